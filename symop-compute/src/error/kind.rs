use ariadne::Fmt;
use symop_attrs::ErrorKind;
use symop_error::EXPR;
use crate::types::Type;

/// Formats a list of types as a parenthesized operand tuple, e.g. `(Mat44, Vec4)`.
fn tuple(types: &[Type]) -> String {
    let names = types.iter().map(|ty| ty.name()).collect::<Vec<_>>();
    format!("({})", names.join(", "))
}

/// Two operators were registered with the same result type, name and operand types.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("operator `{}` is already defined", self.signature),
    labels = ["this signature is already registered"],
    help = "each combination of result type, operator name and operand types may only be registered once",
)]
pub struct DuplicateDefinition {
    /// The signature that was registered twice.
    pub signature: String,
}

/// No registered operator matches the given name and operand types exactly.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("no `{}` operator takes operands of types `{}`", self.name, tuple(&self.operands)),
    labels = ["this operator", "these operand types"],
    help = if self.suggestions.is_empty() {
        "operators must be registered for the exact operand types they are applied to".to_string()
    } else if self.suggestions.len() == 1 {
        format!("did you mean `{}`?", (&*self.suggestions[0]).fg(EXPR))
    } else {
        format!(
            "did you mean one of these? {}",
            self.suggestions
                .iter()
                .map(|s| format!("`{}`", s.fg(EXPR)))
                .collect::<Vec<_>>()
                .join(", ")
        )
    },
)]
pub struct UnknownOperator {
    /// The name of the operator that was applied.
    pub name: String,

    /// The types of the operands it was applied to.
    pub operands: Vec<Type>,

    /// Registered signatures with the same name, or registered names similar to the given name.
    pub suggestions: Vec<String>,
}

/// The operator name and operand types match definitions with different result types.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("the `{}` operator is ambiguous for operands `{}`", self.name, tuple(&self.operands)),
    labels = ["this operator"],
    help = "apply the operator with an explicit result type",
    note = format!("candidates: {}", self.candidates.join(", ")),
)]
pub struct AmbiguousOperator {
    /// The name of the operator that was applied.
    pub name: String,

    /// The types of the operands it was applied to.
    pub operands: Vec<Type>,

    /// The signatures of every matching definition.
    pub candidates: Vec<String>,
}

/// A pass reached an operator whose definition lacks the hook the pass needs.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("cannot compute the {} of `{}`", self.pass, self.signature),
    labels = [format!("this operator has no `{}` hook", self.hook)],
    help = format!("register a `{}` hook for this operator, or lower the expression first", self.hook),
)]
pub struct UnsupportedOperation {
    /// The signature of the operator.
    pub signature: String,

    /// The name of the missing hook.
    pub hook: &'static str,

    /// The pass that needed the hook, e.g. `derivative`.
    pub pass: &'static str,
}

/// A value's type disagrees with the type its position requires.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("expected a value of type `{}`, found `{}`", self.expected, self.given),
    labels = [format!("this must have type `{}`", self.expected)],
    note = self.context.clone(),
)]
pub struct TypeMismatch {
    /// Where the mismatching value appeared.
    pub context: String,

    /// The type required here.
    pub expected: Type,

    /// The type that was found.
    pub given: Type,
}

/// An operator has no renderer for the requested target.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("the `{}` operator cannot be rendered to {}", self.signature, self.target),
    labels = [format!("this operator has no `{}` renderer", self.target)],
    help = "lower the expression first, or register a renderer for this target",
)]
pub struct UnsupportedTarget {
    /// The signature of the operator.
    pub signature: String,

    /// The name of the target.
    pub target: &'static str,
}

/// A target name outside the closed set of targets.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("unknown target: `{}`", self.name),
    labels = ["this target"],
    help = format!("available targets are: {}", self.available.join(", ")),
)]
pub struct UnknownTarget {
    /// The name that was given.
    pub name: String,

    /// The names of every target.
    pub available: Vec<&'static str>,
}

/// A literal was given the wrong number of components for its type.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("a `{}` literal needs {} components, but {} were given", self.ty, self.expected, self.given),
    labels = ["this literal"],
    help = "matrix literals are flattened column-major",
)]
pub struct InvalidLiteral {
    /// The type of the literal.
    pub ty: Type,

    /// The number of components that type has.
    pub expected: usize,

    /// The number of components that were given.
    pub given: usize,
}

/// A leaf was required, such as the variable to differentiate with respect to.
#[derive(Debug, Clone, ErrorKind, PartialEq)]
#[error(
    message = format!("the {} must be a leaf", self.role),
    labels = ["this is not a leaf"],
    help = "differentiation targets are named leaves, compared by identity",
)]
pub struct ExpectedLeaf {
    /// What the leaf was needed for.
    pub role: &'static str,
}
