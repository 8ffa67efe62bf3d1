//! Errors produced while registering, building, transforming and emitting expressions.
//!
//! Every error is reported against the text of the operator signature at fault, so reports
//! highlight the offending operator name or operand type. For example, applying `*` to a `Vec3`
//! and a `Mat44` reports against the text `*(Vec3, Mat44)`, with one label on the `*` and one on
//! the operand list.

pub mod kind;

pub use kind::{
    AmbiguousOperator,
    DuplicateDefinition,
    ExpectedLeaf,
    InvalidLiteral,
    TypeMismatch,
    UnknownOperator,
    UnknownTarget,
    UnsupportedOperation,
    UnsupportedTarget,
};

use crate::registry::Signature;
use crate::types::Type;
use std::ops::Range;
use symop_error::Error;

/// The text of an operator signature, with the spans of each of its parts.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SignatureText {
    /// The full text, e.g. `Mat44 *(Mat44, Vec4)`.
    pub text: String,

    /// The span of the result type, if the text includes one.
    pub result: Option<Range<usize>>,

    /// The span of the operator name.
    pub name: Range<usize>,

    /// The span of the whole parenthesized operand list.
    pub args: Range<usize>,

    /// The span of each operand type.
    pub operands: Vec<Range<usize>>,
}

impl SignatureText {
    /// Lays out a signature. The result type is omitted if `None`.
    pub fn new(result: Option<Type>, name: &str, operands: &[Type]) -> Self {
        let mut text = String::new();
        let result = result.map(|ty| {
            text.push_str(ty.name());
            let span = 0..text.len();
            text.push(' ');
            span
        });

        let name_start = text.len();
        text.push_str(name);
        let name = name_start..text.len();

        let args_start = text.len();
        text.push('(');
        let mut spans = Vec::with_capacity(operands.len());
        for (i, ty) in operands.iter().enumerate() {
            if i > 0 {
                text.push_str(", ");
            }
            let start = text.len();
            text.push_str(ty.name());
            spans.push(start..text.len());
        }
        text.push(')');

        Self {
            args: args_start..text.len(),
            text,
            result,
            name,
            operands: spans,
        }
    }

    /// Lays out a registered signature.
    pub fn of(signature: &Signature) -> Self {
        Self::new(Some(signature.result), &signature.name, &signature.operands)
    }

    /// The span of the whole text.
    pub fn full(&self) -> Range<usize> {
        0..self.text.len()
    }
}

/// The operator was already registered.
pub(crate) fn duplicate_definition(signature: &Signature) -> Error {
    let text = SignatureText::of(signature);
    Error::new(text.text.clone(), vec![text.full()], DuplicateDefinition {
        signature: text.text,
    })
}

/// No operator matches the name and operand types.
pub(crate) fn unknown_operator(name: &str, operands: &[Type], suggestions: Vec<String>) -> Error {
    let text = SignatureText::new(None, name, operands);
    Error::new(text.text, vec![text.name, text.args], UnknownOperator {
        name: name.to_string(),
        operands: operands.to_vec(),
        suggestions,
    })
}

/// More than one result type is registered for the name and operand types.
pub(crate) fn ambiguous_operator(name: &str, operands: &[Type], candidates: Vec<String>) -> Error {
    let text = SignatureText::new(None, name, operands);
    Error::new(text.text, vec![text.name], AmbiguousOperator {
        name: name.to_string(),
        operands: operands.to_vec(),
        candidates,
    })
}

/// The operator lacks a hook required by a pass.
pub(crate) fn unsupported_operation(
    signature: &Signature,
    hook: &'static str,
    pass: &'static str,
) -> Error {
    let text = SignatureText::of(signature);
    Error::new(text.text.clone(), vec![text.name], UnsupportedOperation {
        signature: text.text,
        hook,
        pass,
    })
}

/// An operand of an application has the wrong type.
pub(crate) fn operand_mismatch(signature: &Signature, index: usize, given: Type) -> Error {
    let text = SignatureText::of(signature);
    let span = text.operands.get(index).cloned().unwrap_or_else(|| text.args.clone());
    Error::new(text.text, vec![span], TypeMismatch {
        context: format!("operand #{} of `{}`", index + 1, signature),
        expected: signature.operands.get(index).copied().unwrap_or(given),
        given,
    })
}

/// A hook of the operator produced a node of the wrong type.
pub(crate) fn result_mismatch(signature: &Signature, hook: &'static str, given: Type) -> Error {
    let text = SignatureText::of(signature);
    let span = text.result.clone().unwrap_or_else(|| text.full());
    Error::new(text.text, vec![span], TypeMismatch {
        context: format!("the `{}` hook of `{}` produced a `{}`", hook, signature, given),
        expected: signature.result,
        given,
    })
}

/// A value meant to stand in for `name` has the wrong type.
pub(crate) fn binding_mismatch(name: &str, expected: Type, given: Type, role: &str) -> Error {
    let text = format!("{}: {}", name, expected);
    let span = name.len() + 2..text.len();
    Error::new(text, vec![span], TypeMismatch {
        context: format!("{} for `{}`", role, name),
        expected,
        given,
    })
}

/// The operator has no renderer for the target.
pub(crate) fn unsupported_target(signature: &Signature, target: &'static str) -> Error {
    let text = SignatureText::of(signature);
    Error::new(text.text.clone(), vec![text.name], UnsupportedTarget {
        signature: text.text,
        target,
    })
}

/// The target name is not one of the known targets.
pub(crate) fn unknown_target(name: &str, available: Vec<&'static str>) -> Error {
    Error::new(name, vec![0..name.len()], UnknownTarget {
        name: name.to_string(),
        available,
    })
}

/// The literal has the wrong number of components.
pub(crate) fn invalid_literal(ty: Type, given: usize) -> Error {
    let text = format!("{}[{}]", ty, given);
    Error::new(text.clone(), vec![0..text.len()], InvalidLiteral {
        ty,
        expected: ty.len(),
        given,
    })
}

/// A leaf was expected, but `text` (the display of the node) was given.
pub(crate) fn expected_leaf(text: String, role: &'static str) -> Error {
    let span = 0..text.len();
    Error::new(text, vec![span], ExpectedLeaf { role })
}
