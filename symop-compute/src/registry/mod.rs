//! The operator registry.
//!
//! Operators are declared once, before any expression is built, by registering a [`Definition`]
//! under its [`Signature`]: a result type, an operator name and an ordered tuple of operand
//! types. The same name may be registered any number of times with different operand types or
//! result types; `*`, for example, has distinct definitions for `Mat44 * Mat44`,
//! `Scalar * Mat44`, and `Mat44 * Vec4`.
//!
//! Resolution is by exact match on the operand-type tuple. There is no implicit widening or
//! coercion between types; [`Type::Scalar`] and [`Type::GenericScalar`] are distinct keys.
//!
//! ```
//! use symop_compute::{Node, Registry, Target, Type};
//!
//! let mut registry = Registry::new();
//! registry.define(Type::Scalar, "+", [Type::Scalar, Type::Scalar])
//!     .render(Target::C, |a| format!("({} + {})", a[0], a[1]))
//!     .finish()
//!     .unwrap();
//!
//! let sum = registry.apply("+", &[Node::leaf("x", Type::Scalar), Node::scalar(2.0)]).unwrap();
//! assert_eq!(sum.to_string(), "(x + 2)");
//! ```
//!
//! A registry is read-only once populated and can be shared between threads.

pub mod hooks;
pub mod target;

use crate::derivative::Derivative;
use crate::error::{ambiguous_operator, duplicate_definition, unknown_operator};
use crate::expr::Node;
use crate::gradient::Backprop;
use crate::literal::Literal;
use crate::types::Type;
use hooks::Hooks;
use levenshtein::levenshtein;
use log::trace;
use std::{collections::HashMap, fmt, sync::Arc};
use symop_error::Error;

pub use hooks::{DerivFn, ExpandFn, FoldFn, GradientFn, OptimizeFn, RenderFn, ReplaceFn};
pub use target::Target;

/// The key an operator is registered under.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    /// The type of the operator's result.
    pub result: Type,

    /// The name of the operator, such as `*`, `trans` or `(0,3)`.
    pub name: String,

    /// The types of the operands, in order.
    pub operands: Vec<Type>,
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}(", self.result, self.name)?;
        let mut iter = self.operands.iter();
        if let Some(ty) = iter.next() {
            write!(f, "{}", ty)?;
            for ty in iter {
                write!(f, ", {}", ty)?;
            }
        }
        write!(f, ")")
    }
}

/// A registered operator: its signature and the hooks it provides.
pub struct Definition {
    signature: Signature,
    hooks: Hooks,
}

impl Definition {
    /// The signature of the operator.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// The type of the operator's result.
    pub fn result(&self) -> Type {
        self.signature.result
    }

    /// The name of the operator.
    pub fn name(&self) -> &str {
        &self.signature.name
    }

    /// The types of the operator's operands.
    pub fn operands(&self) -> &[Type] {
        &self.signature.operands
    }

    /// The hooks of the operator.
    pub fn hooks(&self) -> &Hooks {
        &self.hooks
    }

    /// The renderer for the given target, if the operator has one.
    pub fn renderer(&self, target: Target) -> Option<&RenderFn> {
        self.hooks.render.get(&target)
    }
}

impl fmt::Debug for Definition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Definition")
            .field("signature", &self.signature.to_string())
            .field("hooks", &self.hooks.present())
            .finish()
    }
}

/// The set of operators expressions can be built from.
///
/// See the [module-level documentation](self) for details.
#[derive(Debug, Default)]
pub struct Registry {
    /// Definitions grouped by operator name.
    defs: HashMap<String, Vec<Arc<Definition>>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the declaration of an operator. Call [`DefinitionBuilder::finish`] to register it.
    pub fn define(
        &mut self,
        result: Type,
        name: impl Into<String>,
        operands: impl Into<Vec<Type>>,
    ) -> DefinitionBuilder<'_> {
        DefinitionBuilder {
            registry: self,
            signature: Signature {
                result,
                name: name.into(),
                operands: operands.into(),
            },
            hooks: Hooks::default(),
        }
    }

    /// Registers an operator with the given signature and hooks. Returns [`Err`] if an operator
    /// with the same signature is already registered.
    pub fn register(&mut self, signature: Signature, hooks: Hooks) -> Result<Arc<Definition>, Error> {
        let group = self.defs.entry(signature.name.clone()).or_default();
        if group.iter().any(|def| def.signature == signature) {
            return Err(duplicate_definition(&signature));
        }

        trace!("registering `{}` with hooks {:?}", signature, hooks.present());
        let def = Arc::new(Definition { signature, hooks });
        group.push(Arc::clone(&def));
        Ok(def)
    }

    /// Returns the operator with the given name and exact operand types.
    ///
    /// Returns [`Err`] if there is no such operator, or if there is more than one (registered
    /// with different result types; see [`Registry::resolve_exact`]).
    pub fn resolve(&self, name: &str, operands: &[Type]) -> Result<&Arc<Definition>, Error> {
        let mut matches = self.defs
            .get(name)
            .into_iter()
            .flatten()
            .filter(|def| def.operands() == operands);

        match (matches.next(), matches.next()) {
            (Some(def), None) => Ok(def),
            (None, _) => Err(unknown_operator(name, operands, self.suggestions(name, operands))),
            (Some(first), Some(second)) => {
                let candidates = [first, second]
                    .into_iter()
                    .chain(matches)
                    .map(|def| def.signature.to_string())
                    .collect();
                Err(ambiguous_operator(name, operands, candidates))
            },
        }
    }

    /// Returns the operator with the given result type, name and exact operand types.
    pub fn resolve_exact(
        &self,
        result: Type,
        name: &str,
        operands: &[Type],
    ) -> Result<&Arc<Definition>, Error> {
        self.defs
            .get(name)
            .into_iter()
            .flatten()
            .find(|def| def.result() == result && def.operands() == operands)
            .ok_or_else(|| unknown_operator(name, operands, self.suggestions(name, operands)))
    }

    /// Returns the signatures of operators that the caller may have meant: every registered
    /// signature with the same name, or failing that, every operator name within an edit
    /// distance of one.
    fn suggestions(&self, name: &str, operands: &[Type]) -> Vec<String> {
        if let Some(group) = self.defs.get(name) {
            let mut signatures = group
                .iter()
                .filter(|def| def.operands().len() == operands.len())
                .map(|def| def.signature.to_string())
                .collect::<Vec<_>>();
            signatures.sort();
            return signatures;
        }

        let mut names = self.defs
            .keys()
            .filter(|n| levenshtein(n, name) < 2)
            .cloned()
            .collect::<Vec<_>>();
        names.sort();
        names
    }

    /// Returns an iterator over every registered operator, in no particular order.
    pub fn definitions(&self) -> impl Iterator<Item = &Arc<Definition>> {
        self.defs.values().flatten()
    }

    /// Returns the number of registered operators.
    pub fn len(&self) -> usize {
        self.defs.values().map(Vec::len).sum()
    }

    /// Returns true if no operators are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Declares an operator's hooks, then registers it with [`DefinitionBuilder::finish`].
///
/// Returned by [`Registry::define`].
#[must_use = "the operator is only registered once `finish` is called"]
pub struct DefinitionBuilder<'r> {
    registry: &'r mut Registry,
    signature: Signature,
    hooks: Hooks,
}

impl DefinitionBuilder<'_> {
    /// Sets the construction-time simplification hook.
    pub fn optimize<F>(mut self, f: F) -> Self
    where
        F: Fn(&Registry, &[Node]) -> Result<Option<Node>, Error> + Send + Sync + 'static,
    {
        self.hooks.optimize = Some(Box::new(f));
        self
    }

    /// Sets the lowering hook that may decline to rewrite.
    pub fn expand<F>(mut self, f: F) -> Self
    where
        F: Fn(&Registry, &[Node]) -> Result<Option<Node>, Error> + Send + Sync + 'static,
    {
        self.hooks.expand = Some(Box::new(f));
        self
    }

    /// Sets the unconditional rewriting hook.
    pub fn replace<F>(mut self, f: F) -> Self
    where
        F: Fn(&Registry, &[Node]) -> Result<Node, Error> + Send + Sync + 'static,
    {
        self.hooks.replace = Some(Box::new(f));
        self
    }

    /// Sets the forward derivative hook.
    pub fn deriv<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Derivative<'_>, &[Node]) -> Result<Node, Error> + Send + Sync + 'static,
    {
        self.hooks.deriv = Some(Box::new(f));
        self
    }

    /// Sets the reverse-mode gradient hook.
    pub fn gradient<F>(mut self, f: F) -> Self
    where
        F: Fn(&mut Backprop<'_>, &Node, &[Node]) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.hooks.gradient = Some(Box::new(f));
        self
    }

    /// Sets the constant folding hook.
    pub fn fold<F>(mut self, f: F) -> Self
    where
        F: Fn(&[&Literal]) -> Literal + Send + Sync + 'static,
    {
        self.hooks.fold = Some(Box::new(f));
        self
    }

    /// Sets the renderer for a target.
    pub fn render<F>(mut self, target: Target, f: F) -> Self
    where
        F: Fn(&[String]) -> String + Send + Sync + 'static,
    {
        self.hooks.render.insert(target, Box::new(f));
        self
    }

    /// Registers the operator. Returns [`Err`] if the signature is already registered.
    pub fn finish(self) -> Result<Arc<Definition>, Error> {
        self.registry.register(self.signature, self.hooks)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::{AmbiguousOperator, DuplicateDefinition, UnknownOperator};
    use pretty_assertions::assert_eq;
    use super::*;

    fn sample() -> Registry {
        let mut registry = Registry::new();
        for (result, operands) in [
            (Type::Mat44, vec![Type::Mat44, Type::Mat44]),
            (Type::Mat44, vec![Type::Scalar, Type::Mat44]),
            (Type::Vec4, vec![Type::Mat44, Type::Vec4]),
            (Type::Mat44, vec![Type::GenericScalar, Type::Mat44]),
        ] {
            registry.define(result, "*", operands).finish().unwrap();
        }
        registry.define(Type::Mat44, "trans", [Type::Mat44]).finish().unwrap();
        registry
    }

    #[test]
    fn resolve_every_signature() {
        let registry = sample();
        assert_eq!(registry.len(), 5);
        for def in registry.definitions() {
            let resolved = registry.resolve(def.name(), def.operands()).unwrap();
            assert!(Arc::ptr_eq(resolved, def));
        }
    }

    #[test]
    fn one_position_differs() {
        let registry = sample();
        let err = registry.resolve("*", &[Type::Mat44, Type::Vec3]).unwrap_err();
        assert!(err.is::<UnknownOperator>());

        let kind = err.downcast_ref::<UnknownOperator>().unwrap();
        assert_eq!(kind.suggestions, vec![
            "Mat44 *(GenericScalar, Mat44)".to_string(),
            "Mat44 *(Mat44, Mat44)".to_string(),
            "Mat44 *(Scalar, Mat44)".to_string(),
            "Vec4 *(Mat44, Vec4)".to_string(),
        ]);
    }

    #[test]
    fn scalar_kinds_are_distinct() {
        let registry = sample();
        let scalar = registry.resolve("*", &[Type::Scalar, Type::Mat44]).unwrap();
        let generic = registry.resolve("*", &[Type::GenericScalar, Type::Mat44]).unwrap();
        assert!(!Arc::ptr_eq(scalar, generic));
    }

    #[test]
    fn similar_names_suggested() {
        let registry = sample();
        let err = registry.resolve("tran", &[Type::Mat44]).unwrap_err();
        let kind = err.downcast_ref::<UnknownOperator>().unwrap();
        assert_eq!(kind.suggestions, vec!["trans".to_string()]);
    }

    #[test]
    fn duplicate_rejected() {
        let mut registry = sample();
        let err = registry.define(Type::Mat44, "trans", [Type::Mat44]).finish().unwrap_err();
        assert!(err.is::<DuplicateDefinition>());
        assert_eq!(err.to_string(), "operator `Mat44 trans(Mat44)` is already defined");

        // same name and operands, different result type: a distinct key
        registry.define(Type::Mat33, "trans", [Type::Mat44]).finish().unwrap();
    }

    #[test]
    fn ambiguous_without_result_type() {
        let mut registry = sample();
        registry.define(Type::Mat33, "trans", [Type::Mat44]).finish().unwrap();

        let err = registry.resolve("trans", &[Type::Mat44]).unwrap_err();
        assert!(err.is::<AmbiguousOperator>());

        let def = registry.resolve_exact(Type::Mat33, "trans", &[Type::Mat44]).unwrap();
        assert_eq!(def.result(), Type::Mat33);
    }
}
