//! Forward symbolic differentiation.
//!
//! The derivative of an expression with respect to a leaf is another expression, built by
//! structural recursion:
//!
//! - a constant differentiates to the zero constant of its type;
//! - the leaf itself differentiates to the identity constant of its type, any other leaf to zero;
//! - an application differentiates through its operator's `deriv` hook, which applies the rule of
//!   that operator (sum rule, product rule, chain rule) and differentiates its operands through
//!   [`Derivative::derive`].
//!
//! Because operators are built through [`Registry::apply`], the `optimize` hooks prune the many
//! zero terms the rules produce (`0 * x`, `x + 0`).

use crate::error::{expected_leaf, result_mismatch, unsupported_operation};
use crate::expr::{Node, NodeId, NodeKind};
use crate::registry::Registry;
use log::trace;
use rayon::prelude::*;
use std::{collections::HashMap, sync::Arc};
use symop_error::Error;

/// Differentiates expressions with respect to one leaf.
///
/// Derivatives are remembered by node identity, so a subexpression shared by several parents is
/// differentiated once.
pub struct Derivative<'a> {
    registry: &'a Registry,
    wrt: Node,
    derived: HashMap<NodeId, Node>,
}

impl<'a> Derivative<'a> {
    /// Creates a pass that differentiates with respect to `wrt`, which must be a leaf.
    pub fn new(registry: &'a Registry, wrt: &Node) -> Result<Self, Error> {
        if !wrt.is_leaf() {
            return Err(expected_leaf(wrt.to_string(), "differentiation variable"));
        }

        Ok(Self {
            registry,
            wrt: wrt.clone(),
            derived: HashMap::new(),
        })
    }

    /// The registry derivatives are built from.
    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// The leaf being differentiated with respect to.
    pub fn wrt(&self) -> &Node {
        &self.wrt
    }

    /// Returns the derivative of `node`, of the same type as `node`.
    pub fn derive(&mut self, node: &Node) -> Result<Node, Error> {
        if let Some(derived) = self.derived.get(&node.id()) {
            return Ok(derived.clone());
        }

        let derived = match node.kind() {
            NodeKind::Constant(_) => Node::zero(node.ty()),
            NodeKind::Leaf(_) if node.same(&self.wrt) => Node::one(node.ty()),
            NodeKind::Leaf(_) => Node::zero(node.ty()),
            NodeKind::Application(app) => {
                let def = Arc::clone(app.definition());
                let Some(deriv) = &def.hooks().deriv else {
                    return Err(unsupported_operation(def.signature(), "deriv", "derivative"));
                };

                trace!("differentiating `{}`", def.signature());
                let derived = deriv(self, app.operands())?;
                if derived.ty() != def.result() {
                    return Err(result_mismatch(def.signature(), "deriv", derived.ty()));
                }
                derived
            },
        };

        self.derived.insert(node.id(), derived.clone());
        Ok(derived)
    }
}

/// Returns the derivative of `expr` with respect to the leaf `wrt`.
pub fn derivative(registry: &Registry, expr: &Node, wrt: &Node) -> Result<Node, Error> {
    Derivative::new(registry, wrt)?.derive(expr)
}

/// Returns the derivative of `expr` with respect to each of the given leaves, in order.
///
/// The derivatives are computed in parallel; the graph and registry are only read.
pub fn jacobian(registry: &Registry, expr: &Node, leaves: &[Node]) -> Result<Vec<Node>, Error> {
    leaves
        .par_iter()
        .map(|leaf| derivative(registry, expr, leaf))
        .collect()
}

#[cfg(test)]
mod tests {
    use crate::error::{ExpectedLeaf, UnsupportedOperation};
    use crate::fold::{fold_constants, substitute};
    use crate::literal::Literal;
    use crate::lower::lower;
    use crate::ops;
    use crate::types::Type;
    use assert_float_eq::*;
    use pretty_assertions::assert_eq;
    use super::*;

    /// Evaluates `expr` with the given leaves bound to constants.
    fn eval(registry: &Registry, expr: &Node, bindings: &[(Node, Node)]) -> Literal {
        let bound = substitute(registry, expr, bindings).unwrap();
        let lowered = lower(registry, &bound).unwrap();
        let folded = fold_constants(registry, &lowered).unwrap();
        folded.as_literal().cloned().unwrap()
    }

    fn assert_literal_eq(lhs: &Literal, rhs: &Literal) {
        assert_eq!(lhs.ty(), rhs.ty());
        for (&a, &b) in lhs.data().iter().zip(rhs.data()) {
            assert_float_absolute_eq!(a, b, 1e-9);
        }
    }

    #[test]
    fn leaves_and_constants() {
        let registry = ops::standard().unwrap();
        let x = Node::leaf("x", Type::Mat44);
        let other_x = Node::leaf("x", Type::Mat44);

        assert!(derivative(&registry, &x, &x).unwrap().is_one());
        assert!(derivative(&registry, &other_x, &x).unwrap().is_zero());
        assert!(derivative(&registry, &Node::one(Type::Vec3), &x).unwrap().is_zero());
    }

    #[test]
    fn wrt_must_be_leaf() {
        let registry = ops::standard().unwrap();
        let err = derivative(&registry, &Node::scalar(1.0), &Node::scalar(2.0)).unwrap_err();
        assert!(err.is::<ExpectedLeaf>());
    }

    #[test]
    fn missing_hook() {
        let mut registry = Registry::new();
        registry.define(Type::Scalar, "opaque", [Type::Scalar]).finish().unwrap();
        let x = Node::leaf("x", Type::Scalar);
        let expr = registry.apply("opaque", &[x.clone()]).unwrap();

        let err = derivative(&registry, &expr, &x).unwrap_err();
        assert!(err.is::<UnsupportedOperation>());
        assert_eq!(err.to_string(), "cannot compute the derivative of `Scalar opaque(Scalar)`");
    }

    #[test]
    fn sum_rule() {
        let registry = ops::standard().unwrap();
        let w = Node::leaf("w", Type::Scalar);
        let a = registry.apply("mat44RotationX", &[w.clone()]).unwrap();
        let scale = registry.apply("*", &[w.clone(), w.clone()]).unwrap();
        let b = registry.apply("mat44Scale", &[scale, Node::scalar(2.0), w.clone()]).unwrap();
        let sum = registry.apply("+", &[a.clone(), b.clone()]).unwrap();

        let d_sum = derivative(&registry, &sum, &w).unwrap();
        let da = derivative(&registry, &a, &w).unwrap();
        let db = derivative(&registry, &b, &w).unwrap();
        assert_eq!(d_sum, registry.apply("+", &[da.clone(), db.clone()]).unwrap());

        for value in [0.0, 0.3, -1.7] {
            let at = [(w.clone(), Node::scalar(value))];
            let expected = eval(&registry, &da, &at).zip_with(&eval(&registry, &db, &at), |x, y| x + y);
            assert_literal_eq(&eval(&registry, &d_sum, &at), &expected);
        }
    }

    #[test]
    fn product_rule() {
        let registry = ops::standard().unwrap();
        let w = Node::leaf("w", Type::Scalar);
        let a = registry.apply("mat44RotationZ", &[w.clone()]).unwrap();
        let b = registry.apply("mat44Translation", &[w.clone(), Node::scalar(1.0), w.clone()]).unwrap();
        let product = registry.apply("*", &[a.clone(), b.clone()]).unwrap();

        let d_product = derivative(&registry, &product, &w).unwrap();
        let da = derivative(&registry, &a, &w).unwrap();
        let db = derivative(&registry, &b, &w).unwrap();

        for value in [0.0, 0.5, 2.0] {
            let at = [(w.clone(), Node::scalar(value))];
            let (a, b) = (eval(&registry, &a, &at), eval(&registry, &b, &at));
            let (da, db) = (eval(&registry, &da, &at), eval(&registry, &db, &at));
            let expected = da.matmul(&b, Type::Mat44)
                .zip_with(&a.matmul(&db, Type::Mat44), |x, y| x + y);
            assert_literal_eq(&eval(&registry, &d_product, &at), &expected);
        }
    }

    #[test]
    fn rotation_matches_finite_difference() {
        let registry = ops::standard().unwrap();
        let w = Node::leaf("w", Type::Scalar);
        for name in ["mat44RotationX", "mat44RotationY", "mat44RotationZ"] {
            let rotation = registry.apply(name, &[w.clone()]).unwrap();
            let d_rotation = derivative(&registry, &rotation, &w).unwrap();

            let (value, h) = (0.7, 1e-6);
            let ahead = eval(&registry, &rotation, &[(w.clone(), Node::scalar(value + h))]);
            let behind = eval(&registry, &rotation, &[(w.clone(), Node::scalar(value - h))]);
            let expected = ahead.zip_with(&behind, |x, y| (x - y) / (2.0 * h));
            let actual = eval(&registry, &d_rotation, &[(w.clone(), Node::scalar(value))]);
            for (&a, &b) in actual.data().iter().zip(expected.data()) {
                assert_float_absolute_eq!(a, b, 1e-6);
            }
        }
    }

    #[test]
    fn jacobian_of_translation() {
        let registry = ops::standard().unwrap();
        let leaves = ["x", "y", "z"].map(|name| Node::leaf(name, Type::Scalar));
        let translation = registry.apply("mat44Translation", &leaves).unwrap();
        let p = Node::literal(Type::Vec4, vec![1.0, 2.0, 3.0, 1.0]).unwrap();
        let moved = registry.apply("*", &[translation, p]).unwrap();

        let columns = jacobian(&registry, &moved, &leaves).unwrap();
        let at = leaves.iter().map(|leaf| (leaf.clone(), Node::scalar(0.25))).collect::<Vec<_>>();
        for (i, column) in columns.iter().enumerate() {
            assert_eq!(eval(&registry, column, &at), Literal::one_hot(Type::Vec4, i));
        }
    }
}
