//! Rendering expression graphs to target source text.
//!
//! [`render`] turns a single expression into a source fragment: leaves render as their names,
//! constants as target literals, and applications through their operator's renderer for the
//! target, given the rendered operands. Every renderer parenthesizes its result, so the output
//! never depends on the target's precedence rules.
//!
//! [`Kernel`] renders a set of named outputs as a sequence of statements, computing shared
//! subexpressions once.
//!
//! Vectors and matrices are flattened column-major in both targets: element `(row, col)` of a
//! `Mat44` is at flat index `row + 4*col`.

mod kernel;

pub use kernel::{CodeSink, Kernel};

use crate::error::unsupported_target;
use crate::expr::{Node, NodeId, NodeKind};
use crate::literal::Literal;
use crate::registry::Target;
use crate::types::Type;
use log::debug;
use std::collections::HashMap;
use symop_error::Error;

/// Renders a real number as a literal of the target.
pub fn number(value: f64, target: Target) -> String {
    let text = if value.is_nan() {
        match target {
            Target::C => "NAN".to_string(),
            Target::Js => "NaN".to_string(),
        }
    } else if value.is_infinite() {
        let infinity = match target {
            Target::C => "INFINITY",
            Target::Js => "Infinity",
        };
        if value < 0.0 {
            format!("-{}", infinity)
        } else {
            infinity.to_string()
        }
    } else {
        format!("{:?}", value)
    };

    if value.is_sign_negative() && !value.is_nan() {
        format!("({})", text)
    } else {
        text
    }
}

/// Renders the construction of a vector or matrix from its flattened, column-major components.
pub fn container(ty: Type, items: &[String], target: Target) -> String {
    match target {
        Target::C => format!("{} {{ {} }}", ty, items.join(", ")),
        Target::Js => format!("Float64Array.of({})", items.join(", ")),
    }
}

/// Renders a literal value.
pub fn literal(value: &Literal, target: Target) -> String {
    match value.as_scalar() {
        Some(scalar) => number(scalar, target),
        None => {
            let items = value.data().iter().map(|&x| number(x, target)).collect::<Vec<_>>();
            container(value.ty(), &items, target)
        },
    }
}

/// Renders one node, given the already rendered text of its operands.
fn render_node(node: &Node, target: Target, rendered: &HashMap<NodeId, String>) -> Result<String, Error> {
    match node.kind() {
        NodeKind::Constant(value) => Ok(literal(value, target)),
        NodeKind::Leaf(name) => Ok(name.clone()),
        NodeKind::Application(app) => {
            let Some(renderer) = app.definition().renderer(target) else {
                return Err(unsupported_target(app.signature(), target.name()));
            };
            // operands precede their consumers in post-order
            let operands = app.operands()
                .iter()
                .map(|operand| rendered[&operand.id()].clone())
                .collect::<Vec<_>>();
            Ok(renderer(&operands))
        },
    }
}

/// Renders an expression as a single source fragment of the target.
pub fn render(node: &Node, target: Target) -> Result<String, Error> {
    // the root is yielded last, so `text` ends up holding it
    let mut rendered = HashMap::new();
    let mut text = String::new();
    for current in node.post_order_iter() {
        text = render_node(current, target, &rendered)?;
        rendered.insert(current.id(), text.clone());
    }

    debug!("rendered {} bytes of {} for a `{}`", text.len(), target, node.ty());
    Ok(text)
}

#[cfg(test)]
mod tests {
    use crate::error::UnsupportedTarget;
    use crate::ops;
    use crate::registry::Registry;
    use pretty_assertions::assert_eq;
    use super::*;

    #[test]
    fn numbers() {
        assert_eq!(number(1.0, Target::C), "1.0");
        assert_eq!(number(-0.5, Target::C), "(-0.5)");
        assert_eq!(number(1e-12, Target::Js), "1e-12");
        assert_eq!(number(f64::NAN, Target::C), "NAN");
        assert_eq!(number(f64::NAN, Target::Js), "NaN");
        assert_eq!(number(f64::NEG_INFINITY, Target::Js), "(-Infinity)");
    }

    #[test]
    fn literals() {
        let v = Literal::new(Type::Vec3, vec![1.0, -2.0, 0.25]).unwrap();
        assert_eq!(literal(&v, Target::C), "Vec3 { 1.0, (-2.0), 0.25 }");
        assert_eq!(literal(&v, Target::Js), "Float64Array.of(1.0, (-2.0), 0.25)");
    }

    #[test]
    fn element_access() {
        let registry = ops::standard().unwrap();
        let m = Node::leaf("m", Type::Mat44);
        let cell = registry.apply("(2,3)", &[m]).unwrap();
        assert_eq!(render(&cell, Target::C).unwrap(), "(m(2,3))");
        assert_eq!(render(&cell, Target::Js).unwrap(), "(m[2 + 4*3])");
    }

    #[test]
    fn fully_parenthesized() {
        let registry = ops::standard().unwrap();
        let a = Node::leaf("a", Type::Scalar);
        let b = Node::leaf("b", Type::Scalar);
        let c = Node::leaf("c", Type::Scalar);
        let sum = registry.apply("+", &[a, b]).unwrap();
        let product = registry.apply("*", &[sum, c]).unwrap();
        let negated = registry.apply("-", &[product]).unwrap();

        assert_eq!(render(&negated, Target::C).unwrap(), "(-((a + b) * c))");
        assert_eq!(render(&negated, Target::Js).unwrap(), "(-((a + b) * c))");
    }

    #[test]
    fn target_helpers() {
        let registry = ops::standard().unwrap();
        let a = Node::leaf("a", Type::Mat44);
        let b = Node::leaf("b", Type::Mat44);
        let product = registry.apply("*", &[a.clone(), b]).unwrap();
        let cos = registry.apply("cos", &[Node::leaf("t", Type::Scalar)]).unwrap();

        assert_eq!(render(&product, Target::C).unwrap(), "(a * b)");
        assert_eq!(render(&product, Target::Js).unwrap(), "Geom3D.mul_mat44_mat44(a, b)");
        assert_eq!(render(&cos, Target::C).unwrap(), "cos(t)");
        assert_eq!(render(&cos, Target::Js).unwrap(), "Math.cos(t)");
    }

    #[test]
    fn shared_operands_render_in_full() {
        let registry = ops::standard().unwrap();
        let x = Node::leaf("x", Type::Scalar);
        let cos = registry.apply("cos", &[x]).unwrap();
        let square = registry.apply("*", &[cos.clone(), cos]).unwrap();
        let sum = registry.apply("+", &[square.clone(), square]).unwrap();

        assert_eq!(render(&sum, Target::C).unwrap(), "((cos(x) * cos(x)) + (cos(x) * cos(x)))");
        assert_eq!(render(&Node::leaf("y", Type::Vec3), Target::Js).unwrap(), "y");
    }

    #[test]
    fn missing_renderer() {
        let mut registry = Registry::new();
        registry.define(Type::Scalar, "cOnly", [Type::Scalar])
            .render(Target::C, |args| format!("c_only({})", args[0]))
            .finish()
            .unwrap();
        let expr = registry.apply("cOnly", &[Node::leaf("x", Type::Scalar)]).unwrap();

        assert_eq!(render(&expr, Target::C).unwrap(), "c_only(x)");
        let err = render(&expr, Target::Js).unwrap_err();
        assert!(err.is::<UnsupportedTarget>());
        assert_eq!(err.to_string(), "the `Scalar cOnly(Scalar)` operator cannot be rendered to js");
    }
}
