//! Scalar arithmetic.

use crate::literal::Literal;
use crate::registry::{Registry, Target};
use crate::types::Type::Scalar;
use super::{add, call, cos, div, fold_if_constant, infix, mul, neg, sin, sub};
use symop_error::Error;

/// Combines two scalar literals.
fn binary(f: fn(f64, f64) -> f64) -> impl Fn(&[&Literal]) -> Literal + Copy + Send + Sync + 'static {
    move |args: &[&Literal]| args[0].zip_with(args[1], f)
}

/// Maps a scalar literal.
fn unary(f: fn(f64) -> f64) -> impl Fn(&[&Literal]) -> Literal + Copy + Send + Sync + 'static {
    move |args: &[&Literal]| args[0].map(f)
}

pub(super) fn register(registry: &mut Registry) -> Result<(), Error> {
    let fold = binary(|a, b| a + b);
    registry.define(Scalar, "+", [Scalar, Scalar])
        .optimize(move |_, args| {
            if let Some(folded) = fold_if_constant(args, fold) {
                return Ok(Some(folded));
            }
            if args[0].is_zero() {
                return Ok(Some(args[1].clone()));
            }
            if args[1].is_zero() {
                return Ok(Some(args[0].clone()));
            }
            Ok(None)
        })
        .deriv(|d, args| {
            let (da, db) = (d.derive(&args[0])?, d.derive(&args[1])?);
            add(d.registry(), &da, &db)
        })
        .gradient(|pass, g, args| {
            pass.add_gradient(&args[0], g.clone())?;
            pass.add_gradient(&args[1], g.clone())
        })
        .fold(fold)
        .render(Target::C, infix("+"))
        .render(Target::Js, infix("+"))
        .finish()?;

    let fold = binary(|a, b| a - b);
    registry.define(Scalar, "-", [Scalar, Scalar])
        .optimize(move |registry, args| {
            if let Some(folded) = fold_if_constant(args, fold) {
                return Ok(Some(folded));
            }
            if args[1].is_zero() {
                return Ok(Some(args[0].clone()));
            }
            if args[0].is_zero() {
                return neg(registry, &args[1]).map(Some);
            }
            Ok(None)
        })
        .deriv(|d, args| {
            let (da, db) = (d.derive(&args[0])?, d.derive(&args[1])?);
            sub(d.registry(), &da, &db)
        })
        .gradient(|pass, g, args| {
            let negated = neg(pass.registry(), g)?;
            pass.add_gradient(&args[0], g.clone())?;
            pass.add_gradient(&args[1], negated)
        })
        .fold(fold)
        .render(Target::C, infix("-"))
        .render(Target::Js, infix("-"))
        .finish()?;

    let fold = unary(|a| -a);
    registry.define(Scalar, "-", [Scalar])
        .optimize(move |_, args| {
            if let Some(folded) = fold_if_constant(args, fold) {
                return Ok(Some(folded));
            }
            // double negation
            if args[0].is_op("-") && args[0].operands().len() == 1 {
                return Ok(Some(args[0].operands()[0].clone()));
            }
            Ok(None)
        })
        .deriv(|d, args| {
            let da = d.derive(&args[0])?;
            neg(d.registry(), &da)
        })
        .gradient(|pass, g, args| {
            let negated = neg(pass.registry(), g)?;
            pass.add_gradient(&args[0], negated)
        })
        .fold(fold)
        .render(Target::C, |args| format!("(-{})", args[0]))
        .render(Target::Js, |args| format!("(-{})", args[0]))
        .finish()?;

    let fold = binary(|a, b| a * b);
    registry.define(Scalar, "*", [Scalar, Scalar])
        .optimize(move |_, args| {
            if let Some(folded) = fold_if_constant(args, fold) {
                return Ok(Some(folded));
            }
            for (this, other) in [(&args[0], &args[1]), (&args[1], &args[0])] {
                if this.is_zero() {
                    return Ok(Some(this.clone()));
                }
                if this.is_one() {
                    return Ok(Some(other.clone()));
                }
            }
            Ok(None)
        })
        .deriv(|d, args| {
            let (a, b) = (&args[0], &args[1]);
            let (da, db) = (d.derive(a)?, d.derive(b)?);
            let registry = d.registry();
            add(registry, &mul(registry, a, &db)?, &mul(registry, &da, b)?)
        })
        .gradient(|pass, g, args| {
            let registry = pass.registry();
            pass.add_gradient(&args[0], mul(registry, g, &args[1])?)?;
            pass.add_gradient(&args[1], mul(registry, &args[0], g)?)
        })
        .fold(fold)
        .render(Target::C, infix("*"))
        .render(Target::Js, infix("*"))
        .finish()?;

    let fold = binary(|a, b| a / b);
    registry.define(Scalar, "/", [Scalar, Scalar])
        .optimize(move |_, args| {
            if let Some(folded) = fold_if_constant(args, fold) {
                return Ok(Some(folded));
            }
            if args[0].is_zero() || args[1].is_one() {
                return Ok(Some(args[0].clone()));
            }
            Ok(None)
        })
        .deriv(|d, args| {
            // (da b - a db) / b^2
            let (a, b) = (&args[0], &args[1]);
            let (da, db) = (d.derive(a)?, d.derive(b)?);
            let registry = d.registry();
            let numerator = sub(registry, &mul(registry, &da, b)?, &mul(registry, a, &db)?)?;
            div(registry, &numerator, &mul(registry, b, b)?)
        })
        .gradient(|pass, g, args| {
            let (a, b) = (&args[0], &args[1]);
            let registry = pass.registry();
            let quotient = div(registry, a, b)?;
            let da = div(registry, g, b)?;
            let db = neg(registry, &mul(registry, &da, &quotient)?)?;
            pass.add_gradient(a, da)?;
            pass.add_gradient(b, db)
        })
        .fold(fold)
        .render(Target::C, infix("/"))
        .render(Target::Js, infix("/"))
        .finish()?;

    let fold = unary(f64::cos);
    registry.define(Scalar, "cos", [Scalar])
        .optimize(move |_, args| Ok(fold_if_constant(args, fold)))
        .deriv(|d, args| {
            let da = d.derive(&args[0])?;
            let registry = d.registry();
            mul(registry, &neg(registry, &sin(registry, &args[0])?)?, &da)
        })
        .gradient(|pass, g, args| {
            let registry = pass.registry();
            let slope = neg(registry, &sin(registry, &args[0])?)?;
            pass.add_gradient(&args[0], mul(registry, &slope, g)?)
        })
        .fold(fold)
        .render(Target::C, call("cos"))
        .render(Target::Js, call("Math.cos"))
        .finish()?;

    let fold = unary(f64::sin);
    registry.define(Scalar, "sin", [Scalar])
        .optimize(move |_, args| Ok(fold_if_constant(args, fold)))
        .deriv(|d, args| {
            let da = d.derive(&args[0])?;
            let registry = d.registry();
            mul(registry, &cos(registry, &args[0])?, &da)
        })
        .gradient(|pass, g, args| {
            let registry = pass.registry();
            let slope = cos(registry, &args[0])?;
            pass.add_gradient(&args[0], mul(registry, &slope, g)?)
        })
        .fold(fold)
        .render(Target::C, call("sin"))
        .render(Target::Js, call("Math.sin"))
        .finish()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::derivative::derivative;
    use crate::expr::Node;
    use crate::fold::{fold_constants, substitute};
    use crate::gradient::backprop;
    use crate::ops::standard;
    use crate::types::Type;
    use assert_float_eq::*;
    use pretty_assertions::assert_eq;
    use super::*;

    fn eval(registry: &Registry, expr: &Node, x: &Node, value: f64) -> f64 {
        let bound = substitute(registry, expr, &[(x.clone(), Node::scalar(value))]).unwrap();
        fold_constants(registry, &bound).unwrap().as_scalar().unwrap()
    }

    #[test]
    fn identity_elements() {
        let registry = standard().unwrap();
        let x = Node::leaf("x", Type::Scalar);
        let zero = Node::scalar(0.0);
        let one = Node::scalar(1.0);

        assert!(add(&registry, &x, &zero).unwrap().same(&x));
        assert!(sub(&registry, &x, &zero).unwrap().same(&x));
        assert!(mul(&registry, &one, &x).unwrap().same(&x));
        assert!(mul(&registry, &x, &zero).unwrap().is_zero());
        assert!(div(&registry, &x, &one).unwrap().same(&x));
        assert!(neg(&registry, &neg(&registry, &x).unwrap()).unwrap().same(&x));
        assert_eq!(sub(&registry, &zero, &x).unwrap().to_string(), "(-x)");
    }

    #[test]
    fn constants_fold_at_construction() {
        let registry = standard().unwrap();
        let sum = add(&registry, &Node::scalar(1.5), &Node::scalar(2.0)).unwrap();
        assert_eq!(sum.as_scalar(), Some(3.5));
        let angle = cos(&registry, &Node::scalar(0.0)).unwrap();
        assert!(angle.is_one());
    }

    #[test]
    fn quotient_rule() {
        let registry = standard().unwrap();
        let x = Node::leaf("x", Type::Scalar);
        let expr = div(&registry, &sin(&registry, &x).unwrap(), &x).unwrap();
        let d = derivative(&registry, &expr, &x).unwrap();
        let g = backprop(&registry, &expr, &[x.clone()]).unwrap().gradient_or_zero(&x);

        for value in [0.5f64, 1.0, 2.5] {
            let expected = (value * value.cos() - value.sin()) / (value * value);
            assert_float_absolute_eq!(eval(&registry, &d, &x, value), expected, 1e-12);
            assert_float_absolute_eq!(eval(&registry, &g, &x, value), expected, 1e-12);
        }
    }

    #[test]
    fn trigonometric_chain_rule() {
        let registry = standard().unwrap();
        let x = Node::leaf("x", Type::Scalar);
        let inner = mul(&registry, &x, &x).unwrap();
        let expr = sub(&registry, &cos(&registry, &inner).unwrap(), &x).unwrap();
        let d = derivative(&registry, &expr, &x).unwrap();

        for value in [-1.0f64, 0.25, 3.0] {
            let expected = -(value * value).sin() * 2.0 * value - 1.0;
            assert_float_absolute_eq!(eval(&registry, &d, &x, value), expected, 1e-12);
        }
    }
}
