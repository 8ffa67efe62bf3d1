//! Linear algebra over vectors and matrices: sums, scaling, products, transposes, constructors and
//! component extraction.

use crate::emit::container;
use crate::expr::Node;
use crate::literal::Literal;
use crate::registry::{Registry, Target};
use crate::types::Type::{self, Mat33, Mat44, Scalar, Vec3, Vec4};
use super::{
    add,
    call,
    component,
    component_name,
    construct,
    dot,
    fold_if_constant,
    infix,
    mul,
    outer,
    runtime_name,
    sub,
    trans,
};
use symop_error::Error;

pub(super) fn register(registry: &mut Registry) -> Result<(), Error> {
    for ty in [Vec3, Vec4, Mat33, Mat44] {
        linear(registry, ty)?;
        constructor(registry, ty)?;
        components(registry, ty)?;
    }
    for ty in [Mat33, Mat44] {
        matrix(registry, ty)?;
    }
    for (mat, vec) in [(Mat33, Vec3), (Mat44, Vec4)] {
        matrix_vector(registry, mat, vec)?;
    }
    Ok(())
}

/// `+`, `-`, scaling and `dot` for one vector or matrix type.
fn linear(registry: &mut Registry, ty: Type) -> Result<(), Error> {
    let t = runtime_name(ty);

    let fold = |args: &[&Literal]| args[0].zip_with(args[1], |a, b| a + b);
    registry.define(ty, "+", [ty, ty])
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
        .render(Target::Js, call(format!("Geom3D.add_{}_{}", t, t)))
        .finish()?;

    let fold = |args: &[&Literal]| args[0].zip_with(args[1], |a, b| a - b);
    registry.define(ty, "-", [ty, ty])
        .optimize(move |registry, args| {
            if let Some(folded) = fold_if_constant(args, fold) {
                return Ok(Some(folded));
            }
            if args[1].is_zero() {
                return Ok(Some(args[0].clone()));
            }
            if args[0].is_zero() {
                return mul(registry, &Node::scalar(-1.0), &args[1]).map(Some);
            }
            Ok(None)
        })
        .deriv(|d, args| {
            let (da, db) = (d.derive(&args[0])?, d.derive(&args[1])?);
            sub(d.registry(), &da, &db)
        })
        .gradient(|pass, g, args| {
            let negated = mul(pass.registry(), &Node::scalar(-1.0), g)?;
            pass.add_gradient(&args[0], g.clone())?;
            pass.add_gradient(&args[1], negated)
        })
        .fold(fold)
        .render(Target::C, infix("-"))
        .render(Target::Js, call(format!("Geom3D.sub_{}_{}", t, t)))
        .finish()?;

    let fold = |args: &[&Literal]| args[1].scale(args[0].data()[0]);
    registry.define(ty, "*", [Scalar, ty])
        .optimize(move |_, args| {
            if let Some(folded) = fold_if_constant(args, fold) {
                return Ok(Some(folded));
            }
            if args[0].is_zero() || args[1].is_zero() {
                return Ok(Some(Node::zero(ty)));
            }
            if args[0].is_one() {
                return Ok(Some(args[1].clone()));
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
            pass.add_gradient(&args[0], dot(registry, &args[1], g)?)?;
            pass.add_gradient(&args[1], mul(registry, &args[0], g)?)
        })
        .fold(fold)
        .render(Target::C, infix("*"))
        .render(Target::Js, call(format!("Geom3D.mul_double_{}", t)))
        .finish()?;

    let fold = |args: &[&Literal]| Literal::scalar(args[0].dot(args[1]));
    registry.define(Scalar, "dot", [ty, ty])
        .optimize(move |_, args| {
            if let Some(folded) = fold_if_constant(args, fold) {
                return Ok(Some(folded));
            }
            if args[0].is_zero() || args[1].is_zero() {
                return Ok(Some(Node::scalar(0.0)));
            }
            Ok(None)
        })
        .deriv(|d, args| {
            let (a, b) = (&args[0], &args[1]);
            let (da, db) = (d.derive(a)?, d.derive(b)?);
            let registry = d.registry();
            add(registry, &dot(registry, &da, b)?, &dot(registry, a, &db)?)
        })
        .gradient(|pass, g, args| {
            let registry = pass.registry();
            pass.add_gradient(&args[0], mul(registry, g, &args[1])?)?;
            pass.add_gradient(&args[1], mul(registry, g, &args[0])?)
        })
        .fold(fold)
        .render(Target::C, call("dot"))
        .render(Target::Js, call(format!("Geom3D.dot_{}_{}", t, t)))
        .finish()?;

    Ok(())
}

/// The constructor named after the type, taking every component as a scalar, column-major.
fn constructor(registry: &mut Registry, ty: Type) -> Result<(), Error> {
    let fold = move |args: &[&Literal]| Literal::from_fn(ty, |i| args[i].data()[0]);
    registry.define(ty, ty.name(), vec![Scalar; ty.len()])
        .optimize(move |_, args| Ok(fold_if_constant(args, fold)))
        .deriv(move |d, args| {
            let derivs = args
                .iter()
                .map(|arg| d.derive(arg))
                .collect::<Result<Vec<_>, _>>()?;
            construct(d.registry(), ty, derivs)
        })
        .gradient(|pass, g, args| {
            for (index, arg) in args.iter().enumerate() {
                let part = component(pass.registry(), g, index)?;
                pass.add_gradient(arg, part)?;
            }
            Ok(())
        })
        .fold(fold)
        .render(Target::C, move |args| container(ty, args, Target::C))
        .render(Target::Js, move |args| container(ty, args, Target::Js))
        .finish()?;
    Ok(())
}

/// The extraction operators `(i)` or `(r,c)`, one per component.
fn components(registry: &mut Registry, ty: Type) -> Result<(), Error> {
    let (rows, _) = ty.dims();
    for index in 0..ty.len() {
        let (row, col) = (index % rows, index / rows);
        let (c_index, js_index) = if ty.is_matrix() {
            (format!("{},{}", row, col), format!("{} + {}*{}", row, rows, col))
        } else {
            (index.to_string(), index.to_string())
        };

        let fold = move |args: &[&Literal]| Literal::scalar(args[0].data()[index]);
        registry.define(Scalar, component_name(ty, index), [ty])
            .optimize(move |_, args| {
                if let Some(folded) = fold_if_constant(args, fold) {
                    return Ok(Some(folded));
                }
                // a component of a constructor is its operand
                let parts = args[0].operands();
                if args[0].is_op(ty.name()) && parts.len() == ty.len() {
                    return Ok(Some(parts[index].clone()));
                }
                Ok(None)
            })
            .deriv(move |d, args| {
                let da = d.derive(&args[0])?;
                component(d.registry(), &da, index)
            })
            .gradient(move |pass, g, args| {
                let basis = Node::constant(Literal::one_hot(ty, index));
                let contribution = mul(pass.registry(), g, &basis)?;
                pass.add_gradient(&args[0], contribution)
            })
            .fold(fold)
            .render(Target::C, move |args| format!("({}({}))", args[0], c_index))
            .render(Target::Js, move |args| format!("({}[{}])", args[0], js_index))
            .finish()?;
    }
    Ok(())
}

/// `trans` and the matrix product for one matrix type.
fn matrix(registry: &mut Registry, ty: Type) -> Result<(), Error> {
    let t = runtime_name(ty);

    let fold = |args: &[&Literal]| args[0].transpose();
    registry.define(ty, "trans", [ty])
        .optimize(move |_, args| {
            if let Some(folded) = fold_if_constant(args, fold) {
                return Ok(Some(folded));
            }
            if args[0].is_op("trans") {
                return Ok(Some(args[0].operands()[0].clone()));
            }
            Ok(None)
        })
        .deriv(|d, args| {
            let da = d.derive(&args[0])?;
            trans(d.registry(), &da)
        })
        .gradient(|pass, g, args| {
            let transposed = trans(pass.registry(), g)?;
            pass.add_gradient(&args[0], transposed)
        })
        .fold(fold)
        .render(Target::C, call("trans"))
        .render(Target::Js, call(format!("Geom3D.trans_{}", t)))
        .finish()?;

    let fold = move |args: &[&Literal]| args[0].matmul(args[1], ty);
    registry.define(ty, "*", [ty, ty])
        .optimize(move |_, args| {
            if let Some(folded) = fold_if_constant(args, fold) {
                return Ok(Some(folded));
            }
            let (a, b) = (&args[0], &args[1]);
            if a.is_zero() || b.is_one() {
                return Ok(Some(a.clone()));
            }
            if b.is_zero() || a.is_one() {
                return Ok(Some(b.clone()));
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
            // C = A B: dA = G B^T, dB = A^T G
            let (a, b) = (&args[0], &args[1]);
            let registry = pass.registry();
            pass.add_gradient(a, mul(registry, g, &trans(registry, b)?)?)?;
            pass.add_gradient(b, mul(registry, &trans(registry, a)?, g)?)
        })
        .fold(fold)
        .render(Target::C, infix("*"))
        .render(Target::Js, call(format!("Geom3D.mul_{}_{}", t, t)))
        .finish()?;

    Ok(())
}

/// The matrix-vector product and the outer product for a matrix type and its column type.
fn matrix_vector(registry: &mut Registry, mat: Type, vec: Type) -> Result<(), Error> {
    let (m, v) = (runtime_name(mat), runtime_name(vec));

    let fold = move |args: &[&Literal]| args[0].matmul(args[1], vec);
    registry.define(vec, "*", [mat, vec])
        .optimize(move |_, args| {
            if let Some(folded) = fold_if_constant(args, fold) {
                return Ok(Some(folded));
            }
            let (a, b) = (&args[0], &args[1]);
            if a.is_zero() {
                return Ok(Some(Node::zero(vec)));
            }
            if b.is_zero() || a.is_one() {
                return Ok(Some(b.clone()));
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
            // y = A x: dA = g x^T, dx = A^T g
            let (a, x) = (&args[0], &args[1]);
            let registry = pass.registry();
            pass.add_gradient(a, outer(registry, g, x)?)?;
            pass.add_gradient(x, mul(registry, &trans(registry, a)?, g)?)
        })
        .fold(fold)
        .render(Target::C, infix("*"))
        .render(Target::Js, call(format!("Geom3D.mul_{}_{}", m, v)))
        .finish()?;

    let fold = move |args: &[&Literal]| Literal::outer(args[0], args[1], mat);
    registry.define(mat, "outer", [vec, vec])
        .optimize(move |_, args| {
            if let Some(folded) = fold_if_constant(args, fold) {
                return Ok(Some(folded));
            }
            if args[0].is_zero() || args[1].is_zero() {
                return Ok(Some(Node::zero(mat)));
            }
            Ok(None)
        })
        .deriv(|d, args| {
            let (a, b) = (&args[0], &args[1]);
            let (da, db) = (d.derive(a)?, d.derive(b)?);
            let registry = d.registry();
            add(registry, &outer(registry, &da, b)?, &outer(registry, a, &db)?)
        })
        .gradient(|pass, g, args| {
            // C = u v^T: du = G v, dv = G^T u
            let (u, v) = (&args[0], &args[1]);
            let registry = pass.registry();
            pass.add_gradient(u, mul(registry, g, v)?)?;
            pass.add_gradient(v, mul(registry, &trans(registry, g)?, u)?)
        })
        .fold(fold)
        .render(Target::C, |args| format!("({} * trans({}))", args[0], args[1]))
        .render(Target::Js, call(format!("Geom3D.outer_{}_{}", v, v)))
        .finish()?;

    Ok(())
}
