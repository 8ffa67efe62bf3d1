//! Rigid-body transforms: axis rotations, translation, scaling, rotation about an arbitrary axis
//! and the homogeneous-to-Cartesian conversion.
//!
//! The axis rotations, translation and scaling have no runtime representation of their own in the
//! C target; they expand into matrix constructors during lowering.

use crate::emit::{container, number};
use crate::expr::Node;
use crate::literal::Literal;
use crate::registry::{Registry, Target};
use crate::types::Type::{self, Mat33, Mat44, Scalar, Vec3, Vec4};
use super::{call, component, construct, cos, div, dot, mul, neg, sin};
use symop_error::Error;

/// The contents of one component of an axis rotation matrix.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Cell {
    Zero,
    One,
    Cos,
    Sin,
    NegSin,
}

use Cell::{Cos, NegSin, One, Sin, Zero};

impl Cell {
    /// The value of the cell at the given cosine and sine.
    fn value(self, c: f64, s: f64) -> f64 {
        match self {
            Zero => 0.0,
            One => 1.0,
            Cos => c,
            Sin => s,
            NegSin => -s,
        }
    }

    /// The value of the cell in the generator `K` of the rotation, such that `dR/da = R(a) K`.
    fn generator(self) -> f64 {
        match self {
            Sin => 1.0,
            NegSin => -1.0,
            _ => 0.0,
        }
    }
}

/// Column-major layouts of the axis rotations.
const ROTATION_X: [Cell; 16] = [
    One, Zero, Zero, Zero,
    Zero, Cos, Sin, Zero,
    Zero, NegSin, Cos, Zero,
    Zero, Zero, Zero, One,
];

const ROTATION_Y: [Cell; 16] = [
    Cos, Zero, NegSin, Zero,
    Zero, One, Zero, Zero,
    Sin, Zero, Cos, Zero,
    Zero, Zero, Zero, One,
];

const ROTATION_Z: [Cell; 16] = [
    Cos, Sin, Zero, Zero,
    NegSin, Cos, Zero, Zero,
    Zero, Zero, One, Zero,
    Zero, Zero, Zero, One,
];

const ROTATION_Z_33: [Cell; 9] = [
    Cos, Sin, Zero,
    NegSin, Cos, Zero,
    Zero, Zero, One,
];

pub(super) fn register(registry: &mut Registry) -> Result<(), Error> {
    rotation(registry, "mat33RotationZ", Mat33, &ROTATION_Z_33, true)?;
    rotation(registry, "mat44RotationX", Mat44, &ROTATION_X, false)?;
    rotation(registry, "mat44RotationY", Mat44, &ROTATION_Y, false)?;
    rotation(registry, "mat44RotationZ", Mat44, &ROTATION_Z, false)?;
    translation(registry)?;
    scale(registry)?;
    axis_rotation(registry)?;
    from_homo(registry)?;
    Ok(())
}

/// Renders an axis rotation directly as a matrix literal of `cos`/`sin` calls.
fn render_rotation(cells: &[Cell], ty: Type, angle: &str, target: Target) -> String {
    let (cos, sin) = match target {
        Target::C => ("cos", "sin"),
        Target::Js => ("Math.cos", "Math.sin"),
    };
    let items = cells
        .iter()
        .map(|cell| match cell {
            Cos => format!("{}({})", cos, angle),
            Sin => format!("{}({})", sin, angle),
            NegSin => format!("(-{}({}))", sin, angle),
            cell => number(cell.value(0.0, 0.0), target),
        })
        .collect::<Vec<_>>();
    container(ty, &items, target)
}

/// A rotation about a coordinate axis by the angle operand.
fn rotation(
    registry: &mut Registry,
    name: &'static str,
    ty: Type,
    cells: &'static [Cell],
    renders: bool,
) -> Result<(), Error> {
    let generator = Node::constant(Literal::from_fn(ty, |i| cells[i].generator()));
    let fold = move |args: &[&Literal]| {
        let angle = args[0].data()[0];
        let (c, s) = (angle.cos(), angle.sin());
        Literal::from_fn(ty, |i| cells[i].value(c, s))
    };
    let rate = generator.clone();

    let mut builder = registry.define(ty, name, [Scalar])
        .optimize(move |_, args| {
            if args[0].is_zero() {
                return Ok(Some(Node::one(ty)));
            }
            Ok(None)
        })
        .expand(move |registry, args| {
            let angle = &args[0];
            let (c, s) = (cos(registry, angle)?, sin(registry, angle)?);
            let neg_s = neg(registry, &s)?;
            let components = cells
                .iter()
                .map(|cell| match cell {
                    Zero => Node::scalar(0.0),
                    One => Node::scalar(1.0),
                    Cos => c.clone(),
                    Sin => s.clone(),
                    NegSin => neg_s.clone(),
                })
                .collect();
            construct(registry, ty, components).map(Some)
        })
        .deriv(move |d, args| {
            // dR = da R(a) K
            let da = d.derive(&args[0])?;
            let registry = d.registry();
            let rotated = registry.apply(name, args)?;
            mul(registry, &da, &mul(registry, &rotated, &generator)?)
        })
        .gradient(move |pass, g, args| {
            let registry = pass.registry();
            let rotated = registry.apply(name, args)?;
            let slope = mul(registry, &rotated, &rate)?;
            pass.add_gradient(&args[0], dot(registry, g, &slope)?)
        })
        .fold(fold);

    if renders {
        builder = builder
            .render(Target::C, move |args| render_rotation(cells, ty, &args[0], Target::C))
            .render(Target::Js, move |args| render_rotation(cells, ty, &args[0], Target::Js));
    }
    builder.finish()?;
    Ok(())
}

/// Returns the components of the identity `Mat44`, with `f` applied to the given flat indices.
fn identity_with(indices: [usize; 3], mut f: impl FnMut(usize) -> Node) -> Vec<Node> {
    let identity = Literal::one(Mat44);
    (0..16)
        .map(|i| match indices.iter().position(|&j| j == i) {
            Some(k) => f(k),
            None => Node::scalar(identity.data()[i]),
        })
        .collect()
}

/// `mat44Translation(x, y, z)`, translating by `(x, y, z)`.
fn translation(registry: &mut Registry) -> Result<(), Error> {
    const OFFSETS: [usize; 3] = [12, 13, 14];

    registry.define(Mat44, "mat44Translation", [Scalar, Scalar, Scalar])
        .optimize(|_, args| {
            if args.iter().all(Node::is_zero) {
                return Ok(Some(Node::one(Mat44)));
            }
            Ok(None)
        })
        .expand(|registry, args| {
            let components = identity_with(OFFSETS, |k| args[k].clone());
            construct(registry, Mat44, components).map(Some)
        })
        .deriv(|d, args| {
            let derivs = args.iter().map(|arg| d.derive(arg)).collect::<Result<Vec<_>, _>>()?;
            let components = (0..16)
                .map(|i| match OFFSETS.iter().position(|&j| j == i) {
                    Some(k) => derivs[k].clone(),
                    None => Node::scalar(0.0),
                })
                .collect();
            construct(d.registry(), Mat44, components)
        })
        .gradient(|pass, g, args| {
            for (arg, offset) in args.iter().zip(OFFSETS) {
                let part = component(pass.registry(), g, offset)?;
                pass.add_gradient(arg, part)?;
            }
            Ok(())
        })
        .fold(|args| {
            let mut data = Literal::one(Mat44).data().to_vec();
            for (arg, offset) in args.iter().zip(OFFSETS) {
                data[offset] = arg.data()[0];
            }
            Literal::from_fn(Mat44, |i| data[i])
        })
        .finish()?;
    Ok(())
}

/// `mat44Scale(x, y, z)`, scaling each axis independently.
fn scale(registry: &mut Registry) -> Result<(), Error> {
    const DIAGONAL: [usize; 3] = [0, 5, 10];

    registry.define(Mat44, "mat44Scale", [Scalar, Scalar, Scalar])
        .optimize(|_, args| {
            if args.iter().all(Node::is_zero) {
                let flat = Literal::one_hot(Mat44, 15);
                return Ok(Some(Node::constant(flat)));
            }
            if args.iter().all(Node::is_one) {
                return Ok(Some(Node::one(Mat44)));
            }
            Ok(None)
        })
        .expand(|registry, args| {
            let components = identity_with(DIAGONAL, |k| args[k].clone());
            construct(registry, Mat44, components).map(Some)
        })
        .deriv(|d, args| {
            let derivs = args.iter().map(|arg| d.derive(arg)).collect::<Result<Vec<_>, _>>()?;
            let components = (0..16)
                .map(|i| match DIAGONAL.iter().position(|&j| j == i) {
                    Some(k) => derivs[k].clone(),
                    None => Node::scalar(0.0),
                })
                .collect();
            construct(d.registry(), Mat44, components)
        })
        .gradient(|pass, g, args| {
            for (arg, index) in args.iter().zip(DIAGONAL) {
                let part = component(pass.registry(), g, index)?;
                pass.add_gradient(arg, part)?;
            }
            Ok(())
        })
        .fold(|args| {
            let mut data = Literal::one(Mat44).data().to_vec();
            for (arg, index) in args.iter().zip(DIAGONAL) {
                data[index] = arg.data()[0];
            }
            Literal::from_fn(Mat44, |i| data[i])
        })
        .finish()?;
    Ok(())
}

/// Rodrigues' rotation about a (not necessarily unit) axis.
fn rodrigues(axis: &Literal, angle: f64) -> Literal {
    let norm = axis.dot(axis).sqrt();
    if norm == 0.0 {
        return Literal::one(Mat44);
    }

    let k = axis.map(|x| x / norm);
    let (c, s) = (angle.cos(), angle.sin());
    let cross = |row: usize, col: usize| match (row, col) {
        (1, 0) => k.data()[2],
        (0, 1) => -k.data()[2],
        (0, 2) => k.data()[1],
        (2, 0) => -k.data()[1],
        (2, 1) => k.data()[0],
        (1, 2) => -k.data()[0],
        _ => 0.0,
    };
    Literal::from_fn(Mat44, |i| {
        let (row, col) = (i % 4, i / 4);
        match (row, col) {
            (3, 3) => 1.0,
            (3, _) | (_, 3) => 0.0,
            _ => {
                let diagonal = if row == col { c } else { 0.0 };
                diagonal + s * cross(row, col) + (1.0 - c) * k.data()[row] * k.data()[col]
            },
        }
    })
}

/// `mat44Rotation(axis, angle)`, a rotation about an arbitrary axis, computed by the runtime.
fn axis_rotation(registry: &mut Registry) -> Result<(), Error> {
    registry.define(Mat44, "mat44Rotation", [Vec3, Scalar])
        .optimize(|_, args| {
            if args[1].is_zero() {
                return Ok(Some(Node::one(Mat44)));
            }
            Ok(None)
        })
        .fold(|args| rodrigues(args[0], args[1].data()[0]))
        .render(Target::C, call("mat44Rotation"))
        .render(Target::Js, call("Geom3D.mat44Rotation"))
        .finish()?;
    Ok(())
}

/// `fromHomo(p)`, the Cartesian point of a homogeneous one, always rewritten as three divisions.
fn from_homo(registry: &mut Registry) -> Result<(), Error> {
    registry.define(Vec3, "fromHomo", [Vec4])
        .replace(|registry, args| {
            let p = &args[0];
            let w = component(registry, p, 3)?;
            let components = (0..3)
                .map(|i| div(registry, &component(registry, p, i)?, &w))
                .collect::<Result<Vec<_>, _>>()?;
            construct(registry, Vec3, components)
        })
        .finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::derivative::derivative;
    use crate::emit::render;
    use crate::fold::{fold_constants, substitute};
    use crate::gradient::backprop;
    use crate::lower::lower;
    use crate::ops::standard;
    use assert_float_eq::*;
    use pretty_assertions::assert_eq;
    use std::f64::consts::{FRAC_PI_2, PI};
    use super::*;

    /// Substitutes the bindings, lowers, and folds to a constant.
    fn eval(registry: &Registry, expr: &Node, bindings: &[(Node, Node)]) -> Literal {
        let bound = substitute(registry, expr, bindings).unwrap();
        let lowered = lower(registry, &bound).unwrap();
        fold_constants(registry, &lowered).unwrap().as_literal().cloned().unwrap()
    }

    /// Reads back the components of a rendered C matrix literal, such as `Mat44 { 1.0, (-0.5) }`.
    fn parse_c_literal(text: &str) -> Vec<f64> {
        let inner = text
            .trim_start_matches(|c: char| c.is_alphanumeric() || c == ' ')
            .trim_start_matches('{')
            .trim_end_matches('}');
        inner
            .split(',')
            .map(|item| item.trim().trim_start_matches('(').trim_end_matches(')').parse().unwrap())
            .collect()
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (&a, &b) in actual.iter().zip(expected) {
            assert_float_absolute_eq!(a, b, 1e-9);
        }
    }

    #[test]
    fn zero_angle_is_identity() {
        let registry = standard().unwrap();
        for name in ["mat44RotationX", "mat44RotationY", "mat44RotationZ"] {
            let rotation = registry.apply(name, &[Node::scalar(0.0)]).unwrap();
            assert!(rotation.is_one());
        }

        let a = Node::leaf("a", Scalar);
        let rotation = registry.apply("mat44RotationZ", &[a.clone()]).unwrap();
        let at_zero = substitute(&registry, &rotation, &[(a, Node::scalar(0.0))]).unwrap();
        let lowered = lower(&registry, &at_zero).unwrap();
        assert!(lowered.is_one());
        assert_eq!(
            render(&lowered, Target::C).unwrap(),
            "Mat44 { 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0 }",
        );
    }

    #[test]
    fn quarter_turn_about_z() {
        let registry = standard().unwrap();
        let a = Node::leaf("a", Scalar);
        let rotation = registry.apply("mat44RotationZ", &[a.clone()]).unwrap();
        let bound = substitute(&registry, &rotation, &[(a, Node::scalar(FRAC_PI_2))]).unwrap();
        let lowered = lower(&registry, &bound).unwrap();

        let matrix = Literal::new(Mat44, parse_c_literal(&render(&lowered, Target::C).unwrap())).unwrap();
        let point = Literal::new(Vec4, vec![1.0, 0.0, 0.0, 1.0]).unwrap();
        assert_close(matrix.matmul(&point, Vec4).data(), &[0.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn unlowered_rotation_cannot_render() {
        let registry = standard().unwrap();
        let rotation = registry.apply("mat44RotationX", &[Node::leaf("a", Scalar)]).unwrap();
        assert!(render(&rotation, Target::C).is_err());

        let lowered = lower(&registry, &rotation).unwrap();
        assert_eq!(
            render(&lowered, Target::Js).unwrap(),
            "Float64Array.of(1.0, 0.0, 0.0, 0.0, 0.0, Math.cos(a), Math.sin(a), 0.0, \
             0.0, (-Math.sin(a)), Math.cos(a), 0.0, 0.0, 0.0, 0.0, 1.0)",
        );
    }

    #[test]
    fn planar_rotation_renders_directly() {
        let registry = standard().unwrap();
        let rotation = registry.apply("mat33RotationZ", &[Node::leaf("t", Scalar)]).unwrap();
        assert_eq!(
            render(&rotation, Target::C).unwrap(),
            "Mat33 { cos(t), sin(t), 0.0, (-sin(t)), cos(t), 0.0, 0.0, 0.0, 1.0 }",
        );

        let t = Node::leaf("t", Scalar);
        let rotation = registry.apply("mat33RotationZ", &[t.clone()]).unwrap();
        let point = Node::literal(Vec3, vec![1.0, 0.0, 5.0]).unwrap();
        let moved = registry.apply("*", &[rotation, point]).unwrap();
        assert_close(eval(&registry, &moved, &[(t, Node::scalar(PI))]).data(), &[-1.0, 0.0, 5.0]);
    }

    #[test]
    fn translation_and_scale() {
        let registry = standard().unwrap();
        let leaves = ["x", "y", "z"].map(|name| Node::leaf(name, Scalar));
        let at = [
            (leaves[0].clone(), Node::scalar(2.0)),
            (leaves[1].clone(), Node::scalar(-1.0)),
            (leaves[2].clone(), Node::scalar(0.5)),
        ];
        let point = Node::literal(Vec4, vec![1.0, 1.0, 1.0, 1.0]).unwrap();

        let translation = registry.apply("mat44Translation", &leaves).unwrap();
        let moved = registry.apply("*", &[translation, point.clone()]).unwrap();
        assert_close(eval(&registry, &moved, &at).data(), &[3.0, 0.0, 1.5, 1.0]);

        let scale = registry.apply("mat44Scale", &leaves).unwrap();
        let scaled = registry.apply("*", &[scale, point]).unwrap();
        assert_close(eval(&registry, &scaled, &at).data(), &[2.0, -1.0, 0.5, 1.0]);

        let zeros = [0.0; 3].map(Node::scalar);
        assert!(registry.apply("mat44Translation", &zeros).unwrap().is_one());
        let flat = registry.apply("mat44Scale", &zeros).unwrap();
        assert_eq!(flat.as_literal().unwrap().data()[15], 1.0);
        assert_eq!(flat.as_literal().unwrap().data()[0], 0.0);
        let ones = [1.0; 3].map(Node::scalar);
        assert!(registry.apply("mat44Scale", &ones).unwrap().is_one());
    }

    #[test]
    fn translation_gradient() {
        let registry = standard().unwrap();
        let leaves = ["x", "y", "z"].map(|name| Node::leaf(name, Scalar));
        let translation = registry.apply("mat44Translation", &leaves).unwrap();
        let point = Node::literal(Vec4, vec![4.0, 5.0, 6.0, 2.0]).unwrap();
        let weights = Node::literal(Vec4, vec![1.0, 10.0, 100.0, 0.0]).unwrap();
        let moved = registry.apply("*", &[translation, point]).unwrap();
        let loss = registry.apply("dot", &[weights, moved]).unwrap();

        // T p = p + p.w (x, y, z, 0)
        let grads = backprop(&registry, &loss, &leaves).unwrap();
        for (leaf, expected) in leaves.iter().zip([2.0, 20.0, 200.0]) {
            let gradient = eval(&registry, grads.get(leaf).unwrap(), &[]);
            assert_float_absolute_eq!(gradient.data()[0], expected, 1e-12);
        }
    }

    #[test]
    fn rotation_gradient_matches_derivative() {
        let registry = standard().unwrap();
        let a = Node::leaf("a", Scalar);
        let point = Node::literal(Vec4, vec![0.3, -2.0, 1.0, 1.0]).unwrap();
        let weights = Node::literal(Vec4, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        for name in ["mat44RotationX", "mat44RotationY", "mat44RotationZ"] {
            let rotation = registry.apply(name, &[a.clone()]).unwrap();
            let moved = registry.apply("*", &[rotation, point.clone()]).unwrap();
            let loss = registry.apply("dot", &[weights.clone(), moved]).unwrap();

            let forward = derivative(&registry, &loss, &a).unwrap();
            let reverse = backprop(&registry, &loss, &[a.clone()]).unwrap().gradient_or_zero(&a);
            for value in [0.0, 0.9, -2.4] {
                let at = [(a.clone(), Node::scalar(value))];
                assert_float_absolute_eq!(
                    eval(&registry, &forward, &at).data()[0],
                    eval(&registry, &reverse, &at).data()[0],
                    1e-9
                );
            }
        }
    }

    #[test]
    fn axis_rotation_folds() {
        let registry = standard().unwrap();
        let axis = Node::literal(Vec3, vec![2.0, 0.0, 0.0]).unwrap();
        let general = registry.apply("mat44Rotation", &[axis.clone(), Node::scalar(0.8)]).unwrap();
        let about_x = registry.apply("mat44RotationX", &[Node::scalar(0.8)]).unwrap();
        assert_close(
            eval(&registry, &general, &[]).data(),
            eval(&registry, &about_x, &[]).data(),
        );

        assert!(registry.apply("mat44Rotation", &[axis, Node::scalar(0.0)]).unwrap().is_one());
        let v = Node::leaf("v", Vec3);
        let runtime = registry.apply("mat44Rotation", &[v, Node::leaf("t", Scalar)]).unwrap();
        assert_eq!(render(&runtime, Target::Js).unwrap(), "Geom3D.mat44Rotation(v, t)");
    }
}
