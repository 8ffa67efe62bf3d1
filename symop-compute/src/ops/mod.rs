//! The standard operator library: scalar arithmetic, linear algebra over the vector and matrix
//! types, and the rigid-body transforms built on them.
//!
//! [`standard`] builds a fresh registry containing every operator listed here;
//! [`standard_registry`] builds one once per process and shares it.
//!
//! | Operators                                   | Operand types                                  |
//! | ------------------------------------------- | ---------------------------------------------- |
//! | `+`, `-`, `*`, `/`, unary `-`, `cos`, `sin` | `Scalar`                                       |
//! | `+`, `-`, `dot`                             | `Vec3`, `Vec4`, `Mat33`, `Mat44`, pairwise      |
//! | `*`                                         | `Scalar` times any of the above                |
//! | `*`, `trans`                                | `Mat33`, `Mat44`; matrix times vector          |
//! | `outer`                                     | `Vec3`, `Vec4`                                 |
//! | `Vec3`, `Vec4`, `Mat33`, `Mat44`            | constructors from scalars, column-major        |
//! | `(i)`, `(r,c)`                              | component extraction                           |
//! | `mat33RotationZ`, `mat44RotationX/Y/Z`      | an angle                                       |
//! | `mat44Translation`, `mat44Scale`            | three scalars                                  |
//! | `mat44Rotation`                             | a `Vec3` axis and an angle                     |
//! | `fromHomo`                                  | a homogeneous `Vec4`                           |
//!
//! Every scalar operand and result here is [`Type::Scalar`], including the results of component
//! extraction. Nothing is registered on [`Type::GenericScalar`]: a caller that wants symbolic reals
//! kept apart from plain scalars registers its own operators on that key, and applying a standard
//! operator to a `GenericScalar` is an unknown-operator error rather than an implicit conversion.

mod arith;
mod linalg;
mod transform;

use crate::expr::Node;
use crate::literal::Literal;
use crate::registry::Registry;
use crate::types::Type;
use once_cell::sync::OnceCell;
use symop_error::Error;

/// Builds a registry containing the standard operators.
pub fn standard() -> Result<Registry, Error> {
    let mut registry = Registry::new();
    arith::register(&mut registry)?;
    linalg::register(&mut registry)?;
    transform::register(&mut registry)?;
    Ok(registry)
}

/// Returns a process-wide registry containing the standard operators, building it on first use.
pub fn standard_registry() -> Result<&'static Registry, Error> {
    static REGISTRY: OnceCell<Registry> = OnceCell::new();
    REGISTRY.get_or_try_init(standard)
}

/// A renderer writing `(lhs op rhs)`.
pub(crate) fn infix(op: &'static str) -> impl Fn(&[String]) -> String + Send + Sync + 'static {
    move |args: &[String]| format!("({} {} {})", args[0], op, args[1])
}

/// A renderer writing a call to the given function.
pub(crate) fn call(function: impl Into<String>) -> impl Fn(&[String]) -> String + Send + Sync + 'static {
    let function = function.into();
    move |args: &[String]| format!("{}({})", function, args.join(", "))
}

/// The name the JS runtime uses for a type in helper function names, e.g. `mat44`.
pub(crate) fn runtime_name(ty: Type) -> String {
    match ty {
        Type::Scalar | Type::GenericScalar => "double".to_string(),
        ty => ty.name().to_lowercase(),
    }
}

/// The name of the operator extracting the component at a flat index, `(i)` for vectors and
/// `(r,c)` for matrices.
pub(crate) fn component_name(ty: Type, index: usize) -> String {
    let (rows, _) = ty.dims();
    if ty.is_matrix() {
        format!("({},{})", index % rows, index / rows)
    } else {
        format!("({})", index)
    }
}

/// Folds the operands into a constant if they are all constants.
pub(crate) fn fold_if_constant(args: &[Node], fold: impl Fn(&[&Literal]) -> Literal) -> Option<Node> {
    let literals = args.iter().map(Node::as_literal).collect::<Option<Vec<_>>>()?;
    Some(Node::constant(fold(&literals)))
}

pub(crate) fn add(registry: &Registry, lhs: &Node, rhs: &Node) -> Result<Node, Error> {
    registry.apply("+", &[lhs.clone(), rhs.clone()])
}

pub(crate) fn sub(registry: &Registry, lhs: &Node, rhs: &Node) -> Result<Node, Error> {
    registry.apply("-", &[lhs.clone(), rhs.clone()])
}

pub(crate) fn mul(registry: &Registry, lhs: &Node, rhs: &Node) -> Result<Node, Error> {
    registry.apply("*", &[lhs.clone(), rhs.clone()])
}

pub(crate) fn div(registry: &Registry, lhs: &Node, rhs: &Node) -> Result<Node, Error> {
    registry.apply("/", &[lhs.clone(), rhs.clone()])
}

pub(crate) fn neg(registry: &Registry, node: &Node) -> Result<Node, Error> {
    registry.apply("-", &[node.clone()])
}

pub(crate) fn trans(registry: &Registry, node: &Node) -> Result<Node, Error> {
    registry.apply("trans", &[node.clone()])
}

pub(crate) fn dot(registry: &Registry, lhs: &Node, rhs: &Node) -> Result<Node, Error> {
    registry.apply("dot", &[lhs.clone(), rhs.clone()])
}

pub(crate) fn outer(registry: &Registry, lhs: &Node, rhs: &Node) -> Result<Node, Error> {
    registry.apply("outer", &[lhs.clone(), rhs.clone()])
}

pub(crate) fn cos(registry: &Registry, node: &Node) -> Result<Node, Error> {
    registry.apply("cos", &[node.clone()])
}

pub(crate) fn sin(registry: &Registry, node: &Node) -> Result<Node, Error> {
    registry.apply("sin", &[node.clone()])
}

/// Extracts the component at a flat, column-major index.
pub(crate) fn component(registry: &Registry, node: &Node, index: usize) -> Result<Node, Error> {
    registry.apply(&component_name(node.ty(), index), &[node.clone()])
}

/// Builds a vector or matrix from its flattened components with the type's constructor.
pub(crate) fn construct(registry: &Registry, ty: Type, components: Vec<Node>) -> Result<Node, Error> {
    registry.apply(ty.name(), &components)
}
