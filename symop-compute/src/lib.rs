//! A symbolic compiler for small fixed-size linear algebra.
//!
//! Expressions over scalars, `Vec3`/`Vec4` vectors and `Mat33`/`Mat44` matrices are built as
//! immutable [`Node`] graphs through a [`Registry`] of typed operators. Each operator carries the
//! hooks the passes of this crate need:
//!
//! - [`lower`] rewrites high-level operators into simpler ones,
//! - [`derivative`] and [`jacobian`] differentiate forward, with respect to scalar leaves,
//! - [`backprop`] computes gradients in reverse, for any number of leaves at once,
//! - [`fold_constants`] and [`substitute`] evaluate expressions symbolically,
//! - [`render`] and [`emit::Kernel`] turn expressions into C++ or JavaScript source.
//!
//! The standard operators live in [`ops`].
//!
//! ```
//! use symop_compute::{lower, ops, render, Node, Target, Type};
//!
//! let registry = ops::standard().unwrap();
//! let p = Node::leaf("p", Type::Vec4);
//! let cartesian = registry.apply("fromHomo", &[p]).unwrap();
//! let lowered = lower(&registry, &cartesian).unwrap();
//! assert_eq!(
//!     render(&lowered, Target::Js).unwrap(),
//!     "Float64Array.of(((p[0]) / (p[3])), ((p[1]) / (p[3])), ((p[2]) / (p[3])))",
//! );
//! ```

pub mod derivative;
pub mod emit;
pub mod error;
pub mod expr;
pub mod fold;
pub mod gradient;
pub mod literal;
pub mod lower;
pub mod ops;
pub mod registry;
pub mod types;

pub use derivative::{derivative, jacobian, Derivative};
pub use emit::render;
pub use expr::{Node, NodeId, NodeKind};
pub use fold::{fold_constants, substitute};
pub use gradient::{backprop, backprop_with_seed, Backprop, GradientAccumulator};
pub use literal::Literal;
pub use lower::{lower, Lowering};
pub use registry::{Definition, Registry, Signature, Target};
pub use types::Type;
