//! Immutable, shareable expression nodes.
//!
//! A [`Node`] is a cheap, reference-counted handle to one of:
//!
//! - a **constant**, holding a [`Literal`],
//! - a **leaf**, a named independent variable,
//! - an **application** of a registered operator to operand nodes.
//!
//! Nodes never change after construction. Any pass that "modifies" an expression builds new nodes
//! and reuses the untouched ones, so a node can be the operand of many applications and an
//! expression is a DAG rather than a tree.
//!
//! # Identity and equality
//!
//! Every node gets a unique [`NodeId`] when it is created. Passes that must visit each node once
//! (lowering, differentiation, backprop, emission) key their bookkeeping by this identity.
//!
//! The [`PartialEq`] implementation is **structural**, with one exception: two leaves are equal
//! only if they are the same leaf. Two leaves named `x` created by separate calls to
//! [`Node::leaf`] are different variables.
//!
//! Applications are built through [`Registry::apply`](crate::Registry::apply), which resolves the
//! operator and runs its `optimize` hook.

mod construct;
mod iter;

use crate::literal::Literal;
use crate::registry::{Definition, Signature};
use crate::types::Type;
use std::{fmt, sync::{atomic::{AtomicU64, Ordering}, Arc}};
use symop_error::Error;

pub use iter::PostOrder;

/// The identity of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// An operator applied to operands.
#[derive(Clone)]
pub struct Application {
    def: Arc<Definition>,
    operands: Vec<Node>,
}

impl Application {
    /// The definition of the applied operator.
    pub fn definition(&self) -> &Arc<Definition> {
        &self.def
    }

    /// The signature of the applied operator.
    pub fn signature(&self) -> &Signature {
        self.def.signature()
    }

    /// The operands, in order.
    pub fn operands(&self) -> &[Node] {
        &self.operands
    }
}

/// The contents of a node.
#[derive(Clone)]
pub enum NodeKind {
    /// A fixed value.
    Constant(Literal),

    /// A named independent variable.
    Leaf(String),

    /// An operator applied to operands.
    Application(Application),
}

struct NodeData {
    id: NodeId,
    ty: Type,
    kind: NodeKind,
}

/// A node of an expression graph. Cloning a node clones the handle, not the graph.
#[derive(Clone)]
pub struct Node(Arc<NodeData>);

impl Node {
    fn new(ty: Type, kind: NodeKind) -> Self {
        Self(Arc::new(NodeData { id: NodeId::next(), ty, kind }))
    }

    /// Creates a new, independent variable. Every call creates a distinct leaf, even if the name
    /// is reused.
    pub fn leaf(name: impl Into<String>, ty: Type) -> Self {
        Self::new(ty, NodeKind::Leaf(name.into()))
    }

    /// Creates a constant.
    pub fn constant(literal: Literal) -> Self {
        Self::new(literal.ty(), NodeKind::Constant(literal))
    }

    /// Creates a constant from flattened, column-major components. Returns [`Err`] if the number
    /// of components does not match the type.
    pub fn literal(ty: Type, data: Vec<f64>) -> Result<Self, Error> {
        Literal::new(ty, data).map(Self::constant)
    }

    /// Creates a [`Type::Scalar`] constant.
    pub fn scalar(value: f64) -> Self {
        Self::constant(Literal::scalar(value))
    }

    /// Creates the zero constant of the given type.
    pub fn zero(ty: Type) -> Self {
        Self::constant(Literal::zero(ty))
    }

    /// Creates the identity constant of the given type. See [`Literal::one`].
    pub fn one(ty: Type) -> Self {
        Self::constant(Literal::one(ty))
    }

    /// Wraps an already resolved definition and operands, without running `optimize`.
    pub(crate) fn application(def: Arc<Definition>, operands: Vec<Node>) -> Self {
        debug_assert!(operands.iter().map(Node::ty).eq(def.operands().iter().copied()));
        Self::new(def.result(), NodeKind::Application(Application { def, operands }))
    }

    /// The identity of the node.
    pub fn id(&self) -> NodeId {
        self.0.id
    }

    /// The type of the node.
    pub fn ty(&self) -> Type {
        self.0.ty
    }

    /// The contents of the node.
    pub fn kind(&self) -> &NodeKind {
        &self.0.kind
    }

    /// Returns true if both handles refer to the same node.
    pub fn same(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// If the node is a constant, returns its value.
    pub fn as_literal(&self) -> Option<&Literal> {
        match self.kind() {
            NodeKind::Constant(literal) => Some(literal),
            _ => None,
        }
    }

    /// If the node is a constant scalar, returns its value.
    pub fn as_scalar(&self) -> Option<f64> {
        self.as_literal().and_then(Literal::as_scalar)
    }

    /// If the node is a leaf, returns its name.
    pub fn leaf_name(&self) -> Option<&str> {
        match self.kind() {
            NodeKind::Leaf(name) => Some(name),
            _ => None,
        }
    }

    /// If the node is an application, returns it.
    pub fn as_application(&self) -> Option<&Application> {
        match self.kind() {
            NodeKind::Application(app) => Some(app),
            _ => None,
        }
    }

    /// Returns true if the node is a leaf.
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind(), NodeKind::Leaf(_))
    }

    /// Returns true if the node is a constant.
    pub fn is_constant(&self) -> bool {
        matches!(self.kind(), NodeKind::Constant(_))
    }

    /// Returns true if the node is an application of an operator with the given name.
    pub fn is_op(&self, name: &str) -> bool {
        self.as_application().map_or(false, |app| app.def.name() == name)
    }

    /// The operands of the node. Empty for constants and leaves.
    pub fn operands(&self) -> &[Node] {
        match self.kind() {
            NodeKind::Application(app) => &app.operands,
            _ => &[],
        }
    }

    /// Returns true if the node is the zero constant of its type.
    pub fn is_zero(&self) -> bool {
        self.as_literal().map_or(false, Literal::is_zero)
    }

    /// Returns true if the node is the identity constant of its type.
    pub fn is_one(&self) -> bool {
        self.as_literal().map_or(false, Literal::is_one)
    }

    /// Returns an iterator over every distinct node of the graph, operands before the nodes that
    /// use them. The root is yielded last.
    pub fn post_order_iter(&self) -> PostOrder<'_> {
        PostOrder::new(self)
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        if self.same(other) {
            return true;
        }

        self.ty() == other.ty() && match (self.kind(), other.kind()) {
            (NodeKind::Constant(lhs), NodeKind::Constant(rhs)) => lhs == rhs,
            (NodeKind::Application(lhs), NodeKind::Application(rhs)) => {
                lhs.signature() == rhs.signature() && lhs.operands == rhs.operands
            },
            _ => false,
        }
    }
}

/// Writes a scalar component, parenthesized if negative.
fn write_number(f: &mut fmt::Formatter<'_>, value: f64) -> fmt::Result {
    if value < 0.0 {
        write!(f, "({})", value)
    } else {
        write!(f, "{}", value)
    }
}

/// Operator names made only of symbols, such as `+` and `*`, display infix.
fn is_symbolic(name: &str) -> bool {
    !name.is_empty() && !name.starts_with('(') && !name.chars().any(char::is_alphanumeric)
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            NodeKind::Constant(literal) => match literal.as_scalar() {
                Some(value) => write_number(f, value),
                None => {
                    write!(f, "{}[", literal.ty())?;
                    for (i, &value) in literal.data().iter().enumerate() {
                        if i > 0 {
                            write!(f, ", ")?;
                        }
                        write_number(f, value)?;
                    }
                    write!(f, "]")
                },
            },
            NodeKind::Leaf(name) => write!(f, "{}", name),
            NodeKind::Application(app) => {
                let name = app.def.name();
                match app.operands.as_slice() {
                    [operand] if name.starts_with('(') => write!(f, "{}{}", operand, name),
                    [operand] if is_symbolic(name) => write!(f, "({}{})", name, operand),
                    [lhs, rhs] if is_symbolic(name) => write!(f, "({} {} {})", lhs, name, rhs),
                    operands => {
                        write!(f, "{}(", name)?;
                        for (i, operand) in operands.iter().enumerate() {
                            if i > 0 {
                                write!(f, ", ")?;
                            }
                            write!(f, "{}", operand)?;
                        }
                        write!(f, ")")
                    },
                }
            },
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self, self.ty())
    }
}

#[cfg(test)]
mod tests {
    use crate::registry::Registry;
    use pretty_assertions::{assert_eq, assert_ne};
    use super::*;

    fn registry() -> Registry {
        let mut registry = Registry::new();
        registry.define(Type::Mat44, "*", [Type::Mat44, Type::Mat44]).finish().unwrap();
        registry.define(Type::Mat44, "trans", [Type::Mat44]).finish().unwrap();
        registry.define(Type::Scalar, "(0,3)", [Type::Mat44]).finish().unwrap();
        registry
    }

    #[test]
    fn leaves_compare_by_identity() {
        let a = Node::leaf("a", Type::Mat44);
        let other_a = Node::leaf("a", Type::Mat44);
        assert_eq!(a, a.clone());
        assert_ne!(a, other_a);
        assert_ne!(a.id(), other_a.id());
    }

    #[test]
    fn applications_compare_structurally() {
        let registry = registry();
        let a = Node::leaf("a", Type::Mat44);
        let b = Node::leaf("b", Type::Mat44);

        let first = registry.apply("*", &[a.clone(), b.clone()]).unwrap();
        let second = registry.apply("*", &[a.clone(), b.clone()]).unwrap();
        let swapped = registry.apply("*", &[b, a]).unwrap();

        assert!(!first.same(&second));
        assert_eq!(first, second);
        assert_ne!(first, swapped);
    }

    #[test]
    fn identity_predicates() {
        assert!(Node::zero(Type::Vec4).is_zero());
        assert!(Node::one(Type::Mat33).is_one());
        assert!(!Node::one(Type::Mat33).is_zero());
        assert!(!Node::leaf("x", Type::Scalar).is_zero());
        assert!(Node::literal(Type::Vec3, vec![0.0, 0.0, 0.0]).unwrap().is_zero());
        assert!(!Node::literal(Type::Vec3, vec![0.0, 1.0, 0.0]).unwrap().is_zero());
    }

    #[test]
    fn display() {
        let registry = registry();
        let a = Node::leaf("a", Type::Mat44);
        let t = registry.apply("trans", &[a.clone()]).unwrap();
        let product = registry.apply("*", &[a, t]).unwrap();
        let cell = registry.apply("(0,3)", &[product]).unwrap();
        assert_eq!(cell.to_string(), "(a * trans(a))(0,3)");
        assert_eq!(Node::scalar(-1.5).to_string(), "(-1.5)");
        assert_eq!(
            Node::literal(Type::Vec3, vec![1.0, 0.0, 2.5]).unwrap().to_string(),
            "Vec3[1, 0, 2.5]",
        );
    }
}
