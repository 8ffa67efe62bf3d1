use std::collections::HashSet;
use super::{Node, NodeId};

/// An iterator that traverses an expression graph in left-to-right post-order (i.e. depth-first),
/// yielding each distinct node exactly once, even if it is shared by several applications.
///
/// This iterator is created by [`Node::post_order_iter`].
pub struct PostOrder<'a> {
    /// Nodes being visited, with the index of the next operand to descend into.
    stack: Vec<(&'a Node, usize)>,
    visited: HashSet<NodeId>,
}

impl<'a> PostOrder<'a> {
    /// Creates a new iterator rooted at the given node.
    pub fn new(root: &'a Node) -> Self {
        Self {
            stack: vec![(root, 0)],
            visited: HashSet::new(),
        }
    }
}

impl<'a> Iterator for PostOrder<'a> {
    type Item = &'a Node;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (node, next_operand) = self.stack.last_mut()?;
            let node: &'a Node = *node;
            match node.operands().get(*next_operand) {
                Some(operand) => {
                    *next_operand += 1;
                    if !self.visited.contains(&operand.id()) {
                        self.stack.push((operand, 0));
                    }
                },
                None => {
                    self.stack.pop();
                    if self.visited.insert(node.id()) {
                        return Some(node);
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::registry::Registry;
    use crate::types::Type;
    use pretty_assertions::assert_eq;
    use super::*;

    #[test]
    fn shared_nodes_once() {
        let mut registry = Registry::new();
        registry.define(Type::Scalar, "+", [Type::Scalar, Type::Scalar]).finish().unwrap();

        let x = Node::leaf("x", Type::Scalar);
        let double = registry.apply("+", &[x.clone(), x.clone()]).unwrap();
        let quad = registry.apply("+", &[double.clone(), double.clone()]).unwrap();

        let order = quad.post_order_iter().map(Node::to_string).collect::<Vec<_>>();
        assert_eq!(order, vec!["x", "(x + x)", "((x + x) + (x + x))"]);
    }
}
