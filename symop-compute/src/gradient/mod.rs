//! Reverse-mode gradient propagation.
//!
//! [`backprop`] pushes an upstream gradient from the root of an expression back to the leaves it
//! depends on. Each application's `gradient` hook receives the **total** gradient flowing into it
//! and routes a contribution to each of its operands with [`Backprop::add_gradient`]:
//!
//! - a contribution to a leaf is summed into the [`GradientAccumulator`] under that leaf;
//! - a contribution to an application is summed with the others it receives, and its own hook
//!   fires once all of its consumers have contributed.
//!
//! Applications are visited in reverse topological order, so every hook fires exactly once even
//! when subexpressions are shared. Only nodes from which one of the requested leaves can be
//! reached are visited at all.

use crate::error::{binding_mismatch, expected_leaf, unsupported_operation};
use crate::expr::{Node, NodeId};
use crate::registry::Registry;
use log::{debug, trace};
use std::{collections::{HashMap, HashSet}, sync::Arc};
use symop_error::Error;

/// The gradients accumulated for each requested leaf.
#[derive(Debug, Default)]
pub struct GradientAccumulator {
    /// Maps each leaf to the leaf itself and its summed gradient.
    gradients: HashMap<NodeId, (Node, Node)>,
}

impl GradientAccumulator {
    /// Returns the gradient accumulated for the leaf, or [`None`] if nothing reached it.
    pub fn get(&self, leaf: &Node) -> Option<&Node> {
        self.gradients.get(&leaf.id()).map(|(_, gradient)| gradient)
    }

    /// Returns the gradient accumulated for the leaf, or the zero constant of its type if nothing
    /// reached it.
    pub fn gradient_or_zero(&self, leaf: &Node) -> Node {
        self.get(leaf).cloned().unwrap_or_else(|| Node::zero(leaf.ty()))
    }

    /// Returns an iterator over each reached leaf and its gradient, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&Node, &Node)> {
        self.gradients.values().map(|(leaf, gradient)| (leaf, gradient))
    }

    /// Returns the number of leaves that received a gradient.
    pub fn len(&self) -> usize {
        self.gradients.len()
    }

    /// Returns true if no leaf received a gradient.
    pub fn is_empty(&self) -> bool {
        self.gradients.is_empty()
    }
}

/// The state of one reverse-mode pass, handed to each `gradient` hook.
pub struct Backprop<'a> {
    registry: &'a Registry,

    /// Nodes from which a requested leaf is reachable, including those leaves.
    relevant: HashSet<NodeId>,

    /// Summed upstream gradients of applications whose hooks have not fired yet.
    pending: HashMap<NodeId, Node>,

    accumulator: GradientAccumulator,
}

impl<'a> Backprop<'a> {
    /// The registry gradients are built from.
    pub fn registry(&self) -> &'a Registry {
        self.registry
    }

    /// Routes a gradient contribution to an operand. The contribution must have the operand's
    /// type. Contributions to operands that no requested leaf depends on are dropped.
    pub fn add_gradient(&mut self, operand: &Node, contribution: Node) -> Result<(), Error> {
        if contribution.ty() != operand.ty() {
            return Err(binding_mismatch(
                &operand.to_string(),
                operand.ty(),
                contribution.ty(),
                "gradient contribution",
            ));
        }
        if !self.relevant.contains(&operand.id()) {
            return Ok(());
        }

        let registry = self.registry;
        let sum = |total: Option<&Node>| match total {
            Some(total) => registry.apply("+", &[total.clone(), contribution.clone()]),
            None => Ok(contribution.clone()),
        };

        if operand.is_leaf() {
            let entry = self.accumulator.gradients.get(&operand.id()).map(|(_, total)| total);
            let total = sum(entry)?;
            self.accumulator.gradients.insert(operand.id(), (operand.clone(), total));
        } else {
            let total = sum(self.pending.get(&operand.id()))?;
            self.pending.insert(operand.id(), total);
        }
        Ok(())
    }
}

/// Propagates the identity of the root's type back through `expr`, and returns the gradient of
/// each leaf in `deps`.
pub fn backprop(registry: &Registry, expr: &Node, deps: &[Node]) -> Result<GradientAccumulator, Error> {
    backprop_with_seed(registry, expr, deps, Node::one(expr.ty()))
}

/// Propagates `seed`, the upstream gradient of `expr`, back through `expr`, and returns the
/// gradient of each leaf in `deps`.
pub fn backprop_with_seed(
    registry: &Registry,
    expr: &Node,
    deps: &[Node],
    seed: Node,
) -> Result<GradientAccumulator, Error> {
    let mut targets = HashSet::new();
    for dep in deps {
        if !dep.is_leaf() {
            return Err(expected_leaf(dep.to_string(), "gradient dependency"));
        }
        targets.insert(dep.id());
    }

    // operands come before their consumers
    let order = expr.post_order_iter().collect::<Vec<_>>();
    let mut relevant = HashSet::new();
    for node in &order {
        if targets.contains(&node.id()) || node.operands().iter().any(|op| relevant.contains(&op.id())) {
            relevant.insert(node.id());
        }
    }

    let mut pass = Backprop {
        registry,
        relevant,
        pending: HashMap::new(),
        accumulator: GradientAccumulator::default(),
    };
    if seed.ty() != expr.ty() {
        return Err(binding_mismatch("seed", expr.ty(), seed.ty(), "upstream gradient"));
    }
    pass.add_gradient(expr, seed)?;

    for node in order.into_iter().rev() {
        let Some(app) = node.as_application() else {
            continue;
        };
        let Some(upstream) = pass.pending.remove(&node.id()) else {
            continue;
        };
        if upstream.is_zero() {
            trace!("skipping `{}`: zero upstream gradient", app.signature());
            continue;
        }

        let def = Arc::clone(app.definition());
        let Some(gradient) = &def.hooks().gradient else {
            return Err(unsupported_operation(def.signature(), "gradient", "gradient"));
        };
        debug!("propagating through `{}`", def.signature());
        gradient(&mut pass, &upstream, app.operands())?;
    }

    Ok(pass.accumulator)
}
