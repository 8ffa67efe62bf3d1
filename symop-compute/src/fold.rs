//! Constant folding and leaf substitution.
//!
//! Together these evaluate a graph at a point without a runtime: substitute constants for its
//! leaves, [`lower`](crate::lower::lower) it, then fold it down to a single constant.

use crate::error::{binding_mismatch, expected_leaf, result_mismatch};
use crate::expr::{Node, NodeId, NodeKind};
use crate::registry::Registry;
use log::trace;
use std::collections::HashMap;
use symop_error::Error;

/// Replaces every application whose operands are all constants, and whose operator has a `fold`
/// hook, with the constant it computes. Other applications are rebuilt over their folded operands,
/// running their `optimize` hooks again.
pub fn fold_constants(registry: &Registry, node: &Node) -> Result<Node, Error> {
    let mut folded = HashMap::new();
    fold_node(registry, node, &mut folded)
}

fn fold_node(registry: &Registry, node: &Node, folded: &mut HashMap<NodeId, Node>) -> Result<Node, Error> {
    if let Some(result) = folded.get(&node.id()) {
        return Ok(result.clone());
    }

    let result = match node.kind() {
        NodeKind::Constant(_) | NodeKind::Leaf(_) => node.clone(),
        NodeKind::Application(app) => {
            let def = app.definition();
            let operands = app.operands()
                .iter()
                .map(|operand| fold_node(registry, operand, folded))
                .collect::<Result<Vec<_>, _>>()?;

            let literals = operands.iter().map(Node::as_literal).collect::<Option<Vec<_>>>();
            match (&def.hooks().fold, literals) {
                (Some(fold), Some(literals)) => {
                    let value = fold(&literals);
                    if value.ty() != def.result() {
                        return Err(result_mismatch(def.signature(), "fold", value.ty()));
                    }
                    trace!("folded `{}`", def.signature());
                    Node::constant(value)
                },
                _ if operands.iter().zip(app.operands()).all(|(new, old)| new.same(old)) => node.clone(),
                _ => registry.build(def, &operands)?,
            }
        },
    };

    folded.insert(node.id(), result.clone());
    Ok(result)
}

/// Replaces leaves with other nodes of the same type.
///
/// Each binding pairs a leaf with its replacement. Every application above a replaced leaf is
/// rebuilt through [`Registry::build`], so `optimize` hooks see the new operands: substituting
/// `0` for the angle of a rotation yields the identity constant.
pub fn substitute(registry: &Registry, node: &Node, bindings: &[(Node, Node)]) -> Result<Node, Error> {
    let mut substituted = HashMap::new();
    for (leaf, value) in bindings {
        let Some(name) = leaf.leaf_name() else {
            return Err(expected_leaf(leaf.to_string(), "substituted node"));
        };
        if leaf.ty() != value.ty() {
            return Err(binding_mismatch(name, leaf.ty(), value.ty(), "substitution"));
        }
        substituted.insert(leaf.id(), value.clone());
    }

    substitute_node(registry, node, &mut substituted)
}

fn substitute_node(
    registry: &Registry,
    node: &Node,
    substituted: &mut HashMap<NodeId, Node>,
) -> Result<Node, Error> {
    if let Some(result) = substituted.get(&node.id()) {
        return Ok(result.clone());
    }

    let result = match node.as_application() {
        None => node.clone(),
        Some(app) => {
            let operands = app.operands()
                .iter()
                .map(|operand| substitute_node(registry, operand, substituted))
                .collect::<Result<Vec<_>, _>>()?;
            if operands.iter().zip(app.operands()).all(|(new, old)| new.same(old)) {
                node.clone()
            } else {
                registry.build(app.definition(), &operands)?
            }
        },
    };

    substituted.insert(node.id(), result.clone());
    Ok(result)
}
