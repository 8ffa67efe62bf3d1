//! Lowering of high-level operators into primitive ones.
//!
//! Lowering runs post-order over the whole graph, so operands are always lowered before the
//! application that uses them. For each application:
//!
//! - a `replace` hook always rewrites it, and the rewrite is itself lowered;
//! - otherwise an `expand` hook may rewrite it, and the rewrite is itself lowered;
//! - otherwise the application survives over its lowered operands.
//!
//! `optimize` hooks are not consulted here; they already ran when the graph was built (and run
//! again for every node a `replace` or `expand` hook builds).

use crate::error::result_mismatch;
use crate::expr::{Node, NodeId, NodeKind};
use crate::registry::Registry;
use log::{debug, trace};
use std::{collections::HashMap, sync::Arc};
use symop_error::Error;

/// Lowers expressions built from one registry.
///
/// A lowering remembers every node it has lowered, so a subgraph shared by several parents (or by
/// several expressions passed to the same lowering) is lowered once and stays shared.
pub struct Lowering<'a> {
    registry: &'a Registry,

    /// Maps each visited node to its lowered form.
    cache: HashMap<NodeId, Node>,
}

impl<'a> Lowering<'a> {
    /// Creates a lowering for graphs built from the given registry.
    pub fn new(registry: &'a Registry) -> Self {
        Self {
            registry,
            cache: HashMap::new(),
        }
    }

    /// Lowers the given expression.
    pub fn lower(&mut self, node: &Node) -> Result<Node, Error> {
        if let Some(lowered) = self.cache.get(&node.id()) {
            return Ok(lowered.clone());
        }

        let lowered = match node.kind() {
            NodeKind::Constant(_) | NodeKind::Leaf(_) => node.clone(),
            NodeKind::Application(app) => {
                trace!("lowering `{}`", app.signature());
                let def = Arc::clone(app.definition());
                let operands = app.operands()
                    .iter()
                    .map(|operand| self.lower(operand))
                    .collect::<Result<Vec<_>, _>>()?;

                let hooks = def.hooks();
                let rewrite = if let Some(replace) = &hooks.replace {
                    Some(("replace", replace(self.registry, &operands)?))
                } else if let Some(expand) = &hooks.expand {
                    expand(self.registry, &operands)?.map(|node| ("expand", node))
                } else {
                    None
                };

                match rewrite {
                    Some((hook, rewritten)) => {
                        if rewritten.ty() != def.result() {
                            return Err(result_mismatch(def.signature(), hook, rewritten.ty()));
                        }
                        debug!("{} rewrote `{}` to `{}`", hook, def.signature(), rewritten);
                        self.lower(&rewritten)?
                    },
                    None => {
                        let unchanged = operands
                            .iter()
                            .zip(app.operands())
                            .all(|(lowered, original)| lowered.same(original));
                        if unchanged {
                            node.clone()
                        } else {
                            Node::application(def, operands)
                        }
                    },
                }
            },
        };

        self.cache.insert(node.id(), lowered.clone());
        self.cache.insert(lowered.id(), lowered.clone());
        Ok(lowered)
    }
}

/// Lowers a single expression. See the [module-level documentation](self) for details.
pub fn lower(registry: &Registry, node: &Node) -> Result<Node, Error> {
    Lowering::new(registry).lower(node)
}
