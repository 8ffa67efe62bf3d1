use crate::error::{operand_mismatch, result_mismatch, unknown_operator};
use crate::registry::{Definition, Registry};
use crate::types::Type;
use log::debug;
use std::sync::Arc;
use super::Node;
use symop_error::Error;

impl Registry {
    /// Applies the operator with the given name to the operands.
    ///
    /// The operator is resolved from the operands' types. If it has an `optimize` hook, the hook
    /// runs once, and its replacement (if any) is returned instead of a new application.
    pub fn apply(&self, name: &str, operands: &[Node]) -> Result<Node, Error> {
        let types = operands.iter().map(Node::ty).collect::<Vec<_>>();
        let def = self.resolve(name, &types)?;
        self.build(def, operands)
    }

    /// Applies the operator with the given result type, name and operand types. Use this where
    /// the same name and operands are registered with more than one result type.
    pub fn apply_as(&self, result: Type, name: &str, operands: &[Node]) -> Result<Node, Error> {
        let types = operands.iter().map(Node::ty).collect::<Vec<_>>();
        let def = self.resolve_exact(result, name, &types)?;
        self.build(def, operands)
    }

    /// Applies an already resolved operator to the operands, running its `optimize` hook.
    pub fn build(&self, def: &Arc<Definition>, operands: &[Node]) -> Result<Node, Error> {
        if operands.len() != def.operands().len() {
            let types = operands.iter().map(Node::ty).collect::<Vec<_>>();
            return Err(unknown_operator(def.name(), &types, vec![def.signature().to_string()]));
        }
        for (index, (operand, &expected)) in operands.iter().zip(def.operands()).enumerate() {
            if operand.ty() != expected {
                return Err(operand_mismatch(def.signature(), index, operand.ty()));
            }
        }

        if let Some(optimize) = &def.hooks().optimize {
            if let Some(simplified) = optimize(self, operands)? {
                if simplified.ty() != def.result() {
                    return Err(result_mismatch(def.signature(), "optimize", simplified.ty()));
                }
                debug!("simplified `{}` to `{}`", def.signature(), simplified);
                return Ok(simplified);
            }
        }

        Ok(Node::application(Arc::clone(def), operands.to_vec()))
    }
}
