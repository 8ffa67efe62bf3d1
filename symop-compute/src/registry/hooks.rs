//! The optional capabilities an operator definition can provide.
//!
//! Every hook is a boxed closure, so families of operators (such as component extraction for each
//! index) can be registered in a loop, each capturing its own parameters. Absence of a hook is an
//! explicit `None`, checked by each pass before use.

use crate::derivative::Derivative;
use crate::expr::Node;
use crate::gradient::Backprop;
use crate::literal::Literal;
use super::{Registry, Target};
use std::collections::HashMap;
use symop_error::Error;

/// Simplifies an application at construction time. Returns `Some` with an already simplified
/// replacement, or `None` to build the application as-is.
pub type OptimizeFn = Box<dyn Fn(&Registry, &[Node]) -> Result<Option<Node>, Error> + Send + Sync>;

/// Lowers an application into more primitive operators during lowering, or declines with `None`.
pub type ExpandFn = Box<dyn Fn(&Registry, &[Node]) -> Result<Option<Node>, Error> + Send + Sync>;

/// Unconditionally rewrites an application into more primitive operators during lowering.
pub type ReplaceFn = Box<dyn Fn(&Registry, &[Node]) -> Result<Node, Error> + Send + Sync>;

/// Computes the forward derivative of an application, given the derivative pass (which
/// differentiates operands) and the operands.
pub type DerivFn = Box<dyn Fn(&mut Derivative<'_>, &[Node]) -> Result<Node, Error> + Send + Sync>;

/// Routes the upstream gradient of an application to its operands, through
/// [`Backprop::add_gradient`]. Receives the backprop pass, the upstream gradient and the operands.
pub type GradientFn = Box<dyn Fn(&mut Backprop<'_>, &Node, &[Node]) -> Result<(), Error> + Send + Sync>;

/// Computes the literal result of an application over literal operands.
pub type FoldFn = Box<dyn Fn(&[&Literal]) -> Literal + Send + Sync>;

/// Renders an application, given the already rendered operands.
pub type RenderFn = Box<dyn Fn(&[String]) -> String + Send + Sync>;

/// The hooks of an operator definition.
#[derive(Default)]
pub struct Hooks {
    pub optimize: Option<OptimizeFn>,
    pub expand: Option<ExpandFn>,
    pub replace: Option<ReplaceFn>,
    pub deriv: Option<DerivFn>,
    pub gradient: Option<GradientFn>,
    pub fold: Option<FoldFn>,
    pub render: HashMap<Target, RenderFn>,
}

impl Hooks {
    /// The names of the hooks that are present, for debug output.
    pub fn present(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        let flags = [
            ("optimize", self.optimize.is_some()),
            ("expand", self.expand.is_some()),
            ("replace", self.replace.is_some()),
            ("deriv", self.deriv.is_some()),
            ("gradient", self.gradient.is_some()),
            ("fold", self.fold.is_some()),
        ];
        for (name, present) in flags {
            if present {
                names.push(name);
            }
        }
        for target in Target::ALL {
            if self.render.contains_key(&target) {
                names.push(target.name());
            }
        }
        names
    }
}
