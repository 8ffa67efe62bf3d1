use crate::expr::{Node, NodeId};
use crate::registry::Target;
use crate::types::Type;
use log::debug;
use std::collections::{HashMap, HashSet};
use super::render_node;
use symop_error::Error;

/// Receives the statements of an emitted kernel, one line at a time.
pub trait CodeSink {
    /// Appends a complete statement.
    fn line(&mut self, line: &str);
}

impl CodeSink for String {
    fn line(&mut self, line: &str) {
        self.push_str(line);
        self.push('\n');
    }
}

impl CodeSink for Vec<String> {
    fn line(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// Renders a variable declaration statement.
fn declaration(ty: Type, name: &str, value: &str, target: Target) -> String {
    match target {
        Target::C if ty.is_scalar() => format!("double {} = {};", name, value),
        Target::C => format!("{} {} = {};", ty, name, value),
        Target::Js => format!("const {} = {};", name, value),
    }
}

/// A set of named expressions emitted together.
///
/// Applications used more than once across the outputs are computed once, into temporaries named
/// `_t0`, `_t1`, and so on, declared before their first use.
///
/// ```
/// use symop_compute::{emit::Kernel, ops, Node, Target, Type};
///
/// let registry = ops::standard().unwrap();
/// let a = Node::leaf("a", Type::Scalar);
/// let cos = registry.apply("cos", &[a.clone()]).unwrap();
/// let twice = registry.apply("+", &[cos.clone(), cos]).unwrap();
///
/// let kernel = Kernel::new().output("twice", twice);
/// assert_eq!(kernel.to_source(Target::C).unwrap(), "\
/// double _t0 = cos(a);
/// double twice = (_t0 + _t0);
/// ");
/// ```
#[derive(Clone, Debug, Default)]
pub struct Kernel {
    outputs: Vec<(String, Node)>,
}

impl Kernel {
    /// Creates a kernel with no outputs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a named output.
    pub fn output(mut self, name: impl Into<String>, node: Node) -> Self {
        self.push(name, node);
        self
    }

    /// Adds a named output.
    pub fn push(&mut self, name: impl Into<String>, node: Node) {
        self.outputs.push((name.into(), node));
    }

    /// The outputs, in the order they are emitted.
    pub fn outputs(&self) -> &[(String, Node)] {
        &self.outputs
    }

    /// Counts the consumers of each node across all outputs. Each output counts as a consumer of
    /// its root.
    fn uses(&self) -> HashMap<NodeId, usize> {
        let mut uses = HashMap::new();
        let mut seen = HashSet::new();
        for (_, root) in &self.outputs {
            *uses.entry(root.id()).or_insert(0) += 1;
            for node in root.post_order_iter() {
                if seen.insert(node.id()) {
                    for operand in node.operands() {
                        *uses.entry(operand.id()).or_insert(0) += 1;
                    }
                }
            }
        }
        uses
    }

    /// Writes the statements of the kernel to the sink.
    pub fn emit(&self, target: Target, sink: &mut impl CodeSink) -> Result<(), Error> {
        let uses = self.uses();
        let mut rendered = HashMap::new();
        let mut temporaries = 0;

        for (name, root) in &self.outputs {
            for node in root.post_order_iter() {
                if rendered.contains_key(&node.id()) {
                    continue;
                }

                let mut text = render_node(node, target, &rendered)?;
                let shared = uses.get(&node.id()).copied().unwrap_or(0) > 1;
                if shared && node.as_application().is_some() {
                    let temporary = format!("_t{}", temporaries);
                    temporaries += 1;
                    sink.line(&declaration(node.ty(), &temporary, &text, target));
                    text = temporary;
                }
                rendered.insert(node.id(), text);
            }

            sink.line(&declaration(root.ty(), name, &rendered[&root.id()], target));
        }

        debug!(
            "emitted {} outputs with {} temporaries to {}",
            self.outputs.len(),
            temporaries,
            target,
        );
        Ok(())
    }

    /// Renders the statements of the kernel, one per line.
    pub fn to_source(&self, target: Target) -> Result<String, Error> {
        let mut source = String::new();
        self.emit(target, &mut source)?;
        Ok(source)
    }
}
