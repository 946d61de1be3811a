// SPDX-License-Identifier: MIT OR Apache-2.0
//! Finalize pipeline: pass-node elision and dead-node pruning.
//!
//! Run exactly once per graph, the pipeline rewrites a build-stage graph
//! into the minimal form consumed by code generation: no pass instances,
//! every survivor backward-reachable from a graph output, every link
//! type-consistent. That contract is established here and never
//! re-validated downstream.

use crate::graph::{GraphState, NodeGraph};
use crate::node::{InputBinding, NodeInstance, NodeType, SocketRef};
use std::collections::HashSet;

/// Structural error detected during finalize.
///
/// These indicate an unrecoverable build defect; the graph is left
/// non-finalized and callers must rebuild from scratch.
#[derive(Debug, thiserror::Error)]
pub enum FinalizeError {
    /// A cycle composed entirely of pass nodes
    #[error("pass node cycle: {}", path.join(" -> "))]
    PassCycle {
        /// Pass instances on the offending path, in walk order
        path: Vec<String>,
    },

    /// A graph output links to an instance that does not exist
    #[error("output {output} is linked to missing node {node}")]
    DanglingOutputLink {
        /// Output port name
        output: String,
        /// Missing instance name
        node: String,
    },

    /// An instance input links to an instance that does not exist
    #[error("input `{socket}` of {node} is linked to missing node {target}")]
    DanglingLink {
        /// Consuming instance name
        node: String,
        /// Consuming socket name
        socket: String,
        /// Missing producer name
        target: String,
    },

    /// An instance is bound to a type absent from the registry
    #[error("node {node} is bound to unknown node type {type_name}")]
    UnknownNodeType {
        /// Instance name
        node: String,
        /// Missing type name
        type_name: String,
    },

    /// A pass node type declares no input to forward
    #[error("pass node {node} declares no input socket")]
    MalformedPassNode {
        /// Offending instance name
        node: String,
    },
}

impl NodeGraph {
    /// Rewrite the graph into its final, code-generation-ready form.
    ///
    /// Elides pass nodes, then prunes every instance not backward-reachable
    /// from a graph output. The transition is one-shot; calling `finalize`
    /// on an already-finalized graph is a no-op (its own postcondition is a
    /// fixed point). On a structural error the graph is not advanced to
    /// [`GraphState::Finalized`] and must be rebuilt.
    pub fn finalize(&mut self) -> Result<(), FinalizeError> {
        if self.is_finalized() {
            return Ok(());
        }
        self.skip_pass_nodes()?;
        self.remove_unused_nodes()?;
        self.set_state(GraphState::Finalized);
        tracing::debug!(nodes = self.node_count(), "graph finalized");
        Ok(())
    }

    fn instance_type(&self, instance: &NodeInstance) -> Result<&NodeType, FinalizeError> {
        self.registry()
            .find_node_type(instance.type_name())
            .ok_or_else(|| FinalizeError::UnknownNodeType {
                node: instance.name().to_owned(),
                type_name: instance.type_name().to_owned(),
            })
    }

    /// Follow a link through consecutive pass nodes to the binding of the
    /// ultimate non-pass source. Propagates the binding kind: a chain ending
    /// in a constant (or an unbound pass input, via the socket default)
    /// resolves to that constant, one ending in an external input resolves
    /// to that extern.
    fn resolve_past_pass_nodes(&self, start: &SocketRef) -> Result<InputBinding, FinalizeError> {
        let mut current = start.clone();
        let mut path: Vec<String> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        loop {
            let Some(node) = self.node(&current.node) else {
                return Err(FinalizeError::DanglingLink {
                    node: path.last().cloned().unwrap_or_else(|| current.node.clone()),
                    socket: current.socket.clone(),
                    target: current.node.clone(),
                });
            };
            let node_type = self.instance_type(node)?;
            if !node_type.is_pass {
                return Ok(InputBinding::Link(current));
            }
            if !seen.insert(node.name().to_owned()) {
                path.push(node.name().to_owned());
                return Err(FinalizeError::PassCycle { path });
            }
            path.push(node.name().to_owned());

            let Some(socket) = node_type.find_input(0usize) else {
                return Err(FinalizeError::MalformedPassNode {
                    node: node.name().to_owned(),
                });
            };
            match node.input_binding(&socket.name) {
                Some(InputBinding::Link(next)) => current = next.clone(),
                Some(binding) => return Ok(binding.clone()),
                None => return Ok(InputBinding::Constant(socket.default_value.clone())),
            }
        }
    }

    /// Rewire every link pointing at a pass node to the pass node's own
    /// upstream source, transitively through chains of pass nodes.
    fn skip_pass_nodes(&mut self) -> Result<(), FinalizeError> {
        let mut rewrites: Vec<(String, String, InputBinding)> = Vec::new();
        for node in self.nodes() {
            for (socket, binding) in node.input_bindings() {
                let InputBinding::Link(target) = binding else {
                    continue;
                };
                let Some(producer) = self.node(&target.node) else {
                    return Err(FinalizeError::DanglingLink {
                        node: node.name().to_owned(),
                        socket: socket.to_owned(),
                        target: target.node.clone(),
                    });
                };
                if self.instance_type(producer)?.is_pass {
                    let resolved = self.resolve_past_pass_nodes(target)?;
                    rewrites.push((node.name().to_owned(), socket.to_owned(), resolved));
                }
            }
        }
        let rewired = rewrites.len();
        for (node, socket, binding) in rewrites {
            if let Some(instance) = self.nodes_mut().get_mut(&node) {
                instance.bind_input(socket, binding);
            }
        }
        if rewired > 0 {
            tracing::debug!(rewired, "elided pass node links");
        }

        let mut output_rewrites: Vec<(usize, InputBinding)> = Vec::new();
        for (index, output) in self.outputs().iter().enumerate() {
            let Some(link) = &output.link else {
                continue;
            };
            let Some(producer) = self.node(&link.node) else {
                return Err(FinalizeError::DanglingOutputLink {
                    output: output.name.clone(),
                    node: link.node.clone(),
                });
            };
            if self.instance_type(producer)?.is_pass {
                output_rewrites.push((index, self.resolve_past_pass_nodes(link)?));
            }
        }
        for (index, binding) in output_rewrites {
            let name = self.outputs()[index].name.clone();
            let output = &mut self.outputs_mut()[index];
            match binding {
                InputBinding::Link(link) => output.link = Some(link),
                InputBinding::Constant(value) => {
                    output.default_value = value;
                    output.link = None;
                }
                InputBinding::Extern(input) => {
                    output.link = None;
                    tracing::warn!(
                        output = %name,
                        input = %input,
                        "output pass chain ends at an external input; link dropped"
                    );
                }
            }
        }
        Ok(())
    }

    /// Discard every instance not transitively reachable by walking
    /// backward from the graph outputs. The walk tracks visited instances
    /// and terminates even on cyclic link structures.
    fn remove_unused_nodes(&mut self) -> Result<(), FinalizeError> {
        let mut reachable: HashSet<String> = HashSet::new();
        let mut stack: Vec<String> = Vec::new();

        for output in self.outputs() {
            if let Some(link) = &output.link {
                if self.node(&link.node).is_none() {
                    return Err(FinalizeError::DanglingOutputLink {
                        output: output.name.clone(),
                        node: link.node.clone(),
                    });
                }
                stack.push(link.node.clone());
            }
        }

        while let Some(name) = stack.pop() {
            if !reachable.insert(name.clone()) {
                continue;
            }
            let Some(node) = self.node(&name) else {
                continue;
            };
            for (socket, binding) in node.input_bindings() {
                if let InputBinding::Link(target) = binding {
                    if self.node(&target.node).is_none() {
                        return Err(FinalizeError::DanglingLink {
                            node: name.clone(),
                            socket: socket.to_owned(),
                            target: target.node.clone(),
                        });
                    }
                    stack.push(target.node.clone());
                }
            }
        }

        let before = self.node_count();
        self.nodes_mut().retain(|name, _| reachable.contains(name));
        let removed = before - self.node_count();
        if removed > 0 {
            tracing::debug!(removed, remaining = self.node_count(), "pruned unreachable nodes");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::graph::GraphError;
    use crate::registry::NodeRegistry;
    use crate::value::{TypeDesc, Value};
    use std::sync::Arc;

    fn session_registry() -> Arc<NodeRegistry> {
        let mut registry = NodeRegistry::new();
        catalog::register_all(&mut registry).unwrap();
        Arc::new(registry)
    }

    fn graph() -> NodeGraph {
        NodeGraph::new(session_registry())
    }

    #[test]
    fn test_pass_node_elided_between_instances() {
        // O <- A <- P <- B
        let mut g = graph();
        let b = g.add_node("float_value", Some("b")).unwrap();
        let p = g.add_node("pass_float", Some("p")).unwrap();
        let a = g.add_node("float_add", Some("a")).unwrap();
        g.add_link(&b, "value", &p, "value", true).unwrap();
        g.add_link(&p, "value", &a, "a", true).unwrap();
        g.add_output("result", TypeDesc::Float, 0.0).unwrap();
        g.set_output_link("result", &a, "value").unwrap();

        g.finalize().unwrap();

        assert!(g.node(&p).is_none());
        assert!(g.node(&a).is_some());
        let link = g.node(&a).unwrap().find_input_link("a").unwrap();
        assert_eq!(link.node, b);
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn test_output_linked_through_pass_resolves_to_producer() {
        // O <- P <- B
        let mut g = graph();
        let b = g.add_node("float_value", Some("b")).unwrap();
        let p = g.add_node("pass_float", Some("p")).unwrap();
        g.add_link(&b, "value", &p, "value", true).unwrap();
        g.add_output("result", TypeDesc::Float, 0.0).unwrap();
        g.set_output_link("result", &p, "value").unwrap();

        g.finalize().unwrap();

        let link = g.output("result").unwrap().link.as_ref().unwrap();
        assert_eq!(link.node, b);
        assert!(g.node(&p).is_none());
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn test_orphan_nodes_pruned() {
        let mut g = graph();
        let used = g.add_node("float_value", Some("used")).unwrap();
        let orphan = g.add_node("float_add", Some("orphan")).unwrap();
        g.add_output("result", TypeDesc::Float, 0.0).unwrap();
        g.set_output_link("result", &used, "value").unwrap();

        g.finalize().unwrap();

        assert!(g.node(&used).is_some());
        assert!(g.node(&orphan).is_none());
        assert_eq!(g.node_count(), 1);
    }

    #[test]
    fn test_finalize_idempotent() {
        let mut g = graph();
        let src = g.add_node("float_value", None).unwrap();
        g.add_node("float_add", None).unwrap();
        g.add_output("result", TypeDesc::Float, 0.0).unwrap();
        g.set_output_link("result", &src, "value").unwrap();

        g.finalize().unwrap();
        let count = g.node_count();
        g.finalize().unwrap();
        assert_eq!(g.node_count(), count);
        assert!(g.is_finalized());
    }

    #[test]
    fn test_finalized_graph_rejects_mutation() {
        let mut g = graph();
        g.finalize().unwrap();
        assert!(matches!(
            g.add_node("float_value", None),
            Err(GraphError::Finalized)
        ));
        assert!(matches!(
            g.add_input("x", TypeDesc::Float),
            Err(GraphError::Finalized)
        ));
    }

    #[test]
    fn test_pass_chain_collapses_to_direct_link() {
        let mut g = graph();
        let src = g.add_node("float_value", Some("src")).unwrap();
        let p1 = g.add_node("pass_float", Some("p1")).unwrap();
        let p2 = g.add_node("pass_float", Some("p2")).unwrap();
        let p3 = g.add_node("pass_float", Some("p3")).unwrap();
        let sink = g.add_node("float_add", Some("sink")).unwrap();
        g.add_link(&src, "value", &p1, "value", true).unwrap();
        g.add_link(&p1, "value", &p2, "value", true).unwrap();
        g.add_link(&p2, "value", &p3, "value", true).unwrap();
        g.add_link(&p3, "value", &sink, "a", true).unwrap();
        g.add_output("result", TypeDesc::Float, 0.0).unwrap();
        g.set_output_link("result", &sink, "value").unwrap();

        g.finalize().unwrap();

        let link = g.node(&sink).unwrap().find_input_link("a").unwrap();
        assert_eq!(link.node, src);
        assert_eq!(g.node_count(), 2);
    }

    #[test]
    fn test_pass_cycle_detected() {
        let mut g = graph();
        let p1 = g.add_node("pass_float", Some("p1")).unwrap();
        let p2 = g.add_node("pass_float", Some("p2")).unwrap();
        let p3 = g.add_node("pass_float", Some("p3")).unwrap();
        g.add_link(&p1, "value", &p2, "value", true).unwrap();
        g.add_link(&p2, "value", &p3, "value", true).unwrap();
        g.add_link(&p3, "value", &p1, "value", true).unwrap();

        let err = g.finalize().unwrap_err();
        let FinalizeError::PassCycle { path } = err else {
            panic!("expected pass cycle, got {err:?}");
        };
        assert!(!path.is_empty());
        assert!(!g.is_finalized());
    }

    #[test]
    fn test_pass_chain_ending_in_constant_rebinds_constant() {
        let mut g = graph();
        let p = g.add_node("pass_float", Some("p")).unwrap();
        let sink = g.add_node("float_add", Some("sink")).unwrap();
        g.set_input_value(&p, "value", 2.0).unwrap();
        g.add_link(&p, "value", &sink, "a", true).unwrap();
        g.add_output("result", TypeDesc::Float, 0.0).unwrap();
        g.set_output_link("result", &sink, "value").unwrap();

        g.finalize().unwrap();

        assert_eq!(
            g.node(&sink).unwrap().find_input_value("a"),
            Some(&Value::Float(2.0))
        );
        assert!(g.node(&p).is_none());
    }

    #[test]
    fn test_pass_chain_ending_in_extern_rebinds_extern() {
        let mut g = graph();
        g.add_input("fac", TypeDesc::Float).unwrap();
        let p = g.add_node("pass_float", Some("p")).unwrap();
        let sink = g.add_node("float_add", Some("sink")).unwrap();
        g.set_input_extern(&p, "value", "fac").unwrap();
        g.add_link(&p, "value", &sink, "a", true).unwrap();
        g.add_output("result", TypeDesc::Float, 0.0).unwrap();
        g.set_output_link("result", &sink, "value").unwrap();

        g.finalize().unwrap();

        assert_eq!(g.node(&sink).unwrap().find_input_extern("a"), Some("fac"));
    }

    #[test]
    fn test_output_pass_chain_ending_in_constant_becomes_default() {
        let mut g = graph();
        let p = g.add_node("pass_float", Some("p")).unwrap();
        g.set_input_value(&p, "value", 7.0).unwrap();
        g.add_output("result", TypeDesc::Float, 0.0).unwrap();
        g.set_output_link("result", &p, "value").unwrap();

        g.finalize().unwrap();

        let output = g.output("result").unwrap();
        assert!(output.link.is_none());
        assert_eq!(output.default_value, Value::Float(7.0));
        assert_eq!(g.node_count(), 0);
    }

    #[test]
    fn test_unbound_pass_input_resolves_to_socket_default() {
        let mut g = graph();
        let p = g.add_node("pass_float", Some("p")).unwrap();
        let sink = g.add_node("float_add", Some("sink")).unwrap();
        g.add_link(&p, "value", &sink, "a", true).unwrap();
        g.add_output("result", TypeDesc::Float, 0.0).unwrap();
        g.set_output_link("result", &sink, "value").unwrap();

        g.finalize().unwrap();

        assert_eq!(
            g.node(&sink).unwrap().find_input_value("a"),
            Some(&Value::Float(0.0))
        );
    }

    #[test]
    fn test_dangling_output_link_reported() {
        let mut g = graph();
        g.add_output("result", TypeDesc::Float, 0.0).unwrap();
        g.outputs_mut()[0].link = Some(SocketRef::new("ghost", "value"));

        let err = g.finalize().unwrap_err();
        assert!(matches!(
            err,
            FinalizeError::DanglingOutputLink { ref node, .. } if node == "ghost"
        ));
        assert!(!g.is_finalized());
    }

    #[test]
    fn test_converter_kept_when_reachable() {
        let mut g = graph();
        let src = g.add_node("int_value", Some("src")).unwrap();
        let sink = g.add_node("float_add", Some("sink")).unwrap();
        g.add_link(&src, "value", &sink, "a", true).unwrap();
        g.add_output("result", TypeDesc::Float, 0.0).unwrap();
        g.set_output_link("result", &sink, "value").unwrap();

        g.finalize().unwrap();

        // src, converter, sink all survive
        assert_eq!(g.node_count(), 3);
        assert!(g
            .nodes()
            .any(|n| n.type_name() == "int_to_float"));
    }
}
