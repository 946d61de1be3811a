// SPDX-License-Identifier: MIT OR Apache-2.0
//! Graph data structure owning node instances and external ports.

use crate::catalog::converter_type_name;
use crate::node::{InputBinding, NodeInstance, NodeType, SocketRef};
use crate::registry::NodeRegistry;
use crate::socket::SocketKey;
use crate::value::{TypeDesc, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Build stage of a graph. The transition is one-shot: once finalized, a
/// graph is read-only input to code generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GraphState {
    /// Under incremental construction
    Build,
    /// Rewritten into its minimal, type-consistent, reachable form
    Finalized,
}

/// A named external input port exposing a graph parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphInput {
    /// Port name, unique among the graph's inputs
    pub name: String,
    /// Type of values supplied through this port
    pub type_desc: TypeDesc,
    /// Argument value bound for this invocation, if any
    pub value: Option<Value>,
}

/// A named external output port exposing a graph result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphOutput {
    /// Port name, unique among the graph's outputs
    pub name: String,
    /// Type of the produced value
    pub type_desc: TypeDesc,
    /// Value used when no producing instance is linked
    pub default_value: Value,
    /// Producing instance socket, if linked
    pub link: Option<SocketRef>,
}

/// Error raised by graph build operations.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// Referenced node type is not registered
    #[error("unknown node type: {0}")]
    UnknownNodeType(String),

    /// Referenced instance does not exist in this graph
    #[error("unknown node: {0}")]
    UnknownNode(String),

    /// An instance with this name already exists
    #[error("duplicate node name: {0}")]
    DuplicateNode(String),

    /// Referenced socket does not exist on the instance's type
    #[error("no socket `{socket}` on node {node}")]
    UnknownSocket {
        /// Instance name
        node: String,
        /// Rendered socket key
        socket: String,
    },

    /// Referenced graph input does not exist
    #[error("unknown graph input: {0}")]
    UnknownInput(String),

    /// Referenced graph output does not exist
    #[error("unknown graph output: {0}")]
    UnknownOutput(String),

    /// A port with this name already exists on the graph
    #[error("duplicate graph port name: {0}")]
    DuplicatePort(String),

    /// Socket types differ and automatic conversion was disabled
    #[error("type mismatch: {from} cannot feed {to}")]
    TypeMismatch {
        /// Source socket type
        from: TypeDesc,
        /// Destination socket type
        to: TypeDesc,
    },

    /// Socket types differ and no conversion path exists between them
    #[error("no conversion from {from} to {to}")]
    ConverterUnavailable {
        /// Source socket type
        from: TypeDesc,
        /// Destination socket type
        to: TypeDesc,
    },

    /// A literal cannot represent the required socket or port type
    #[error("literal does not fit type {0}")]
    LiteralMismatch(TypeDesc),

    /// The graph has been finalized and no longer accepts mutation
    #[error("graph is finalized and read-only")]
    Finalized,
}

/// A directed dataflow graph of typed node instances.
///
/// The graph exclusively owns its instances; destroying the graph destroys
/// them. Instances are addressed by graph-unique names, which stay stable
/// across finalize-time pruning.
pub struct NodeGraph {
    registry: Arc<NodeRegistry>,
    nodes: IndexMap<String, NodeInstance>,
    inputs: Vec<GraphInput>,
    outputs: Vec<GraphOutput>,
    state: GraphState,
}

impl NodeGraph {
    /// Create an empty graph over a session registry.
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self {
            registry,
            nodes: IndexMap::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            state: GraphState::Build,
        }
    }

    /// The registry this graph resolves node types against.
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Current build stage.
    pub fn state(&self) -> GraphState {
        self.state
    }

    /// Whether the finalize pipeline has run.
    pub fn is_finalized(&self) -> bool {
        self.state == GraphState::Finalized
    }

    fn ensure_build(&self) -> Result<(), GraphError> {
        if self.is_finalized() {
            return Err(GraphError::Finalized);
        }
        Ok(())
    }

    /// Materialize an instance of a registered type.
    ///
    /// With `name == None` a unique instance name is derived from the type
    /// name; an explicit name must not collide with an existing instance.
    /// Returns the instance name, the stable handle for all later wiring.
    pub fn add_node(&mut self, type_name: &str, name: Option<&str>) -> Result<String, GraphError> {
        self.ensure_build()?;
        let Some(node_type) = self.registry.find_node_type(type_name) else {
            return Err(GraphError::UnknownNodeType(type_name.to_owned()));
        };

        let name = match name {
            Some(name) => {
                if self.nodes.contains_key(name) {
                    return Err(GraphError::DuplicateNode(name.to_owned()));
                }
                name.to_owned()
            }
            None => {
                let mut n = self.nodes.len() + 1;
                loop {
                    let candidate = format!("{type_name}_{n:03}");
                    if !self.nodes.contains_key(&candidate) {
                        break candidate;
                    }
                    n += 1;
                }
            }
        };

        let instance = NodeInstance::new(node_type, name.clone());
        self.nodes.insert(name.clone(), instance);
        Ok(name)
    }

    /// Get an instance by name.
    pub fn node(&self, name: &str) -> Option<&NodeInstance> {
        self.nodes.get(name)
    }

    /// All instances. After finalize the order is not guaranteed to match
    /// insertion order; consumers derive their own topological order.
    pub fn nodes(&self) -> impl Iterator<Item = &NodeInstance> {
        self.nodes.values()
    }

    /// Number of instances currently in the graph.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The node type an instance is bound to.
    pub fn node_type(&self, node: &str) -> Option<&NodeType> {
        self.nodes
            .get(node)
            .and_then(|n| self.registry.find_node_type(n.type_name()))
    }

    /// Declare an external input port.
    pub fn add_input(&mut self, name: &str, type_desc: TypeDesc) -> Result<&GraphInput, GraphError> {
        self.ensure_build()?;
        if self.input(name).is_some() {
            return Err(GraphError::DuplicatePort(name.to_owned()));
        }
        self.inputs.push(GraphInput {
            name: name.to_owned(),
            type_desc,
            value: None,
        });
        Ok(&self.inputs[self.inputs.len() - 1])
    }

    /// Declare an external output port with its fallback value.
    pub fn add_output(
        &mut self,
        name: &str,
        type_desc: TypeDesc,
        default_value: impl Into<Value>,
    ) -> Result<&GraphOutput, GraphError> {
        self.ensure_build()?;
        if self.output(name).is_some() {
            return Err(GraphError::DuplicatePort(name.to_owned()));
        }
        let default_value = Value::create(type_desc, default_value)
            .ok_or(GraphError::LiteralMismatch(type_desc))?;
        self.outputs.push(GraphOutput {
            name: name.to_owned(),
            type_desc,
            default_value,
            link: None,
        });
        Ok(&self.outputs[self.outputs.len() - 1])
    }

    /// Get an input port by name.
    pub fn input(&self, name: &str) -> Option<&GraphInput> {
        self.inputs.iter().find(|i| i.name == name)
    }

    /// Get an input port by position.
    pub fn input_at(&self, index: usize) -> Option<&GraphInput> {
        self.inputs.get(index)
    }

    /// Ordered input ports.
    pub fn inputs(&self) -> &[GraphInput] {
        &self.inputs
    }

    /// Get an output port by name.
    pub fn output(&self, name: &str) -> Option<&GraphOutput> {
        self.outputs.iter().find(|o| o.name == name)
    }

    /// Get an output port by position.
    pub fn output_at(&self, index: usize) -> Option<&GraphOutput> {
        self.outputs.get(index)
    }

    /// Ordered output ports.
    pub fn outputs(&self) -> &[GraphOutput] {
        &self.outputs
    }

    /// Bind an argument value to an input port for this invocation.
    pub fn set_input_argument(
        &mut self,
        name: &str,
        value: impl Into<Value>,
    ) -> Result<(), GraphError> {
        self.ensure_build()?;
        let Some(input) = self.inputs.iter_mut().find(|i| i.name == name) else {
            return Err(GraphError::UnknownInput(name.to_owned()));
        };
        let value =
            Value::create(input.type_desc, value).ok_or(GraphError::LiteralMismatch(input.type_desc))?;
        input.value = Some(value);
        Ok(())
    }

    /// Link an output port to a producing instance socket of the same type.
    pub fn set_output_link<'k>(
        &mut self,
        output: &str,
        node: &str,
        socket: impl Into<SocketKey<'k>>,
    ) -> Result<(), GraphError> {
        self.ensure_build()?;
        let socket = socket.into();
        let Some(from_type) = self.node_type(node) else {
            return Err(GraphError::UnknownNode(node.to_owned()));
        };
        let Some(from_socket) = from_type.find_output(socket) else {
            return Err(GraphError::UnknownSocket {
                node: node.to_owned(),
                socket: socket.to_string(),
            });
        };
        let link = SocketRef::new(node, from_socket.name.clone());
        let from_td = from_socket.type_desc;

        let Some(port) = self.outputs.iter_mut().find(|o| o.name == output) else {
            return Err(GraphError::UnknownOutput(output.to_owned()));
        };
        if port.type_desc != from_td {
            return Err(GraphError::TypeMismatch {
                from: from_td,
                to: port.type_desc,
            });
        }
        port.link = Some(link);
        Ok(())
    }

    /// Bind a constant to an instance input, replacing any prior binding.
    pub fn set_input_value<'k>(
        &mut self,
        node: &str,
        socket: impl Into<SocketKey<'k>>,
        value: impl Into<Value>,
    ) -> Result<(), GraphError> {
        self.ensure_build()?;
        let socket = socket.into();
        let Some(node_type) = self.node_type(node) else {
            return Err(GraphError::UnknownNode(node.to_owned()));
        };
        let Some(decl) = node_type.find_input(socket) else {
            return Err(GraphError::UnknownSocket {
                node: node.to_owned(),
                socket: socket.to_string(),
            });
        };
        let value =
            Value::create(decl.type_desc, value).ok_or(GraphError::LiteralMismatch(decl.type_desc))?;
        let socket_name = decl.name.clone();
        self.bind(node, socket_name, InputBinding::Constant(value))
    }

    /// Bind an instance input to another instance's output socket,
    /// replacing any prior binding. Types are not checked here; use
    /// [`NodeGraph::add_link`] for checked, converting links.
    pub fn set_input_link<'f, 't>(
        &mut self,
        node: &str,
        socket: impl Into<SocketKey<'t>>,
        from_node: &str,
        from_socket: impl Into<SocketKey<'f>>,
    ) -> Result<(), GraphError> {
        self.ensure_build()?;
        let socket = socket.into();
        let from_socket = from_socket.into();
        let Some(from_type) = self.node_type(from_node) else {
            return Err(GraphError::UnknownNode(from_node.to_owned()));
        };
        let Some(from_decl) = from_type.find_output(from_socket) else {
            return Err(GraphError::UnknownSocket {
                node: from_node.to_owned(),
                socket: from_socket.to_string(),
            });
        };
        let link = SocketRef::new(from_node, from_decl.name.clone());

        let Some(node_type) = self.node_type(node) else {
            return Err(GraphError::UnknownNode(node.to_owned()));
        };
        let Some(decl) = node_type.find_input(socket) else {
            return Err(GraphError::UnknownSocket {
                node: node.to_owned(),
                socket: socket.to_string(),
            });
        };
        let socket_name = decl.name.clone();
        self.bind(node, socket_name, InputBinding::Link(link))
    }

    /// Bind an instance input to a graph input of the same type, replacing
    /// any prior binding.
    pub fn set_input_extern<'k>(
        &mut self,
        node: &str,
        socket: impl Into<SocketKey<'k>>,
        input: &str,
    ) -> Result<(), GraphError> {
        self.ensure_build()?;
        let socket = socket.into();
        let Some(graph_input) = self.input(input) else {
            return Err(GraphError::UnknownInput(input.to_owned()));
        };
        let input_td = graph_input.type_desc;
        let Some(node_type) = self.node_type(node) else {
            return Err(GraphError::UnknownNode(node.to_owned()));
        };
        let Some(decl) = node_type.find_input(socket) else {
            return Err(GraphError::UnknownSocket {
                node: node.to_owned(),
                socket: socket.to_string(),
            });
        };
        if decl.type_desc != input_td {
            return Err(GraphError::TypeMismatch {
                from: input_td,
                to: decl.type_desc,
            });
        }
        let socket_name = decl.name.clone();
        self.bind(node, socket_name, InputBinding::Extern(input.to_owned()))
    }

    /// Store a value placeholder on an instance output socket.
    pub fn set_output_value<'k>(
        &mut self,
        node: &str,
        socket: impl Into<SocketKey<'k>>,
        value: impl Into<Value>,
    ) -> Result<(), GraphError> {
        self.ensure_build()?;
        let socket = socket.into();
        let Some(node_type) = self.node_type(node) else {
            return Err(GraphError::UnknownNode(node.to_owned()));
        };
        let Some(decl) = node_type.find_output(socket) else {
            return Err(GraphError::UnknownSocket {
                node: node.to_owned(),
                socket: socket.to_string(),
            });
        };
        let value =
            Value::create(decl.type_desc, value).ok_or(GraphError::LiteralMismatch(decl.type_desc))?;
        let socket_name = decl.name.clone();
        let Some(instance) = self.nodes.get_mut(node) else {
            return Err(GraphError::UnknownNode(node.to_owned()));
        };
        instance.bind_output_value(socket_name, value);
        Ok(())
    }

    fn bind(&mut self, node: &str, socket: String, binding: InputBinding) -> Result<(), GraphError> {
        let Some(instance) = self.nodes.get_mut(node) else {
            return Err(GraphError::UnknownNode(node.to_owned()));
        };
        instance.bind_input(socket, binding);
        Ok(())
    }

    /// Connect an output socket to an input socket, inserting a conversion
    /// node when the types differ and `autoconvert` allows it.
    ///
    /// On any failure the graph and the destination's prior binding are left
    /// untouched. Inserted converters are ordinary instances; code
    /// generation needs no special case for them.
    pub fn add_link<'f, 't>(
        &mut self,
        from_node: &str,
        from_socket: impl Into<SocketKey<'f>>,
        to_node: &str,
        to_socket: impl Into<SocketKey<'t>>,
        autoconvert: bool,
    ) -> Result<(), GraphError> {
        self.ensure_build()?;
        let from_socket = from_socket.into();
        let to_socket = to_socket.into();

        let registry = Arc::clone(&self.registry);
        let Some(from_type) = self.node_type(from_node) else {
            return Err(GraphError::UnknownNode(from_node.to_owned()));
        };
        let Some(from_decl) = from_type.find_output(from_socket) else {
            return Err(GraphError::UnknownSocket {
                node: from_node.to_owned(),
                socket: from_socket.to_string(),
            });
        };
        let Some(to_type) = self.node_type(to_node) else {
            return Err(GraphError::UnknownNode(to_node.to_owned()));
        };
        let Some(to_decl) = to_type.find_input(to_socket) else {
            return Err(GraphError::UnknownSocket {
                node: to_node.to_owned(),
                socket: to_socket.to_string(),
            });
        };

        let from_td = from_decl.type_desc;
        let to_td = to_decl.type_desc;
        let to_socket_name = to_decl.name.clone();
        let mut source = SocketRef::new(from_node, from_decl.name.clone());

        if from_td != to_td {
            if !autoconvert {
                return Err(GraphError::TypeMismatch {
                    from: from_td,
                    to: to_td,
                });
            }
            let Some(conv_type_name) = converter_type_name(from_td, to_td) else {
                return Err(GraphError::ConverterUnavailable {
                    from: from_td,
                    to: to_td,
                });
            };
            let Some(conv_type) = registry.find_node_type(conv_type_name) else {
                return Err(GraphError::ConverterUnavailable {
                    from: from_td,
                    to: to_td,
                });
            };
            // converter types declare a single input and output socket
            let (Some(conv_in), Some(conv_out)) =
                (conv_type.find_input(0usize), conv_type.find_output(0usize))
            else {
                return Err(GraphError::ConverterUnavailable {
                    from: from_td,
                    to: to_td,
                });
            };
            let conv_in = conv_in.name.clone();
            let conv_out = conv_out.name.clone();

            // all checks passed; mutation starts here
            let conv_node = self.add_node(conv_type_name, None)?;
            tracing::debug!(
                converter = conv_type_name,
                node = %conv_node,
                source = %source,
                "inserted conversion node"
            );
            self.bind(&conv_node, conv_in, InputBinding::Link(source))?;
            source = SocketRef::new(conv_node, conv_out);
        }

        self.bind(to_node, to_socket_name, InputBinding::Link(source))
    }

    pub(crate) fn nodes_mut(&mut self) -> &mut IndexMap<String, NodeInstance> {
        &mut self.nodes
    }

    pub(crate) fn outputs_mut(&mut self) -> &mut Vec<GraphOutput> {
        &mut self.outputs
    }

    pub(crate) fn set_state(&mut self, state: GraphState) {
        self.state = state;
    }
}
