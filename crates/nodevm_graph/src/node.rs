// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node type declarations and materialized node instances.

use crate::socket::{NodeSocket, SocketCategory, SocketKey};
use crate::value::{TypeDesc, Value};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error raised while declaring sockets on a node type.
#[derive(Debug, thiserror::Error)]
pub enum NodeTypeError {
    /// A socket with the same name already exists in the list
    #[error("duplicate socket name: {0}")]
    DuplicateSocket(String),

    /// The default literal cannot represent the socket type
    #[error("default literal does not fit socket type {0}")]
    LiteralMismatch(TypeDesc),
}

/// Reusable declaration of a computation kind: its name and the ordered
/// input/output socket shapes shared by every instance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeType {
    /// Globally unique type name
    pub name: String,
    /// Pass nodes are structural identities elided during finalize
    pub is_pass: bool,
    inputs: Vec<NodeSocket>,
    outputs: Vec<NodeSocket>,
}

impl NodeType {
    /// Create an empty node type.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_pass: false,
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    /// Declare an input socket. The default literal must fit the socket type.
    pub fn add_input(
        &mut self,
        name: impl Into<String>,
        type_desc: TypeDesc,
        default_value: impl Into<Value>,
        category: SocketCategory,
    ) -> Result<&NodeSocket, NodeTypeError> {
        let name = name.into();
        if self.find_input(name.as_str()).is_some() {
            return Err(NodeTypeError::DuplicateSocket(name));
        }
        let default_value = Value::create(type_desc, default_value)
            .ok_or(NodeTypeError::LiteralMismatch(type_desc))?;
        let index = self.inputs.len();
        self.inputs
            .push(NodeSocket::new(name, type_desc, default_value, category));
        Ok(&self.inputs[index])
    }

    /// Declare an output socket.
    pub fn add_output(
        &mut self,
        name: impl Into<String>,
        type_desc: TypeDesc,
        default_value: impl Into<Value>,
    ) -> Result<&NodeSocket, NodeTypeError> {
        let name = name.into();
        if self.find_output(name.as_str()).is_some() {
            return Err(NodeTypeError::DuplicateSocket(name));
        }
        let default_value = Value::create(type_desc, default_value)
            .ok_or(NodeTypeError::LiteralMismatch(type_desc))?;
        let index = self.outputs.len();
        self.outputs.push(NodeSocket::new(
            name,
            type_desc,
            default_value,
            SocketCategory::Variable,
        ));
        Ok(&self.outputs[index])
    }

    /// Look up an input socket by name, index, or resolved reference.
    pub fn find_input<'a>(&self, key: impl Into<SocketKey<'a>>) -> Option<&NodeSocket> {
        key.into().resolve_in(&self.inputs)
    }

    /// Look up an output socket by name, index, or resolved reference.
    pub fn find_output<'a>(&self, key: impl Into<SocketKey<'a>>) -> Option<&NodeSocket> {
        key.into().resolve_in(&self.outputs)
    }

    /// Ordered input socket declarations.
    pub fn inputs(&self) -> &[NodeSocket] {
        &self.inputs
    }

    /// Ordered output socket declarations.
    pub fn outputs(&self) -> &[NodeSocket] {
        &self.outputs
    }
}

/// Reference to one output socket of a named node instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketRef {
    /// Producing instance name (unique within its graph)
    pub node: String,
    /// Output socket name on the producing instance
    pub socket: String,
}

impl SocketRef {
    /// Create a reference to `node.socket`.
    pub fn new(node: impl Into<String>, socket: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            socket: socket.into(),
        }
    }
}

impl fmt::Display for SocketRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.node, self.socket)
    }
}

/// The source bound to one input slot of an instance.
///
/// Exactly one kind is active per slot; rebinding silently replaces the
/// previous kind. An input with no binding falls back to the socket default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputBinding {
    /// Fed by a named graph input
    Extern(String),
    /// Fed by another instance's output socket
    Link(SocketRef),
    /// Fed by an owned constant
    Constant(Value),
}

/// One concrete occurrence of a [`NodeType`] in a graph.
///
/// Instances are owned by their graph and addressed by a name unique within
/// it. Input bindings and output value placeholders are stored sparsely;
/// sockets without an entry use their declared defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeInstance {
    name: String,
    type_name: String,
    inputs: IndexMap<String, InputBinding>,
    outputs: IndexMap<String, Value>,
}

impl NodeInstance {
    /// Materialize an instance of `node_type` under `name`.
    pub(crate) fn new(node_type: &NodeType, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: node_type.name.clone(),
            inputs: IndexMap::new(),
            outputs: IndexMap::new(),
        }
    }

    /// Instance name, unique within the owning graph.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the node type this instance is bound to.
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// The binding currently attached to an input socket, if any.
    pub fn input_binding(&self, socket: &str) -> Option<&InputBinding> {
        self.inputs.get(socket)
    }

    /// All explicit input bindings, in binding order.
    pub fn input_bindings(&self) -> impl Iterator<Item = (&str, &InputBinding)> {
        self.inputs.iter().map(|(name, b)| (name.as_str(), b))
    }

    /// The producing socket an input is linked to, if link-bound.
    pub fn find_input_link(&self, socket: &str) -> Option<&SocketRef> {
        match self.inputs.get(socket) {
            Some(InputBinding::Link(link)) => Some(link),
            _ => None,
        }
    }

    /// The graph input an input socket is bound to, if extern-bound.
    pub fn find_input_extern(&self, socket: &str) -> Option<&str> {
        match self.inputs.get(socket) {
            Some(InputBinding::Extern(input)) => Some(input.as_str()),
            _ => None,
        }
    }

    /// The constant bound to an input socket, if value-bound.
    pub fn find_input_value(&self, socket: &str) -> Option<&Value> {
        match self.inputs.get(socket) {
            Some(InputBinding::Constant(value)) => Some(value),
            _ => None,
        }
    }

    /// Whether an input socket is link-bound.
    pub fn has_input_link(&self, socket: &str) -> bool {
        self.find_input_link(socket).is_some()
    }

    /// Whether an input socket is bound to a graph input.
    pub fn has_input_extern(&self, socket: &str) -> bool {
        self.find_input_extern(socket).is_some()
    }

    /// Whether an input socket is bound to a constant.
    pub fn has_input_value(&self, socket: &str) -> bool {
        self.find_input_value(socket).is_some()
    }

    /// The value placeholder stored for an output socket, if set.
    pub fn find_output_value(&self, socket: &str) -> Option<&Value> {
        self.outputs.get(socket)
    }

    /// Attach a binding to an input socket, replacing any previous kind.
    pub(crate) fn bind_input(&mut self, socket: impl Into<String>, binding: InputBinding) {
        self.inputs.insert(socket.into(), binding);
    }

    /// Store a value placeholder on an output socket.
    pub(crate) fn bind_output_value(&mut self, socket: impl Into<String>, value: Value) {
        self.outputs.insert(socket.into(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn math_type() -> NodeType {
        let mut ty = NodeType::new("float_add");
        ty.add_input("a", TypeDesc::Float, 0.0, SocketCategory::Variable)
            .unwrap();
        ty.add_input("b", TypeDesc::Float, 0.0, SocketCategory::Variable)
            .unwrap();
        ty.add_output("value", TypeDesc::Float, 0.0).unwrap();
        ty
    }

    #[test]
    fn test_find_socket_by_name_and_index() {
        let ty = math_type();
        assert_eq!(ty.find_input("b").map(|s| &*s.name), Some("b"));
        assert_eq!(ty.find_input(1).map(|s| &*s.name), Some("b"));
        assert_eq!(ty.find_output("value").map(|s| s.type_desc), Some(TypeDesc::Float));
        assert!(ty.find_input("value").is_none());
        assert!(ty.find_output("a").is_none());
        assert!(ty.find_input(5).is_none());
    }

    #[test]
    fn test_find_socket_resolved_fast_path() {
        let ty = math_type();
        let socket = ty.find_input("a").unwrap();
        let again = ty.find_input(socket).unwrap();
        assert!(std::ptr::eq(socket, again));
    }

    #[test]
    fn test_duplicate_socket_rejected() {
        let mut ty = math_type();
        let err = ty
            .add_input("a", TypeDesc::Float, 0.0, SocketCategory::Variable)
            .unwrap_err();
        assert!(matches!(err, NodeTypeError::DuplicateSocket(name) if name == "a"));
        // the same name is free in the output list
        assert!(ty.add_output("a", TypeDesc::Float, 0.0).is_ok());
    }

    #[test]
    fn test_bad_default_literal_rejected() {
        let mut ty = NodeType::new("bad");
        let err = ty
            .add_input("v", TypeDesc::Float3, 1.0, SocketCategory::Variable)
            .unwrap_err();
        assert!(matches!(err, NodeTypeError::LiteralMismatch(TypeDesc::Float3)));
    }

    #[test]
    fn test_binding_kinds_are_mutually_exclusive() {
        let ty = math_type();
        let mut node = NodeInstance::new(&ty, "add_001");

        node.bind_input("a", InputBinding::Constant(Value::Float(1.0)));
        assert!(node.has_input_value("a"));

        node.bind_input("a", InputBinding::Link(SocketRef::new("other", "value")));
        assert!(node.has_input_link("a"));
        assert!(!node.has_input_value("a"));

        node.bind_input("a", InputBinding::Extern("param".to_string()));
        assert!(node.has_input_extern("a"));
        assert!(!node.has_input_link("a"));
    }
}
