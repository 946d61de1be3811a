// SPDX-License-Identifier: MIT OR Apache-2.0
//! Registry of available node types.
//!
//! The registry is an explicit session object rather than process-global
//! state: it is populated once, wrapped in an [`std::sync::Arc`], and handed
//! to every graph built during the session. Sharing the `Arc` freezes the
//! type table for as long as any graph holds it, so a type can never be
//! removed out from under a live instance.

use crate::node::NodeType;
use indexmap::IndexMap;

/// Error raised by node type registration.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// A type with this name is already registered. Re-registration is
    /// rejected loudly, never silently merged or replaced.
    #[error("node type already registered: {0}")]
    DuplicateNodeType(String),
}

/// Catalog of registered node types, in registration order.
pub struct NodeRegistry {
    types: IndexMap<String, NodeType>,
}

impl NodeRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            types: IndexMap::new(),
        }
    }

    /// Insert a new empty node type and return it for socket declaration.
    pub fn add_node_type(&mut self, name: &str) -> Result<&mut NodeType, RegistryError> {
        if self.types.contains_key(name) {
            return Err(RegistryError::DuplicateNodeType(name.to_owned()));
        }
        Ok(self
            .types
            .entry(name.to_owned())
            .or_insert_with(|| NodeType::new(name)))
    }

    /// Register a fully declared node type.
    pub fn register(&mut self, node_type: NodeType) -> Result<(), RegistryError> {
        if self.types.contains_key(&node_type.name) {
            return Err(RegistryError::DuplicateNodeType(node_type.name));
        }
        self.types.insert(node_type.name.clone(), node_type);
        Ok(())
    }

    /// Look up a node type by name. Never faults on a miss.
    pub fn find_node_type(&self, name: &str) -> Option<&NodeType> {
        self.types.get(name)
    }

    /// Remove a node type, returning it if it was registered.
    ///
    /// Must not be called while any graph holds instances of the type;
    /// sharing the registry through an `Arc` enforces this statically.
    pub fn remove_node_type(&mut self, name: &str) -> Option<NodeType> {
        self.types.shift_remove(name)
    }

    /// All registered types, in registration order.
    pub fn types(&self) -> impl Iterator<Item = &NodeType> {
        self.types.values()
    }

    /// Number of registered types.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::socket::SocketCategory;
    use crate::value::TypeDesc;

    #[test]
    fn test_find_returns_registered_type() {
        let mut registry = NodeRegistry::new();
        registry.add_node_type("noise").unwrap();
        assert!(registry.find_node_type("noise").is_some());
        assert!(registry.find_node_type("missing").is_none());
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = NodeRegistry::new();
        let ty = registry.add_node_type("mix").unwrap();
        ty.add_input("fac", TypeDesc::Float, 0.5, SocketCategory::Variable)
            .unwrap();

        let err = registry.add_node_type("mix").unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateNodeType(name) if name == "mix"));

        // the original definition is untouched
        let kept = registry.find_node_type("mix").unwrap();
        assert_eq!(kept.inputs().len(), 1);

        let err = registry.register(NodeType::new("mix")).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateNodeType(_)));
    }

    #[test]
    fn test_remove_node_type() {
        let mut registry = NodeRegistry::new();
        registry.add_node_type("temp").unwrap();
        assert!(registry.remove_node_type("temp").is_some());
        assert!(registry.find_node_type("temp").is_none());
        assert!(registry.remove_node_type("temp").is_none());
    }
}
