// SPDX-License-Identifier: MIT OR Apache-2.0
//! Socket declarations for node inputs/outputs.

use crate::value::{TypeDesc, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a socket's value behaves during code generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SocketCategory {
    /// Resolved to a constant at compile time
    Constant,
    /// Evaluated once per invocation
    Variable,
    /// Re-evaluated on every use (deferred expression)
    Function,
}

/// A named, typed input or output slot declared on a node type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSocket {
    /// Socket name, unique within its owning input or output list
    pub name: String,
    /// Type of values accepted or produced
    pub type_desc: TypeDesc,
    /// Value used when an input is left unbound
    pub default_value: Value,
    /// Value category
    pub category: SocketCategory,
}

impl NodeSocket {
    /// Create a new socket declaration.
    pub fn new(
        name: impl Into<String>,
        type_desc: TypeDesc,
        default_value: Value,
        category: SocketCategory,
    ) -> Self {
        Self {
            name: name.into(),
            type_desc,
            default_value,
            category,
        }
    }
}

/// Unified key for addressing a socket within one declaration list.
///
/// Accepted anywhere a socket is looked up, via `impl Into<SocketKey>`:
/// a name, a positional index, or a previously resolved socket reference
/// (identity fast path, no second traversal by name).
#[derive(Debug, Clone, Copy)]
pub enum SocketKey<'a> {
    /// Address by socket name
    Name(&'a str),
    /// Address by position in the declaration list
    Index(usize),
    /// An already-resolved socket, matched by identity
    Resolved(&'a NodeSocket),
}

impl SocketKey<'_> {
    /// Resolve this key against a socket declaration list.
    pub(crate) fn resolve_in<'s>(&self, sockets: &'s [NodeSocket]) -> Option<&'s NodeSocket> {
        match self {
            Self::Name(name) => sockets.iter().find(|s| s.name == *name),
            Self::Index(index) => sockets.get(*index),
            Self::Resolved(socket) => sockets
                .iter()
                .find(|s| std::ptr::eq::<NodeSocket>(*s, *socket)),
        }
    }
}

impl fmt::Display for SocketKey<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name}"),
            Self::Index(index) => write!(f, "#{index}"),
            Self::Resolved(socket) => write!(f, "{}", socket.name),
        }
    }
}

impl<'a> From<&'a str> for SocketKey<'a> {
    fn from(name: &'a str) -> Self {
        Self::Name(name)
    }
}

impl From<usize> for SocketKey<'_> {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl<'a> From<&'a NodeSocket> for SocketKey<'a> {
    fn from(socket: &'a NodeSocket) -> Self {
        Self::Resolved(socket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sockets() -> Vec<NodeSocket> {
        vec![
            NodeSocket::new(
                "a",
                TypeDesc::Float,
                Value::Float(0.0),
                SocketCategory::Variable,
            ),
            NodeSocket::new(
                "b",
                TypeDesc::Int,
                Value::Int(0),
                SocketCategory::Constant,
            ),
        ]
    }

    #[test]
    fn test_resolve_by_name() {
        let list = sockets();
        assert_eq!(SocketKey::from("b").resolve_in(&list).map(|s| &*s.name), Some("b"));
        assert!(SocketKey::from("missing").resolve_in(&list).is_none());
    }

    #[test]
    fn test_resolve_by_index() {
        let list = sockets();
        assert_eq!(SocketKey::from(0).resolve_in(&list).map(|s| &*s.name), Some("a"));
        assert!(SocketKey::from(2).resolve_in(&list).is_none());
    }

    #[test]
    fn test_resolve_by_identity() {
        let list = sockets();
        let second = &list[1];
        let resolved = SocketKey::from(second).resolve_in(&list);
        assert!(resolved.is_some_and(|s| std::ptr::eq(s, second)));

        // a socket from a different list does not match by identity
        let other = sockets();
        assert!(SocketKey::from(&other[1]).resolve_in(&list).is_none());
    }
}
