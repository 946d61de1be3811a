// SPDX-License-Identifier: MIT OR Apache-2.0
//! Node graph intermediate representation for the `nodevm` bytecode compiler.
//!
//! This crate sits between a node editor frontend and the bytecode backend.
//! It models a directed dataflow graph of typed operations and reduces it to
//! the minimal, connected, type-consistent form the instruction emitter
//! consumes:
//! - Typed input/output sockets with per-type default values
//! - Automatic conversion nodes inserted at link time
//! - Incremental construction with local validation (speculative wiring
//!   fails gracefully, it never faults)
//! - A one-shot finalize pipeline: pass-node elision and dead-node pruning
//! - Text and Graphviz dumps for debugging
//!
//! ## Architecture
//!
//! Node types live in a [`NodeRegistry`] built once per compilation session
//! and shared with every [`NodeGraph`] through an `Arc`. Graphs own their
//! [`NodeInstance`]s and address them by graph-unique name; each instance
//! input carries at most one [`InputBinding`] (constant, link, or external
//! input). [`NodeGraph::finalize`] rewrites the graph in place and freezes
//! it for code generation.

pub mod catalog;
pub mod dump;
pub mod finalize;
pub mod graph;
pub mod node;
pub mod registry;
pub mod socket;
pub mod value;

pub use catalog::CatalogError;
pub use finalize::FinalizeError;
pub use graph::{GraphError, GraphInput, GraphOutput, GraphState, NodeGraph};
pub use node::{InputBinding, NodeInstance, NodeType, NodeTypeError, SocketRef};
pub use registry::{NodeRegistry, RegistryError};
pub use socket::{NodeSocket, SocketCategory, SocketKey};
pub use value::{TypeDesc, Value};
