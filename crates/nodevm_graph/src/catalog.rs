// SPDX-License-Identifier: MIT OR Apache-2.0
//! Built-in node type catalog.
//!
//! Registers the node types the graph core itself relies on: conversion
//! nodes targeted by [`NodeGraph::add_link`](crate::graph::NodeGraph::add_link)
//! and the per-type pass (structural identity) nodes, plus a small set of
//! constant and arithmetic types. Domain catalogs (shader, particle node
//! sets) are configuration data layered on the same registration API.

use crate::node::NodeTypeError;
use crate::registry::{NodeRegistry, RegistryError};
use crate::socket::SocketCategory;
use crate::value::{TypeDesc, Value};

/// Error raised while installing a catalog.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Registration failed
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Socket declaration failed
    #[error(transparent)]
    NodeType(#[from] NodeTypeError),
}

/// Converter type name for a (source, target) pair, dispatched on the
/// source type. `None` when no conversion path exists.
pub(crate) fn converter_type_name(from: TypeDesc, to: TypeDesc) -> Option<&'static str> {
    match (from, to) {
        (TypeDesc::Float, TypeDesc::Int) => Some("float_to_int"),
        (TypeDesc::Float, TypeDesc::Float3) => Some("float_to_float3"),
        (TypeDesc::Float, TypeDesc::Float4) => Some("float_to_float4"),
        (TypeDesc::Int, TypeDesc::Float) => Some("int_to_float"),
        (TypeDesc::Float3, TypeDesc::Float4) => Some("float3_to_float4"),
        (TypeDesc::Float4, TypeDesc::Float3) => Some("float4_to_float3"),
        _ => None,
    }
}

fn register_converter(
    registry: &mut NodeRegistry,
    name: &str,
    from: TypeDesc,
    to: TypeDesc,
) -> Result<(), CatalogError> {
    let ty = registry.add_node_type(name)?;
    ty.add_input("value", from, Value::default_for(from), SocketCategory::Variable)?;
    ty.add_output("value", to, Value::default_for(to))?;
    Ok(())
}

/// Install the conversion node types targeted by automatic link conversion.
pub fn register_conversion_nodes(registry: &mut NodeRegistry) -> Result<(), CatalogError> {
    register_converter(registry, "float_to_int", TypeDesc::Float, TypeDesc::Int)?;
    register_converter(registry, "float_to_float3", TypeDesc::Float, TypeDesc::Float3)?;
    register_converter(registry, "float_to_float4", TypeDesc::Float, TypeDesc::Float4)?;
    register_converter(registry, "int_to_float", TypeDesc::Int, TypeDesc::Float)?;
    register_converter(registry, "float3_to_float4", TypeDesc::Float3, TypeDesc::Float4)?;
    register_converter(registry, "float4_to_float3", TypeDesc::Float4, TypeDesc::Float3)?;
    Ok(())
}

/// Install the per-type pass nodes used by upstream tooling as structural
/// identities. All of them are elided during finalize.
pub fn register_pass_nodes(registry: &mut NodeRegistry) -> Result<(), CatalogError> {
    for (name, td) in [
        ("pass_float", TypeDesc::Float),
        ("pass_int", TypeDesc::Int),
        ("pass_float3", TypeDesc::Float3),
        ("pass_float4", TypeDesc::Float4),
        ("pass_matrix44", TypeDesc::Matrix44),
    ] {
        let ty = registry.add_node_type(name)?;
        ty.is_pass = true;
        ty.add_input("value", td, Value::default_for(td), SocketCategory::Variable)?;
        ty.add_output("value", td, Value::default_for(td))?;
    }
    Ok(())
}

/// Install constant and basic arithmetic node types.
pub fn register_basic_nodes(registry: &mut NodeRegistry) -> Result<(), CatalogError> {
    for (name, td) in [
        ("float_value", TypeDesc::Float),
        ("int_value", TypeDesc::Int),
        ("float3_value", TypeDesc::Float3),
        ("float4_value", TypeDesc::Float4),
        ("matrix44_value", TypeDesc::Matrix44),
    ] {
        let ty = registry.add_node_type(name)?;
        ty.add_output("value", td, Value::default_for(td))?;
    }

    for name in ["float_add", "float_sub", "float_mul", "float_div"] {
        let ty = registry.add_node_type(name)?;
        ty.add_input("a", TypeDesc::Float, 0.0, SocketCategory::Variable)?;
        ty.add_input("b", TypeDesc::Float, 0.0, SocketCategory::Variable)?;
        ty.add_output("value", TypeDesc::Float, 0.0)?;
    }

    let ty = registry.add_node_type("float3_dot")?;
    ty.add_input("a", TypeDesc::Float3, [0.0; 3], SocketCategory::Variable)?;
    ty.add_input("b", TypeDesc::Float3, [0.0; 3], SocketCategory::Variable)?;
    ty.add_output("value", TypeDesc::Float, 0.0)?;

    let ty = registry.add_node_type("float3_combine")?;
    ty.add_input("x", TypeDesc::Float, 0.0, SocketCategory::Variable)?;
    ty.add_input("y", TypeDesc::Float, 0.0, SocketCategory::Variable)?;
    ty.add_input("z", TypeDesc::Float, 0.0, SocketCategory::Variable)?;
    ty.add_output("vector", TypeDesc::Float3, [0.0; 3])?;

    let ty = registry.add_node_type("matrix44_transform")?;
    ty.add_input(
        "matrix",
        TypeDesc::Matrix44,
        Value::default_for(TypeDesc::Matrix44),
        SocketCategory::Variable,
    )?;
    ty.add_input("vector", TypeDesc::Float3, [0.0; 3], SocketCategory::Variable)?;
    ty.add_output("vector", TypeDesc::Float3, [0.0; 3])?;

    Ok(())
}

/// Install every built-in node type.
pub fn register_all(registry: &mut NodeRegistry) -> Result<(), CatalogError> {
    register_conversion_nodes(registry)?;
    register_pass_nodes(registry)?;
    register_basic_nodes(registry)?;
    Ok(())
}
