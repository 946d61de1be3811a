// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed constants and the type descriptors attached to sockets.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Describes the type of a value flowing through a socket.
///
/// Equality between two descriptors decides whether a direct link needs no
/// conversion node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeDesc {
    /// Scalar float
    Float,
    /// Integer
    Int,
    /// 3-component float vector
    Float3,
    /// 4-component float vector
    Float4,
    /// 4x4 float matrix
    Matrix44,
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Float => "float",
            Self::Int => "int",
            Self::Float3 => "float3",
            Self::Float4 => "float4",
            Self::Matrix44 => "matrix44",
        };
        f.write_str(name)
    }
}

/// Identity matrix used as the default for matrix sockets.
const MATRIX44_IDENTITY: [[f32; 4]; 4] = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// An immutable typed constant.
///
/// Values are exclusively owned by the binding site holding them and are
/// deep-cloned when they move between sites, never aliased.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// Scalar float
    Float(f32),
    /// Integer
    Int(i32),
    /// 3-component float vector
    Float3([f32; 3]),
    /// 4-component float vector
    Float4([f32; 4]),
    /// 4x4 float matrix, row-major
    Matrix44([[f32; 4]; 4]),
}

impl Value {
    /// Build a typed constant from an untyped literal.
    ///
    /// Returns `None` when the literal cannot represent the requested type.
    /// Integer literals widen to [`TypeDesc::Float`]; no other coercion is
    /// performed.
    pub fn create(type_desc: TypeDesc, literal: impl Into<Value>) -> Option<Value> {
        let value = literal.into();
        match (type_desc, value) {
            (TypeDesc::Float, v @ Value::Float(_)) => Some(v),
            (TypeDesc::Float, Value::Int(i)) => Some(Value::Float(i as f32)),
            (TypeDesc::Int, v @ Value::Int(_)) => Some(v),
            (TypeDesc::Float3, v @ Value::Float3(_)) => Some(v),
            (TypeDesc::Float4, v @ Value::Float4(_)) => Some(v),
            (TypeDesc::Matrix44, v @ Value::Matrix44(_)) => Some(v),
            _ => None,
        }
    }

    /// The zero (identity, for matrices) value of a type.
    pub fn default_for(type_desc: TypeDesc) -> Value {
        match type_desc {
            TypeDesc::Float => Value::Float(0.0),
            TypeDesc::Int => Value::Int(0),
            TypeDesc::Float3 => Value::Float3([0.0; 3]),
            TypeDesc::Float4 => Value::Float4([0.0; 4]),
            TypeDesc::Matrix44 => Value::Matrix44(MATRIX44_IDENTITY),
        }
    }

    /// The type descriptor this value satisfies.
    pub fn type_desc(&self) -> TypeDesc {
        match self {
            Self::Float(_) => TypeDesc::Float,
            Self::Int(_) => TypeDesc::Int,
            Self::Float3(_) => TypeDesc::Float3,
            Self::Float4(_) => TypeDesc::Float4,
            Self::Matrix44(_) => TypeDesc::Matrix44,
        }
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<[f32; 3]> for Value {
    fn from(v: [f32; 3]) -> Self {
        Self::Float3(v)
    }
}

impl From<[f32; 4]> for Value {
    fn from(v: [f32; 4]) -> Self {
        Self::Float4(v)
    }
}

impl From<[[f32; 4]; 4]> for Value {
    fn from(v: [[f32; 4]; 4]) -> Self {
        Self::Matrix44(v)
    }
}

// f64 literals narrow to the f32 storage used throughout the VM.

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v as f32)
    }
}

impl From<[f64; 3]> for Value {
    fn from(v: [f64; 3]) -> Self {
        Self::Float3(v.map(|x| x as f32))
    }
}

impl From<[f64; 4]> for Value {
    fn from(v: [f64; 4]) -> Self {
        Self::Float4(v.map(|x| x as f32))
    }
}

impl From<[[f64; 4]; 4]> for Value {
    fn from(v: [[f64; 4]; 4]) -> Self {
        Self::Matrix44(v.map(|row| row.map(|x| x as f32)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_matching_literal() {
        assert_eq!(Value::create(TypeDesc::Float, 1.5), Some(Value::Float(1.5)));
        assert_eq!(Value::create(TypeDesc::Int, 7), Some(Value::Int(7)));
        assert_eq!(
            Value::create(TypeDesc::Float3, [1.0, 2.0, 3.0]),
            Some(Value::Float3([1.0, 2.0, 3.0]))
        );
    }

    #[test]
    fn test_create_widens_int_to_float() {
        assert_eq!(Value::create(TypeDesc::Float, 3), Some(Value::Float(3.0)));
    }

    #[test]
    fn test_create_rejects_unrepresentable_literal() {
        assert_eq!(Value::create(TypeDesc::Int, 1.5), None);
        assert_eq!(Value::create(TypeDesc::Float3, 1.0), None);
        assert_eq!(Value::create(TypeDesc::Matrix44, [0.0; 4]), None);
    }

    #[test]
    fn test_default_matches_type() {
        for td in [
            TypeDesc::Float,
            TypeDesc::Int,
            TypeDesc::Float3,
            TypeDesc::Float4,
            TypeDesc::Matrix44,
        ] {
            assert_eq!(Value::default_for(td).type_desc(), td);
        }
    }
}
