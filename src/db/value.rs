//! Portable values and the codec that produces them from driver fields.
//!
//! Every backend column type maps onto exactly one `Value` variant. The
//! mapping is an exhaustive match over `TypeTag`; a tag outside the portable
//! set surfaces as `DbError::UnsupportedType`.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use super::backend::{RawField, TypeTag};
use super::DbError;

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    String(String),
    Null,
}

impl Value {
    /// Extract as &str if the value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Extract as i64 if the value is an integer that fits.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(i) => Some(i64::from(*i)),
            Value::UInt32(u) => Some(i64::from(*u)),
            Value::Int64(i) => Some(*i),
            Value::UInt64(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    /// Extract as u64 if the value is a non-negative integer.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Int32(i) => u64::try_from(*i).ok(),
            Value::UInt32(u) => Some(u64::from(*u)),
            Value::Int64(i) => u64::try_from(*i).ok(),
            Value::UInt64(u) => Some(*u),
            _ => None,
        }
    }

    /// Extract as f64 if the value is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(f) => Some(f64::from(*f)),
            Value::Float64(f) => Some(*f),
            Value::Int32(i) => Some(f64::from(*i)),
            Value::UInt32(u) => Some(f64::from(*u)),
            Value::Int64(i) => Some(*i as f64),
            Value::UInt64(u) => Some(*u as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get type name for debugging/error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int32(_) => "int32",
            Value::UInt32(_) => "uint32",
            Value::Int64(_) => "int64",
            Value::UInt64(_) => "uint64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::String(_) => "string",
            Value::Null => "null",
        }
    }

    pub fn as_i64_or(&self, default: i64) -> i64 {
        self.as_i64().unwrap_or(default)
    }

    pub fn as_string_or(&self, default: &str) -> String {
        self.as_str().unwrap_or(default).to_string()
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int32(v) => write!(f, "{}", v),
            Value::UInt32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::String(v) => f.write_str(v),
            Value::Null => f.write_str("NULL"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int64(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float64(f)
    }
}

fn parse<T: FromStr>(data: &str, tag: &TypeTag) -> Result<T, DbError> {
    data.trim().parse().map_err(|_| DbError::InvalidValue {
        type_name: tag.name().to_string(),
        data: data.to_string(),
    })
}

/// Decode one driver field into its portable value.
///
/// SQL NULL decodes to `Value::Null` whatever the column type.
pub fn decode(field: &RawField) -> Result<Value, DbError> {
    match (&field.tag, field.data.as_deref()) {
        (TypeTag::Other(name), _) => Err(DbError::UnsupportedType {
            type_name: name.clone(),
        }),
        (TypeTag::Null, _) | (_, None) => Ok(Value::Null),
        (TypeTag::Int32, Some(data)) => parse(data, &field.tag).map(Value::Int32),
        (TypeTag::UInt32, Some(data)) => parse(data, &field.tag).map(Value::UInt32),
        (TypeTag::Int64, Some(data)) => parse(data, &field.tag).map(Value::Int64),
        (TypeTag::UInt64, Some(data)) => parse(data, &field.tag).map(Value::UInt64),
        (TypeTag::Float32, Some(data)) => parse(data, &field.tag).map(Value::Float32),
        (TypeTag::Float64, Some(data)) => parse(data, &field.tag).map(Value::Float64),
        (TypeTag::Text, Some(data)) => Ok(Value::String(data.to_string())),
    }
}
