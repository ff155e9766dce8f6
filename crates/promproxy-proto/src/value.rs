//! Wire value types for the command protocol.

use std::fmt;

/// A single wire-level value.
///
/// This is the unit the codec produces and consumes: commands arrive as an
/// [`Value::Array`] whose first element is a one-byte command tag, and every
/// reply is a single value. The tree is immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// CRLF-free text, wire tag `+`.
    Simple(String),
    /// Binary-safe length-prefixed string, wire tag `$`.
    Bulk(Vec<u8>),
    /// Signed 64-bit integer, wire tag `:`.
    Int(i64),
    /// Error message, wire tag `-`.
    Error(String),
    /// Null, encoded as the null bulk form `$-1`.
    Null,
    /// Ordered sequence of values, wire tag `*`.
    Array(Vec<Value>),
}

impl Value {
    /// Create a simple string value.
    pub fn simple(s: impl Into<String>) -> Self {
        Value::Simple(s.into())
    }

    /// Create a bulk string value.
    pub fn bulk(b: impl Into<Vec<u8>>) -> Self {
        Value::Bulk(b.into())
    }

    /// Create an error value from anything displayable.
    pub fn error(e: impl fmt::Display) -> Self {
        Value::Error(e.to_string())
    }

    /// Create an array value.
    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(items)
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// View the raw bytes of a string-like value.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Simple(s) => Some(s.as_bytes()),
            Value::Bulk(b) => Some(b),
            _ => None,
        }
    }

    /// View a string-like value as UTF-8 text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Simple(s) => Some(s),
            Value::Bulk(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Coerce to an integer: native integers directly, string-like values
    /// by parsing their decimal text.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => self.as_str()?.parse().ok(),
        }
    }

    /// Coerce to a float: native integers widen, string-like values parse.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            _ => self.as_str()?.parse().ok(),
        }
    }

    /// View an array value's elements.
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }
}
