//! Values written into and read out of a tree.

use crate::node::NodeType;

/// A scalar accepted by assignment.
///
/// Integer types narrower than 32 bits widen losslessly; wider integers are
/// truncated to `i32` and `f32` widens to `f64`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar<'a> {
    Null,
    Bool(bool),
    Int(i32),
    Double(f64),
    Str(&'a [u8]),
}

impl From<()> for Scalar<'_> {
    fn from(_: ()) -> Self {
        Scalar::Null
    }
}

impl From<bool> for Scalar<'_> {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

macro_rules! scalar_from_int {
    ($($t:ty),*) => {$(
        impl From<$t> for Scalar<'_> {
            fn from(value: $t) -> Self {
                Scalar::Int(value as i32)
            }
        }
    )*};
}

scalar_from_int!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl From<f32> for Scalar<'_> {
    fn from(value: f32) -> Self {
        Scalar::Double(value as f64)
    }
}

impl From<f64> for Scalar<'_> {
    fn from(value: f64) -> Self {
        Scalar::Double(value)
    }
}

impl<'a> From<&'a str> for Scalar<'a> {
    fn from(value: &'a str) -> Self {
        Scalar::Str(value.as_bytes())
    }
}

impl<'a> From<&'a String> for Scalar<'a> {
    fn from(value: &'a String) -> Self {
        Scalar::Str(value.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for Scalar<'a> {
    fn from(value: &'a [u8]) -> Self {
        Scalar::Str(value)
    }
}

impl<'a, T: Into<Scalar<'a>>> From<Option<T>> for Scalar<'a> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Scalar::Null, Into::into)
    }
}

/// Read view of a resolved node. Containers carry no payload; walk them with
/// [`Tree::children`](crate::Tree::children).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value<'t> {
    Null,
    Bool(bool),
    Int(i32),
    Double(f64),
    Str(&'t [u8]),
    Object,
    Array,
}

impl Value<'_> {
    pub fn node_type(&self) -> NodeType {
        match self {
            Value::Null => NodeType::Null,
            Value::Bool(_) => NodeType::Bool,
            Value::Int(_) => NodeType::Int,
            Value::Double(_) => NodeType::Double,
            Value::Str(_) => NodeType::String,
            Value::Object => NodeType::Object,
            Value::Array => NodeType::Array,
        }
    }
}

/// Conversion applied by [`Tree::get`](crate::Tree::get).
///
/// Returning `None` makes the read fall back to the caller's default.
/// Numbers interconvert with `as` semantics, booleans read as `0`/`1`, and
/// `bool` accepts numbers (non-zero) and strings (non-empty).
pub trait FromValue: Sized {
    fn from_value(value: Value<'_>) -> Option<Self>;
}

impl FromValue for bool {
    fn from_value(value: Value<'_>) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(b),
            Value::Int(n) => Some(n != 0),
            Value::Double(n) => Some(n != 0.0),
            Value::Str(s) => Some(!s.is_empty()),
            Value::Null | Value::Object | Value::Array => None,
        }
    }
}

macro_rules! from_value_numeric {
    ($($t:ty),*) => {$(
        impl FromValue for $t {
            fn from_value(value: Value<'_>) -> Option<Self> {
                match value {
                    Value::Bool(b) => Some(b as u8 as $t),
                    Value::Int(n) => Some(n as $t),
                    Value::Double(n) => Some(n as $t),
                    _ => None,
                }
            }
        }
    )*};
}

from_value_numeric!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl FromValue for String {
    fn from_value(value: Value<'_>) -> Option<Self> {
        match value {
            Value::Str(s) => std::str::from_utf8(s).ok().map(str::to_owned),
            _ => None,
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: Value<'_>) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s.to_vec()),
            _ => None,
        }
    }
}
