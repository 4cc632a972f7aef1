//! # Value Module
//!
//! Contains the `Value` enum, the dynamic form of one element of a column.
//!
//! ## Purpose
//! Row-oriented code (row ⇄ columnar conversion, filter predicates,
//! aggregate results) deals in `Value`s. A `Row` is one `Value` per
//! top-level field.
//!
//! ## Supports:
//! - every type in [`ArrowType`], with nested lists and structs held recursively
//! - `Value::Null` for an invalid slot of any type
//! - [`FromValue`] / [`IntoValue`] to move between `Value` and plain Rust
//!   types, including `Option<T>` for nullable fields and `Vec<T>` for lists

use std::fmt::{Display, Formatter};

use crate::enums::error::{BridgeError, Result};
use crate::ffi::arrow_dtype::ArrowType;

/// # Value
///
/// One element of any supported type.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Utf8(String),
    List(Vec<Value>),
    /// Field values in schema order
    Struct(Vec<Value>),
}

/// One record: a value per top-level field, in schema order.
pub type Row = Vec<Value>;

impl Value {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Boolean(_) => "Boolean",
            Value::Int8(_) => "Int8",
            Value::Int16(_) => "Int16",
            Value::Int32(_) => "Int32",
            Value::Int64(_) => "Int64",
            Value::UInt8(_) => "UInt8",
            Value::UInt16(_) => "UInt16",
            Value::UInt32(_) => "UInt32",
            Value::UInt64(_) => "UInt64",
            Value::Float32(_) => "Float32",
            Value::Float64(_) => "Float64",
            Value::Utf8(_) => "Utf8",
            Value::List(_) => "List",
            Value::Struct(_) => "Struct",
        }
    }

    /// Numeric value widened to `f64`, for aggregates and comparisons.
    pub fn as_f64(&self) -> Option<f64> {
        Some(match self {
            Value::Int8(v) => *v as f64,
            Value::Int16(v) => *v as f64,
            Value::Int32(v) => *v as f64,
            Value::Int64(v) => *v as f64,
            Value::UInt8(v) => *v as f64,
            Value::UInt16(v) => *v as f64,
            Value::UInt32(v) => *v as f64,
            Value::UInt64(v) => *v as f64,
            Value::Float32(v) => *v as f64,
            Value::Float64(v) => *v,
            _ => return None,
        })
    }

    /// Error for a value that cannot be stored as `dtype`.
    pub(crate) fn type_error(&self, dtype: &ArrowType) -> BridgeError {
        BridgeError::InvalidArgument(format!("cannot store {} value as {dtype}", self.type_name()))
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fn seq(f: &mut Formatter<'_>, open: &str, items: &[Value], close: &str) -> std::fmt::Result {
            f.write_str(open)?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
            f.write_str(close)
        }
        match self {
            Value::Null => f.write_str("null"),
            Value::Boolean(v) => write!(f, "{v}"),
            Value::Int8(v) => write!(f, "{v}"),
            Value::Int16(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::UInt8(v) => write!(f, "{v}"),
            Value::UInt16(v) => write!(f, "{v}"),
            Value::UInt32(v) => write!(f, "{v}"),
            Value::UInt64(v) => write!(f, "{v}"),
            Value::Float32(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Utf8(v) => write!(f, "{v:?}"),
            Value::List(items) => seq(f, "[", items, "]"),
            Value::Struct(items) => seq(f, "{", items, "}"),
        }
    }
}

/// Extraction of a plain Rust value from a [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self>;
}

/// Conversion of a plain Rust value into a [`Value`].
pub trait IntoValue {
    fn into_value(self) -> Value;
}

macro_rules! value_conversions {
    ($t:ty, $variant:ident) => {
        impl From<$t> for Value {
            #[inline]
            fn from(v: $t) -> Self {
                Value::$variant(v)
            }
        }

        impl IntoValue for $t {
            #[inline]
            fn into_value(self) -> Value {
                Value::$variant(self)
            }
        }

        impl FromValue for $t {
            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(BridgeError::InvalidArgument(format!(
                        "expected {}, found {}",
                        stringify!($variant),
                        other.type_name()
                    ))),
                }
            }
        }
    };
}

value_conversions!(bool, Boolean);
value_conversions!(i8, Int8);
value_conversions!(i16, Int16);
value_conversions!(i32, Int32);
value_conversions!(i64, Int64);
value_conversions!(u8, UInt8);
value_conversions!(u16, UInt16);
value_conversions!(u32, UInt32);
value_conversions!(u64, UInt64);
value_conversions!(f32, Float32);
value_conversions!(f64, Float64);
value_conversions!(String, Utf8);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Utf8(v.to_string())
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::Null, IntoValue::into_value)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

impl<T: IntoValue> IntoValue for Vec<T> {
    fn into_value(self) -> Value {
        Value::List(self.into_iter().map(IntoValue::into_value).collect())
    }
}

impl<T: FromValue> FromValue for Vec<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(BridgeError::InvalidArgument(format!(
                "expected List, found {}",
                other.type_name()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_conversions() {
        assert_eq!(Value::from(3i64), Value::Int64(3));
        assert_eq!(i64::from_value(Value::Int64(3)).unwrap(), 3);
        assert!(i64::from_value(Value::Int32(3)).is_err());
        assert_eq!(String::from_value(Value::from("x")).unwrap(), "x");
    }

    #[test]
    fn test_option_and_vec_conversions() {
        let none: Option<f64> = None;
        assert_eq!(none.into_value(), Value::Null);
        assert_eq!(Option::<f64>::from_value(Value::Null).unwrap(), None);
        assert_eq!(Option::<f64>::from_value(Value::Float64(1.5)).unwrap(), Some(1.5));

        let costs = vec![11.0f64, 12.0, 13.0];
        let v = costs.clone().into_value();
        assert_eq!(
            v,
            Value::List(vec![Value::Float64(11.0), Value::Float64(12.0), Value::Float64(13.0)])
        );
        assert_eq!(Vec::<f64>::from_value(v).unwrap(), costs);
        assert!(Vec::<f64>::from_value(Value::Int64(1)).is_err());
    }

    #[test]
    fn test_display() {
        let v = Value::Struct(vec![Value::Int64(1), Value::List(vec![Value::Float64(10.0)]), Value::Null]);
        assert_eq!(v.to_string(), "{1, [10], null}");
        assert_eq!(Value::from(2.5f64).as_f64(), Some(2.5));
        assert_eq!(Value::from("a").as_f64(), None);
    }
}
