//! # ArrowDType Module - *Arrow type tagging for self-documenting data*
//!
//! The closed set of logical types that can cross the exchange boundary.
//!
//! ## Overview
//! - Covers null, boolean, every fixed-width integer and float, UTF-8 strings
//!   with 32 or 64-bit offsets, and the nested `List` and `Struct` types.
//! - Each variant knows its C Data Interface format string and its physical
//!   buffer layout, which is what both export and import are driven by.
//!
//! ## Display
//! - Human-readable type names are produced for all variants, with nested
//!   types rendered recursively, e.g. `List<Float64>`.
//!
//! ## Copyright Notice
//! - The term `Apache Arrow` is a trademark of the *Apache Software Foundation*.
//! - The term `Arrow` is used here under fair use to implement the public FFI compatibility standard,
//!   in accordance with the official guidance: <https://www.apache.org/foundation/marks/>.

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::enums::error::{BridgeError, Result};
use crate::structs::field::Field;

/// # ArrowType
///
/// Logical type tag of an array or schema node.
///
/// Nested variants carry their child fields, so an `ArrowType` is a full
/// type tree rather than just a tag.
#[derive(PartialEq, Clone, Debug)]
pub enum ArrowType {
    Null,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    /// UTF-8 with `i32` offsets
    String,
    /// UTF-8 with `i64` offsets
    LargeString,
    List(Box<Field>),
    Struct(Vec<Field>),
}

/// Physical role of one buffer slot in the C Data Interface layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    /// Validity bitmap, one bit per slot, LSB first.
    Validity,
    /// Fixed-width values of the given bit width.
    Values(usize),
    /// Offsets of the given byte width, `len + 1` entries.
    Offsets(usize),
    /// Variable-length bytes indexed by the preceding offsets buffer.
    Data,
}

impl ArrowType {
    /// C Data Interface format string.
    pub fn format(&self) -> &'static str {
        match self {
            ArrowType::Null => "n",
            ArrowType::Boolean => "b",
            ArrowType::Int8 => "c",
            ArrowType::Int16 => "s",
            ArrowType::Int32 => "i",
            ArrowType::Int64 => "l",
            ArrowType::UInt8 => "C",
            ArrowType::UInt16 => "S",
            ArrowType::UInt32 => "I",
            ArrowType::UInt64 => "L",
            ArrowType::Float32 => "f",
            ArrowType::Float64 => "g",
            ArrowType::String => "u",
            ArrowType::LargeString => "U",
            ArrowType::List(_) => "+l",
            ArrowType::Struct(_) => "+s",
        }
    }

    /// Parses a format string, attaching already-imported child fields.
    pub fn from_format(format: &str, mut children: Vec<Field>) -> Result<Self> {
        let leaf = |dtype: ArrowType, children: &[Field]| {
            if children.is_empty() {
                Ok(dtype)
            } else {
                Err(BridgeError::InvalidData(format!(
                    "format '{format}' takes no children, found {}",
                    children.len()
                )))
            }
        };
        match format {
            "n" => leaf(ArrowType::Null, &children),
            "b" => leaf(ArrowType::Boolean, &children),
            "c" => leaf(ArrowType::Int8, &children),
            "s" => leaf(ArrowType::Int16, &children),
            "i" => leaf(ArrowType::Int32, &children),
            "l" => leaf(ArrowType::Int64, &children),
            "C" => leaf(ArrowType::UInt8, &children),
            "S" => leaf(ArrowType::UInt16, &children),
            "I" => leaf(ArrowType::UInt32, &children),
            "L" => leaf(ArrowType::UInt64, &children),
            "f" => leaf(ArrowType::Float32, &children),
            "g" => leaf(ArrowType::Float64, &children),
            "u" => leaf(ArrowType::String, &children),
            "U" => leaf(ArrowType::LargeString, &children),
            "+l" => match children.len() {
                1 => Ok(ArrowType::List(Box::new(children.remove(0)))),
                n => Err(BridgeError::InvalidData(format!(
                    "list format requires exactly one child, found {n}"
                ))),
            },
            "+s" => Ok(ArrowType::Struct(children)),
            other => Err(BridgeError::NotImplemented(format!(
                "unsupported format string '{other}'"
            ))),
        }
    }

    /// Buffer slots in C Data Interface order.
    pub fn buffer_layout(&self) -> &'static [BufferKind] {
        use BufferKind::*;
        match self {
            ArrowType::Null => &[],
            ArrowType::Boolean => &[Validity, Values(1)],
            ArrowType::Int8 | ArrowType::UInt8 => &[Validity, Values(8)],
            ArrowType::Int16 | ArrowType::UInt16 => &[Validity, Values(16)],
            ArrowType::Int32 | ArrowType::UInt32 | ArrowType::Float32 => &[Validity, Values(32)],
            ArrowType::Int64 | ArrowType::UInt64 | ArrowType::Float64 => &[Validity, Values(64)],
            ArrowType::String => &[Validity, Offsets(4), Data],
            ArrowType::LargeString => &[Validity, Offsets(8), Data],
            ArrowType::List(_) => &[Validity, Offsets(4)],
            ArrowType::Struct(_) => &[Validity],
        }
    }

    #[inline]
    pub fn n_buffers(&self) -> usize {
        self.buffer_layout().len()
    }

    /// Child fields of a nested type, empty for leaves.
    pub fn children(&self) -> &[Field] {
        match self {
            ArrowType::List(item) => std::slice::from_ref(item.as_ref()),
            ArrowType::Struct(fields) => fields,
            _ => &[],
        }
    }

    #[inline]
    pub fn is_nested(&self) -> bool {
        matches!(self, ArrowType::List(_) | ArrowType::Struct(_))
    }

    /// Width in bits of the fixed-size values buffer, if the type has one.
    pub fn bit_width(&self) -> Option<usize> {
        self.buffer_layout().iter().find_map(|kind| match kind {
            BufferKind::Values(bits) => Some(*bits),
            _ => None,
        })
    }

    /// Name of the variant without its children, e.g. `List`.
    pub fn tag(&self) -> &'static str {
        match self {
            ArrowType::Null => "Null",
            ArrowType::Boolean => "Boolean",
            ArrowType::Int8 => "Int8",
            ArrowType::Int16 => "Int16",
            ArrowType::Int32 => "Int32",
            ArrowType::Int64 => "Int64",
            ArrowType::UInt8 => "UInt8",
            ArrowType::UInt16 => "UInt16",
            ArrowType::UInt32 => "UInt32",
            ArrowType::UInt64 => "UInt64",
            ArrowType::Float32 => "Float32",
            ArrowType::Float64 => "Float64",
            ArrowType::String => "String",
            ArrowType::LargeString => "LargeString",
            ArrowType::List(_) => "List",
            ArrowType::Struct(_) => "Struct",
        }
    }
}

impl Display for ArrowType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ArrowType::List(item) => write!(f, "List<{}>", item.dtype),
            ArrowType::Struct(fields) => {
                f.write_str("Struct<")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", field.name, field.dtype)?;
                }
                f.write_str(">")
            }
            other => f.write_str(other.tag()),
        }
    }
}
