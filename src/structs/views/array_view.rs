//! # ArrayView Module
//!
//! `ArrayView` is the single read path over an [`ArrayData`]: a closed union
//! with one typed reader per variant, chosen once from the type tag when the
//! view is created.
//!
//! ## Framing
//! A view is built over `(data, start, len)`. Every reader adds
//! `data.offset() + start` before touching a buffer, so sliced arrays,
//! struct children and list elements all read the right slots without the
//! caller doing pointer arithmetic.

use crate::enums::error::{BridgeError, Result};
use crate::enums::value::Value;
use crate::ffi::arrow_dtype::ArrowType;
use crate::structs::array_data::ArrayData;
use crate::structs::views::boolean_view::BooleanView;
use crate::structs::views::list_view::ListView;
use crate::structs::views::primitive_view::PrimitiveView;
use crate::structs::views::string_view::StringView;
use crate::structs::views::struct_view::StructView;
use crate::traits::type_unions::NativeType;

/// # ArrayView
///
/// Offset-aware, typed reader over one column window.
#[derive(Clone, Copy, Debug)]
pub enum ArrayView<'a> {
    Null(usize),
    Boolean(BooleanView<'a>),
    Int8(PrimitiveView<'a, i8>),
    Int16(PrimitiveView<'a, i16>),
    Int32(PrimitiveView<'a, i32>),
    Int64(PrimitiveView<'a, i64>),
    UInt8(PrimitiveView<'a, u8>),
    UInt16(PrimitiveView<'a, u16>),
    UInt32(PrimitiveView<'a, u32>),
    UInt64(PrimitiveView<'a, u64>),
    Float32(PrimitiveView<'a, f32>),
    Float64(PrimitiveView<'a, f64>),
    Utf8(StringView<'a, i32>),
    LargeUtf8(StringView<'a, i64>),
    List(ListView<'a>),
    Struct(StructView<'a>),
}

impl<'a> ArrayView<'a> {
    /// View over all of `data`.
    pub fn try_new(data: &'a ArrayData) -> Result<Self> {
        Self::framed(data, 0, data.len())
    }

    /// View over logical slots `[start, start + len)` of `data`.
    pub fn framed(data: &'a ArrayData, start: usize, len: usize) -> Result<Self> {
        if start.checked_add(len).is_none_or(|end| end > data.len()) {
            return Err(BridgeError::InvalidArgument(format!(
                "window {start}+{len} out of bounds for array of {}",
                data.len()
            )));
        }
        Ok(match data.dtype() {
            ArrowType::Null => ArrayView::Null(len),
            ArrowType::Boolean => ArrayView::Boolean(BooleanView::new(data, start, len)?),
            ArrowType::Int8 => ArrayView::Int8(PrimitiveView::new(data, start, len)?),
            ArrowType::Int16 => ArrayView::Int16(PrimitiveView::new(data, start, len)?),
            ArrowType::Int32 => ArrayView::Int32(PrimitiveView::new(data, start, len)?),
            ArrowType::Int64 => ArrayView::Int64(PrimitiveView::new(data, start, len)?),
            ArrowType::UInt8 => ArrayView::UInt8(PrimitiveView::new(data, start, len)?),
            ArrowType::UInt16 => ArrayView::UInt16(PrimitiveView::new(data, start, len)?),
            ArrowType::UInt32 => ArrayView::UInt32(PrimitiveView::new(data, start, len)?),
            ArrowType::UInt64 => ArrayView::UInt64(PrimitiveView::new(data, start, len)?),
            ArrowType::Float32 => ArrayView::Float32(PrimitiveView::new(data, start, len)?),
            ArrowType::Float64 => ArrayView::Float64(PrimitiveView::new(data, start, len)?),
            ArrowType::String => ArrayView::Utf8(StringView::new(data, start, len)?),
            ArrowType::LargeString => ArrayView::LargeUtf8(StringView::new(data, start, len)?),
            ArrowType::List(_) => ArrayView::List(ListView::new(data, start, len)?),
            ArrowType::Struct(_) => ArrayView::Struct(StructView::new(data, start, len)?),
        })
    }

    pub fn len(&self) -> usize {
        match self {
            ArrayView::Null(len) => *len,
            ArrayView::Boolean(v) => v.len(),
            ArrayView::Int8(v) => v.len(),
            ArrayView::Int16(v) => v.len(),
            ArrayView::Int32(v) => v.len(),
            ArrayView::Int64(v) => v.len(),
            ArrayView::UInt8(v) => v.len(),
            ArrayView::UInt16(v) => v.len(),
            ArrayView::UInt32(v) => v.len(),
            ArrayView::UInt64(v) => v.len(),
            ArrayView::Float32(v) => v.len(),
            ArrayView::Float64(v) => v.len(),
            ArrayView::Utf8(v) => v.len(),
            ArrayView::LargeUtf8(v) => v.len(),
            ArrayView::List(v) => v.len(),
            ArrayView::Struct(v) => v.len(),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_valid(&self, i: usize) -> bool {
        match self {
            ArrayView::Null(_) => false,
            ArrayView::Boolean(v) => v.is_valid(i),
            ArrayView::Int8(v) => v.is_valid(i),
            ArrayView::Int16(v) => v.is_valid(i),
            ArrayView::Int32(v) => v.is_valid(i),
            ArrayView::Int64(v) => v.is_valid(i),
            ArrayView::UInt8(v) => v.is_valid(i),
            ArrayView::UInt16(v) => v.is_valid(i),
            ArrayView::UInt32(v) => v.is_valid(i),
            ArrayView::UInt64(v) => v.is_valid(i),
            ArrayView::Float32(v) => v.is_valid(i),
            ArrayView::Float64(v) => v.is_valid(i),
            ArrayView::Utf8(v) => v.is_valid(i),
            ArrayView::LargeUtf8(v) => v.is_valid(i),
            ArrayView::List(v) => v.is_valid(i),
            ArrayView::Struct(v) => v.is_valid(i),
        }
    }

    /// Typed reader for a primitive column, `None` if the type differs.
    #[inline]
    pub fn as_primitive<T: NativeType>(&self) -> Option<PrimitiveView<'a, T>> {
        T::view(self)
    }

    /// Slot `i` as a dynamic [`Value`]. Null slots read as `Value::Null`.
    pub fn value(&self, i: usize) -> Result<Value> {
        if i >= self.len() {
            return Err(BridgeError::InvalidArgument(format!(
                "index {i} out of bounds for view of {}",
                self.len()
            )));
        }
        if !self.is_valid(i) {
            return Ok(Value::Null);
        }
        Ok(match self {
            ArrayView::Null(_) => Value::Null,
            ArrayView::Boolean(v) => Value::Boolean(v.value(i)),
            ArrayView::Int8(v) => Value::Int8(v.value(i)),
            ArrayView::Int16(v) => Value::Int16(v.value(i)),
            ArrayView::Int32(v) => Value::Int32(v.value(i)),
            ArrayView::Int64(v) => Value::Int64(v.value(i)),
            ArrayView::UInt8(v) => Value::UInt8(v.value(i)),
            ArrayView::UInt16(v) => Value::UInt16(v.value(i)),
            ArrayView::UInt32(v) => Value::UInt32(v.value(i)),
            ArrayView::UInt64(v) => Value::UInt64(v.value(i)),
            ArrayView::Float32(v) => Value::Float32(v.value(i)),
            ArrayView::Float64(v) => Value::Float64(v.value(i)),
            ArrayView::Utf8(v) => Value::Utf8(v.value(i)?.to_string()),
            ArrayView::LargeUtf8(v) => Value::Utf8(v.value(i)?.to_string()),
            ArrayView::List(v) => {
                let items = v.value(i)?;
                Value::List(items.to_values()?)
            }
            ArrayView::Struct(v) => {
                let mut fields = Vec::with_capacity(v.num_columns());
                for j in 0..v.num_columns() {
                    fields.push(v.column(j)?.value(i)?);
                }
                Value::Struct(fields)
            }
        })
    }

    /// Every slot of the window as dynamic values.
    pub fn to_values(&self) -> Result<Vec<Value>> {
        (0..self.len()).map(|i| self.value(i)).collect()
    }
}
