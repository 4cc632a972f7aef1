//! # ArrayBuilder Module
//!
//! `ArrayBuilder` is the closed union over every concrete builder. The
//! variant is chosen once from the `ArrowType` at construction; after that,
//! callers either append dynamic [`Value`]s or borrow the typed builder
//! through `as_primitive_mut`, `as_list_mut` and friends.

use std::sync::Arc;

use crate::enums::error::{BridgeError, Result};
use crate::enums::value::Value;
use crate::ffi::arrow_dtype::ArrowType;
use crate::structs::array_data::ArrayData;
use crate::structs::builders::boolean::BooleanBuilder;
use crate::structs::builders::list::ListBuilder;
use crate::structs::builders::primitive::PrimitiveBuilder;
use crate::structs::builders::string::StringBuilder;
use crate::structs::builders::structure::StructBuilder;
use crate::structs::field::Field;
use crate::structs::memory_pool::MemoryPool;
use crate::traits::type_unions::NativeType;

/// Builder for the `Null` type: only counts slots.
#[derive(Debug, Default)]
pub struct NullBuilder {
    len: usize,
}

impl NullBuilder {
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn append_null(&mut self) -> Result<()> {
        self.len += 1;
        Ok(())
    }

    pub fn truncate(&mut self, len: usize) {
        self.len = self.len.min(len);
    }

    pub fn finish(&mut self) -> Result<ArrayData> {
        Ok(ArrayData::new_null(std::mem::take(&mut self.len)))
    }
}

/// # ArrayBuilder
///
/// Type-erased column builder.
///
/// ## Failure
/// Every append reserves before it writes, so a `ResourceExhausted` error
/// leaves previously appended values intact. Dynamic values are type
/// checked in full before anything is written. A nested value that runs out
/// of memory part way is truncated away again, so a failed `append_value`
/// never leaves a partial slot for `finish` to pick up.
pub enum ArrayBuilder {
    Null(NullBuilder),
    Boolean(BooleanBuilder),
    Int8(PrimitiveBuilder<i8>),
    Int16(PrimitiveBuilder<i16>),
    Int32(PrimitiveBuilder<i32>),
    Int64(PrimitiveBuilder<i64>),
    UInt8(PrimitiveBuilder<u8>),
    UInt16(PrimitiveBuilder<u16>),
    UInt32(PrimitiveBuilder<u32>),
    UInt64(PrimitiveBuilder<u64>),
    Float32(PrimitiveBuilder<f32>),
    Float64(PrimitiveBuilder<f64>),
    Utf8(StringBuilder<i32>),
    LargeUtf8(StringBuilder<i64>),
    List(Box<ListBuilder>),
    Struct(StructBuilder),
}

/// Runs `$body` with `$b` bound to the inner builder of any variant.
macro_rules! dispatch {
    ($self:expr, $b:ident => $body:expr) => {
        match $self {
            ArrayBuilder::Null($b) => $body,
            ArrayBuilder::Boolean($b) => $body,
            ArrayBuilder::Int8($b) => $body,
            ArrayBuilder::Int16($b) => $body,
            ArrayBuilder::Int32($b) => $body,
            ArrayBuilder::Int64($b) => $body,
            ArrayBuilder::UInt8($b) => $body,
            ArrayBuilder::UInt16($b) => $body,
            ArrayBuilder::UInt32($b) => $body,
            ArrayBuilder::UInt64($b) => $body,
            ArrayBuilder::Float32($b) => $body,
            ArrayBuilder::Float64($b) => $body,
            ArrayBuilder::Utf8($b) => $body,
            ArrayBuilder::LargeUtf8($b) => $body,
            ArrayBuilder::List($b) => $body,
            ArrayBuilder::Struct($b) => $body,
        }
    };
}

impl ArrayBuilder {
    pub fn new(dtype: &ArrowType, pool: Arc<MemoryPool>) -> Self {
        match dtype {
            ArrowType::Null => ArrayBuilder::Null(NullBuilder::default()),
            ArrowType::Boolean => ArrayBuilder::Boolean(BooleanBuilder::new(pool)),
            ArrowType::Int8 => ArrayBuilder::Int8(PrimitiveBuilder::new(pool)),
            ArrowType::Int16 => ArrayBuilder::Int16(PrimitiveBuilder::new(pool)),
            ArrowType::Int32 => ArrayBuilder::Int32(PrimitiveBuilder::new(pool)),
            ArrowType::Int64 => ArrayBuilder::Int64(PrimitiveBuilder::new(pool)),
            ArrowType::UInt8 => ArrayBuilder::UInt8(PrimitiveBuilder::new(pool)),
            ArrowType::UInt16 => ArrayBuilder::UInt16(PrimitiveBuilder::new(pool)),
            ArrowType::UInt32 => ArrayBuilder::UInt32(PrimitiveBuilder::new(pool)),
            ArrowType::UInt64 => ArrayBuilder::UInt64(PrimitiveBuilder::new(pool)),
            ArrowType::Float32 => ArrayBuilder::Float32(PrimitiveBuilder::new(pool)),
            ArrowType::Float64 => ArrayBuilder::Float64(PrimitiveBuilder::new(pool)),
            ArrowType::String => ArrayBuilder::Utf8(StringBuilder::new(pool)),
            ArrowType::LargeString => ArrayBuilder::LargeUtf8(StringBuilder::new(pool)),
            ArrowType::List(item) => {
                ArrayBuilder::List(Box::new(ListBuilder::new((**item).clone(), pool)))
            }
            ArrowType::Struct(fields) => {
                ArrayBuilder::Struct(StructBuilder::new(fields.clone(), pool))
            }
        }
    }

    pub fn dtype(&self) -> ArrowType {
        match self {
            ArrayBuilder::Null(_) => ArrowType::Null,
            ArrayBuilder::Boolean(_) => ArrowType::Boolean,
            ArrayBuilder::Int8(_) => ArrowType::Int8,
            ArrayBuilder::Int16(_) => ArrowType::Int16,
            ArrayBuilder::Int32(_) => ArrowType::Int32,
            ArrayBuilder::Int64(_) => ArrowType::Int64,
            ArrayBuilder::UInt8(_) => ArrowType::UInt8,
            ArrayBuilder::UInt16(_) => ArrowType::UInt16,
            ArrayBuilder::UInt32(_) => ArrowType::UInt32,
            ArrayBuilder::UInt64(_) => ArrowType::UInt64,
            ArrayBuilder::Float32(_) => ArrowType::Float32,
            ArrayBuilder::Float64(_) => ArrowType::Float64,
            ArrayBuilder::Utf8(_) => ArrowType::String,
            ArrayBuilder::LargeUtf8(_) => ArrowType::LargeString,
            ArrayBuilder::List(b) => ArrowType::List(Box::new(b.item_field().clone())),
            ArrayBuilder::Struct(b) => b.dtype(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        dispatch!(self, b => b.len())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn append_null(&mut self) -> Result<()> {
        dispatch!(self, b => b.append_null())
    }

    /// Appends one dynamic value. `Value::Null` appends a null slot.
    ///
    /// On error the builder holds exactly the slots it held before.
    pub fn append_value(&mut self, value: &Value) -> Result<()> {
        let len = self.len();
        let appended = self.write_value(value);
        if appended.is_err() {
            self.truncate(len);
        }
        appended
    }

    fn write_value(&mut self, value: &Value) -> Result<()> {
        if value.is_null() {
            return self.append_null();
        }
        match self {
            ArrayBuilder::Null(_) => Err(value.type_error(&ArrowType::Null)),
            ArrayBuilder::Boolean(b) => match value {
                Value::Boolean(v) => b.append_value(*v),
                other => Err(other.type_error(&ArrowType::Boolean)),
            },
            ArrayBuilder::Int8(b) => append_native(b, value),
            ArrayBuilder::Int16(b) => append_native(b, value),
            ArrayBuilder::Int32(b) => append_native(b, value),
            ArrayBuilder::Int64(b) => append_native(b, value),
            ArrayBuilder::UInt8(b) => append_native(b, value),
            ArrayBuilder::UInt16(b) => append_native(b, value),
            ArrayBuilder::UInt32(b) => append_native(b, value),
            ArrayBuilder::UInt64(b) => append_native(b, value),
            ArrayBuilder::Float32(b) => append_native(b, value),
            ArrayBuilder::Float64(b) => append_native(b, value),
            ArrayBuilder::Utf8(b) => match value {
                Value::Utf8(s) => b.append_value(s),
                other => Err(other.type_error(&ArrowType::String)),
            },
            ArrayBuilder::LargeUtf8(b) => match value {
                Value::Utf8(s) => b.append_value(s),
                other => Err(other.type_error(&ArrowType::LargeString)),
            },
            ArrayBuilder::List(b) => {
                let Value::List(items) = value else {
                    return Err(value.type_error(&ArrowType::List(Box::new(b.item_field().clone()))));
                };
                for item in items {
                    check_value(b.item_field(), item)?;
                }
                b.append(true)?;
                for item in items {
                    b.values().append_value(item)?;
                }
                Ok(())
            }
            ArrayBuilder::Struct(b) => {
                let Value::Struct(values) = value else {
                    return Err(value.type_error(&b.dtype()));
                };
                check_struct_values(b.fields(), values)?;
                b.append(true)?;
                for (child, v) in b.children_mut().iter_mut().zip(values) {
                    child.append_value(v)?;
                }
                Ok(())
            }
        }
    }

    /// Discards slots past `len`, nested elements included.
    pub fn truncate(&mut self, len: usize) {
        dispatch!(self, b => b.truncate(len))
    }

    /// Freezes the appended values and resets the builder.
    pub fn finish(&mut self) -> Result<ArrayData> {
        dispatch!(self, b => b.finish())
    }

    /// Slot counts of nested children agree with their parents.
    pub(crate) fn check_consistent(&self) -> Result<()> {
        match self {
            ArrayBuilder::List(b) => b.check_consistent(),
            ArrayBuilder::Struct(b) => b.check_consistent(),
            _ => Ok(()),
        }
    }

    #[inline]
    pub fn as_primitive_mut<T: NativeType>(&mut self) -> Option<&mut PrimitiveBuilder<T>> {
        T::builder_mut(self)
    }

    pub fn as_boolean_mut(&mut self) -> Option<&mut BooleanBuilder> {
        match self {
            ArrayBuilder::Boolean(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_string_mut(&mut self) -> Option<&mut StringBuilder<i32>> {
        match self {
            ArrayBuilder::Utf8(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_large_string_mut(&mut self) -> Option<&mut StringBuilder<i64>> {
        match self {
            ArrayBuilder::LargeUtf8(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_list_mut(&mut self) -> Option<&mut ListBuilder> {
        match self {
            ArrayBuilder::List(b) => Some(b.as_mut()),
            _ => None,
        }
    }

    pub fn as_struct_mut(&mut self) -> Option<&mut StructBuilder> {
        match self {
            ArrayBuilder::Struct(b) => Some(b),
            _ => None,
        }
    }
}

#[inline]
fn append_native<T: NativeType>(b: &mut PrimitiveBuilder<T>, value: &Value) -> Result<()> {
    match T::from_scalar(value) {
        Some(v) => b.append_value(v),
        None => Err(value.type_error(&T::DTYPE)),
    }
}

fn check_struct_values(fields: &[Field], values: &[Value]) -> Result<()> {
    if values.len() != fields.len() {
        return Err(BridgeError::InvalidArgument(format!(
            "struct value has {} fields, expected {}",
            values.len(),
            fields.len()
        )));
    }
    fields.iter().zip(values).try_for_each(|(f, v)| check_value(f, v))
}

/// Checks that `value` can be stored under `field`, nullability included,
/// without writing anything.
pub(crate) fn check_value(field: &Field, value: &Value) -> Result<()> {
    let fits = match (&field.dtype, value) {
        (_, Value::Null) => {
            if field.nullable {
                return Ok(());
            }
            return Err(BridgeError::InvalidArgument(format!(
                "null value for non-nullable field '{}'",
                field.name
            )));
        }
        (ArrowType::List(item), Value::List(items)) => {
            return items.iter().try_for_each(|v| check_value(item, v));
        }
        (ArrowType::Struct(fields), Value::Struct(values)) => {
            return check_struct_values(fields, values);
        }
        (ArrowType::Boolean, Value::Boolean(_))
        | (ArrowType::Int8, Value::Int8(_))
        | (ArrowType::Int16, Value::Int16(_))
        | (ArrowType::Int32, Value::Int32(_))
        | (ArrowType::Int64, Value::Int64(_))
        | (ArrowType::UInt8, Value::UInt8(_))
        | (ArrowType::UInt16, Value::UInt16(_))
        | (ArrowType::UInt32, Value::UInt32(_))
        | (ArrowType::UInt64, Value::UInt64(_))
        | (ArrowType::Float32, Value::Float32(_))
        | (ArrowType::Float64, Value::Float64(_))
        | (ArrowType::String | ArrowType::LargeString, Value::Utf8(_)) => true,
        _ => false,
    };
    if fits {
        Ok(())
    } else {
        Err(BridgeError::InvalidArgument(format!(
            "field '{}': cannot store {} value as {}",
            field.name,
            value.type_name(),
            field.dtype
        )))
    }
}
