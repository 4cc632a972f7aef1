//! # Kernels Module - *Scalar reductions and gathers*
//!
//! Null-skipping reductions over a single column plus the `take` and
//! `concat` gathers the pipeline executor builds on.
//!
//! ## Result types
//! | kernel  | input                 | output                      |
//! |---------|-----------------------|-----------------------------|
//! | `sum`   | signed integers       | `Int64`, wrapping           |
//! | `sum`   | unsigned integers     | `UInt64`, wrapping          |
//! | `sum`   | floats                | `Float64`                   |
//! | `min`/`max` | any numeric       | the input type              |
//! | `mean`  | any numeric           | `Float64`                   |
//! | `count` | any                   | number of valid slots       |
//!
//! Every reduction returns `Value::Null` when the column is empty or has no
//! valid slots.
//!
//! With the `parallel_proc` feature the numeric folds run on *Rayon*.

use std::sync::Arc;

use num_traits::ToPrimitive;

use crate::enums::error::{BridgeError, Result};
use crate::enums::value::Value;
use crate::ffi::arrow_dtype::ArrowType;
use crate::structs::array_data::ArrayData;
use crate::structs::builders::ArrayBuilder;
use crate::structs::memory_pool::MemoryPool;
use crate::structs::views::{ArrayView, PrimitiveView};
use crate::traits::type_unions::{Integer, NativeType};

/// Folds the valid slots of `view`. `combine` merges partial folds.
#[cfg(not(feature = "parallel_proc"))]
fn fold_valid<T, A, F, C>(view: &PrimitiveView<'_, T>, init: A, fold: F, _combine: C) -> A
where
    T: NativeType,
    A: Copy + Send,
    F: Fn(A, T) -> A + Send + Sync,
    C: Fn(A, A) -> A + Send + Sync,
{
    view.iter().flatten().fold(init, fold)
}

#[cfg(feature = "parallel_proc")]
fn fold_valid<T, A, F, C>(view: &PrimitiveView<'_, T>, init: A, fold: F, combine: C) -> A
where
    T: NativeType,
    A: Copy + Send,
    F: Fn(A, T) -> A + Send + Sync,
    C: Fn(A, A) -> A + Send + Sync,
{
    use rayon::prelude::*;
    let view = *view;
    (0..view.len())
        .into_par_iter()
        .filter_map(|i| view.get(i))
        .fold(|| init, &fold)
        .reduce(|| init, &combine)
}

#[inline]
fn all_null<T: NativeType>(view: &PrimitiveView<'_, T>) -> bool {
    view.null_count() == view.len()
}

fn signed_sum<T: Integer>(view: &PrimitiveView<'_, T>) -> Value {
    if all_null(view) {
        return Value::Null;
    }
    let total = fold_valid(
        view,
        0i64,
        |acc, x| acc.wrapping_add(x.to_i64().unwrap_or_default()),
        i64::wrapping_add,
    );
    Value::Int64(total)
}

fn unsigned_sum<T: Integer>(view: &PrimitiveView<'_, T>) -> Value {
    if all_null(view) {
        return Value::Null;
    }
    let total = fold_valid(
        view,
        0u64,
        |acc, x| acc.wrapping_add(x.to_u64().unwrap_or_default()),
        u64::wrapping_add,
    );
    Value::UInt64(total)
}

fn float_sum<T: NativeType + ToPrimitive>(view: &PrimitiveView<'_, T>) -> Value {
    if all_null(view) {
        return Value::Null;
    }
    Value::Float64(fold_valid(view, 0.0f64, |acc, x| acc + x.to_f64().unwrap_or_default(), |a, b| a + b))
}

/// Sum of the valid slots, widened to 64 bits.
pub fn sum(data: &ArrayData) -> Result<Value> {
    Ok(match ArrayView::try_new(data)? {
        ArrayView::Null(_) => Value::Null,
        ArrayView::Int8(v) => signed_sum(&v),
        ArrayView::Int16(v) => signed_sum(&v),
        ArrayView::Int32(v) => signed_sum(&v),
        ArrayView::Int64(v) => signed_sum(&v),
        ArrayView::UInt8(v) => unsigned_sum(&v),
        ArrayView::UInt16(v) => unsigned_sum(&v),
        ArrayView::UInt32(v) => unsigned_sum(&v),
        ArrayView::UInt64(v) => unsigned_sum(&v),
        ArrayView::Float32(v) => float_sum(&v),
        ArrayView::Float64(v) => float_sum(&v),
        _ => return Err(unsupported("sum", data.dtype())),
    })
}

/// Output type of [`sum`] for a column of `dtype`.
pub fn sum_type(dtype: &ArrowType) -> Result<ArrowType> {
    Ok(match dtype {
        ArrowType::Null => ArrowType::Null,
        ArrowType::Int8 | ArrowType::Int16 | ArrowType::Int32 | ArrowType::Int64 => ArrowType::Int64,
        ArrowType::UInt8 | ArrowType::UInt16 | ArrowType::UInt32 | ArrowType::UInt64 => {
            ArrowType::UInt64
        }
        ArrowType::Float32 | ArrowType::Float64 => ArrowType::Float64,
        other => return Err(unsupported("sum", other)),
    })
}

fn extreme<T: NativeType>(view: &PrimitiveView<'_, T>, keep_left: fn(&T, &T) -> bool) -> Value {
    let pick = move |a: T, b: T| if keep_left(&a, &b) { a } else { b };
    let best = fold_valid(
        view,
        None,
        move |acc: Option<T>, x| Some(acc.map_or(x, |a| pick(a, x))),
        move |a, b| match (a, b) {
            (Some(a), Some(b)) => Some(pick(a, b)),
            (a, None) => a,
            (None, b) => b,
        },
    );
    best.map_or(Value::Null, NativeType::into_scalar)
}

macro_rules! numeric_extreme {
    ($data:expr, $name:literal, $keep_left:expr) => {
        match ArrayView::try_new($data)? {
            ArrayView::Null(_) => Value::Null,
            ArrayView::Int8(v) => extreme(&v, $keep_left),
            ArrayView::Int16(v) => extreme(&v, $keep_left),
            ArrayView::Int32(v) => extreme(&v, $keep_left),
            ArrayView::Int64(v) => extreme(&v, $keep_left),
            ArrayView::UInt8(v) => extreme(&v, $keep_left),
            ArrayView::UInt16(v) => extreme(&v, $keep_left),
            ArrayView::UInt32(v) => extreme(&v, $keep_left),
            ArrayView::UInt64(v) => extreme(&v, $keep_left),
            ArrayView::Float32(v) => extreme(&v, $keep_left),
            ArrayView::Float64(v) => extreme(&v, $keep_left),
            _ => return Err(unsupported($name, $data.dtype())),
        }
    };
}

/// Smallest valid value, in the column's own type.
pub fn min(data: &ArrayData) -> Result<Value> {
    Ok(numeric_extreme!(data, "min", |a, b| a <= b))
}

/// Largest valid value, in the column's own type.
pub fn max(data: &ArrayData) -> Result<Value> {
    Ok(numeric_extreme!(data, "max", |a, b| a >= b))
}

/// Number of valid slots.
#[inline]
pub fn count(data: &ArrayData) -> usize {
    data.len() - data.null_count()
}

fn mean_of<T: NativeType + ToPrimitive>(view: &PrimitiveView<'_, T>) -> Value {
    let (total, n) = fold_valid(
        view,
        (0.0f64, 0usize),
        |(s, n), x| (s + x.to_f64().unwrap_or_default(), n + 1),
        |(s1, n1), (s2, n2)| (s1 + s2, n1 + n2),
    );
    if n == 0 { Value::Null } else { Value::Float64(total / n as f64) }
}

/// Arithmetic mean of the valid slots as `Float64`.
pub fn mean(data: &ArrayData) -> Result<Value> {
    Ok(match ArrayView::try_new(data)? {
        ArrayView::Null(_) => Value::Null,
        ArrayView::Int8(v) => mean_of(&v),
        ArrayView::Int16(v) => mean_of(&v),
        ArrayView::Int32(v) => mean_of(&v),
        ArrayView::Int64(v) => mean_of(&v),
        ArrayView::UInt8(v) => mean_of(&v),
        ArrayView::UInt16(v) => mean_of(&v),
        ArrayView::UInt32(v) => mean_of(&v),
        ArrayView::UInt64(v) => mean_of(&v),
        ArrayView::Float32(v) => mean_of(&v),
        ArrayView::Float64(v) => mean_of(&v),
        _ => return Err(unsupported("mean", data.dtype())),
    })
}

/// Gathers the slots at `indices` into a new array of the same type.
pub fn take(data: &ArrayData, indices: &[usize], pool: Arc<MemoryPool>) -> Result<ArrayData> {
    let view = ArrayView::try_new(data)?;
    let mut builder = ArrayBuilder::new(data.dtype(), pool);
    for &i in indices {
        builder.append_value(&view.value(i)?)?;
    }
    builder.finish()
}

/// Appends `parts`, all of type `dtype`, into one array.
pub fn concat(dtype: &ArrowType, parts: &[&ArrayData], pool: Arc<MemoryPool>) -> Result<ArrayData> {
    let mut builder = ArrayBuilder::new(dtype, pool);
    for part in parts {
        if part.dtype() != dtype {
            return Err(BridgeError::InvalidArgument(format!(
                "cannot concatenate {} onto {dtype}",
                part.dtype()
            )));
        }
        let view = ArrayView::try_new(part)?;
        for i in 0..view.len() {
            builder.append_value(&view.value(i)?)?;
        }
    }
    builder.finish()
}

fn unsupported(kernel: &str, dtype: &ArrowType) -> BridgeError {
    BridgeError::NotImplemented(format!("{kernel} over {dtype}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(values: &[Option<i32>]) -> ArrayData {
        let mut b = ArrayBuilder::new(&ArrowType::Int32, MemoryPool::unbounded());
        let ints = b.as_primitive_mut::<i32>().unwrap();
        for v in values {
            ints.append_option(*v).unwrap();
        }
        b.finish().unwrap()
    }

    #[test]
    fn test_sum_skips_nulls_and_widens() {
        let data = ints(&[Some(i32::MAX), None, Some(i32::MAX), Some(-2)]);
        assert_eq!(sum(&data).unwrap(), Value::Int64(2 * i32::MAX as i64 - 2));
        assert_eq!(count(&data), 3);
        assert_eq!(sum_type(data.dtype()).unwrap(), ArrowType::Int64);
    }

    #[test]
    fn test_empty_and_all_null_reduce_to_null() {
        let empty = ints(&[]);
        let nulls = ints(&[None, None]);
        for data in [&empty, &nulls] {
            assert_eq!(sum(data).unwrap(), Value::Null);
            assert_eq!(min(data).unwrap(), Value::Null);
            assert_eq!(mean(data).unwrap(), Value::Null);
            assert_eq!(count(data), 0);
        }
    }

    #[test]
    fn test_min_max_mean_on_slice() {
        let data = ints(&[Some(100), Some(4), None, Some(-7), Some(9)]).slice(1, 4).unwrap();
        assert_eq!(min(&data).unwrap(), Value::Int32(-7));
        assert_eq!(max(&data).unwrap(), Value::Int32(9));
        assert_eq!(mean(&data).unwrap(), Value::Float64(2.0));
    }

    #[test]
    fn test_unsigned_sum_wraps() {
        let mut b = ArrayBuilder::new(&ArrowType::UInt64, MemoryPool::unbounded());
        b.as_primitive_mut::<u64>().unwrap().append_slice(&[u64::MAX, 2]).unwrap();
        assert_eq!(sum(&b.finish().unwrap()).unwrap(), Value::UInt64(1));
    }

    #[test]
    fn test_take_and_concat() {
        let data = ints(&[Some(1), None, Some(3)]);
        let taken = take(&data, &[2, 1, 2], MemoryPool::unbounded()).unwrap();
        assert_eq!(
            ArrayView::try_new(&taken).unwrap().to_values().unwrap(),
            vec![Value::Int32(3), Value::Null, Value::Int32(3)]
        );
        assert!(take(&data, &[3], MemoryPool::unbounded()).is_err());

        let joined = concat(&ArrowType::Int32, &[&data, &taken], MemoryPool::unbounded()).unwrap();
        assert_eq!(joined.len(), 6);
        assert_eq!(count(&joined), 4);
        let strings = ArrayBuilder::new(&ArrowType::String, MemoryPool::unbounded()).finish().unwrap();
        assert!(concat(&ArrowType::Int32, &[&strings], MemoryPool::unbounded()).is_err());
    }

    #[test]
    fn test_sum_rejects_strings() {
        let strings = ArrayBuilder::new(&ArrowType::String, MemoryPool::unbounded()).finish().unwrap();
        assert!(matches!(sum(&strings), Err(BridgeError::NotImplemented(_))));
    }
}
