//! # PrimitiveBuilder
//!
//! Builder for fixed-width numeric columns. Null slots hold `T::default()`
//! in the values buffer.

use std::sync::Arc;

use crate::enums::error::Result;
use crate::structs::array_data::ArrayData;
use crate::structs::builders::buffer_builder::BufferBuilder;
use crate::structs::builders::validity::ValidityBuilder;
use crate::structs::memory_pool::MemoryPool;
use crate::traits::type_unions::NativeType;

pub struct PrimitiveBuilder<T: NativeType> {
    values: BufferBuilder<T>,
    validity: ValidityBuilder,
}

impl<T: NativeType> PrimitiveBuilder<T> {
    pub fn new(pool: Arc<MemoryPool>) -> Self {
        Self { values: BufferBuilder::new(pool.clone()), validity: ValidityBuilder::new(pool) }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn null_count(&self) -> usize {
        self.validity.null_count()
    }

    /// Values appended so far, nulls included as `T::default()`.
    #[inline]
    pub fn values_slice(&self) -> &[T] {
        self.values.as_slice()
    }

    // Each append reserves values space before touching validity, so a
    // refused allocation changes neither.
    pub fn append_value(&mut self, value: T) -> Result<()> {
        self.values.reserve(1)?;
        self.validity.append(true)?;
        self.values.push(value)
    }

    pub fn append_null(&mut self) -> Result<()> {
        self.values.reserve(1)?;
        self.validity.append(false)?;
        self.values.push(T::default())
    }

    pub fn append_option(&mut self, value: Option<T>) -> Result<()> {
        match value {
            Some(v) => self.append_value(v),
            None => self.append_null(),
        }
    }

    pub fn append_slice(&mut self, values: &[T]) -> Result<()> {
        self.values.reserve(values.len())?;
        self.validity.append_n(true, values.len())?;
        self.values.extend_from_slice(values)
    }

    pub fn append_nulls(&mut self, n: usize) -> Result<()> {
        self.values.reserve(n)?;
        self.validity.append_n(false, n)?;
        self.values.push_n(T::default(), n)
    }

    /// Discards slots past `len`.
    pub fn truncate(&mut self, len: usize) {
        self.values.truncate(len);
        self.validity.truncate(len);
    }

    /// Freezes the appended values into an immutable column and resets.
    pub fn finish(&mut self) -> Result<ArrayData> {
        let len = self.values.len();
        let (validity, nulls) = self.validity.finish();
        let values = self.values.finish();
        ArrayData::try_new(T::DTYPE, len, 0, nulls as i64, vec![validity, Some(values)], vec![])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::error::BridgeError;

    #[test]
    fn test_build_with_nulls() {
        let mut b = PrimitiveBuilder::<i64>::new(MemoryPool::unbounded());
        b.append_slice(&[1, 2]).unwrap();
        b.append_null().unwrap();
        b.append_option(Some(4)).unwrap();
        let data = b.finish().unwrap();
        assert_eq!(data.len(), 4);
        assert_eq!(data.null_count(), 1);
        assert!(data.is_null(2));
        assert_eq!(data.buffer(1).unwrap().typed::<i64>().unwrap(), &[1, 2, 0, 4]);
        assert!(b.is_empty());
    }

    #[test]
    fn test_exhaustion_keeps_builder_consistent() {
        let pool = MemoryPool::with_limit(64);
        let mut b = PrimitiveBuilder::<f64>::new(pool.clone());
        b.append_slice(&[1.0; 8]).unwrap();
        let err = b.append_value(9.0).unwrap_err();
        assert!(matches!(err, BridgeError::ResourceExhausted { .. }));
        assert_eq!(b.len(), 8);
        let data = b.finish().unwrap();
        assert_eq!(data.len(), 8);
        drop(data);
        drop(b);
        assert_eq!(pool.bytes_allocated(), 0);
    }
}
