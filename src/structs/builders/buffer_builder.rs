//! # BufferBuilder - *Pool-accounted growable buffer*
//!
//! Grows a [`Buffer<T>`] with amortized doubling, charging every growth step to
//! a [`MemoryPool`] before it happens. A refused charge surfaces as
//! [`BridgeError::ResourceExhausted`] and leaves the contents untouched, so the
//! builder can be abandoned or retried safely.

use std::mem;
use std::sync::Arc;

use crate::enums::error::{BridgeError, Result};
use crate::structs::buffer::Buffer;
use crate::structs::memory_pool::MemoryPool;
use crate::structs::shared_buffer::SharedBuffer;
use crate::traits::type_unions::NativeType;

/// Smallest allocation, in bytes, a non-empty builder asks the pool for.
const MIN_GROWTH_BYTES: usize = 64;

pub struct BufferBuilder<T: NativeType> {
    buffer: Buffer<T>,
    pool: Arc<MemoryPool>,
    /// Bytes currently charged to `pool` on behalf of `buffer`.
    charged: usize,
}

impl<T: NativeType> BufferBuilder<T> {
    pub fn new(pool: Arc<MemoryPool>) -> Self {
        Self { buffer: Buffer::new(), pool, charged: 0 }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.buffer.as_slice()
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.buffer.as_mut_slice()
    }

    #[inline]
    pub fn last(&self) -> Option<T> {
        self.buffer.as_slice().last().copied()
    }

    /// Bytes currently charged to the pool.
    #[inline]
    pub fn charged_bytes(&self) -> usize {
        self.charged
    }

    /// Makes room for `additional` more elements.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let width = mem::size_of::<T>();
        let reserved = self.charged / width;
        let needed = self.len().checked_add(additional).ok_or_else(|| self.exhausted(usize::MAX))?;
        if needed <= reserved {
            return Ok(());
        }
        let doubled = reserved.saturating_mul(2).max(MIN_GROWTH_BYTES / width);
        let target = needed.max(doubled);
        // Fall back to the exact size when doubling would cross the pool limit
        let cap = match self.charge_for(target) {
            Ok(()) => target,
            Err(_) if target > needed => {
                self.charge_for(needed)?;
                needed
            }
            Err(e) => return Err(e),
        };
        self.buffer.reserve(cap - self.len());
        Ok(())
    }

    fn charge_for(&mut self, elements: usize) -> Result<()> {
        let bytes = elements
            .checked_mul(mem::size_of::<T>())
            .ok_or_else(|| self.exhausted(usize::MAX))?;
        self.pool.try_reserve(bytes - self.charged)?;
        self.charged = bytes;
        Ok(())
    }

    fn exhausted(&self, requested: usize) -> BridgeError {
        BridgeError::ResourceExhausted {
            requested,
            allocated: self.pool.bytes_allocated(),
            limit: self.pool.limit().unwrap_or(usize::MAX),
        }
    }

    #[inline]
    pub fn push(&mut self, value: T) -> Result<()> {
        self.reserve(1)?;
        self.buffer.push(value);
        Ok(())
    }

    pub fn push_n(&mut self, value: T, n: usize) -> Result<()> {
        self.reserve(n)?;
        let len = self.len();
        self.buffer.resize(len + n, value);
        Ok(())
    }

    pub fn extend_from_slice(&mut self, values: &[T]) -> Result<()> {
        self.reserve(values.len())?;
        self.buffer.extend_from_slice(values);
        Ok(())
    }

    /// Drops elements past `len`. The pool charge stays with the capacity.
    pub fn truncate(&mut self, len: usize) {
        if len < self.len() {
            self.buffer.truncate(len);
        }
    }

    /// Hands the contents over as an immutable buffer and resets the builder.
    ///
    /// The pool charge moves with the data and is returned when the last
    /// reference to the finished buffer drops.
    pub fn finish(&mut self) -> SharedBuffer {
        let buffer = mem::take(&mut self.buffer);
        let charged = mem::take(&mut self.charged);
        SharedBuffer::from_pooled(buffer.into_vec64(), self.pool.clone(), charged)
    }
}

impl<T: NativeType> Drop for BufferBuilder<T> {
    fn drop(&mut self) {
        if self.charged > 0 {
            self.pool.release(self.charged);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth_doubles_and_charges_pool() {
        let pool = MemoryPool::unbounded();
        let mut b = BufferBuilder::<i64>::new(pool.clone());
        b.push(1).unwrap();
        assert_eq!(b.charged_bytes(), 64);
        for i in 0..8 {
            b.push(i).unwrap();
        }
        assert_eq!(b.len(), 9);
        assert_eq!(b.charged_bytes(), 128);
        assert_eq!(pool.bytes_allocated(), 128);
    }

    #[test]
    fn test_exhaustion_leaves_contents_intact() {
        let pool = MemoryPool::with_limit(64);
        let mut b = BufferBuilder::<u8>::new(pool.clone());
        b.extend_from_slice(&[7; 60]).unwrap();
        let err = b.extend_from_slice(&[1; 10]).unwrap_err();
        assert!(matches!(err, BridgeError::ResourceExhausted { .. }));
        assert_eq!(b.len(), 60);
        assert_eq!(b.as_slice()[59], 7);
        // Still usable within the limit
        b.extend_from_slice(&[1; 4]).unwrap();
        assert_eq!(b.len(), 64);
    }

    #[test]
    fn test_truncate_keeps_charge() {
        let pool = MemoryPool::with_limit(64);
        let mut b = BufferBuilder::<i32>::new(pool.clone());
        b.extend_from_slice(&[1, 2, 3, 4]).unwrap();
        b.truncate(1);
        assert_eq!(b.as_slice(), &[1]);
        assert_eq!(pool.bytes_allocated(), 64);
        b.truncate(5);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn test_doubling_falls_back_to_exact_size_under_limit() {
        let pool = MemoryPool::with_limit(100);
        let mut b = BufferBuilder::<u8>::new(pool.clone());
        b.extend_from_slice(&[0; 64]).unwrap();
        // Doubling to 128 would exceed 100, exact growth to 90 fits
        b.extend_from_slice(&[0; 26]).unwrap();
        assert_eq!(b.charged_bytes(), 90);
    }

    #[test]
    fn test_drop_and_finish_return_bytes() {
        let pool = MemoryPool::unbounded();
        {
            let mut b = BufferBuilder::<i32>::new(pool.clone());
            b.push(1).unwrap();
            assert!(pool.bytes_allocated() > 0);
        }
        assert_eq!(pool.bytes_allocated(), 0);

        let mut b = BufferBuilder::<i32>::new(pool.clone());
        b.extend_from_slice(&[1, 2, 3]).unwrap();
        let finished = b.finish();
        assert!(b.is_empty());
        drop(b);
        assert!(pool.bytes_allocated() > 0);
        assert_eq!(finished.typed::<i32>().unwrap(), &[1, 2, 3]);
        drop(finished);
        assert_eq!(pool.bytes_allocated(), 0);
    }
}
