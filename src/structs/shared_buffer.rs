//! # **SharedBuffer Module** - Backs *ArrayData* for zero-copy sharing
//!
//! Immutable, reference-counted byte window over memory owned by someone else:
//! a finished builder allocation, an arbitrary byte container, or a foreign
//! producer's buffers received over the C Data Interface.
//!
//! Cloning and slicing are O(1). The owner is dropped with the last window
//! that references it, which is what returns pool bytes or triggers the
//! foreign release callback.

use std::any::Any;
use std::fmt;
use std::mem;
use std::ops::{Bound, Deref, RangeBounds};
use std::ptr;
use std::slice;
use std::sync::Arc;

use tracing::trace;

use crate::Vec64;
use crate::enums::error::{BridgeError, Result};
use crate::structs::memory_pool::MemoryPool;
use crate::traits::type_unions::NativeType;

/// Keep-alive owner behind a [`SharedBuffer`].
pub type BufferOwner = Arc<dyn Any + Send + Sync>;

/// # SharedBuffer
///
/// Zero-copy, reference-counted, read-only byte window.
///
/// ## Features
/// - O(1) cloning and slicing
/// - Backed by `Vec64<T>` (64-byte aligned), pool-charged allocations,
///   any `AsRef<[u8]>` owner, or foreign memory kept alive by an import owner
/// - Typed reads through [`SharedBuffer::typed`] check size and alignment,
///   so no raw pointer leaves this type outside the FFI layer
///
/// ## Usage
/// ```rust
/// use colbridge::{SharedBuffer, vec64};
/// let sb = SharedBuffer::from_vec64(vec64![1u8, 2, 3, 4, 5]);
/// let head = sb.slice(0..2).unwrap();
/// assert_eq!(head.as_slice(), &[1, 2]);
/// assert_eq!(sb.ref_count(), 2);
/// ```
pub struct SharedBuffer {
    ptr: *const u8,
    len: usize,
    owner: Option<BufferOwner>,
}

// The window is read-only and the owner is Send + Sync.
unsafe impl Send for SharedBuffer {}
unsafe impl Sync for SharedBuffer {}

/// A finished builder allocation that gives its bytes back to the pool on drop.
struct PooledAllocation<T> {
    data: Vec64<T>,
    pool: Arc<MemoryPool>,
    charged: usize,
}

impl<T> Drop for PooledAllocation<T> {
    fn drop(&mut self) {
        trace!(bytes = self.charged, "returning pooled allocation");
        self.pool.release(self.charged);
    }
}

impl SharedBuffer {
    /// Constructs a new, empty `SharedBuffer`
    pub const fn new() -> Self {
        Self { ptr: ptr::null(), len: 0, owner: None }
    }

    /// Constructs a `SharedBuffer` from a 64-byte aligned `Vec64<T>` without copying.
    pub fn from_vec64<T: NativeType>(v: Vec64<T>) -> Self {
        let len = v.len() * mem::size_of::<T>();
        let owner = Arc::new(v);
        let ptr = owner.as_slice().as_ptr() as *const u8;
        Self { ptr, len, owner: Some(owner) }
    }

    /// Wraps a finished builder allocation whose `charged` bytes are returned
    /// to `pool` when the last window drops.
    pub(crate) fn from_pooled<T: NativeType>(
        data: Vec64<T>,
        pool: Arc<MemoryPool>,
        charged: usize,
    ) -> Self {
        let len = data.len() * mem::size_of::<T>();
        let owner = Arc::new(PooledAllocation { data, pool, charged });
        let ptr = owner.data.as_slice().as_ptr() as *const u8;
        Self { ptr, len, owner: Some(owner) }
    }

    /// Constructs a `SharedBuffer` over any byte container.
    pub fn from_owner<O: AsRef<[u8]> + Send + Sync + 'static>(owner: O) -> Self {
        let owner = Arc::new(owner);
        let bytes = (*owner).as_ref();
        let (ptr, len) = (bytes.as_ptr(), bytes.len());
        Self { ptr, len, owner: Some(owner) }
    }

    /// Constructs a window over memory kept alive by `owner`.
    ///
    /// # Safety
    /// `ptr..ptr + len` must be readable and unchanged for as long as `owner`
    /// is alive. `ptr` may be null only when `len == 0`.
    pub unsafe fn from_foreign(owner: BufferOwner, ptr: *const u8, len: usize) -> Self {
        Self { ptr, len, owner: Some(owner) }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        if self.len == 0 || self.ptr.is_null() {
            &[]
        } else {
            unsafe { slice::from_raw_parts(self.ptr, self.len) }
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Start address, for filling C Data Interface buffer tables only.
    #[inline]
    pub(crate) fn as_ptr(&self) -> *const u8 {
        self.ptr
    }

    /// Zero-copy sub-window sharing the same owner.
    pub fn slice(&self, range: impl RangeBounds<usize>) -> Result<Self> {
        let start = match range.start_bound() {
            Bound::Included(&s) => s,
            Bound::Excluded(&s) => s + 1,
            Bound::Unbounded => 0,
        };
        let end = match range.end_bound() {
            Bound::Included(&e) => e + 1,
            Bound::Excluded(&e) => e,
            Bound::Unbounded => self.len,
        };
        if start > end || end > self.len {
            return Err(BridgeError::InvalidArgument(format!(
                "slice {start}..{end} out of bounds for buffer of {} bytes",
                self.len
            )));
        }
        let ptr = if self.ptr.is_null() { self.ptr } else { unsafe { self.ptr.add(start) } };
        Ok(Self { ptr, len: end - start, owner: self.owner.clone() })
    }

    /// Reinterprets the bytes as a slice of `T`.
    ///
    /// Fails if the length is not a multiple of `T`'s size or the start is
    /// not aligned for `T`.
    pub fn typed<T: NativeType>(&self) -> Result<&[T]> {
        let width = mem::size_of::<T>();
        if self.len % width != 0 {
            return Err(BridgeError::InvalidData(format!(
                "buffer of {} bytes is not a whole number of {width}-byte values",
                self.len
            )));
        }
        if self.len == 0 {
            return Ok(&[]);
        }
        if !self.is_aligned(mem::align_of::<T>()) {
            return Err(BridgeError::InvalidData(format!(
                "buffer at {:p} is not aligned to {} bytes",
                self.ptr,
                mem::align_of::<T>()
            )));
        }
        Ok(unsafe { slice::from_raw_parts(self.ptr as *const T, self.len / width) })
    }

    #[inline]
    pub fn is_aligned(&self, align: usize) -> bool {
        (self.ptr as usize) % align == 0
    }

    /// Returns true if this is the only window onto its owner.
    pub fn is_unique(&self) -> bool {
        self.owner.as_ref().map_or(true, |o| Arc::strong_count(o) == 1)
    }

    /// Number of live windows onto the same owner.
    pub fn ref_count(&self) -> usize {
        self.owner.as_ref().map_or(0, Arc::strong_count)
    }

    /// Copies the bytes into a fresh 64-byte aligned allocation.
    pub fn to_aligned(&self) -> Self {
        let mut v: Vec64<u8> = Vec64::with_capacity(self.len);
        v.extend_from_slice(self.as_slice());
        Self::from_vec64(v)
    }
}

impl Clone for SharedBuffer {
    fn clone(&self) -> Self {
        Self { ptr: self.ptr, len: self.len, owner: self.owner.clone() }
    }
}

impl Default for SharedBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for SharedBuffer {
    type Target = [u8];

    #[inline]
    fn deref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl PartialEq for SharedBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBuffer")
            .field("len", &self.len)
            .field("refs", &self.ref_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec64;

    #[test]
    fn test_from_vec64_is_zero_copy() {
        let v = vec64![1i32, 2, 3];
        let addr = v.as_slice().as_ptr() as usize;
        let sb = SharedBuffer::from_vec64(v);
        assert_eq!(sb.as_ptr() as usize, addr);
        assert_eq!(sb.len(), 12);
        assert_eq!(sb.typed::<i32>().unwrap(), &[1, 2, 3]);
        assert!(sb.is_aligned(64));
    }

    #[test]
    fn test_slice_shares_owner() {
        let sb = SharedBuffer::from_owner(vec![10u8, 20, 30, 40]);
        let mid = sb.slice(1..3).unwrap();
        assert_eq!(mid.as_slice(), &[20, 30]);
        assert_eq!(sb.ref_count(), 2);
        assert!(!sb.is_unique());
        drop(mid);
        assert!(sb.is_unique());
        assert!(sb.slice(2..9).is_err());
    }

    #[test]
    fn test_typed_rejects_misaligned_or_ragged() {
        let sb = SharedBuffer::from_vec64(vec64![0u8; 16]);
        let shifted = sb.slice(1..9).unwrap();
        assert!(shifted.typed::<u64>().is_err());
        let ragged = sb.slice(0..7).unwrap();
        assert!(ragged.typed::<i32>().is_err());
        let realigned = shifted.to_aligned();
        assert_eq!(realigned.typed::<u64>().unwrap(), &[0]);
    }

    #[test]
    fn test_pooled_returns_bytes_on_last_drop() {
        let pool = MemoryPool::unbounded();
        pool.try_reserve(24).unwrap();
        let sb = SharedBuffer::from_pooled(vec64![1u64, 2, 3], pool.clone(), 24);
        let other = sb.clone();
        drop(sb);
        assert_eq!(pool.bytes_allocated(), 24);
        drop(other);
        assert_eq!(pool.bytes_allocated(), 0);
    }

    #[test]
    fn test_empty() {
        let sb = SharedBuffer::new();
        assert!(sb.is_empty());
        assert_eq!(sb.as_slice(), &[] as &[u8]);
        assert_eq!(sb.typed::<i64>().unwrap(), &[] as &[i64]);
        assert_eq!(sb.ref_count(), 0);
    }
}
