//! # Buffer - *Unified owned/shared typed storage*
//!
//! `Buffer<T>` is the typed, growable container builders write into before a
//! column is finished.
//!
//! # Design
//! `Buffer<T>` abstracts over two storage backends:
//! - **Owned**: [`Vec64<T>`], an internally aligned, 64-byte, heap-allocated vector.
//! - **Shared**: a read-only window onto a [`SharedBuffer`], e.g. the values of an
//!   already-finished or imported column.
//!
//! ## Behaviour
//! - **Read-only ops** (`&[T]` slicing, iteration) operate directly on the
//!   backing memory regardless of ownership.
//! - **Mutating ops** (push, resize, truncate, etc.) transparently convert shared
//!   buffers into owned `Vec64<T>` before modifying. Shared memory is never
//!   written through.
//! - Shared windows that are not aligned for `T` are copied into an aligned
//!   `Vec64<T>` on ingestion.

use std::fmt;
use std::mem;
use std::ops::Deref;
use std::slice;

use tracing::warn;

use crate::Vec64;
use crate::enums::error::{BridgeError, Result};
use crate::structs::shared_buffer::SharedBuffer;
use crate::traits::type_unions::NativeType;

/// # Buffer
///
/// Typed storage that is either an owned, 64-byte aligned `Vec64<T>` or a
/// shared, read-only window. See the module docs for the copy-on-write rules.
pub struct Buffer<T: NativeType> {
    storage: Storage<T>,
}

enum Storage<T> {
    Owned(Vec64<T>),
    /// `window` is already sliced to exactly `len` elements and aligned for `T`.
    Shared { window: SharedBuffer, len: usize },
}

impl<T: NativeType> Buffer<T> {
    #[inline]
    pub fn new() -> Self {
        Self::from_vec64(Vec64::new())
    }

    #[inline]
    pub fn with_capacity(cap: usize) -> Self {
        Self::from_vec64(Vec64::with_capacity(cap))
    }

    #[inline]
    pub fn from_vec64(v: Vec64<T>) -> Self {
        Self { storage: Storage::Owned(v) }
    }

    pub fn from_slice(values: &[T]) -> Self {
        let mut v = Vec64::with_capacity(values.len());
        v.extend_from_slice(values);
        Self::from_vec64(v)
    }

    /// Wraps a shared window without copying when it is aligned for `T`.
    pub fn from_shared(window: SharedBuffer) -> Result<Self> {
        let width = mem::size_of::<T>();
        if window.len() % width != 0 {
            return Err(BridgeError::InvalidData(format!(
                "shared window of {} bytes is not a whole number of {width}-byte values",
                window.len()
            )));
        }
        let len = window.len() / width;
        if window.is_aligned(mem::align_of::<T>()) {
            return Ok(Self { storage: Storage::Shared { window, len } });
        }
        warn!(bytes = window.len(), "shared window misaligned, copying into Vec64");
        let mut v: Vec64<T> = Vec64::with_capacity(len);
        unsafe {
            std::ptr::copy_nonoverlapping(
                window.as_slice().as_ptr(),
                v.as_mut_ptr() as *mut u8,
                window.len(),
            );
            v.set_len(len);
        }
        Ok(Self::from_vec64(v))
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        match &self.storage {
            Storage::Owned(v) => v.as_slice(),
            Storage::Shared { window, len } => {
                if *len == 0 {
                    &[]
                } else {
                    unsafe { slice::from_raw_parts(window.as_ptr() as *const T, *len) }
                }
            }
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Owned(v) => v.len(),
            Storage::Shared { len, .. } => *len,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        match &self.storage {
            Storage::Owned(v) => v.capacity(),
            Storage::Shared { len, .. } => *len,
        }
    }

    #[inline]
    pub fn is_shared(&self) -> bool {
        matches!(self.storage, Storage::Shared { .. })
    }

    /// Converts a shared window into owned storage, then returns it mutably.
    pub fn make_owned_mut(&mut self) -> &mut Vec64<T> {
        if let Storage::Shared { .. } = self.storage {
            let owned = {
                let mut v = Vec64::with_capacity(self.len());
                v.extend_from_slice(self.as_slice());
                v
            };
            self.storage = Storage::Owned(owned);
        }
        match &mut self.storage {
            Storage::Owned(v) => v,
            Storage::Shared { .. } => unreachable!("converted to owned above"),
        }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.make_owned_mut().as_mut_slice()
    }

    #[inline]
    pub fn push(&mut self, value: T) {
        self.make_owned_mut().push(value);
    }

    #[inline]
    pub fn extend_from_slice(&mut self, values: &[T]) {
        self.make_owned_mut().extend_from_slice(values);
    }

    #[inline]
    pub fn reserve(&mut self, additional: usize) {
        self.make_owned_mut().reserve(additional);
    }

    #[inline]
    pub fn resize(&mut self, new_len: usize, value: T) {
        self.make_owned_mut().resize(new_len, value);
    }

    #[inline]
    pub fn truncate(&mut self, len: usize) {
        self.make_owned_mut().truncate(len);
    }

    #[inline]
    pub fn clear(&mut self) {
        self.storage = Storage::Owned(Vec64::new());
    }

    /// Owned storage, copying out of a shared window if needed.
    pub fn into_vec64(mut self) -> Vec64<T> {
        self.make_owned_mut();
        match self.storage {
            Storage::Owned(v) => v,
            Storage::Shared { .. } => unreachable!("converted to owned above"),
        }
    }

    /// Byte window over the contents without copying.
    pub fn into_shared(self) -> SharedBuffer {
        match self.storage {
            Storage::Owned(v) => SharedBuffer::from_vec64(v),
            Storage::Shared { window, .. } => window,
        }
    }
}

impl<T: NativeType> Default for Buffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: NativeType> Clone for Buffer<T> {
    fn clone(&self) -> Self {
        match &self.storage {
            Storage::Owned(v) => Self::from_vec64(v.clone()),
            Storage::Shared { window, len } => {
                Self { storage: Storage::Shared { window: window.clone(), len: *len } }
            }
        }
    }
}

impl<T: NativeType> Deref for Buffer<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: NativeType> PartialEq for Buffer<T> {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl<T: NativeType> From<Vec64<T>> for Buffer<T> {
    fn from(v: Vec64<T>) -> Self {
        Self::from_vec64(v)
    }
}

impl<T: NativeType> FromIterator<T> for Buffer<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut v = Vec64::new();
        for x in iter {
            v.push(x);
        }
        Self::from_vec64(v)
    }
}

impl<T: NativeType> fmt::Debug for Buffer<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Buffer")
            .field("shared", &self.is_shared())
            .field("values", &self.as_slice())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec64;

    #[test]
    fn test_owned_push_and_slice() {
        let mut b = Buffer::from(vec64![1u32, 2, 3]);
        b.push(4);
        assert_eq!(b.as_slice(), &[1, 2, 3, 4]);
        assert!(!b.is_shared());
        b.truncate(2);
        assert_eq!(&b[..], &[1, 2]);
    }

    #[test]
    fn test_shared_is_copy_on_write() {
        let source = SharedBuffer::from_vec64(vec64![5i64, 6, 7]);
        let mut b = Buffer::<i64>::from_shared(source.clone()).unwrap();
        assert!(b.is_shared());
        assert_eq!(source.ref_count(), 2);

        b.push(8);
        assert!(!b.is_shared());
        assert_eq!(b.as_slice(), &[5, 6, 7, 8]);
        // Shared source is untouched and no longer referenced
        assert_eq!(source.typed::<i64>().unwrap(), &[5, 6, 7]);
        assert_eq!(source.ref_count(), 1);
    }

    #[test]
    fn test_from_shared_realigns_misaligned_window() {
        let mut bytes = vec64![0u8; 17];
        bytes[1..9].copy_from_slice(&42u64.to_ne_bytes());
        let window = SharedBuffer::from_vec64(bytes).slice(1..9).unwrap();
        let b = Buffer::<u64>::from_shared(window).unwrap();
        assert!(!b.is_shared());
        assert_eq!(b.as_slice(), &[42]);
    }

    #[test]
    fn test_from_shared_rejects_ragged_window() {
        let window = SharedBuffer::from_vec64(vec64![0u8; 6]);
        assert!(Buffer::<i32>::from_shared(window).is_err());
    }

    #[test]
    fn test_into_shared_is_zero_copy() {
        let b: Buffer<f64> = [1.0, 2.0].into_iter().collect();
        let addr = b.as_slice().as_ptr() as usize;
        let sb = b.into_shared();
        assert_eq!(sb.as_ptr() as usize, addr);
        assert_eq!(sb.typed::<f64>().unwrap(), &[1.0, 2.0]);
    }
}
