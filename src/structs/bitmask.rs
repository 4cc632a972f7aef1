//! # Bitmask Module - *Growable bit-packed mask*
//!
//! Bit-packed boolean storage used while building: validity bitmaps and the
//! values of boolean columns. Bits are LSB-first within each byte, which is
//! the layout the C Data Interface expects, so a finished mask is shipped
//! without repacking.
//!
//! Reading a finished mask goes through [`BitmaskView`](crate::BitmaskView).

use std::sync::Arc;

use crate::enums::error::Result;
use crate::structs::builders::buffer_builder::BufferBuilder;
use crate::structs::memory_pool::MemoryPool;
use crate::structs::shared_buffer::SharedBuffer;
use crate::utils::{bytes_for_bits, get_bit, set_bit, unset_bit};

/// # Bitmask
///
/// Append-only bit vector whose bytes are charged to a [`MemoryPool`].
///
/// ## Invariants
/// - Bits past `len` in the final byte are always zero.
pub struct Bitmask {
    bytes: BufferBuilder<u8>,
    len: usize,
    set: usize,
}

impl Bitmask {
    pub fn new(pool: Arc<MemoryPool>) -> Self {
        Self { bytes: BufferBuilder::new(pool), len: 0, set: 0 }
    }

    /// A mask of `len` bits, all set.
    pub fn new_set_all(len: usize, pool: Arc<MemoryPool>) -> Result<Self> {
        let mut mask = Self::new(pool);
        mask.push_n(true, len)?;
        Ok(mask)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn count_ones(&self) -> usize {
        self.set
    }

    #[inline]
    pub fn count_zeros(&self) -> usize {
        self.len - self.set
    }

    #[inline]
    pub fn get(&self, i: usize) -> bool {
        assert!(i < self.len, "Bitmask::get: index {i} out of bounds for {}", self.len);
        get_bit(self.bytes.as_slice(), i)
    }

    pub fn set(&mut self, i: usize, value: bool) {
        assert!(i < self.len, "Bitmask::set: index {i} out of bounds for {}", self.len);
        let was = get_bit(self.bytes.as_slice(), i);
        if value {
            set_bit(self.bytes.as_mut_slice(), i);
        } else {
            unset_bit(self.bytes.as_mut_slice(), i);
        }
        match (was, value) {
            (false, true) => self.set += 1,
            (true, false) => self.set -= 1,
            _ => {}
        }
    }

    /// Makes room for `additional` more bits.
    pub fn reserve(&mut self, additional: usize) -> Result<()> {
        let needed = bytes_for_bits(self.len + additional);
        self.bytes.reserve(needed.saturating_sub(self.bytes.len()))
    }

    pub fn push(&mut self, value: bool) -> Result<()> {
        if self.len % 8 == 0 {
            self.bytes.push(0)?;
        }
        if value {
            set_bit(self.bytes.as_mut_slice(), self.len);
            self.set += 1;
        }
        self.len += 1;
        Ok(())
    }

    pub fn push_n(&mut self, value: bool, n: usize) -> Result<()> {
        let needed = bytes_for_bits(self.len + n);
        self.bytes.push_n(0, needed - self.bytes.len())?;
        if value {
            let bytes = self.bytes.as_mut_slice();
            for i in self.len..self.len + n {
                set_bit(bytes, i);
            }
            self.set += n;
        }
        self.len += n;
        Ok(())
    }

    /// Drops bits past `len`, clearing them so the final byte stays clean.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len {
            return;
        }
        let bytes = self.bytes.as_mut_slice();
        for i in len..self.len {
            if get_bit(bytes, i) {
                unset_bit(bytes, i);
                self.set -= 1;
            }
        }
        self.bytes.truncate(bytes_for_bits(len));
        self.len = len;
    }

    /// Hands the packed bytes over and resets to empty.
    pub fn finish(&mut self) -> SharedBuffer {
        self.len = 0;
        self.set = 0;
        self.bytes.finish()
    }
}
