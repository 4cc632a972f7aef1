//! # ValidityBuilder
//!
//! Lazily materialised validity bitmap. Columns without nulls never allocate
//! one, and export with a null validity pointer.

use std::sync::Arc;

use crate::enums::error::Result;
use crate::structs::bitmask::Bitmask;
use crate::structs::memory_pool::MemoryPool;
use crate::structs::shared_buffer::SharedBuffer;

pub struct ValidityBuilder {
    mask: Option<Bitmask>,
    len: usize,
    pool: Arc<MemoryPool>,
}

impl ValidityBuilder {
    pub fn new(pool: Arc<MemoryPool>) -> Self {
        Self { mask: None, len: 0, pool }
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
    pub fn null_count(&self) -> usize {
        self.mask.as_ref().map_or(0, Bitmask::count_zeros)
    }

    #[inline]
    pub fn append(&mut self, valid: bool) -> Result<()> {
        self.append_n(valid, 1)
    }

    /// Either records all `n` slots or, on allocation failure, none.
    pub fn append_n(&mut self, valid: bool, n: usize) -> Result<()> {
        match &mut self.mask {
            Some(mask) => mask.push_n(valid, n)?,
            None if !valid && n > 0 => {
                let mut mask = Bitmask::new_set_all(self.len, self.pool.clone())?;
                mask.push_n(false, n)?;
                self.mask = Some(mask);
            }
            None => {}
        }
        self.len += n;
        Ok(())
    }

    pub fn truncate(&mut self, len: usize) {
        if len < self.len {
            if let Some(mask) = &mut self.mask {
                mask.truncate(len);
            }
            self.len = len;
        }
    }

    /// Returns the bitmap, if any slot was null, with the null count.
    pub fn finish(&mut self) -> (Option<SharedBuffer>, usize) {
        self.len = 0;
        match self.mask.take() {
            Some(mut mask) => {
                let nulls = mask.count_zeros();
                (Some(mask.finish()), nulls)
            }
            None => (None, 0),
        }
    }
}
