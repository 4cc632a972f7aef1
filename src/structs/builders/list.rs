//! # ListBuilder
//!
//! Builder for variable-length list columns. Delegates elements to a single
//! child builder and records slot boundaries in an `i32` offsets buffer.
//!
//! ## Protocol
//! 1. `append(is_valid)` starts a slot.
//! 2. Append that slot's elements through `values()`.
//!
//! Elements appended before the first slot are a construction error. If
//! filling a slot fails part way, `truncate(len)` drops the slot together
//! with the elements it already received.

use std::sync::Arc;

use crate::enums::error::{BridgeError, Result};
use crate::ffi::arrow_dtype::ArrowType;
use crate::structs::array_data::ArrayData;
use crate::structs::builders::array_builder::ArrayBuilder;
use crate::structs::builders::buffer_builder::BufferBuilder;
use crate::structs::builders::validity::ValidityBuilder;
use crate::structs::field::Field;
use crate::structs::memory_pool::MemoryPool;
use crate::traits::type_unions::OffsetType;

pub struct ListBuilder {
    item: Field,
    /// Start offset of every slot; the closing offset is added by `finish`.
    offsets: BufferBuilder<i32>,
    validity: ValidityBuilder,
    values: ArrayBuilder,
}

impl ListBuilder {
    pub fn new(item: Field, pool: Arc<MemoryPool>) -> Self {
        let values = ArrayBuilder::new(&item.dtype, pool.clone());
        Self {
            item,
            offsets: BufferBuilder::new(pool.clone()),
            validity: ValidityBuilder::new(pool),
            values,
        }
    }

    #[inline]
    pub fn item_field(&self) -> &Field {
        &self.item
    }

    /// Number of slots.
    #[inline]
    pub fn len(&self) -> usize {
        self.validity.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.validity.is_empty()
    }

    fn child_offset(&self) -> Result<i32> {
        let n = self.values.len();
        <i32 as OffsetType>::from_usize(n).ok_or(BridgeError::ResourceExhausted {
            requested: n,
            allocated: n,
            limit: i32::MAX as usize,
        })
    }

    /// Starts a new slot. Elements appended to `values()` afterwards belong to it.
    pub fn append(&mut self, is_valid: bool) -> Result<()> {
        self.check_started()?;
        let start = self.child_offset()?;
        self.offsets.reserve(1)?;
        self.validity.append(is_valid)?;
        self.offsets.push(start)
    }

    /// A null, empty slot.
    #[inline]
    pub fn append_null(&mut self) -> Result<()> {
        self.append(false)
    }

    /// Child builder for the elements of the current slot.
    #[inline]
    pub fn values(&mut self) -> &mut ArrayBuilder {
        &mut self.values
    }

    fn check_started(&self) -> Result<()> {
        if self.offsets.is_empty() && !self.values.is_empty() {
            return Err(BridgeError::InvalidConstruction(format!(
                "{} list values appended before the first slot was started",
                self.values.len()
            )));
        }
        Ok(())
    }

    /// Discards slots past `len` and every element they hold.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len() {
            return;
        }
        let end = self.offsets.as_slice()[len].as_usize();
        self.offsets.truncate(len);
        self.validity.truncate(len);
        self.values.truncate(end);
    }

    pub(crate) fn check_consistent(&self) -> Result<()> {
        self.check_started()?;
        self.values.check_consistent()
    }

    pub fn finish(&mut self) -> Result<ArrayData> {
        self.check_consistent()?;
        let end = self.child_offset()?;
        self.offsets.push(end)?;
        let len = self.validity.len();
        let (validity, nulls) = self.validity.finish();
        let offsets = self.offsets.finish();
        let child = self.values.finish()?;
        ArrayData::try_new(
            ArrowType::List(Box::new(self.item.clone())),
            len,
            0,
            nulls as i64,
            vec![validity, Some(offsets)],
            vec![Arc::new(child)],
        )
    }
}
