//! # StringBuilder
//!
//! Builder for UTF-8 columns. `O = i32` produces `String`, `O = i64`
//! produces `LargeString`.

use std::mem;
use std::sync::Arc;

use crate::enums::error::{BridgeError, Result};
use crate::ffi::arrow_dtype::ArrowType;
use crate::structs::array_data::ArrayData;
use crate::structs::builders::buffer_builder::BufferBuilder;
use crate::structs::builders::validity::ValidityBuilder;
use crate::structs::memory_pool::MemoryPool;
use crate::traits::type_unions::OffsetType;

pub struct StringBuilder<O: OffsetType> {
    offsets: BufferBuilder<O>,
    data: BufferBuilder<u8>,
    validity: ValidityBuilder,
}

impl<O: OffsetType> StringBuilder<O> {
    pub fn new(pool: Arc<MemoryPool>) -> Self {
        Self {
            offsets: BufferBuilder::new(pool.clone()),
            data: BufferBuilder::new(pool.clone()),
            validity: ValidityBuilder::new(pool),
        }
    }

    pub fn dtype() -> ArrowType {
        if mem::size_of::<O>() == 4 { ArrowType::String } else { ArrowType::LargeString }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.validity.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.validity.is_empty()
    }

    fn ensure_started(&mut self) -> Result<()> {
        if self.offsets.is_empty() {
            self.offsets.push(O::zero())?;
        }
        Ok(())
    }

    fn append_bytes(&mut self, bytes: &[u8], valid: bool) -> Result<()> {
        self.ensure_started()?;
        let end = self.data.len() + bytes.len();
        let end_offset = O::from_usize(end).ok_or(BridgeError::ResourceExhausted {
            requested: end,
            allocated: self.data.len(),
            limit: O::max_value().as_usize(),
        })?;
        self.data.reserve(bytes.len())?;
        self.offsets.reserve(1)?;
        self.validity.append(valid)?;
        self.data.extend_from_slice(bytes)?;
        self.offsets.push(end_offset)
    }

    pub fn append_value(&mut self, value: &str) -> Result<()> {
        self.append_bytes(value.as_bytes(), true)
    }

    pub fn append_null(&mut self) -> Result<()> {
        self.append_bytes(&[], false)
    }

    pub fn append_option(&mut self, value: Option<&str>) -> Result<()> {
        match value {
            Some(v) => self.append_value(v),
            None => self.append_null(),
        }
    }

    /// Discards slots past `len` along with their bytes.
    pub fn truncate(&mut self, len: usize) {
        if len >= self.len() {
            return;
        }
        let end = self.offsets.as_slice()[len].as_usize();
        self.offsets.truncate(len + 1);
        self.data.truncate(end);
        self.validity.truncate(len);
    }

    pub fn finish(&mut self) -> Result<ArrayData> {
        self.ensure_started()?;
        let len = self.validity.len();
        let (validity, nulls) = self.validity.finish();
        let offsets = self.offsets.finish();
        let data = self.data.finish();
        ArrayData::try_new(
            Self::dtype(),
            len,
            0,
            nulls as i64,
            vec![validity, Some(offsets), Some(data)],
            vec![],
        )
    }
}
