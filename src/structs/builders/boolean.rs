//! # BooleanBuilder
//!
//! Builder for bit-packed boolean columns.

use std::sync::Arc;

use crate::enums::error::Result;
use crate::ffi::arrow_dtype::ArrowType;
use crate::structs::array_data::ArrayData;
use crate::structs::bitmask::Bitmask;
use crate::structs::builders::validity::ValidityBuilder;
use crate::structs::memory_pool::MemoryPool;

pub struct BooleanBuilder {
    values: Bitmask,
    validity: ValidityBuilder,
}

impl BooleanBuilder {
    pub fn new(pool: Arc<MemoryPool>) -> Self {
        Self { values: Bitmask::new(pool.clone()), validity: ValidityBuilder::new(pool) }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn append_value(&mut self, value: bool) -> Result<()> {
        self.values.reserve(1)?;
        self.validity.append(true)?;
        self.values.push(value)
    }

    pub fn append_null(&mut self) -> Result<()> {
        self.values.reserve(1)?;
        self.validity.append(false)?;
        self.values.push(false)
    }

    pub fn append_option(&mut self, value: Option<bool>) -> Result<()> {
        match value {
            Some(v) => self.append_value(v),
            None => self.append_null(),
        }
    }

    pub fn truncate(&mut self, len: usize) {
        self.values.truncate(len);
        self.validity.truncate(len);
    }

    pub fn finish(&mut self) -> Result<ArrayData> {
        let len = self.values.len();
        let (validity, nulls) = self.validity.finish();
        let values = self.values.finish();
        ArrayData::try_new(ArrowType::Boolean, len, 0, nulls as i64, vec![validity, Some(values)], vec![])
    }
}
