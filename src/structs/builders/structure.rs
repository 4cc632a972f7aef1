//! # StructBuilder
//!
//! Builder for struct columns. One child builder per field; the struct
//! itself only owns the validity bitmap and the slot count.
//!
//! ## Protocol
//! 1. `append(is_valid)` starts a slot.
//! 2. Append exactly one value to every field builder.
//!
//! `finish` checks that every child holds exactly one value per slot before
//! touching any buffer, so a failed `finish` leaves the builder as it was.

use std::sync::Arc;

use crate::enums::error::{BridgeError, Result};
use crate::ffi::arrow_dtype::ArrowType;
use crate::structs::array_data::ArrayData;
use crate::structs::builders::array_builder::ArrayBuilder;
use crate::structs::builders::primitive::PrimitiveBuilder;
use crate::structs::builders::validity::ValidityBuilder;
use crate::structs::field::Field;
use crate::structs::memory_pool::MemoryPool;
use crate::traits::type_unions::NativeType;

pub struct StructBuilder {
    fields: Vec<Field>,
    children: Vec<ArrayBuilder>,
    validity: ValidityBuilder,
}

impl StructBuilder {
    pub fn new(fields: Vec<Field>, pool: Arc<MemoryPool>) -> Self {
        let children = fields.iter().map(|f| ArrayBuilder::new(&f.dtype, pool.clone())).collect();
        Self { fields, children, validity: ValidityBuilder::new(pool) }
    }

    #[inline]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn dtype(&self) -> ArrowType {
        ArrowType::Struct(self.fields.clone())
    }

    #[inline]
    pub fn num_fields(&self) -> usize {
        self.children.len()
    }

    /// Number of slots started.
    #[inline]
    pub fn len(&self) -> usize {
        self.validity.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.validity.is_empty()
    }

    /// Starts a slot. Each field builder then takes one value.
    pub fn append(&mut self, is_valid: bool) -> Result<()> {
        self.validity.append(is_valid)
    }

    /// A null slot, with a null appended to every field. Either every
    /// field takes its null or the slot is dropped.
    pub fn append_null(&mut self) -> Result<()> {
        let len = self.len();
        self.validity.append(false)?;
        let appended = self.children.iter_mut().try_for_each(ArrayBuilder::append_null);
        if appended.is_err() {
            self.truncate(len);
        }
        appended
    }

    /// Discards slots past `len` from the struct and every field.
    pub fn truncate(&mut self, len: usize) {
        self.validity.truncate(len);
        for child in &mut self.children {
            child.truncate(len);
        }
    }

    #[inline]
    pub fn field_builder(&mut self, i: usize) -> Option<&mut ArrayBuilder> {
        self.children.get_mut(i)
    }

    pub fn field_builder_as<T: NativeType>(&mut self, i: usize) -> Option<&mut PrimitiveBuilder<T>> {
        self.children.get_mut(i).and_then(|b| b.as_primitive_mut::<T>())
    }

    pub(crate) fn children_mut(&mut self) -> &mut [ArrayBuilder] {
        &mut self.children
    }

    /// Every child must hold exactly one value per slot, recursively.
    pub(crate) fn check_consistent(&self) -> Result<()> {
        let slots = self.len();
        for (field, child) in self.fields.iter().zip(&self.children) {
            if child.len() != slots {
                return Err(BridgeError::InvalidConstruction(format!(
                    "struct field '{}' has {} values but the struct has {slots} slots",
                    field.name,
                    child.len()
                )));
            }
            child.check_consistent()?;
        }
        Ok(())
    }

    pub fn finish(&mut self) -> Result<ArrayData> {
        self.check_consistent()?;
        let len = self.validity.len();
        let mut children = Vec::with_capacity(self.children.len());
        for child in &mut self.children {
            children.push(Arc::new(child.finish()?));
        }
        let (validity, nulls) = self.validity.finish();
        ArrayData::try_new(self.dtype(), len, 0, nulls as i64, vec![validity], children)
    }
}
