//! # RecordBatchBuilder
//!
//! One [`ArrayBuilder`] per schema field, appended in lockstep and flushed
//! together into a [`RecordBatch`].

use std::sync::Arc;

use crate::enums::error::{BridgeError, Result};
use crate::enums::value::Value;
use crate::ffi::schema::Schema;
use crate::structs::builders::array_builder::{ArrayBuilder, check_value};
use crate::structs::builders::list::ListBuilder;
use crate::structs::builders::primitive::PrimitiveBuilder;
use crate::structs::memory_pool::MemoryPool;
use crate::structs::record_batch::RecordBatch;
use crate::traits::type_unions::NativeType;

pub struct RecordBatchBuilder {
    schema: Arc<Schema>,
    builders: Vec<ArrayBuilder>,
}

impl RecordBatchBuilder {
    pub fn new(schema: Arc<Schema>, pool: Arc<MemoryPool>) -> Self {
        let builders = schema.fields.iter().map(|f| ArrayBuilder::new(&f.dtype, pool.clone())).collect();
        Self { schema, builders }
    }

    #[inline]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    #[inline]
    pub fn num_fields(&self) -> usize {
        self.builders.len()
    }

    #[inline]
    pub fn field_builder(&mut self, i: usize) -> Option<&mut ArrayBuilder> {
        self.builders.get_mut(i)
    }

    pub fn field_builder_as<T: NativeType>(&mut self, i: usize) -> Option<&mut PrimitiveBuilder<T>> {
        self.builders.get_mut(i).and_then(|b| b.as_primitive_mut::<T>())
    }

    pub fn list_builder(&mut self, i: usize) -> Option<&mut ListBuilder> {
        self.builders.get_mut(i).and_then(|b| b.as_list_mut())
    }

    /// Appends one row, one value per field.
    ///
    /// The whole row is checked against the schema before any column is
    /// written. If a column then fails to allocate, the columns already
    /// written are truncated back, so a rejected row leaves every column
    /// untouched.
    pub fn append_row(&mut self, row: &[Value]) -> Result<()> {
        if row.len() != self.builders.len() {
            return Err(BridgeError::InvalidArgument(format!(
                "row has {} values, schema has {} fields",
                row.len(),
                self.builders.len()
            )));
        }
        for (field, value) in self.schema.fields.iter().zip(row) {
            check_value(field, value)?;
        }
        let lens: Vec<usize> = self.builders.iter().map(ArrayBuilder::len).collect();
        let appended = self.builders.iter_mut().zip(row).try_for_each(|(b, v)| b.append_value(v));
        if appended.is_err() {
            for (builder, len) in self.builders.iter_mut().zip(lens) {
                builder.truncate(len);
            }
        }
        appended
    }

    /// Finishes every column into a batch and resets the builders.
    ///
    /// Column lengths are checked first; on mismatch nothing is consumed.
    pub fn flush(&mut self) -> Result<RecordBatch> {
        let rows = self.builders.first().map_or(0, ArrayBuilder::len);
        for (field, builder) in self.schema.fields.iter().zip(&self.builders) {
            if builder.len() != rows {
                return Err(BridgeError::InvalidConstruction(format!(
                    "column '{}' has {} values, expected {rows}",
                    field.name,
                    builder.len()
                )));
            }
            builder.check_consistent()?;
        }
        let columns = self
            .builders
            .iter_mut()
            .map(|b| b.finish().map(Arc::new))
            .collect::<Result<Vec<_>>>()?;
        RecordBatch::try_new(self.schema.clone(), columns)
    }
}
