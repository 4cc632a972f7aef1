//! # **Table Module** - *Multi-batch tables under one schema*
//!
//! A `Table` is an ordered sequence of [`RecordBatch`]es that all share one
//! [`Schema`]. It is the unit pipelines materialize and readers stream, and
//! what row conversion produces for more than one batch.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use crate::enums::error::Result;
use crate::ffi::schema::Schema;
use crate::structs::record_batch::RecordBatch;

/// # Table
///
/// - Every batch has exactly the table's schema.
/// - Batches are shared, so cloning a table never copies column data.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    schema: Arc<Schema>,
    batches: Vec<RecordBatch>,
}

impl Table {
    /// Checks each batch schema against `schema` by deep structural equality.
    pub fn try_new(schema: Arc<Schema>, batches: Vec<RecordBatch>) -> Result<Self> {
        for batch in &batches {
            schema.ensure_matches(batch.schema())?;
        }
        Ok(Self { schema, batches })
    }

    /// A table taking its schema from the first batch. An empty input gives
    /// an empty table with the fallback schema.
    pub fn from_batches(batches: Vec<RecordBatch>, fallback: Arc<Schema>) -> Result<Self> {
        let schema = batches.first().map_or(fallback, |b| b.schema().clone());
        Self::try_new(schema, batches)
    }

    pub fn new_empty(schema: Arc<Schema>) -> Self {
        Self { schema, batches: Vec::new() }
    }

    #[inline]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    #[inline]
    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    #[inline]
    pub fn num_batches(&self) -> usize {
        self.batches.len()
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    #[inline]
    pub fn num_columns(&self) -> usize {
        self.schema.len()
    }

    pub fn push(&mut self, batch: RecordBatch) -> Result<()> {
        self.schema.ensure_matches(batch.schema())?;
        self.batches.push(batch);
        Ok(())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RecordBatch> {
        self.batches.iter()
    }
}

impl<'a> IntoIterator for &'a Table {
    type Item = &'a RecordBatch;
    type IntoIter = std::slice::Iter<'a, RecordBatch>;

    fn into_iter(self) -> Self::IntoIter {
        self.batches.iter()
    }
}

impl Display for Table {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Table [{} rows × {} cols, {} batches]",
            self.num_rows(),
            self.num_columns(),
            self.batches.len()
        )?;
        for batch in &self.batches {
            write!(f, "{batch}")?;
        }
        Ok(())
    }
}
