//! # **Rows Module** - *Row ⇄ columnar conversion*
//!
//! Converts between row records and record batches that share one schema.
//!
//! ## Row → columnar
//! Each row is checked against the schema, then every field is appended to
//! its column builder in lockstep. A list field starts a slot and appends
//! its items. The first failure aborts the conversion; the partially built
//! columns are dropped and their pool charges returned.
//!
//! ## Columnar → row
//! The batch schema is checked against the expected schema first, so a
//! mismatched batch is never read. Columns are then read through
//! offset-aware [`ArrayView`]s, which makes sliced inputs read the right
//! slots, and null slots come back as `Value::Null`.

use std::sync::Arc;

use tracing::debug;

use crate::enums::error::{BridgeError, Result};
use crate::enums::value::{FromValue, Row, Value};
use crate::ffi::schema::Schema;
use crate::structs::builders::RecordBatchBuilder;
use crate::structs::memory_pool::MemoryPool;
use crate::structs::record_batch::RecordBatch;
use crate::structs::table::Table;
use crate::structs::views::ArrayView;

/// Builds one batch from `rows`, all conforming to `schema`.
pub fn rows_to_batch(schema: Arc<Schema>, rows: &[Row], pool: Arc<MemoryPool>) -> Result<RecordBatch> {
    debug!(rows = rows.len(), fields = schema.len(), "rows_to_batch");
    let mut builder = RecordBatchBuilder::new(schema, pool);
    for (i, row) in rows.iter().enumerate() {
        builder.append_row(row).map_err(|e| match e {
            BridgeError::InvalidArgument(msg) => BridgeError::InvalidArgument(format!("row {i}: {msg}")),
            other => other,
        })?;
    }
    builder.flush()
}

/// Reads every row of `batch` after checking its schema against `expected`.
pub fn batch_to_rows(batch: &RecordBatch, expected: &Schema) -> Result<Vec<Row>> {
    expected.ensure_matches(batch.schema())?;
    let views = batch
        .columns()
        .iter()
        .map(|c| ArrayView::try_new(c))
        .collect::<Result<Vec<_>>>()?;
    (0..batch.num_rows())
        .map(|i| views.iter().map(|v| v.value(i)).collect::<Result<Row>>())
        .collect()
}

/// Rows of every batch in order.
pub fn table_to_rows(table: &Table, expected: &Schema) -> Result<Vec<Row>> {
    let mut rows = Vec::with_capacity(table.num_rows());
    for batch in table {
        rows.extend(batch_to_rows(batch, expected)?);
    }
    Ok(rows)
}

/// A typed record with a fixed schema.
///
/// ```rust
/// use std::sync::Arc;
/// use colbridge::{ArrowType, Field, Row, RowCursor, RowRecord, Schema, Value, Result};
///
/// struct Point { x: i64, y: Option<f64> }
///
/// impl RowRecord for Point {
///     fn schema() -> Arc<Schema> {
///         Arc::new(Schema::from(vec![
///             Field::new("x", ArrowType::Int64, false, None),
///             Field::new("y", ArrowType::Float64, true, None),
///         ]))
///     }
///     fn to_row(&self) -> Row {
///         vec![Value::from(self.x), self.y.map_or(Value::Null, Value::from)]
///     }
///     fn from_row(row: Row) -> Result<Self> {
///         let mut c = RowCursor::new(row);
///         Ok(Point { x: c.next("x")?, y: c.next("y")? })
///     }
/// }
/// ```
pub trait RowRecord: Sized {
    fn schema() -> Arc<Schema>;

    fn to_row(&self) -> Row;

    fn from_row(row: Row) -> Result<Self>;
}

/// Sequential typed reader over a row, for `RowRecord::from_row`.
pub struct RowCursor {
    values: std::vec::IntoIter<Value>,
}

impl RowCursor {
    pub fn new(row: Row) -> Self {
        Self { values: row.into_iter() }
    }

    /// Next field converted to `T`, with the field name in any error.
    pub fn next<T: FromValue>(&mut self, name: &str) -> Result<T> {
        let value = self
            .values
            .next()
            .ok_or_else(|| BridgeError::InvalidArgument(format!("row is missing field '{name}'")))?;
        T::from_value(value).map_err(|e| BridgeError::InvalidArgument(format!("field '{name}': {e}")))
    }
}

/// Converts typed records into a single-batch table.
pub fn records_to_table<R: RowRecord>(records: &[R], pool: Arc<MemoryPool>) -> Result<Table> {
    let schema = R::schema();
    let rows: Vec<Row> = records.iter().map(RowRecord::to_row).collect();
    let batch = rows_to_batch(schema.clone(), &rows, pool)?;
    Table::try_new(schema, vec![batch])
}

/// Reads typed records back out of `table`, checking its schema first.
pub fn table_to_records<R: RowRecord>(table: &Table) -> Result<Vec<R>> {
    table_to_rows(table, &R::schema())?.into_iter().map(R::from_row).collect()
}
