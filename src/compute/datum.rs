//! # Datum Module - *Inputs and outputs of compute operations*
//!
//! `Datum` is what flows across the compute boundary: a single column, a
//! batch, a whole table, or a scalar. `BatchReader` is the pull-based stream
//! interface a query engine or database driver hands results back through.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::enums::error::Result;
use crate::enums::value::Value;
use crate::ffi::schema::Schema;
use crate::structs::array_data::ArrayData;
use crate::structs::record_batch::RecordBatch;
use crate::structs::table::Table;

/// # Datum
///
/// A value handed to or returned from a compute operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Datum {
    Array(Arc<ArrayData>),
    Batch(RecordBatch),
    Table(Arc<Table>),
    Scalar(Value),
}

impl Datum {
    pub fn kind(&self) -> &'static str {
        match self {
            Datum::Array(_) => "array",
            Datum::Batch(_) => "batch",
            Datum::Table(_) => "table",
            Datum::Scalar(_) => "scalar",
        }
    }

    #[inline]
    pub fn is_scalar(&self) -> bool {
        matches!(self, Datum::Scalar(_))
    }

    /// Number of rows. A scalar counts as one.
    pub fn num_rows(&self) -> usize {
        match self {
            Datum::Array(a) => a.len(),
            Datum::Batch(b) => b.num_rows(),
            Datum::Table(t) => t.num_rows(),
            Datum::Scalar(_) => 1,
        }
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Datum::Scalar(v) => Some(v),
            _ => None,
        }
    }
}

impl From<Arc<ArrayData>> for Datum {
    fn from(a: Arc<ArrayData>) -> Self {
        Datum::Array(a)
    }
}

impl From<ArrayData> for Datum {
    fn from(a: ArrayData) -> Self {
        Datum::Array(Arc::new(a))
    }
}

impl From<RecordBatch> for Datum {
    fn from(b: RecordBatch) -> Self {
        Datum::Batch(b)
    }
}

impl From<Table> for Datum {
    fn from(t: Table) -> Self {
        Datum::Table(Arc::new(t))
    }
}

impl From<Arc<Table>> for Datum {
    fn from(t: Arc<Table>) -> Self {
        Datum::Table(t)
    }
}

impl From<Value> for Datum {
    fn from(v: Value) -> Self {
        Datum::Scalar(v)
    }
}

/// Pull-based stream of record batches sharing one schema.
pub trait BatchReader: Send {
    fn schema(&self) -> Arc<Schema>;

    /// The next batch, or `None` once the stream is exhausted.
    fn next_batch(&mut self) -> Result<Option<RecordBatch>>;

    /// Drains the stream into a table.
    fn read_all(&mut self) -> Result<Table> {
        let mut table = Table::new_empty(self.schema());
        while let Some(batch) = self.next_batch()? {
            table.push(batch)?;
        }
        Ok(table)
    }
}

/// # VecBatchReader
///
/// In-memory `BatchReader` over already materialised batches.
pub struct VecBatchReader {
    schema: Arc<Schema>,
    batches: VecDeque<RecordBatch>,
}

impl VecBatchReader {
    /// Every batch must match `schema`.
    pub fn try_new(schema: Arc<Schema>, batches: Vec<RecordBatch>) -> Result<Self> {
        for batch in &batches {
            schema.ensure_matches(batch.schema())?;
        }
        Ok(Self { schema, batches: batches.into() })
    }

    pub fn from_batch(batch: RecordBatch) -> Self {
        Self { schema: batch.schema().clone(), batches: VecDeque::from([batch]) }
    }

    pub fn from_table(table: &Table) -> Self {
        Self {
            schema: table.schema().clone(),
            batches: table.batches().iter().cloned().collect(),
        }
    }
}

impl BatchReader for VecBatchReader {
    fn schema(&self) -> Arc<Schema> {
        self.schema.clone()
    }

    fn next_batch(&mut self) -> Result<Option<RecordBatch>> {
        Ok(self.batches.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversions::rows::rows_to_batch;
    use crate::ffi::arrow_dtype::ArrowType;
    use crate::structs::field::Field;
    use crate::structs::memory_pool::MemoryPool;

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::from(vec![Field::new("x", ArrowType::Int32, true, None)]))
    }

    #[test]
    fn test_reader_drains_in_order() {
        let pool = MemoryPool::unbounded();
        let a = rows_to_batch(schema(), &[vec![Value::Int32(1)]], pool.clone()).unwrap();
        let b = rows_to_batch(schema(), &[vec![Value::Int32(2)], vec![Value::Null]], pool).unwrap();
        let mut reader = VecBatchReader::try_new(schema(), vec![a, b]).unwrap();
        let table = reader.read_all().unwrap();
        assert_eq!(table.num_batches(), 2);
        assert_eq!(table.num_rows(), 3);
        assert!(reader.next_batch().unwrap().is_none());
    }

    #[test]
    fn test_datum_conversions() {
        let d: Datum = Value::Int64(4).into();
        assert!(d.is_scalar());
        assert_eq!(d.num_rows(), 1);
        let t: Datum = Table::new_empty(schema()).into();
        assert_eq!(t.kind(), "table");
        assert_eq!(t.num_rows(), 0);
        let a: Datum = ArrayData::new_null(3).into();
        assert_eq!(a.num_rows(), 3);
    }
}
