//! # Plan Module - *Minimal declarative pipelines*
//!
//! A `Declaration` is a tree of pipeline nodes: a source, then any chain of
//! projections, filters and one scalar aggregation. [`Declaration::to_table`]
//! executes it batch by batch and materializes the result.
//!
//! ```rust
//! use std::sync::Arc;
//! use colbridge::{Aggregate, ArrowType, Declaration, Field, MemoryPool, Predicate, Schema, Value, rows_to_batch};
//!
//! let schema = Arc::new(Schema::from(vec![
//!     Field::new("region", ArrowType::String, false, None),
//!     Field::new("sales", ArrowType::Int64, true, None),
//! ]));
//! let rows = vec![
//!     vec![Value::from("east"), Value::Int64(10)],
//!     vec![Value::from("west"), Value::Int64(7)],
//!     vec![Value::from("east"), Value::Null],
//! ];
//! let batch = rows_to_batch(schema, &rows, MemoryPool::unbounded()).unwrap();
//! let out = Declaration::from_batch(batch)
//!     .filter(Predicate::eq("region", "east"))
//!     .aggregate(vec![Aggregate::Sum("sales".into()), Aggregate::Count("sales".into())])
//!     .to_table()
//!     .unwrap();
//! assert_eq!(out.num_rows(), 1);
//! ```
//!
//! Grouped aggregation is out of scope.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use tracing::debug;

use crate::compute::datum::{BatchReader, Datum, VecBatchReader};
use crate::compute::kernels;
use crate::enums::error::{BridgeError, Result};
use crate::enums::value::Value;
use crate::ffi::arrow_dtype::ArrowType;
use crate::ffi::schema::Schema;
use crate::structs::array_data::ArrayData;
use crate::structs::builders::ArrayBuilder;
use crate::structs::field::Field;
use crate::structs::memory_pool::MemoryPool;
use crate::structs::record_batch::RecordBatch;
use crate::structs::table::Table;
use crate::structs::views::ArrayView;

/// Row filter over named columns. Null never compares equal.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq { column: String, value: Value },
    IsIn { column: String, values: Vec<Value> },
    IsNull(String),
    Not(Box<Predicate>),
    And(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    pub fn eq<C: Into<String>, V: Into<Value>>(column: C, value: V) -> Self {
        Predicate::Eq { column: column.into(), value: value.into() }
    }

    pub fn is_in<C: Into<String>>(column: C, values: Vec<Value>) -> Self {
        Predicate::IsIn { column: column.into(), values }
    }

    pub fn is_null<C: Into<String>>(column: C) -> Self {
        Predicate::IsNull(column.into())
    }

    pub fn negate(self) -> Self {
        Predicate::Not(Box::new(self))
    }

    pub fn and(self, other: Predicate) -> Self {
        Predicate::And(Box::new(self), Box::new(other))
    }

    /// One flag per row of `batch`.
    pub fn evaluate(&self, batch: &RecordBatch) -> Result<Vec<bool>> {
        Ok(match self {
            Predicate::Eq { column: name, value } => {
                let data = batch.column_by_name(name)?;
                let view = ArrayView::try_new(data)?;
                (0..view.len())
                    .map(|i| Ok(!value.is_null() && view.value(i)? == *value))
                    .collect::<Result<_>>()?
            }
            Predicate::IsIn { column: name, values } => {
                let data = batch.column_by_name(name)?;
                let view = ArrayView::try_new(data)?;
                (0..view.len())
                    .map(|i| {
                        let v = view.value(i)?;
                        Ok(!v.is_null() && values.contains(&v))
                    })
                    .collect::<Result<_>>()?
            }
            Predicate::IsNull(name) => {
                let data = batch.column_by_name(name)?;
                (0..data.len()).map(|i| data.is_null(i)).collect()
            }
            Predicate::Not(inner) => inner.evaluate(batch)?.into_iter().map(|b| !b).collect(),
            Predicate::And(left, right) => {
                let l = left.evaluate(batch)?;
                let r = right.evaluate(batch)?;
                l.into_iter().zip(r).map(|(a, b)| a && b).collect()
            }
        })
    }
}

/// Scalar aggregate over one named column.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate {
    Count(String),
    Sum(String),
    Min(String),
    Max(String),
    Mean(String),
}

impl Aggregate {
    pub fn column(&self) -> &str {
        match self {
            Aggregate::Count(c)
            | Aggregate::Sum(c)
            | Aggregate::Min(c)
            | Aggregate::Max(c)
            | Aggregate::Mean(c) => c,
        }
    }

    fn function(&self) -> &'static str {
        match self {
            Aggregate::Count(_) => "count",
            Aggregate::Sum(_) => "sum",
            Aggregate::Min(_) => "min",
            Aggregate::Max(_) => "max",
            Aggregate::Mean(_) => "mean",
        }
    }

    /// Output column, e.g. `sum(sales)`.
    fn output_field(&self, input: &ArrowType) -> Result<Field> {
        let name = format!("{}({})", self.function(), self.column());
        Ok(match self {
            Aggregate::Count(_) => Field::new(name, ArrowType::Int64, false, None),
            Aggregate::Sum(_) => Field::new(name, kernels::sum_type(input)?, true, None),
            Aggregate::Min(_) | Aggregate::Max(_) => Field::new(name, input.clone(), true, None),
            Aggregate::Mean(_) => Field::new(name, ArrowType::Float64, true, None),
        })
    }

    fn evaluate(&self, data: &ArrayData) -> Result<Value> {
        match self {
            Aggregate::Count(_) => Ok(Value::Int64(kernels::count(data) as i64)),
            Aggregate::Sum(_) => kernels::sum(data),
            Aggregate::Min(_) => kernels::min(data),
            Aggregate::Max(_) => kernels::max(data),
            Aggregate::Mean(_) => kernels::mean(data),
        }
    }
}

impl Display for Aggregate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.function(), self.column())
    }
}

/// # Declaration
///
/// One pipeline node and, through its input, everything upstream of it.
pub enum Declaration {
    Source(Box<dyn BatchReader>),
    Project { input: Box<Declaration>, columns: Vec<String> },
    Filter { input: Box<Declaration>, predicate: Predicate },
    Aggregate { input: Box<Declaration>, aggregates: Vec<Aggregate> },
}

/// Output of one executed node.
struct Executed {
    schema: Arc<Schema>,
    batches: Vec<RecordBatch>,
}

impl Declaration {
    pub fn source<R: BatchReader + 'static>(reader: R) -> Self {
        Declaration::Source(Box::new(reader))
    }

    pub fn from_batch(batch: RecordBatch) -> Self {
        Declaration::source(VecBatchReader::from_batch(batch))
    }

    pub fn from_table(table: &Table) -> Self {
        Declaration::source(VecBatchReader::from_table(table))
    }

    /// A source over any datum. A bare array becomes a single column named
    /// `values` and a scalar a one-row column named `value`.
    pub fn from_datum(datum: Datum, pool: Arc<MemoryPool>) -> Result<Self> {
        Ok(match datum {
            Datum::Batch(batch) => Self::from_batch(batch),
            Datum::Table(table) => Self::from_table(&table),
            Datum::Array(data) => {
                let field = Field::new("values", data.dtype().clone(), true, None);
                let schema = Arc::new(Schema::from(vec![field]));
                Self::from_batch(RecordBatch::try_new(schema, vec![data])?)
            }
            Datum::Scalar(value) => {
                let dtype = scalar_type(&value)?;
                let mut builder = ArrayBuilder::new(&dtype, pool);
                builder.append_value(&value)?;
                let field = Field::new("value", dtype, true, None);
                let schema = Arc::new(Schema::from(vec![field]));
                Self::from_batch(RecordBatch::try_new(schema, vec![Arc::new(builder.finish()?)])?)
            }
        })
    }

    pub fn project<S: Into<String>>(self, columns: Vec<S>) -> Self {
        Declaration::Project {
            input: Box::new(self),
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn filter(self, predicate: Predicate) -> Self {
        Declaration::Filter { input: Box::new(self), predicate }
    }

    pub fn aggregate(self, aggregates: Vec<Aggregate>) -> Self {
        Declaration::Aggregate { input: Box::new(self), aggregates }
    }

    fn name(&self) -> &'static str {
        match self {
            Declaration::Source(_) => "source",
            Declaration::Project { .. } => "project",
            Declaration::Filter { .. } => "filter",
            Declaration::Aggregate { .. } => "aggregate",
        }
    }

    /// Runs the pipeline against the default memory pool.
    pub fn to_table(self) -> Result<Table> {
        self.to_table_in(MemoryPool::default_pool())
    }

    /// Runs the pipeline, drawing new buffers from `pool`.
    pub fn to_table_in(self, pool: Arc<MemoryPool>) -> Result<Table> {
        let out = self.execute(&pool)?;
        Table::try_new(out.schema, out.batches)
    }

    fn execute(self, pool: &Arc<MemoryPool>) -> Result<Executed> {
        let node = self.name();
        let out = match self {
            Declaration::Source(mut reader) => {
                let schema = reader.schema();
                let mut batches = Vec::new();
                while let Some(batch) = reader.next_batch()? {
                    batches.push(batch);
                }
                Executed { schema, batches }
            }
            Declaration::Project { input, columns } => {
                let input = input.execute(pool)?;
                let names: Vec<&str> = columns.iter().map(String::as_str).collect();
                let mut fields = Vec::with_capacity(names.len());
                for name in &names {
                    fields.push(input.schema.fields[input.schema.index_of(name)?].clone());
                }
                let schema = Arc::new(Schema::new(fields, input.schema.metadata.clone()));
                let batches = input
                    .batches
                    .iter()
                    .map(|b| b.project(&names))
                    .collect::<Result<Vec<_>>>()?;
                Executed { schema, batches }
            }
            Declaration::Filter { input, predicate } => {
                let input = input.execute(pool)?;
                let mut batches = Vec::with_capacity(input.batches.len());
                for batch in &input.batches {
                    let keep = predicate.evaluate(batch)?;
                    let indices: Vec<usize> =
                        keep.iter().enumerate().filter(|(_, k)| **k).map(|(i, _)| i).collect();
                    if indices.is_empty() {
                        continue;
                    }
                    let columns = batch
                        .columns()
                        .iter()
                        .map(|c| kernels::take(c, &indices, pool.clone()).map(Arc::new))
                        .collect::<Result<Vec<_>>>()?;
                    batches.push(RecordBatch::try_new(batch.schema().clone(), columns)?);
                }
                Executed { schema: input.schema, batches }
            }
            Declaration::Aggregate { input, aggregates } => {
                let input = input.execute(pool)?;
                let mut fields = Vec::with_capacity(aggregates.len());
                let mut columns = Vec::with_capacity(aggregates.len());
                for aggregate in &aggregates {
                    let i = input.schema.index_of(aggregate.column())?;
                    let dtype = &input.schema.fields[i].dtype;
                    let parts: Vec<&ArrayData> =
                        input.batches.iter().map(|b| b.columns()[i].as_ref()).collect();
                    let joined = kernels::concat(dtype, &parts, pool.clone())?;
                    let field = aggregate.output_field(dtype)?;
                    let mut builder = ArrayBuilder::new(&field.dtype, pool.clone());
                    builder.append_value(&aggregate.evaluate(&joined)?)?;
                    columns.push(Arc::new(builder.finish()?));
                    fields.push(field);
                }
                let schema = Arc::new(Schema::from(fields));
                let batch = RecordBatch::try_new(schema.clone(), columns)?;
                Executed { schema, batches: vec![batch] }
            }
        };
        debug!(
            node,
            batches = out.batches.len(),
            rows = out.batches.iter().map(RecordBatch::num_rows).sum::<usize>(),
            "executed pipeline node"
        );
        Ok(out)
    }
}

fn scalar_type(value: &Value) -> Result<ArrowType> {
    Ok(match value {
        Value::Null => ArrowType::Null,
        Value::Boolean(_) => ArrowType::Boolean,
        Value::Int8(_) => ArrowType::Int8,
        Value::Int16(_) => ArrowType::Int16,
        Value::Int32(_) => ArrowType::Int32,
        Value::Int64(_) => ArrowType::Int64,
        Value::UInt8(_) => ArrowType::UInt8,
        Value::UInt16(_) => ArrowType::UInt16,
        Value::UInt32(_) => ArrowType::UInt32,
        Value::UInt64(_) => ArrowType::UInt64,
        Value::Float32(_) => ArrowType::Float32,
        Value::Float64(_) => ArrowType::Float64,
        Value::Utf8(_) => ArrowType::String,
        Value::List(_) | Value::Struct(_) => {
            return Err(BridgeError::InvalidArgument(format!(
                "cannot infer a column type from a {} scalar",
                value.type_name()
            )));
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversions::rows::{rows_to_batch, table_to_rows};

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::from(vec![
            Field::new("region", ArrowType::String, false, None),
            Field::new("sales", ArrowType::Int64, true, None),
        ]))
    }

    fn table() -> Table {
        let pool = MemoryPool::unbounded();
        let a = rows_to_batch(
            schema(),
            &[
                vec![Value::from("east"), Value::Int64(10)],
                vec![Value::from("west"), Value::Int64(7)],
            ],
            pool.clone(),
        )
        .unwrap();
        let b = rows_to_batch(
            schema(),
            &[
                vec![Value::from("north"), Value::Null],
                vec![Value::from("east"), Value::Int64(5)],
            ],
            pool,
        )
        .unwrap();
        Table::try_new(schema(), vec![a, b]).unwrap()
    }

    #[test]
    fn test_filter_is_in_inverted_then_project() {
        let out = Declaration::from_table(&table())
            .filter(Predicate::is_in("region", vec!["east".into(), "west".into()]).negate())
            .project(vec!["sales"])
            .to_table()
            .unwrap();
        assert_eq!(out.num_columns(), 1);
        let rows = table_to_rows(&out, out.schema()).unwrap();
        assert_eq!(rows, vec![vec![Value::Null]]);
    }

    #[test]
    fn test_aggregates_across_batches() {
        let out = Declaration::from_table(&table())
            .aggregate(vec![
                Aggregate::Count("sales".into()),
                Aggregate::Sum("sales".into()),
                Aggregate::Min("sales".into()),
                Aggregate::Max("sales".into()),
                Aggregate::Mean("sales".into()),
            ])
            .to_table()
            .unwrap();
        assert_eq!(out.schema().fields[1].name, "sum(sales)");
        let rows = table_to_rows(&out, out.schema()).unwrap();
        assert_eq!(
            rows,
            vec![vec![
                Value::Int64(3),
                Value::Int64(22),
                Value::Int64(5),
                Value::Int64(10),
                Value::Float64(22.0 / 3.0),
            ]]
        );
    }

    #[test]
    fn test_filter_to_nothing_keeps_schema() {
        let out = Declaration::from_table(&table())
            .filter(Predicate::eq("region", "south"))
            .to_table()
            .unwrap();
        assert_eq!(out.num_rows(), 0);
        assert_eq!(out.schema().as_ref(), schema().as_ref());
    }

    #[test]
    fn test_is_null_and_unknown_column() {
        let out = Declaration::from_table(&table())
            .filter(Predicate::is_null("sales").and(Predicate::eq("region", "north")))
            .to_table()
            .unwrap();
        assert_eq!(out.num_rows(), 1);

        let err = Declaration::from_table(&table()).project(vec!["nope"]).to_table();
        assert!(matches!(err, Err(BridgeError::NotFound(_))));
    }

    #[test]
    fn test_from_datum_scalar_and_array() {
        let pool = MemoryPool::unbounded();
        let out = Declaration::from_datum(Datum::Scalar(Value::Int32(4)), pool.clone())
            .unwrap()
            .aggregate(vec![Aggregate::Sum("value".into())])
            .to_table()
            .unwrap();
        assert_eq!(table_to_rows(&out, out.schema()).unwrap(), vec![vec![Value::Int64(4)]]);

        let nulls = Datum::from(ArrayData::new_null(2));
        let out = Declaration::from_datum(nulls, pool).unwrap().to_table().unwrap();
        assert_eq!(out.num_rows(), 2);
        assert_eq!(out.schema().fields[0].name, "values");
    }
}
