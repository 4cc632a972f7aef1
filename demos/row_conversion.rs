//! ---------------------------------------------------------
//! Converts typed rows into a columnar table, hands the batch
//! across the C Data Interface and reads the rows back.
//!
//! Run with:
//!     RUST_LOG=colbridge=debug cargo run --example row_conversion
//! ---------------------------------------------------------

use std::error::Error;
use std::sync::Arc;

use colbridge::{
    ArrowType, Field, MemoryPool, Print, Result, Row, RowCursor, RowRecord, Schema, Value,
    batch_to_rows, export_batch, import_batch, records_to_table,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, PartialEq)]
struct DataRow {
    id: i64,
    components: i64,
    component_cost: Vec<f64>,
}

impl RowRecord for DataRow {
    fn schema() -> Arc<Schema> {
        Arc::new(Schema::from(vec![
            Field::new("id", ArrowType::Int64, false, None),
            Field::new("components", ArrowType::Int64, false, None),
            Field::list("component_cost", Field::new("item", ArrowType::Float64, true, None), false),
        ]))
    }

    fn to_row(&self) -> Row {
        vec![
            Value::from(self.id),
            Value::from(self.components),
            Value::List(self.component_cost.iter().copied().map(Value::from).collect()),
        ]
    }

    fn from_row(row: Row) -> Result<Self> {
        let mut c = RowCursor::new(row);
        Ok(DataRow {
            id: c.next("id")?,
            components: c.next("components")?,
            component_cost: c.next("component_cost")?,
        })
    }
}

fn main() -> std::result::Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(true)
        .init();

    let records = vec![
        DataRow { id: 1, components: 1, component_cost: vec![10.0] },
        DataRow { id: 2, components: 3, component_cost: vec![11.0, 12.0, 13.0] },
        DataRow { id: 3, components: 2, component_cost: vec![15.0, 25.0] },
    ];

    let pool = MemoryPool::unbounded();
    let table = records_to_table(&records, pool.clone())?;
    table.print();
    println!("pool holds {} bytes", pool.bytes_allocated());

    let (mut array, mut schema) = export_batch(&table.batches()[0])?;
    drop(table);
    let batch = unsafe { import_batch(&mut array, &mut schema) }?;

    let back = batch_to_rows(&batch, &DataRow::schema())?
        .into_iter()
        .map(DataRow::from_row)
        .collect::<Result<Vec<_>>>()?;
    for row in &back {
        println!("{row:?}");
    }
    assert_eq!(back, records);

    drop(batch);
    println!("pool holds {} bytes after release", pool.bytes_allocated());
    Ok(())
}
