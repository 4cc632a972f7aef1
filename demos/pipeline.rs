//! ---------------------------------------------------------
//! Runs a filter → project → aggregate pipeline over a table
//! built from rows, then wraps the result as a `Datum`.
//!
//! Run with:
//!     RUST_LOG=colbridge=debug cargo run --example pipeline
//! ---------------------------------------------------------

use std::error::Error;
use std::sync::Arc;

use colbridge::{
    Aggregate, ArrowType, Datum, Declaration, Field, MemoryPool, Predicate, Print, Schema, Table,
    Value, rows_to_batch,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let schema = Arc::new(Schema::from(vec![
        Field::new("region", ArrowType::String, false, None),
        Field::new("units", ArrowType::Int32, true, None),
        Field::new("price", ArrowType::Float64, false, None),
    ]));
    let pool = MemoryPool::unbounded();
    let mut batches = Vec::new();
    for chunk in [
        vec![("north", Some(4), 2.5), ("south", None, 1.0), ("north", Some(1), 9.0)],
        vec![("east", Some(7), 3.25), ("north", Some(2), 4.0)],
    ] {
        let rows: Vec<Vec<Value>> = chunk
            .into_iter()
            .map(|(region, units, price)| {
                vec![Value::from(region), units.map_or(Value::Null, Value::Int32), Value::Float64(price)]
            })
            .collect();
        batches.push(rows_to_batch(schema.clone(), &rows, pool.clone())?);
    }
    let table = Table::try_new(schema, batches)?;
    table.print();

    let north = Declaration::from_table(&table)
        .filter(Predicate::eq("region", "north").and(Predicate::is_null("units").negate()))
        .project(vec!["units", "price"])
        .to_table()?;
    north.print();

    let totals = Declaration::from_table(&north)
        .aggregate(vec![
            Aggregate::Count("units".into()),
            Aggregate::Sum("units".into()),
            Aggregate::Min("price".into()),
            Aggregate::Mean("price".into()),
        ])
        .to_table()?;
    totals.print();

    let datum = Datum::from(Arc::new(totals));
    println!("{} datum with {} row(s)", datum.kind(), datum.num_rows());
    Ok(())
}
