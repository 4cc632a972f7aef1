//! ---------------------------------------------------------
//! A producer thread fills a column and signals its sync
//! event; the consumer sums it through the C entry point.
//!
//! Run with:
//!     RUST_LOG=colbridge=debug cargo run --example device_sum
//! ---------------------------------------------------------

use std::error::Error;
use std::sync::Arc;
use std::thread;

use colbridge::{
    ArrayBuilder, ArrayView, ArrowDeviceArray, ArrowSchema, ArrowType, DeviceType, Field,
    MemoryPool, StatusCode, SyncEvent, colbridge_get_sum, export_device_array, export_field,
    import_array, import_field,
};
use rand::Rng;
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_thread_ids(true)
        .init();

    let mut rng = rand::rng();
    let values: Vec<i32> = (0..1000).map(|_| rng.random_range(-1_000_000..1_000_000)).collect();
    let expected: i64 = values.iter().map(|&v| v as i64).sum();

    let pool = MemoryPool::unbounded();
    let mut b = ArrayBuilder::new(&ArrowType::Int32, pool.clone());
    b.as_primitive_mut::<i32>().ok_or("not an Int32 builder")?.append_slice(&values)?;
    let data = Arc::new(b.finish()?);

    // The consumer blocks on the event until the producer marks the data ready.
    let event = SyncEvent::new();
    let mut input = export_device_array(data, DeviceType::ExtDev, 0, Some(event.clone()));
    let producer = thread::spawn(move || event.signal());

    let mut in_schema = export_field(&Field::new("", ArrowType::Int32, false, None))?;
    let mut out_schema = ArrowSchema::empty();
    let mut output = ArrowDeviceArray::empty();

    let code = unsafe { colbridge_get_sum(&mut in_schema, &mut input, &mut out_schema, &mut output) };
    producer.join().map_err(|_| "producer panicked")?;
    let status = StatusCode::try_from(code)?;
    println!("status: {status}");

    let field = unsafe { import_field(&out_schema) }?;
    out_schema.release();
    let result = unsafe { import_array(&mut output.array, &field.dtype) }?;
    let sum = ArrayView::try_new(&result)?.value(0)?;
    println!("{} = {sum} (expected {expected})", field.name);
    println!("pool holds {} bytes", pool.bytes_allocated());
    Ok(())
}
