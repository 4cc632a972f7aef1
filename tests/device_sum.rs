//! Host-emulated device exchange: a producer thread fills and signals, the
//! consumer sums through the C entry point.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use colbridge::{
    ArrayBuilder, ArrayView, ArrowDeviceArray, ArrowSchema, ArrowType, DeviceType, Field,
    MemoryPool, StatusCode, SyncEvent, Value, colbridge_get_sum, export_device_array,
    export_field, get_sum, import_array, import_field,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_i32s(seed: u64, n: usize) -> Vec<i32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n).map(|_| rng.random_range(i32::MIN..=i32::MAX)).collect()
}

fn column(values: &[i32], pool: Arc<MemoryPool>) -> Arc<colbridge::ArrayData> {
    let mut b = ArrayBuilder::new(&ArrowType::Int32, pool);
    b.as_primitive_mut::<i32>().unwrap().append_slice(values).unwrap();
    Arc::new(b.finish().unwrap())
}

fn read_result(schema: &mut ArrowSchema, output: &mut ArrowDeviceArray) -> Value {
    let field = unsafe { import_field(schema) }.unwrap();
    schema.release();
    let data = unsafe { import_array(&mut output.array, &field.dtype) }.unwrap();
    ArrayView::try_new(&data).unwrap().value(0).unwrap()
}

#[test]
fn test_sum_of_random_column_matches_wide_sum() {
    let values = random_i32s(42, 1000);
    let expected: i64 = values.iter().map(|&v| v as i64).sum();

    let pool = MemoryPool::unbounded();
    let event = SyncEvent::new();
    let mut in_schema = export_field(&Field::new("", ArrowType::Int32, false, None)).unwrap();
    let mut input = export_device_array(
        column(&values, pool.clone()),
        DeviceType::ExtDev,
        0,
        Some(event.clone()),
    );

    let producer = thread::spawn(move || {
        thread::sleep(Duration::from_millis(10));
        event.signal();
    });

    let mut out_schema = ArrowSchema::empty();
    let mut output = ArrowDeviceArray::empty();
    let code = unsafe { colbridge_get_sum(&mut in_schema, &mut input, &mut out_schema, &mut output) };
    producer.join().unwrap();

    assert_eq!(StatusCode::try_from(code).unwrap(), StatusCode::Ok);
    assert!(input.is_released());
    assert!(in_schema.is_released());
    assert_eq!(pool.bytes_allocated(), 0);
    assert_eq!(output.device().unwrap(), DeviceType::ExtDev);
    assert_eq!(read_result(&mut out_schema, &mut output), Value::Int64(expected));
}

#[test]
fn test_empty_input_sums_to_null() {
    let mut in_schema = export_field(&Field::new("", ArrowType::Int32, true, None)).unwrap();
    let mut input = export_device_array(column(&[], MemoryPool::unbounded()), DeviceType::Cpu, 0, None);
    let mut out_schema = ArrowSchema::empty();
    let mut output = ArrowDeviceArray::empty();
    unsafe { get_sum(&mut in_schema, &mut input, &mut out_schema, &mut output) }.unwrap();
    assert_eq!(read_result(&mut out_schema, &mut output), Value::Null);
}

#[test]
fn test_device_memory_yields_not_implemented_status() {
    let pool = MemoryPool::unbounded();
    let mut in_schema = export_field(&Field::new("", ArrowType::Int32, true, None)).unwrap();
    let mut input = export_device_array(column(&[1, 2], pool.clone()), DeviceType::Cuda, 0, None);
    let mut out_schema = ArrowSchema::empty();
    let mut output = ArrowDeviceArray::empty();
    let code = unsafe { colbridge_get_sum(&mut in_schema, &mut input, &mut out_schema, &mut output) };
    assert_eq!(code, StatusCode::NotImplemented as u8);
    assert!(input.is_released());
    assert!(output.is_released());
    assert!(out_schema.is_released());
    assert_eq!(pool.bytes_allocated(), 0);
}

#[test]
fn test_float_input_sums_to_float64() {
    let mut b = ArrayBuilder::new(&ArrowType::Float32, MemoryPool::unbounded());
    let floats = b.as_primitive_mut::<f32>().unwrap();
    floats.append_slice(&[0.5, 1.25]).unwrap();
    floats.append_null().unwrap();
    let data = Arc::new(b.finish().unwrap());

    let mut in_schema = export_field(&Field::new("", ArrowType::Float32, true, None)).unwrap();
    let mut input = export_device_array(data, DeviceType::CudaHost, 2, None);
    let mut out_schema = ArrowSchema::empty();
    let mut output = ArrowDeviceArray::empty();
    unsafe { get_sum(&mut in_schema, &mut input, &mut out_schema, &mut output) }.unwrap();
    assert_eq!(output.device_id, 2);
    assert_eq!(read_result(&mut out_schema, &mut output), Value::Float64(1.75));
}
