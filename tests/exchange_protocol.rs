//! Export, move, release and import through the public C Data Interface API,
//! including a hand-written foreign producer.

use std::ffi::{CString, c_void};
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use colbridge::{
    ArrayBuilder, ArrayData, ArrayView, ArrowArray, ArrowSchema, ArrowType, BridgeError, Field,
    HandleState, MemoryPool, RecordBatch, Schema, Value, export_array, export_batch, export_schema,
    import_array, import_batch, import_field, move_array, move_schema, rows_to_batch,
};

fn people(pool: Arc<MemoryPool>) -> RecordBatch {
    let schema = Arc::new(Schema::from(vec![
        Field::new("name", ArrowType::String, true, None),
        Field::new("age", ArrowType::UInt8, true, None),
        Field::structure(
            "address",
            vec![
                Field::new("city", ArrowType::LargeString, false, None),
                Field::new("verified", ArrowType::Boolean, true, None),
            ],
            true,
        ),
    ]));
    let rows = vec![
        vec![
            Value::from("ada"),
            Value::UInt8(36),
            Value::Struct(vec![Value::from("London"), Value::Boolean(true)]),
        ],
        vec![Value::Null, Value::Null, Value::Null],
        vec![
            Value::from("grace"),
            Value::UInt8(85),
            Value::Struct(vec![Value::from("New York"), Value::Null]),
        ],
    ];
    rows_to_batch(schema, &rows, pool).unwrap()
}

#[test]
fn test_batch_survives_export_move_import() {
    let pool = MemoryPool::unbounded();
    let batch = people(pool.clone());
    let expected = colbridge::batch_to_rows(&batch, batch.schema()).unwrap();

    let (mut array, mut schema) = export_batch(&batch).unwrap();
    drop(batch);

    let mut moved_array = ArrowArray::empty();
    let mut moved_schema = ArrowSchema::empty();
    unsafe {
        move_array(&mut array, &mut moved_array);
        move_schema(&mut schema, &mut moved_schema);
    }
    assert_eq!(array.state(), HandleState::Released);
    assert_eq!(moved_array.state(), HandleState::Live);

    let imported = unsafe { import_batch(&mut moved_array, &mut moved_schema) }.unwrap();
    assert_eq!(colbridge::batch_to_rows(&imported, imported.schema()).unwrap(), expected);
    assert!(pool.bytes_allocated() > 0);
    drop(imported);
    assert_eq!(pool.bytes_allocated(), 0);
}

#[test]
fn test_release_is_idempotent_and_recursive() {
    let pool = MemoryPool::unbounded();
    let (mut array, mut schema) = export_batch(&people(pool.clone())).unwrap();
    assert_eq!(array.n_children, 3);
    array.release();
    array.release();
    schema.release();
    schema.release();
    assert!(array.is_released() && schema.is_released());
    assert_eq!(pool.bytes_allocated(), 0);
}

#[test]
fn test_child_moved_out_before_parent_release() {
    let pool = MemoryPool::unbounded();
    let (mut array, mut schema) = export_batch(&people(pool.clone())).unwrap();
    let field = unsafe { import_field(&*(*schema.children.add(0))) }.unwrap();
    schema.release();

    // Take ownership of the first column, then release the rest.
    let mut name = ArrowArray::empty();
    unsafe { move_array(*array.children.add(0), &mut name) };
    array.release();
    assert!(pool.bytes_allocated() > 0);

    let names = unsafe { import_array(&mut name, &field.dtype) }.unwrap();
    assert_eq!(
        ArrayView::try_new(&names).unwrap().to_values().unwrap(),
        vec![Value::from("ada"), Value::Null, Value::from("grace")]
    );
    drop(names);
    assert_eq!(pool.bytes_allocated(), 0);
}

#[test]
fn test_export_on_one_thread_import_on_another() {
    let pool = MemoryPool::unbounded();
    let mut b = ArrayBuilder::new(&ArrowType::Float64, pool.clone());
    b.as_primitive_mut::<f64>().unwrap().append_slice(&[1.5, 2.5, 3.0]).unwrap();
    let data = Arc::new(b.finish().unwrap());

    struct Handle(ArrowArray);
    // The exported buffers are immutable and owned by the handle.
    unsafe impl Send for Handle {}

    let handle = Handle(export_array(data));
    let total = thread::spawn(move || {
        let mut handle = handle;
        let imported = unsafe { import_array(&mut handle.0, &ArrowType::Float64) }.unwrap();
        colbridge::compute::kernels::sum(&imported).unwrap()
    })
    .join()
    .unwrap();
    assert_eq!(total, Value::Float64(7.0));
    assert_eq!(pool.bytes_allocated(), 0);
}

#[test]
fn test_checked_move_errors() {
    let mut live = export_schema(&Schema::from(vec![Field::new("x", ArrowType::Int8, true, None)]))
        .unwrap();
    let mut other = export_schema(&Schema::default()).unwrap();
    assert!(matches!(live.try_move_into(&mut other), Err(BridgeError::InvalidState(_))));
    other.release();
    live.try_move_into(&mut other).unwrap();
    assert!(matches!(live.try_move_into(&mut other), Err(BridgeError::Released(_))));
    let mut taken = other.take();
    assert!(other.is_released());
    taken.release();
}

// ---------------------------------------------------------------------------
// A foreign producer written directly against the C structs
// ---------------------------------------------------------------------------

static FOREIGN_RELEASES: AtomicUsize = AtomicUsize::new(0);

struct ForeignPrivate {
    _storage: Vec<u8>,
    buffers: Box<[*const u8; 2]>,
}

unsafe extern "C" fn release_foreign(array: *mut ArrowArray) {
    let array = unsafe { &mut *array };
    drop(unsafe { Box::from_raw(array.private_data as *mut ForeignPrivate) });
    array.private_data = ptr::null_mut();
    array.release = None;
    FOREIGN_RELEASES.fetch_add(1, Ordering::SeqCst);
}

/// Int32 array whose values start one byte into its allocation.
fn misaligned_int32(values: &[i32]) -> ArrowArray {
    let mut storage = vec![0u8; 1 + values.len() * 4];
    for (i, v) in values.iter().enumerate() {
        storage[1 + i * 4..5 + i * 4].copy_from_slice(&v.to_ne_bytes());
    }
    let mut values_ptr = unsafe { storage.as_ptr().add(1) };
    if (values_ptr as usize) % 4 == 0 {
        // Keep the window misaligned whatever the allocator returned.
        storage.insert(0, 0);
        values_ptr = unsafe { storage.as_ptr().add(2) };
    }
    let mut private = Box::new(ForeignPrivate {
        _storage: storage,
        buffers: Box::new([ptr::null(), values_ptr]),
    });
    let buffers = private.buffers.as_mut_ptr();
    ArrowArray {
        length: values.len() as i64,
        null_count: 0,
        offset: 0,
        n_buffers: 2,
        n_children: 0,
        buffers,
        children: ptr::null_mut(),
        dictionary: ptr::null_mut(),
        release: Some(release_foreign),
        private_data: Box::into_raw(private) as *mut c_void,
    }
}

#[test]
fn test_foreign_producer_released_once_and_realigned() {
    let before = FOREIGN_RELEASES.load(Ordering::SeqCst);
    let mut foreign = misaligned_int32(&[5, -6, 7]);
    let imported = unsafe { import_array(&mut foreign, &ArrowType::Int32) }.unwrap();
    assert!(foreign.is_released());
    let view = ArrayView::try_new(&imported).unwrap();
    assert_eq!(
        view.to_values().unwrap(),
        vec![Value::Int32(5), Value::Int32(-6), Value::Int32(7)]
    );
    let clone: ArrayData = imported.clone();
    drop(imported);
    drop(clone);
    foreign.release();
    assert_eq!(FOREIGN_RELEASES.load(Ordering::SeqCst), before + 1);
}

#[test]
fn test_import_released_handle_fails() {
    let mut array = ArrowArray::empty();
    let err = unsafe { import_array(&mut array, &ArrowType::Int32) }.unwrap_err();
    assert!(matches!(err, BridgeError::Released(_)));
}

#[test]
fn test_dictionary_schema_not_supported() {
    let field = Field::new("x", ArrowType::Int32, true, None);
    let mut schema = colbridge::export_field(&field).unwrap();
    let format = CString::new("i").unwrap();
    let mut dictionary = ArrowSchema::empty();
    dictionary.format = format.as_ptr();
    schema.dictionary = &mut dictionary;
    let err = unsafe { import_field(&schema) }.unwrap_err();
    assert!(matches!(err, BridgeError::NotImplemented(_)));
    schema.dictionary = ptr::null_mut();
    schema.release();
}
