//! # **Arrow-C-FFI Module** - *Share data to another language and/or run-time*
//!
//! Implements the *Apache Arrow* **C Data Interface**, enabling zero-copy
//! data exchange across language boundaries. Compatible with any runtime
//! implementing the Arrow C interface, including Python, C++, Java, and others.
//!
//! ## Handle lifecycle
//! Every `ArrowArray` and `ArrowSchema` is in one of two states, read off the
//! `release` slot: [`HandleState::Live`] or [`HandleState::Released`].
//! The only legal transitions are:
//! - **export**: [`export_array`], [`export_field`], [`export_schema`] and
//!   [`export_batch`] produce live handles that reference, never copy, the
//!   producer's buffers.
//! - **move**: [`move_array`] / [`move_schema`] (or the checked
//!   `try_move_into`) copy a live handle onto a released one and mark the
//!   source released. No release logic runs.
//! - **release**: `release()` runs the producer's callback once. Calling it
//!   again is a no-op.
//! - **import**: [`import_array`] moves the handle into a shared owner that
//!   releases it exactly once, when the last imported buffer is dropped.
//!
//! The handle structs have no `Drop`; a live handle that is never released
//! keeps its producer's buffers alive.
//!
//! ## Notes
//! - Dictionary-encoded arrays are not supported: exports leave the
//!   `dictionary` slot null and imports reject a non-null one.
//! - Empty non-validity buffers are exported as a non-null static pointer,
//!   since some consumers reject null data pointers.
//! - Imported buffers that are misaligned for their element type are copied
//!   into aligned memory.
//!
//! ## Trademark Notice
//! *Apache Arrow* is a trademark of the Apache Software Foundation, used here under
//! fair-use to implement its published interoperability standard as per
//! https://www.apache.org/foundation/marks/ .

use std::collections::BTreeMap;
use std::ffi::{CStr, CString, c_char, c_void};
use std::sync::Arc;
use std::{mem, ptr};

use tracing::{debug, trace, warn};

use crate::enums::error::{BridgeError, Result};
use crate::ffi::arrow_dtype::{ArrowType, BufferKind};
use crate::ffi::schema::Schema;
use crate::structs::array_data::ArrayData;
use crate::structs::field::Field;
use crate::structs::record_batch::RecordBatch;
use crate::structs::shared_buffer::{BufferOwner, SharedBuffer};
use crate::utils::bytes_for_bits;
use crate::vec64;

// Provides compatibility with the cross-platform `Apache Arrow` standard
// via the `C Data Interface` specification:
// https://arrow.apache.org/docs/format/CDataInterface.html

pub const ARROW_FLAG_DICTIONARY_ORDERED: i64 = 1;
pub const ARROW_FLAG_NULLABLE: i64 = 2;
pub const ARROW_FLAG_MAP_KEYS_SORTED: i64 = 4;

/// Target of empty, non-validity buffer pointers.
static EMPTY_BUFFER: [u64; 8] = [0; 8];

/// Ownership state of an exchange handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// `release` is null: the handle owns nothing and must not be read.
    Released,
    /// `release` is set: someone must call it exactly once.
    Live,
}

/// ArrowArray as per the Arrow C spec
#[repr(C)]
#[derive(Debug)]
pub struct ArrowArray {
    pub length: i64,
    pub null_count: i64,
    pub offset: i64,
    pub n_buffers: i64,
    pub n_children: i64,
    pub buffers: *mut *const u8,
    pub children: *mut *mut ArrowArray,
    pub dictionary: *mut ArrowArray,
    pub release: Option<unsafe extern "C" fn(*mut ArrowArray)>,
    pub private_data: *mut c_void,
}

/// ArrowSchema as per the Arrow C spec
#[repr(C)]
#[derive(Debug)]
pub struct ArrowSchema {
    pub format: *const c_char,
    pub name: *const c_char,
    pub metadata: *const c_char,
    pub flags: i64,
    pub n_children: i64,
    pub children: *mut *mut ArrowSchema,
    pub dictionary: *mut ArrowSchema,
    pub release: Option<unsafe extern "C" fn(*mut ArrowSchema)>,
    pub private_data: *mut c_void,
}

/// Shared handle operations. Both C structs follow the same protocol.
macro_rules! handle_protocol {
    ($handle:ident, $label:literal) => {
        impl $handle {
            #[inline]
            pub fn is_released(&self) -> bool {
                self.release.is_none()
            }

            #[inline]
            pub fn state(&self) -> HandleState {
                if self.is_released() { HandleState::Released } else { HandleState::Live }
            }

            /// Marks the handle released without running its callback.
            #[inline]
            pub(crate) fn mark_released(&mut self) {
                self.release = None;
            }

            /// Moves the handle out by value, leaving this one released.
            #[inline]
            pub fn take(&mut self) -> Self {
                mem::replace(self, Self::empty())
            }

            /// Checked move onto `dst`, which must be released.
            pub fn try_move_into(&mut self, dst: &mut $handle) -> Result<()> {
                if self.is_released() {
                    return Err(BridgeError::Released(concat!($label, " move source")));
                }
                if !dst.is_released() {
                    return Err(BridgeError::InvalidState(format!(
                        "{} move destination is still live",
                        $label
                    )));
                }
                *dst = self.take();
                Ok(())
            }

            /// Runs the release callback if the handle is live. Idempotent.
            pub fn release(&mut self) {
                if let Some(release) = self.release {
                    trace!(concat!("releasing ", $label));
                    unsafe { release(self) };
                    // A callback must mark the handle released; make sure
                    // a second call stays a no-op either way.
                    self.release = None;
                }
            }
        }
    };
}

impl ArrowArray {
    /// Creates a released ArrowArray for receiving FFI data.
    pub const fn empty() -> Self {
        Self {
            length: 0,
            null_count: 0,
            offset: 0,
            n_buffers: 0,
            n_children: 0,
            buffers: ptr::null_mut(),
            children: ptr::null_mut(),
            dictionary: ptr::null_mut(),
            release: None,
            private_data: ptr::null_mut(),
        }
    }
}

impl ArrowSchema {
    /// Creates a released ArrowSchema for receiving FFI data.
    pub const fn empty() -> Self {
        Self {
            format: ptr::null(),
            name: ptr::null(),
            metadata: ptr::null(),
            flags: 0,
            n_children: 0,
            children: ptr::null_mut(),
            dictionary: ptr::null_mut(),
            release: None,
            private_data: ptr::null_mut(),
        }
    }
}

handle_protocol!(ArrowArray, "array");
handle_protocol!(ArrowSchema, "schema");

/// Moves `src` onto `dst` and marks `src` released.
///
/// # Safety
/// Both pointers must be valid and non-overlapping. `src` must be live and
/// `dst` released; both are asserted in debug builds.
pub unsafe fn move_array(src: *mut ArrowArray, dst: *mut ArrowArray) {
    unsafe {
        debug_assert!(!(*src).is_released(), "move_array: source is already released");
        debug_assert!((*dst).is_released(), "move_array: destination is still live");
        ptr::copy_nonoverlapping(src, dst, 1);
        (*src).mark_released();
    }
}

/// Moves `src` onto `dst` and marks `src` released.
///
/// # Safety
/// Same contract as [`move_array`].
pub unsafe fn move_schema(src: *mut ArrowSchema, dst: *mut ArrowSchema) {
    unsafe {
        debug_assert!(!(*src).is_released(), "move_schema: source is already released");
        debug_assert!((*dst).is_released(), "move_schema: destination is still live");
        ptr::copy_nonoverlapping(src, dst, 1);
        (*src).mark_released();
    }
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

/// Keeps buffers, pointer tables and child handles alive while exported.
struct ExportedArray {
    #[allow(dead_code)] // holds the buffers at runtime
    data: Arc<ArrayData>,
    buffer_ptrs: Box<[*const u8]>,
    children: Box<[*mut ArrowArray]>,
    #[allow(dead_code)]
    keep_alive: Option<BufferOwner>,
}

unsafe extern "C" fn release_exported_array(array: *mut ArrowArray) {
    if array.is_null() {
        return;
    }
    let array = unsafe { &mut *array };
    if array.release.is_none() || array.private_data.is_null() {
        array.release = None;
        return;
    }
    let private = unsafe { Box::from_raw(array.private_data as *mut ExportedArray) };
    for &child in private.children.iter() {
        // Children the consumer moved out are already released.
        let mut child = unsafe { Box::from_raw(child) };
        child.release();
    }
    drop(private);
    array.private_data = ptr::null_mut();
    array.release = None;
}

/// Exports `data` zero-copy. The returned handle keeps `data` alive until
/// it is released.
pub fn export_array(data: Arc<ArrayData>) -> ArrowArray {
    export_array_with(data, None)
}

/// Export with an extra keep-alive owned by the root's private data.
pub(crate) fn export_array_with(data: Arc<ArrayData>, keep_alive: Option<BufferOwner>) -> ArrowArray {
    let layout = data.dtype().buffer_layout();
    let buffer_ptrs: Box<[*const u8]> = layout
        .iter()
        .zip(data.buffers())
        .map(|(kind, buffer)| match (kind, buffer) {
            (_, Some(b)) if !b.is_empty() => b.as_ptr(),
            (BufferKind::Validity, _) => ptr::null(),
            _ => EMPTY_BUFFER.as_ptr() as *const u8,
        })
        .collect();
    let children: Box<[*mut ArrowArray]> = data
        .children()
        .iter()
        .map(|child| Box::into_raw(Box::new(export_array_with(child.clone(), None))))
        .collect();

    trace!(dtype = %data.dtype(), len = data.len(), offset = data.offset(), "exporting array");
    let (length, null_count, offset) =
        (data.len() as i64, data.declared_null_count(), data.offset() as i64);
    let mut private = Box::new(ExportedArray { data, buffer_ptrs, children, keep_alive });
    ArrowArray {
        length,
        null_count,
        offset,
        n_buffers: private.buffer_ptrs.len() as i64,
        n_children: private.children.len() as i64,
        buffers: private.buffer_ptrs.as_mut_ptr(),
        children: private.children.as_mut_ptr(),
        dictionary: ptr::null_mut(),
        release: Some(release_exported_array),
        private_data: Box::into_raw(private) as *mut c_void,
    }
}

/// Owns the strings and child handles of an exported schema node.
struct ExportedSchema {
    #[allow(dead_code)]
    format: CString,
    #[allow(dead_code)]
    name: CString,
    #[allow(dead_code)]
    metadata: Option<Box<[u8]>>,
    children: Box<[*mut ArrowSchema]>,
}

unsafe extern "C" fn release_exported_schema(schema: *mut ArrowSchema) {
    if schema.is_null() {
        return;
    }
    let schema = unsafe { &mut *schema };
    if schema.release.is_none() || schema.private_data.is_null() {
        schema.release = None;
        return;
    }
    let private = unsafe { Box::from_raw(schema.private_data as *mut ExportedSchema) };
    for &child in private.children.iter() {
        let mut child = unsafe { Box::from_raw(child) };
        child.release();
    }
    drop(private);
    schema.private_data = ptr::null_mut();
    schema.release = None;
}

/// Exports one field and its children.
pub fn export_field(field: &Field) -> Result<ArrowSchema> {
    let format = CString::new(field.dtype.format())
        .map_err(|e| BridgeError::InvalidArgument(e.to_string()))?;
    let name = CString::new(field.name.as_str()).map_err(|_| {
        BridgeError::InvalidArgument(format!("field name {:?} contains a NUL byte", field.name))
    })?;
    let metadata = encode_metadata(&field.metadata)?;

    let mut children: Vec<*mut ArrowSchema> = Vec::with_capacity(field.dtype.children().len());
    for child in field.dtype.children() {
        match export_field(child) {
            Ok(exported) => children.push(Box::into_raw(Box::new(exported))),
            Err(e) => {
                for child in children {
                    unsafe { Box::from_raw(child) }.release();
                }
                return Err(e);
            }
        }
    }

    let flags = if field.nullable { ARROW_FLAG_NULLABLE } else { 0 };
    let mut private = Box::new(ExportedSchema {
        format,
        name,
        metadata,
        children: children.into_boxed_slice(),
    });
    Ok(ArrowSchema {
        format: private.format.as_ptr(),
        name: private.name.as_ptr(),
        metadata: private.metadata.as_ref().map_or(ptr::null(), |m| m.as_ptr() as *const c_char),
        flags,
        n_children: private.children.len() as i64,
        children: private.children.as_mut_ptr(),
        dictionary: ptr::null_mut(),
        release: Some(release_exported_schema),
        private_data: Box::into_raw(private) as *mut c_void,
    })
}

/// Exports a schema as its unnamed `+s` root.
pub fn export_schema(schema: &Schema) -> Result<ArrowSchema> {
    let root = Field::new("", schema.to_struct_type(), false, Some(schema.metadata.clone()));
    export_field(&root)
}

/// Exports a batch as a struct array plus its schema.
pub fn export_batch(batch: &RecordBatch) -> Result<(ArrowArray, ArrowSchema)> {
    let data = Arc::new(batch.to_struct_data()?);
    let schema = export_schema(batch.schema())?;
    Ok((export_array(data), schema))
}

/// Encodes metadata in the C Data Interface binary layout: an `i32` pair
/// count, then each key and value as an `i32` byte length and the bytes.
/// Empty metadata encodes as `None`, exported as a null pointer.
pub fn encode_metadata(metadata: &BTreeMap<String, String>) -> Result<Option<Box<[u8]>>> {
    if metadata.is_empty() {
        return Ok(None);
    }
    let to_i32 = |n: usize| {
        i32::try_from(n).map_err(|_| BridgeError::InvalidArgument(format!("metadata entry of {n} bytes")))
    };
    let mut out = Vec::new();
    out.extend_from_slice(&to_i32(metadata.len())?.to_ne_bytes());
    for (key, value) in metadata {
        for part in [key.as_bytes(), value.as_bytes()] {
            out.extend_from_slice(&to_i32(part.len())?.to_ne_bytes());
            out.extend_from_slice(part);
        }
    }
    Ok(Some(out.into_boxed_slice()))
}

/// Decodes metadata written by [`encode_metadata`] or any other producer.
///
/// # Safety
/// `ptr` must be null or point at a well-formed metadata blob.
pub unsafe fn decode_metadata(ptr: *const c_char) -> Result<BTreeMap<String, String>> {
    let mut metadata = BTreeMap::new();
    if ptr.is_null() {
        return Ok(metadata);
    }
    let mut cursor = ptr as *const u8;
    let pairs = unsafe { read_len(&mut cursor)? };
    for _ in 0..pairs {
        let key = unsafe { read_string(&mut cursor)? };
        let value = unsafe { read_string(&mut cursor)? };
        metadata.insert(key, value);
    }
    Ok(metadata)
}

unsafe fn read_len(cursor: &mut *const u8) -> Result<usize> {
    let n = unsafe { ptr::read_unaligned(*cursor as *const i32) };
    *cursor = unsafe { (*cursor).add(mem::size_of::<i32>()) };
    usize::try_from(n).map_err(|_| BridgeError::InvalidData(format!("negative metadata length {n}")))
}

unsafe fn read_string(cursor: &mut *const u8) -> Result<String> {
    let len = unsafe { read_len(cursor)? };
    let bytes = unsafe { std::slice::from_raw_parts(*cursor, len) };
    *cursor = unsafe { (*cursor).add(len) };
    String::from_utf8(bytes.to_vec())
        .map_err(|_| BridgeError::InvalidData("metadata is not valid UTF-8".into()))
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Reads a C string slot; null reads as `None`.
unsafe fn read_c_str<'a>(p: *const c_char, what: &str) -> Result<Option<&'a str>> {
    if p.is_null() {
        return Ok(None);
    }
    unsafe { CStr::from_ptr(p) }
        .to_str()
        .map(Some)
        .map_err(|_| BridgeError::InvalidData(format!("{what} is not valid UTF-8")))
}

/// Imports one field and its children. The handle is only read.
///
/// # Safety
/// `schema` and every child it references must follow the C Data Interface.
pub unsafe fn import_field(schema: &ArrowSchema) -> Result<Field> {
    if schema.is_released() {
        return Err(BridgeError::Released("schema import"));
    }
    if !schema.dictionary.is_null() {
        return Err(BridgeError::NotImplemented("dictionary-encoded fields".into()));
    }
    let format = unsafe { read_c_str(schema.format, "format")? }
        .ok_or_else(|| BridgeError::InvalidData("schema has a null format string".into()))?;
    let name = unsafe { read_c_str(schema.name, "field name")? }.unwrap_or_default().to_string();
    let metadata = unsafe { decode_metadata(schema.metadata)? };

    let n_children = usize::try_from(schema.n_children)
        .map_err(|_| BridgeError::InvalidData(format!("negative child count {}", schema.n_children)))?;
    let mut children = Vec::with_capacity(n_children);
    for i in 0..n_children {
        let child = unsafe { child_at(schema.children, i, "schema")? };
        children.push(unsafe { import_field(&*child)? });
    }
    let dtype = ArrowType::from_format(format, children)?;
    Ok(Field::new(name, dtype, schema.flags & ARROW_FLAG_NULLABLE != 0, Some(metadata)))
}

/// Imports the `+s` root of a record batch schema.
///
/// # Safety
/// Same contract as [`import_field`].
pub unsafe fn import_schema(schema: &ArrowSchema) -> Result<Schema> {
    let root = unsafe { import_field(schema)? };
    Schema::try_from_struct_field(root)
}

unsafe fn child_at<T>(children: *mut *mut T, i: usize, what: &str) -> Result<*mut T> {
    if children.is_null() {
        return Err(BridgeError::InvalidData(format!("{what} children table is null")));
    }
    let child = unsafe { *children.add(i) };
    if child.is_null() {
        return Err(BridgeError::InvalidData(format!("{what} child {i} is null")));
    }
    Ok(child)
}

/// A foreign array moved into Rust. Releases the producer exactly once, when
/// the last buffer window onto it drops.
struct ImportedArray {
    array: ArrowArray,
}

impl Drop for ImportedArray {
    fn drop(&mut self) {
        trace!("releasing imported array");
        self.array.release();
    }
}

// The producer's buffers are immutable while exported.
unsafe impl Send for ImportedArray {}
unsafe impl Sync for ImportedArray {}

/// Imports a live array, taking ownership of the handle.
///
/// `array` is left released on every path: on success its buffers are now
/// shared by the returned `ArrayData`, on failure the producer has already
/// been released.
///
/// # Safety
/// `array` must follow the C Data Interface and match `dtype`.
pub unsafe fn import_array(array: &mut ArrowArray, dtype: &ArrowType) -> Result<ArrayData> {
    if array.is_released() {
        return Err(BridgeError::Released("array import"));
    }
    let imported = Arc::new(ImportedArray { array: array.take() });
    debug!(
        dtype = %dtype,
        len = imported.array.length,
        offset = imported.array.offset,
        "importing array"
    );
    let owner: BufferOwner = imported.clone();
    unsafe { import_node(&imported.array, dtype, &owner) }
}

unsafe fn import_node(node: &ArrowArray, dtype: &ArrowType, owner: &BufferOwner) -> Result<ArrayData> {
    if !node.dictionary.is_null() {
        return Err(BridgeError::NotImplemented("dictionary-encoded arrays".into()));
    }
    let invalid = |msg: String| BridgeError::InvalidData(format!("{dtype}: {msg}"));
    let len = usize::try_from(node.length).map_err(|_| invalid(format!("length {}", node.length)))?;
    let offset = usize::try_from(node.offset).map_err(|_| invalid(format!("offset {}", node.offset)))?;
    let end = offset.checked_add(len).ok_or_else(|| invalid("offset + length overflows".into()))?;

    let layout = dtype.buffer_layout();
    if node.n_buffers != layout.len() as i64 {
        return Err(invalid(format!("expected {} buffers, found {}", layout.len(), node.n_buffers)));
    }
    let n_children = dtype.children().len();
    if node.n_children != n_children as i64 {
        return Err(invalid(format!("expected {n_children} children, found {}", node.n_children)));
    }
    if !layout.is_empty() && node.buffers.is_null() {
        return Err(invalid("buffer table is null".into()));
    }

    let mut buffers = Vec::with_capacity(layout.len());
    // Byte length of the data buffer, read from the last offset
    let mut data_len = 0usize;
    for (i, kind) in layout.iter().enumerate() {
        let p = unsafe { *node.buffers.add(i) };
        let buffer = match *kind {
            BufferKind::Validity if p.is_null() => None,
            BufferKind::Validity => Some(unsafe { foreign_window(owner, p, bytes_for_bits(end), 1, i)? }),
            BufferKind::Values(bits) => {
                let bytes = end.checked_mul(bits).map(bytes_for_bits).ok_or_else(|| invalid("values size overflows".into()))?;
                Some(unsafe { foreign_window(owner, p, bytes, (bits / 8).max(1), i)? })
            }
            BufferKind::Offsets(width) if p.is_null() && end == 0 => {
                // Producers may omit the offsets of an empty array.
                Some(zero_offsets(width))
            }
            BufferKind::Offsets(width) => {
                let bytes = end
                    .checked_add(1)
                    .and_then(|n| n.checked_mul(width))
                    .ok_or_else(|| invalid("offsets size overflows".into()))?;
                let b = unsafe { foreign_window(owner, p, bytes, width, i)? };
                data_len = match width {
                    4 => b.typed::<i32>()?[end].max(0) as usize,
                    _ => b.typed::<i64>()?[end].max(0) as usize,
                };
                Some(b)
            }
            BufferKind::Data => Some(unsafe { foreign_window(owner, p, data_len, 1, i)? }),
        };
        buffers.push(buffer);
    }

    let mut children = Vec::with_capacity(n_children);
    for (i, field) in dtype.children().iter().enumerate() {
        let child = unsafe { child_at(node.children, i, "array")? };
        children.push(Arc::new(unsafe { import_node(&*child, &field.dtype, owner)? }));
    }
    ArrayData::try_new(dtype.clone(), len, offset, node.null_count, buffers, children)
}

/// Zero-copy window over `len` producer bytes, realigned by copy if needed.
unsafe fn foreign_window(
    owner: &BufferOwner,
    p: *const u8,
    len: usize,
    align: usize,
    index: usize,
) -> Result<SharedBuffer> {
    if len == 0 {
        return Ok(SharedBuffer::new());
    }
    if p.is_null() {
        return Err(BridgeError::InvalidData(format!(
            "buffer {index} is null but {len} bytes are required"
        )));
    }
    let window = unsafe { SharedBuffer::from_foreign(owner.clone(), p, len) };
    if window.is_aligned(align) {
        Ok(window)
    } else {
        warn!(buffer = index, align, "imported buffer is misaligned, copying");
        Ok(window.to_aligned())
    }
}

fn zero_offsets(width: usize) -> SharedBuffer {
    if width == 4 {
        SharedBuffer::from_vec64(vec64![0i32])
    } else {
        SharedBuffer::from_vec64(vec64![0i64])
    }
}

/// Imports a batch exported as a struct array plus schema.
///
/// Both handles are consumed on every path: the schema is released once it
/// has been read and the array is moved in.
///
/// # Safety
/// Both handles must follow the C Data Interface.
pub unsafe fn import_batch(array: &mut ArrowArray, schema: &mut ArrowSchema) -> Result<RecordBatch> {
    let imported = unsafe { import_schema(schema) };
    schema.release();
    let schema = match imported {
        Ok(s) => Arc::new(s),
        Err(e) => {
            array.release();
            return Err(e);
        }
    };
    let data = unsafe { import_array(array, &schema.to_struct_type())? };
    RecordBatch::from_struct_data(schema, &data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::value::Value;
    use crate::structs::builders::ArrayBuilder;
    use crate::structs::memory_pool::MemoryPool;
    use crate::structs::views::ArrayView;

    fn costs_type() -> ArrowType {
        ArrowType::List(Box::new(Field::new("item", ArrowType::Float64, true, None)))
    }

    fn costs(pool: Arc<MemoryPool>) -> ArrayData {
        let mut b = ArrayBuilder::new(&costs_type(), pool);
        for row in [vec![10.0], vec![11.0, 12.0, 13.0], vec![15.0, 25.0]] {
            b.append_value(&Value::List(row.into_iter().map(Value::Float64).collect())).unwrap();
        }
        b.append_null().unwrap();
        b.finish().unwrap()
    }

    #[test]
    fn test_metadata_layout() {
        let mut md = BTreeMap::new();
        md.insert("k".to_string(), "vv".to_string());
        let blob = encode_metadata(&md).unwrap().unwrap();
        let mut expected = Vec::new();
        for n in [1i32, 1] {
            expected.extend_from_slice(&n.to_ne_bytes());
        }
        expected.push(b'k');
        expected.extend_from_slice(&2i32.to_ne_bytes());
        expected.extend_from_slice(b"vv");
        assert_eq!(&*blob, expected.as_slice());
        let back = unsafe { decode_metadata(blob.as_ptr() as *const c_char) }.unwrap();
        assert_eq!(back, md);
        assert!(encode_metadata(&BTreeMap::new()).unwrap().is_none());
    }

    #[test]
    fn test_export_import_is_zero_copy() {
        let data = Arc::new(costs(MemoryPool::unbounded()));
        let values_ptr = data.child(0).unwrap().buffer(1).unwrap().as_ptr();
        let mut exported = export_array(data.clone());
        assert_eq!(exported.state(), HandleState::Live);
        assert_eq!(exported.n_buffers, 2);
        assert_eq!(exported.n_children, 1);

        let imported = unsafe { import_array(&mut exported, &costs_type()) }.unwrap();
        assert!(exported.is_released());
        assert_eq!(imported.child(0).unwrap().buffer(1).unwrap().as_ptr(), values_ptr);
        assert_eq!(
            ArrayView::try_new(&imported).unwrap().to_values().unwrap(),
            ArrayView::try_new(&data).unwrap().to_values().unwrap()
        );
    }

    #[test]
    fn test_release_frees_pool_exactly_once() {
        let pool = MemoryPool::unbounded();
        let mut exported = export_array(Arc::new(costs(pool.clone())));
        assert!(pool.bytes_allocated() > 0);
        exported.release();
        assert_eq!(pool.bytes_allocated(), 0);
        assert!(exported.is_released());
        exported.release();
        assert_eq!(pool.bytes_allocated(), 0);
    }

    #[test]
    fn test_imported_owner_releases_on_last_drop() {
        let pool = MemoryPool::unbounded();
        let mut exported = export_array(Arc::new(costs(pool.clone())));
        let imported = unsafe { import_array(&mut exported, &costs_type()) }.unwrap();
        let child = imported.child(0).unwrap().clone();
        drop(imported);
        assert!(pool.bytes_allocated() > 0);
        drop(child);
        assert_eq!(pool.bytes_allocated(), 0);
    }

    #[test]
    fn test_checked_moves() {
        let mut src = export_array(Arc::new(ArrayData::new_null(3)));
        let mut dst = ArrowArray::empty();
        src.try_move_into(&mut dst).unwrap();
        assert!(src.is_released());
        assert_eq!(dst.length, 3);
        assert!(matches!(src.try_move_into(&mut dst), Err(BridgeError::Released(_))));

        let mut other = export_array(Arc::new(ArrayData::new_null(1)));
        assert!(matches!(other.try_move_into(&mut dst), Err(BridgeError::InvalidState(_))));
        other.release();
        dst.release();
    }

    #[test]
    fn test_schema_round_trip_keeps_nullability_and_metadata() {
        let mut md = BTreeMap::new();
        md.insert("unit".to_string(), "usd".to_string());
        let schema = Schema::new(
            vec![
                Field::new("id", ArrowType::Int64, false, None),
                Field::new("component_cost", costs_type(), true, Some(md.clone())),
            ],
            md,
        );
        let mut exported = export_schema(&schema).unwrap();
        let back = unsafe { import_schema(&exported) }.unwrap();
        assert_eq!(back, schema);
        exported.release();
        assert!(matches!(unsafe { import_schema(&exported) }, Err(BridgeError::Released(_))));
    }

    #[test]
    fn test_import_rejects_wrong_layout_and_releases() {
        let pool = MemoryPool::unbounded();
        let mut exported = export_array(Arc::new(costs(pool.clone())));
        let err = unsafe { import_array(&mut exported, &ArrowType::Int32) }.unwrap_err();
        assert!(matches!(err, BridgeError::InvalidData(_)));
        assert!(exported.is_released());
        assert_eq!(pool.bytes_allocated(), 0);
    }

    #[test]
    fn test_oversized_length_is_invalid_data() {
        let pool = MemoryPool::unbounded();
        let mut b = ArrayBuilder::new(&ArrowType::String, pool.clone());
        b.append_value(&Value::from("a")).unwrap();
        let mut exported = export_array(Arc::new(b.finish().unwrap()));
        exported.length = i64::MAX;
        let err = unsafe { import_array(&mut exported, &ArrowType::String) }.unwrap_err();
        assert!(matches!(&err, BridgeError::InvalidData(msg) if msg.contains("offsets size")), "{err}");
        assert!(exported.is_released());
        assert_eq!(pool.bytes_allocated(), 0);
    }

    #[test]
    fn test_sliced_export_carries_offset() {
        let data = Arc::new(costs(MemoryPool::unbounded()).slice(1, 2).unwrap());
        let mut exported = export_array(data.clone());
        assert_eq!(exported.offset, 1);
        let imported = unsafe { import_array(&mut exported, &costs_type()) }.unwrap();
        assert_eq!(
            ArrayView::try_new(&imported).unwrap().value(0).unwrap(),
            Value::List(vec![Value::Float64(11.0), Value::Float64(12.0), Value::Float64(13.0)])
        );
    }

    #[test]
    fn test_empty_string_column_exports_non_null_data() {
        let mut b = ArrayBuilder::new(&ArrowType::String, MemoryPool::unbounded());
        let data = Arc::new(b.finish().unwrap());
        let mut exported = export_array(data);
        let ptrs = unsafe { std::slice::from_raw_parts(exported.buffers, 3) };
        assert!(ptrs[0].is_null());
        assert!(!ptrs[2].is_null());
        let back = unsafe { import_array(&mut exported, &ArrowType::String) }.unwrap();
        assert!(back.is_empty());
    }
}
