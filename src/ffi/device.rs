//! # **Device Module** - *Arrow C Device Data Interface*
//!
//! `ArrowDeviceArray` wraps an [`ArrowArray`] with the device that owns its
//! memory and an optional synchronization event the consumer must wait on
//! before reading.
//!
//! ## Host emulation
//! This crate has no GPU runtime. Device memory is emulated on the host:
//! - [`SyncEvent`] is a host event (`parking_lot` mutex and condvar) that a
//!   producer thread signals once the buffers are ready.
//! - [`HostSync`] can wait on events from `CPU` and `EXT_DEV` exports made by
//!   this crate. A null event means the data is already synchronized.
//! - Importing requires host-readable memory: `CPU`, `CUDA_HOST`, `ROCM_HOST`,
//!   `CUDA_MANAGED` and the emulated `EXT_DEV`.
//!
//! [`get_sum`] is the reference consumer: it takes a device array, reduces
//! it and hands a one-element result back by move.

use std::ffi::c_void;
use std::fmt::{Display, Formatter};
use std::ptr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};
use tracing::{debug, trace};

use crate::compute::kernels;
use crate::enums::error::{BridgeError, Result};
use crate::enums::status::StatusCode;
use crate::ffi::arrow_c_ffi::{
    ArrowArray, ArrowSchema, HandleState, export_array_with, export_field, import_array,
    import_field,
};
use crate::ffi::arrow_dtype::ArrowType;
use crate::structs::array_data::ArrayData;
use crate::structs::builders::ArrayBuilder;
use crate::structs::field::Field;
use crate::structs::memory_pool::MemoryPool;
use crate::structs::shared_buffer::BufferOwner;

/// Device kinds of the C Device Data Interface.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceType {
    Cpu = 1,
    Cuda = 2,
    CudaHost = 3,
    OpenCl = 4,
    Vulkan = 7,
    Metal = 8,
    Vpi = 9,
    Rocm = 10,
    RocmHost = 11,
    ExtDev = 12,
    CudaManaged = 13,
    OneApi = 14,
    WebGpu = 15,
    Hexagon = 16,
}

impl DeviceType {
    /// Memory the host can read directly, with this crate's `EXT_DEV`
    /// emulation counted as host memory.
    pub fn is_host_readable(self) -> bool {
        matches!(
            self,
            DeviceType::Cpu
                | DeviceType::CudaHost
                | DeviceType::RocmHost
                | DeviceType::CudaManaged
                | DeviceType::ExtDev
        )
    }
}

impl TryFrom<i32> for DeviceType {
    type Error = BridgeError;

    fn try_from(raw: i32) -> Result<Self> {
        Ok(match raw {
            1 => DeviceType::Cpu,
            2 => DeviceType::Cuda,
            3 => DeviceType::CudaHost,
            4 => DeviceType::OpenCl,
            7 => DeviceType::Vulkan,
            8 => DeviceType::Metal,
            9 => DeviceType::Vpi,
            10 => DeviceType::Rocm,
            11 => DeviceType::RocmHost,
            12 => DeviceType::ExtDev,
            13 => DeviceType::CudaManaged,
            14 => DeviceType::OneApi,
            15 => DeviceType::WebGpu,
            16 => DeviceType::Hexagon,
            other => return Err(BridgeError::InvalidData(format!("unknown device type {other}"))),
        })
    }
}

impl Display for DeviceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// ArrowDeviceArray as per the Arrow C Device spec
#[repr(C)]
#[derive(Debug)]
pub struct ArrowDeviceArray {
    pub array: ArrowArray,
    pub device_id: i64,
    pub device_type: i32,
    pub sync_event: *mut c_void,
    pub reserved: [i64; 3],
}

impl ArrowDeviceArray {
    /// Creates a released ArrowDeviceArray for receiving FFI data.
    pub const fn empty() -> Self {
        Self {
            array: ArrowArray::empty(),
            device_id: -1,
            device_type: 0,
            sync_event: ptr::null_mut(),
            reserved: [0; 3],
        }
    }

    #[inline]
    pub fn is_released(&self) -> bool {
        self.array.is_released()
    }

    #[inline]
    pub fn state(&self) -> HandleState {
        self.array.state()
    }

    pub fn device(&self) -> Result<DeviceType> {
        DeviceType::try_from(self.device_type)
    }

    /// Moves the handle out by value, leaving this one released.
    pub fn take(&mut self) -> Self {
        std::mem::replace(self, Self::empty())
    }

    /// Checked move onto `dst`, which must be released.
    pub fn try_move_into(&mut self, dst: &mut ArrowDeviceArray) -> Result<()> {
        if self.is_released() {
            return Err(BridgeError::Released("device array move source"));
        }
        if !dst.is_released() {
            return Err(BridgeError::InvalidState(
                "device array move destination is still live".into(),
            ));
        }
        *dst = self.take();
        Ok(())
    }

    /// Releases the wrapped array. Idempotent.
    pub fn release(&mut self) {
        if !self.is_released() {
            trace!(device = self.device_type, "releasing device array");
        }
        self.array.release();
        self.sync_event = ptr::null_mut();
    }
}

/// Moves `src` onto `dst` and marks `src` released.
///
/// # Safety
/// Same contract as [`move_array`](crate::ffi::arrow_c_ffi::move_array).
pub unsafe fn move_device_array(src: *mut ArrowDeviceArray, dst: *mut ArrowDeviceArray) {
    unsafe {
        debug_assert!(!(*src).is_released(), "move_device_array: source is already released");
        debug_assert!((*dst).is_released(), "move_device_array: destination is still live");
        ptr::copy_nonoverlapping(src, dst, 1);
        (*src).array.mark_released();
        (*src).sync_event = ptr::null_mut();
    }
}

/// # SyncEvent
///
/// One-shot host event. Waiters block until [`SyncEvent::signal`].
#[derive(Debug, Default)]
pub struct SyncEvent {
    signaled: Mutex<bool>,
    ready: Condvar,
}

impl SyncEvent {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn signal(&self) {
        let mut signaled = self.signaled.lock();
        *signaled = true;
        self.ready.notify_all();
    }

    pub fn is_signaled(&self) -> bool {
        *self.signaled.lock()
    }

    pub fn wait(&self) {
        let mut signaled = self.signaled.lock();
        while !*signaled {
            self.ready.wait(&mut signaled);
        }
    }

    /// Returns false if `timeout` passed before the event was signaled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut signaled = self.signaled.lock();
        if !*signaled {
            let _ = self.ready.wait_while_for(&mut signaled, |s| !*s, timeout);
        }
        *signaled
    }
}

/// Consumer-side wait on the event carried by a device array.
pub trait DeviceSync {
    /// Blocks until the producer's work on `event` is complete.
    ///
    /// # Safety
    /// `event` must be null or the event pointer of a live device array of
    /// type `device`.
    unsafe fn synchronize(&self, device: DeviceType, event: *mut c_void) -> Result<()>;
}

/// Waits on host [`SyncEvent`]s exported by this crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct HostSync;

impl DeviceSync for HostSync {
    unsafe fn synchronize(&self, device: DeviceType, event: *mut c_void) -> Result<()> {
        if event.is_null() {
            return Ok(());
        }
        match device {
            DeviceType::Cpu | DeviceType::ExtDev => {
                let event = unsafe { &*(event as *const SyncEvent) };
                debug!(%device, signaled = event.is_signaled(), "waiting on sync event");
                event.wait();
                Ok(())
            }
            other => Err(BridgeError::NotImplemented(format!("synchronization on {other}"))),
        }
    }
}

/// Exports `data` as living on `device`. The event, if any, stays alive
/// until the export is released.
pub fn export_device_array(
    data: Arc<ArrayData>,
    device: DeviceType,
    device_id: i64,
    event: Option<Arc<SyncEvent>>,
) -> ArrowDeviceArray {
    let sync_event = event.as_ref().map_or(ptr::null_mut(), |e| Arc::as_ptr(e) as *mut c_void);
    let keep_alive = event.map(|e| e as BufferOwner);
    ArrowDeviceArray {
        array: export_array_with(data, keep_alive),
        device_id,
        device_type: device as i32,
        sync_event,
        reserved: [0; 3],
    }
}

/// Waits on the carried event, then imports the host-readable array.
///
/// `array` is consumed on every path.
///
/// # Safety
/// `array` must follow the C Device Data Interface and match `dtype`.
pub unsafe fn import_device_array(
    array: &mut ArrowDeviceArray,
    dtype: &ArrowType,
    sync: &dyn DeviceSync,
) -> Result<ArrayData> {
    if array.is_released() {
        return Err(BridgeError::Released("device array import"));
    }
    let checked = array.device().and_then(|device| {
        unsafe { sync.synchronize(device, array.sync_event)? };
        if device.is_host_readable() {
            Ok(device)
        } else {
            Err(BridgeError::NotImplemented(format!("reading {device} memory from the host")))
        }
    });
    match checked {
        Ok(device) => {
            debug!(%device, device_id = array.device_id, "importing device array");
            array.sync_event = ptr::null_mut();
            unsafe { import_array(&mut array.array, dtype) }
        }
        Err(e) => {
            array.release();
            Err(e)
        }
    }
}

/// Sums a device array into a one-element `result` column.
///
/// - signed integers sum to `Int64`, unsigned to `UInt64`, both wrapping
/// - floats sum to `Float64`
/// - an empty or all-null input gives a null result
///
/// The output is produced on the input's device with no sync event. The
/// input schema and array are released on every path.
///
/// # Safety
/// All four pointers must reference valid handles. The outputs must be
/// released.
pub unsafe fn get_sum(
    in_schema: &mut ArrowSchema,
    input: &mut ArrowDeviceArray,
    out_schema: &mut ArrowSchema,
    output: &mut ArrowDeviceArray,
) -> Result<()> {
    let result = unsafe { sum_into(in_schema, input, out_schema, output) };
    in_schema.release();
    input.release();
    result
}

unsafe fn sum_into(
    in_schema: &mut ArrowSchema,
    input: &mut ArrowDeviceArray,
    out_schema: &mut ArrowSchema,
    output: &mut ArrowDeviceArray,
) -> Result<()> {
    if !out_schema.is_released() || !output.is_released() {
        return Err(BridgeError::InvalidState("sum outputs must be released".into()));
    }
    let field = unsafe { import_field(in_schema)? };
    let device = input.device()?;
    let device_id = input.device_id;
    let data = unsafe { import_device_array(input, &field.dtype, &HostSync)? };

    let total = kernels::sum(&data)?;
    let result_field = Field::new("result", kernels::sum_type(&field.dtype)?, true, None);
    let mut builder = ArrayBuilder::new(&result_field.dtype, MemoryPool::default_pool());
    builder.append_value(&total)?;
    let column = Arc::new(builder.finish()?);
    debug!(input = %field.dtype, rows = data.len(), result = %total, "computed device sum");

    let mut schema = export_field(&result_field)?;
    let mut array = export_device_array(column, device, device_id, None);
    schema.try_move_into(out_schema)?;
    array.try_move_into(output)?;
    Ok(())
}

/// C entry point for [`get_sum`]. Returns a [`StatusCode`] as `u8`.
///
/// # Safety
/// Same contract as [`get_sum`]. Null pointers yield `INVALID_ARGUMENT`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn colbridge_get_sum(
    in_schema: *mut ArrowSchema,
    input: *mut ArrowDeviceArray,
    out_schema: *mut ArrowSchema,
    output: *mut ArrowDeviceArray,
) -> u8 {
    if in_schema.is_null() || input.is_null() || out_schema.is_null() || output.is_null() {
        return StatusCode::InvalidArgument as u8;
    }
    let result = unsafe { get_sum(&mut *in_schema, &mut *input, &mut *out_schema, &mut *output) };
    match result {
        Ok(()) => StatusCode::Ok as u8,
        Err(e) => {
            debug!(error = %e, "colbridge_get_sum failed");
            e.status_code() as u8
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::value::Value;
    use crate::structs::views::ArrayView;
    use std::thread;

    fn ints(values: &[Option<i32>], pool: Arc<MemoryPool>) -> Arc<ArrayData> {
        let mut b = ArrayBuilder::new(&ArrowType::Int32, pool);
        let ints = b.as_primitive_mut::<i32>().unwrap();
        for v in values {
            ints.append_option(*v).unwrap();
        }
        Arc::new(b.finish().unwrap())
    }

    fn int_schema() -> ArrowSchema {
        export_field(&Field::new("", ArrowType::Int32, true, None)).unwrap()
    }

    fn read_result(schema: &mut ArrowSchema, output: &mut ArrowDeviceArray) -> Value {
        let field = unsafe { import_field(schema) }.unwrap();
        assert_eq!(field.name, "result");
        schema.release();
        let data = unsafe { import_array(&mut output.array, &field.dtype) }.unwrap();
        assert_eq!(data.len(), 1);
        ArrayView::try_new(&data).unwrap().value(0).unwrap()
    }

    #[test]
    fn test_sum_on_cpu() {
        let pool = MemoryPool::unbounded();
        let mut in_schema = int_schema();
        let mut input =
            export_device_array(ints(&[Some(1), None, Some(-4), Some(10)], pool.clone()), DeviceType::Cpu, 0, None);
        let (mut out_schema, mut output) = (ArrowSchema::empty(), ArrowDeviceArray::empty());

        unsafe { get_sum(&mut in_schema, &mut input, &mut out_schema, &mut output) }.unwrap();
        assert!(in_schema.is_released());
        assert!(input.is_released());
        assert_eq!(pool.bytes_allocated(), 0);
        assert_eq!(output.device().unwrap(), DeviceType::Cpu);
        assert!(output.sync_event.is_null());
        assert_eq!(read_result(&mut out_schema, &mut output), Value::Int64(7));
    }

    #[test]
    fn test_all_null_sum_is_null() {
        let mut in_schema = int_schema();
        let mut input =
            export_device_array(ints(&[None, None], MemoryPool::unbounded()), DeviceType::ExtDev, 3, None);
        let (mut out_schema, mut output) = (ArrowSchema::empty(), ArrowDeviceArray::empty());
        unsafe { get_sum(&mut in_schema, &mut input, &mut out_schema, &mut output) }.unwrap();
        assert_eq!(output.device_id, 3);
        assert_eq!(read_result(&mut out_schema, &mut output), Value::Null);
    }

    #[test]
    fn test_sum_waits_for_producer_event() {
        let event = SyncEvent::new();
        let mut in_schema = int_schema();
        let mut input = export_device_array(
            ints(&[Some(2), Some(3)], MemoryPool::unbounded()),
            DeviceType::ExtDev,
            0,
            Some(event.clone()),
        );
        let producer = {
            let event = event.clone();
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                event.signal();
            })
        };
        let (mut out_schema, mut output) = (ArrowSchema::empty(), ArrowDeviceArray::empty());
        unsafe { get_sum(&mut in_schema, &mut input, &mut out_schema, &mut output) }.unwrap();
        assert!(event.is_signaled());
        producer.join().unwrap();
        assert_eq!(Arc::strong_count(&event), 1);
        assert_eq!(read_result(&mut out_schema, &mut output), Value::Int64(5));
    }

    #[test]
    fn test_live_output_is_rejected_and_input_released() {
        let pool = MemoryPool::unbounded();
        let mut in_schema = int_schema();
        let mut input = export_device_array(ints(&[Some(1)], pool.clone()), DeviceType::Cpu, 0, None);
        let mut out_schema = int_schema();
        let mut output = ArrowDeviceArray::empty();
        let err = unsafe { get_sum(&mut in_schema, &mut input, &mut out_schema, &mut output) };
        assert!(matches!(err, Err(BridgeError::InvalidState(_))));
        assert!(input.is_released());
        assert_eq!(pool.bytes_allocated(), 0);
        out_schema.release();
    }

    #[test]
    fn test_device_memory_is_not_host_readable() {
        let pool = MemoryPool::unbounded();
        let mut input = export_device_array(ints(&[Some(1)], pool.clone()), DeviceType::Cuda, 0, None);
        let err = unsafe { import_device_array(&mut input, &ArrowType::Int32, &HostSync) };
        assert!(matches!(err, Err(BridgeError::NotImplemented(_))));
        assert!(input.is_released());
        assert_eq!(pool.bytes_allocated(), 0);
    }

    #[test]
    fn test_c_entry_point_status() {
        let mut in_schema = int_schema();
        let mut input = export_device_array(ints(&[Some(4)], MemoryPool::unbounded()), DeviceType::Cpu, 0, None);
        let (mut out_schema, mut output) = (ArrowSchema::empty(), ArrowDeviceArray::empty());
        let code = unsafe { colbridge_get_sum(&mut in_schema, &mut input, &mut out_schema, &mut output) };
        assert_eq!(code, StatusCode::Ok as u8);
        out_schema.release();
        output.release();
        let code = unsafe {
            colbridge_get_sum(ptr::null_mut(), &mut input, &mut out_schema, &mut output)
        };
        assert_eq!(code, StatusCode::InvalidArgument as u8);
    }

    #[test]
    fn test_wait_timeout_and_moves() {
        let event = SyncEvent::new();
        assert!(!event.wait_timeout(Duration::from_millis(5)));
        event.signal();
        assert!(event.wait_timeout(Duration::from_millis(5)));

        let mut src = export_device_array(Arc::new(ArrayData::new_null(2)), DeviceType::Cpu, 1, None);
        let mut dst = ArrowDeviceArray::empty();
        unsafe { move_device_array(&mut src, &mut dst) };
        assert!(src.is_released());
        assert_eq!(dst.array.length, 2);
        assert!(matches!(src.try_move_into(&mut dst), Err(BridgeError::Released(_))));
        dst.release();
        dst.release();
        assert_eq!(dst.state(), HandleState::Released);
    }
}
