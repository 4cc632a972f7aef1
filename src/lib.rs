//! Copyright © 2025 Peter Garfield Bower. All rights reserved.
//!
//! # **colbridge** - *Zero-copy columnar interchange over the Arrow C Data Interface*
//!
//! Build columnar arrays from rows, hand them across a language or runtime
//! boundary without copying, and read them back, with ownership transferred
//! explicitly through export, move and release.
//!
//! ## Layout
//! - [`structs`]: buffers, `ArrayData`, builders, views, batches and tables
//! - [`ffi`]: the C Data Interface structs, export/import, schemas and the
//!   device variant
//! - [`conversions`]: row ⇄ columnar conversion
//! - [`compute`]: kernels, `Datum`, batch readers and minimal pipelines
//! - [`driver`]: database driver interfaces
//!
//! ## Features
//! - `cast_arrow`: interop checks against *arrow-rs*
//! - `parallel_proc`: parallel reductions via *Rayon*

#![feature(allocator_api)]

pub mod enums {
    pub mod error;
    pub mod status;
    pub mod value;
}

pub mod structs {
    pub mod views {
        pub mod array_view;
        pub mod bitmask_view;
        pub mod boolean_view;
        pub mod list_view;
        pub mod primitive_view;
        pub mod string_view;
        pub mod struct_view;

        pub use array_view::ArrayView;
        pub use bitmask_view::BitmaskView;
        pub use boolean_view::BooleanView;
        pub use list_view::ListView;
        pub use primitive_view::PrimitiveView;
        pub use string_view::StringView;
        pub use struct_view::StructView;
    }
    pub mod builders {
        pub mod array_builder;
        pub mod boolean;
        pub mod buffer_builder;
        pub mod list;
        pub mod primitive;
        pub mod record_batch_builder;
        pub mod string;
        pub mod structure;
        pub mod validity;

        pub use array_builder::{ArrayBuilder, NullBuilder};
        pub use boolean::BooleanBuilder;
        pub use buffer_builder::BufferBuilder;
        pub use list::ListBuilder;
        pub use primitive::PrimitiveBuilder;
        pub use record_batch_builder::RecordBatchBuilder;
        pub use string::StringBuilder;
        pub use structure::StructBuilder;
        pub use validity::ValidityBuilder;
    }
    pub mod array_data;
    pub mod bitmask;
    pub mod buffer;
    pub mod field;
    pub mod memory_pool;
    pub mod record_batch;
    pub mod shared_buffer;
    pub mod table;
}

pub mod ffi {
    pub mod arrow_c_ffi;
    pub mod arrow_dtype;
    pub mod device;
    pub mod schema;
}

pub mod traits {
    pub mod print;
    pub mod type_unions;
}

pub mod conversions {
    pub mod rows;
}

pub mod compute {
    pub mod datum;
    pub mod kernels;
    pub mod plan;
}

pub mod driver;
pub mod utils;

pub use ::vec64::{Vec64, vec64};

pub use enums::error::{BridgeError, Result};
pub use enums::status::StatusCode;
pub use enums::value::{FromValue, IntoValue, Row, Value};

pub use structs::array_data::ArrayData;
pub use structs::bitmask::Bitmask;
pub use structs::buffer::Buffer;
pub use structs::builders::{
    ArrayBuilder, BooleanBuilder, ListBuilder, NullBuilder, PrimitiveBuilder, RecordBatchBuilder,
    StringBuilder, StructBuilder,
};
pub use structs::field::Field;
pub use structs::memory_pool::MemoryPool;
pub use structs::record_batch::RecordBatch;
pub use structs::shared_buffer::{BufferOwner, SharedBuffer};
pub use structs::table::Table;
pub use structs::views::{
    ArrayView, BitmaskView, BooleanView, ListView, PrimitiveView, StringView, StructView,
};

pub use ffi::arrow_c_ffi::{
    ARROW_FLAG_DICTIONARY_ORDERED, ARROW_FLAG_MAP_KEYS_SORTED, ARROW_FLAG_NULLABLE, ArrowArray,
    ArrowSchema, HandleState, decode_metadata, encode_metadata, export_array, export_batch,
    export_field, export_schema, import_array, import_batch, import_field, import_schema,
    move_array, move_schema,
};
pub use ffi::arrow_dtype::{ArrowType, BufferKind};
pub use ffi::device::{
    ArrowDeviceArray, DeviceSync, DeviceType, HostSync, SyncEvent, colbridge_get_sum,
    export_device_array, get_sum, import_device_array, move_device_array,
};
pub use ffi::schema::Schema;

pub use traits::print::Print;
pub use traits::type_unions::{Float, Integer, NativeType, OffsetType};

pub use conversions::rows::{
    RowCursor, RowRecord, batch_to_rows, records_to_table, rows_to_batch, table_to_records,
    table_to_rows,
};

pub use compute::datum::{BatchReader, Datum, VecBatchReader};
pub use compute::plan::{Aggregate, Declaration, Predicate};

pub use driver::{
    Connection, Database, Driver, DriverOptions, QueryResult, Session, Statement,
};
