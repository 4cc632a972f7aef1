use std::fmt::Debug;

use num_traits::{Float as NumFloat, NumCast, PrimInt, ToPrimitive};

use crate::enums::value::Value;
use crate::ffi::arrow_dtype::ArrowType;
use crate::structs::builders::{ArrayBuilder, PrimitiveBuilder};
use crate::structs::views::{ArrayView, PrimitiveView};

/// Trait for fixed-width element types that live in a values buffer.
///
/// Ties each Rust type to its `ArrowType`, its dynamic `Value` variant and
/// its builder and view variants, so typed access needs exactly one match.
pub trait NativeType:
    Copy + Default + PartialEq + PartialOrd + Debug + Send + Sync + 'static
{
    const DTYPE: ArrowType;

    fn into_scalar(self) -> Value;

    /// Strict extraction: the `Value` variant must be this exact type.
    fn from_scalar(value: &Value) -> Option<Self>;

    fn builder_mut(builder: &mut ArrayBuilder) -> Option<&mut PrimitiveBuilder<Self>>;

    fn view<'a>(view: &ArrayView<'a>) -> Option<PrimitiveView<'a, Self>>;
}

macro_rules! native_type {
    ($t:ty, $variant:ident) => {
        impl NativeType for $t {
            const DTYPE: ArrowType = ArrowType::$variant;

            #[inline]
            fn into_scalar(self) -> Value {
                Value::$variant(self)
            }

            #[inline]
            fn from_scalar(value: &Value) -> Option<Self> {
                match value {
                    Value::$variant(v) => Some(*v),
                    _ => None,
                }
            }

            #[inline]
            fn builder_mut(builder: &mut ArrayBuilder) -> Option<&mut PrimitiveBuilder<Self>> {
                match builder {
                    ArrayBuilder::$variant(b) => Some(b),
                    _ => None,
                }
            }

            #[inline]
            fn view<'a>(view: &ArrayView<'a>) -> Option<PrimitiveView<'a, Self>> {
                match view {
                    ArrayView::$variant(v) => Some(*v),
                    _ => None,
                }
            }
        }
    };
}

native_type!(i8, Int8);
native_type!(i16, Int16);
native_type!(i32, Int32);
native_type!(i64, Int64);
native_type!(u8, UInt8);
native_type!(u16, UInt16);
native_type!(u32, UInt32);
native_type!(u64, UInt64);
native_type!(f32, Float32);
native_type!(f64, Float64);

/// Trait for types valid as integer elements in columnar arrays.
///
/// Useful when specifying `my_fn::<T: Integer>() {}`.
pub trait Integer: NativeType + PrimInt + ToPrimitive {}
impl Integer for i8 {}
impl Integer for i16 {}
impl Integer for i32 {}
impl Integer for i64 {}
impl Integer for u8 {}
impl Integer for u16 {}
impl Integer for u32 {}
impl Integer for u64 {}

/// Trait for types valid as float elements in columnar arrays.
///
/// Extends and constrains the *num-traits* `Float` implementation to fit the crate's type universe.
pub trait Float: NativeType + NumFloat + ToPrimitive {}
impl Float for f32 {}
impl Float for f64 {}

/// Offset width of variable-length layouts: `i32` for `String`/`List`,
/// `i64` for `LargeString`.
pub trait OffsetType: Integer + NumCast {
    /// Offsets are validated non-negative before they are read this way.
    #[inline]
    fn as_usize(self) -> usize {
        self.to_usize().unwrap_or(0)
    }

    /// `None` when `n` no longer fits the offset width.
    #[inline]
    fn from_usize(n: usize) -> Option<Self> {
        <Self as NumCast>::from(n)
    }
}
impl OffsetType for i32 {}
impl OffsetType for i64 {}
