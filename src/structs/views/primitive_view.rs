//! # PrimitiveView Module
//!
//! Typed, offset-aware window over a fixed-width column.

use std::fmt::Debug;

use crate::enums::error::{BridgeError, Result};
use crate::structs::array_data::ArrayData;
use crate::structs::views::bitmask_view::BitmaskView;
use crate::traits::type_unions::NativeType;

/// # PrimitiveView
///
/// `values` is already cut to the window, so index `i` is logical slot `i`
/// of the framed array regardless of the underlying `offset`.
#[derive(Clone, Copy, Debug)]
pub struct PrimitiveView<'a, T> {
    values: &'a [T],
    validity: Option<BitmaskView<'a>>,
}

impl<'a, T: NativeType> PrimitiveView<'a, T> {
    pub(crate) fn new(data: &'a ArrayData, start: usize, len: usize) -> Result<Self> {
        let buffer = data
            .buffer(1)
            .ok_or_else(|| BridgeError::InvalidData(format!("{} has no values buffer", data.dtype())))?;
        let begin = data.offset() + start;
        let values = &buffer.typed::<T>()?[begin..begin + len];
        let validity = data.validity().map(|v| v.slice(start, len));
        Ok(Self { values, validity })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn is_valid(&self, i: usize) -> bool {
        self.validity.map_or(true, |v| v.get(i))
    }

    /// `None` for a null slot.
    #[inline]
    pub fn get(&self, i: usize) -> Option<T> {
        if self.is_valid(i) { Some(self.values[i]) } else { None }
    }

    /// Raw slot value, ignoring validity.
    #[inline]
    pub fn value(&self, i: usize) -> T {
        self.values[i]
    }

    #[inline]
    pub fn values(&self) -> &'a [T] {
        self.values
    }

    #[inline]
    pub fn validity(&self) -> Option<BitmaskView<'a>> {
        self.validity
    }

    pub fn null_count(&self) -> usize {
        self.validity.map_or(0, |v| v.count_unset())
    }

    pub fn iter(&self) -> impl Iterator<Item = Option<T>> + 'a {
        let view = *self;
        (0..view.len()).map(move |i| view.get(i))
    }
}
