//! # ListView Module
//!
//! Offset-aware window over a variable-length list column.

use std::ops::Range;

use crate::enums::error::Result;
use crate::structs::array_data::ArrayData;
use crate::structs::views::array_view::ArrayView;
use crate::structs::views::bitmask_view::BitmaskView;

/// # ListView
///
/// Slot `i` covers child slots `offsets[i]..offsets[i + 1]`, where `offsets`
/// has already been cut to the window. Child slots are logical indices of the
/// child column, whose own offset the child view applies.
#[derive(Clone, Copy, Debug)]
pub struct ListView<'a> {
    offsets: &'a [i32],
    child: &'a ArrayData,
    validity: Option<BitmaskView<'a>>,
}

impl<'a> ListView<'a> {
    pub(crate) fn new(data: &'a ArrayData, start: usize, len: usize) -> Result<Self> {
        let offsets = &data.offsets::<i32>()?[start..=start + len];
        let validity = data.validity().map(|v| v.slice(start, len));
        // Validated at construction: lists always carry exactly one child
        let child = data.children()[0].as_ref();
        Ok(Self { offsets, child, validity })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn is_valid(&self, i: usize) -> bool {
        self.validity.map_or(true, |v| v.get(i))
    }

    #[inline]
    pub fn value_range(&self, i: usize) -> Range<usize> {
        self.offsets[i] as usize..self.offsets[i + 1] as usize
    }

    #[inline]
    pub fn value_len(&self, i: usize) -> usize {
        self.value_range(i).len()
    }

    /// View of the elements of slot `i`, ignoring validity.
    pub fn value(&self, i: usize) -> Result<ArrayView<'a>> {
        let range = self.value_range(i);
        ArrayView::framed(self.child, range.start, range.len())
    }

    /// View of the whole child column.
    pub fn values(&self) -> Result<ArrayView<'a>> {
        ArrayView::try_new(self.child)
    }
}
