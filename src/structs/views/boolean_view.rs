//! # BooleanView Module
//!
//! Offset-aware window over a bit-packed boolean column.

use crate::enums::error::{BridgeError, Result};
use crate::structs::array_data::ArrayData;
use crate::structs::views::bitmask_view::BitmaskView;

#[derive(Clone, Copy, Debug)]
pub struct BooleanView<'a> {
    values: BitmaskView<'a>,
    validity: Option<BitmaskView<'a>>,
}

impl<'a> BooleanView<'a> {
    pub(crate) fn new(data: &'a ArrayData, start: usize, len: usize) -> Result<Self> {
        let buffer = data
            .buffer(1)
            .ok_or_else(|| BridgeError::InvalidData("Boolean has no values buffer".into()))?;
        let values = BitmaskView::new(buffer.as_slice(), data.offset() + start, len);
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

    #[inline]
    pub fn get(&self, i: usize) -> Option<bool> {
        if self.is_valid(i) { Some(self.values.get(i)) } else { None }
    }

    #[inline]
    pub fn value(&self, i: usize) -> bool {
        self.values.get(i)
    }
}
