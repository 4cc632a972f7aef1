//! # StructView Module
//!
//! Offset-aware window over a struct column. The parent's offset and length
//! frame every child, so field views line up slot for slot.

use crate::enums::error::{BridgeError, Result};
use crate::ffi::arrow_dtype::ArrowType;
use crate::structs::array_data::ArrayData;
use crate::structs::field::Field;
use crate::structs::views::array_view::ArrayView;
use crate::structs::views::bitmask_view::BitmaskView;

#[derive(Clone, Copy, Debug)]
pub struct StructView<'a> {
    data: &'a ArrayData,
    start: usize,
    len: usize,
    validity: Option<BitmaskView<'a>>,
}

impl<'a> StructView<'a> {
    pub(crate) fn new(data: &'a ArrayData, start: usize, len: usize) -> Result<Self> {
        let validity = data.validity().map(|v| v.slice(start, len));
        Ok(Self { data, start, len, validity })
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_valid(&self, i: usize) -> bool {
        self.validity.map_or(true, |v| v.get(i))
    }

    pub fn fields(&self) -> &'a [Field] {
        match self.data.dtype() {
            ArrowType::Struct(fields) => fields,
            _ => &[],
        }
    }

    #[inline]
    pub fn num_columns(&self) -> usize {
        self.data.children().len()
    }

    /// View of child `j`, framed by this struct's window.
    pub fn column(&self, j: usize) -> Result<ArrayView<'a>> {
        let child = self.data.child(j).ok_or_else(|| {
            BridgeError::InvalidArgument(format!(
                "struct has {} fields, asked for {j}",
                self.num_columns()
            ))
        })?;
        ArrayView::framed(child, self.data.offset() + self.start, self.len)
    }
}
