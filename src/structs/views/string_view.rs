//! # StringView Module
//!
//! Offset-aware window over a UTF-8 column with `i32` or `i64` offsets.

use crate::enums::error::{BridgeError, Result};
use crate::structs::array_data::ArrayData;
use crate::structs::views::bitmask_view::BitmaskView;
use crate::traits::type_unions::OffsetType;

/// # StringView
///
/// `offsets` holds `len + 1` entries for the window. They index `data`
/// absolutely, as the C Data Interface lays them out.
#[derive(Clone, Copy, Debug)]
pub struct StringView<'a, O> {
    offsets: &'a [O],
    data: &'a [u8],
    validity: Option<BitmaskView<'a>>,
}

impl<'a, O: OffsetType> StringView<'a, O> {
    pub(crate) fn new(data: &'a ArrayData, start: usize, len: usize) -> Result<Self> {
        let offsets = &data.offsets::<O>()?[start..=start + len];
        let bytes = data
            .buffer(2)
            .ok_or_else(|| BridgeError::InvalidData(format!("{} has no data buffer", data.dtype())))?;
        let validity = data.validity().map(|v| v.slice(start, len));
        Ok(Self { offsets, data: bytes.as_slice(), validity })
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

    /// Bytes of slot `i`, ignoring validity.
    #[inline]
    pub fn bytes(&self, i: usize) -> &'a [u8] {
        &self.data[self.offsets[i].as_usize()..self.offsets[i + 1].as_usize()]
    }

    /// String of slot `i`, ignoring validity. Fails on invalid UTF-8.
    pub fn value(&self, i: usize) -> Result<&'a str> {
        std::str::from_utf8(self.bytes(i))
            .map_err(|e| BridgeError::InvalidData(format!("slot {i} is not UTF-8: {e}")))
    }

    pub fn get(&self, i: usize) -> Result<Option<&'a str>> {
        if self.is_valid(i) { self.value(i).map(Some) } else { Ok(None) }
    }
}
