//! # ArrayData Module - *Immutable columnar value*
//!
//! `ArrayData` is one column: its type, logical length, slice offset, null
//! count, buffers in C Data Interface order and child columns for nested
//! types.
//!
//! ## Invariants
//! Every `ArrayData` is validated when it is constructed and is immutable
//! afterwards, so readers never re-check layout:
//! - buffer count and roles follow [`ArrowType::buffer_layout`];
//! - `null_count` is `-1` (unknown) or in `[0, len]`;
//! - validity and values buffers cover `offset + len` slots;
//! - offsets buffers hold at least `offset + len + 1` non-decreasing entries
//!   whose last value stays within the data buffer or child;
//! - struct children cover `offset + len` slots, since the parent's framing
//!   applies to them.
//!
//! ## Threading
//! `ArrayData` is `Send + Sync`. Finished columns are read concurrently
//! without locks, and exported columns stay unchanged until released.

use std::sync::Arc;

use crate::enums::error::{BridgeError, Result};
use crate::ffi::arrow_dtype::{ArrowType, BufferKind};
use crate::structs::shared_buffer::SharedBuffer;
use crate::structs::views::bitmask_view::BitmaskView;
use crate::traits::type_unions::OffsetType;
use crate::utils::bytes_for_bits;

/// Null count sentinel meaning "not yet computed".
pub const UNKNOWN_NULL_COUNT: i64 = -1;

/// # ArrayData
///
/// Type-erased column description shared through `Arc`.
///
/// Construct with [`ArrayData::try_new`] or a builder. Read through
/// [`ArrayView`](crate::ArrayView), which applies `offset` on every access.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayData {
    dtype: ArrowType,
    len: usize,
    offset: usize,
    null_count: i64,
    buffers: Vec<Option<SharedBuffer>>,
    children: Vec<Arc<ArrayData>>,
}

impl ArrayData {
    /// Validating constructor.
    ///
    /// `buffers[0]` is the validity slot for every type except `Null`;
    /// `None` there means all slots are valid.
    pub fn try_new(
        dtype: ArrowType,
        len: usize,
        offset: usize,
        null_count: i64,
        buffers: Vec<Option<SharedBuffer>>,
        children: Vec<Arc<ArrayData>>,
    ) -> Result<Self> {
        let data = Self { dtype, len, offset, null_count, buffers, children };
        data.validate()?;
        Ok(data)
    }

    /// `len` slots of the `Null` type.
    pub fn new_null(len: usize) -> Self {
        Self {
            dtype: ArrowType::Null,
            len,
            offset: 0,
            null_count: len as i64,
            buffers: Vec::new(),
            children: Vec::new(),
        }
    }

    fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(BridgeError::InvalidData(format!("{}: {msg}", self.dtype)));

        if self.null_count < UNKNOWN_NULL_COUNT || self.null_count > self.len as i64 {
            return invalid(format!("null count {} outside [-1, {}]", self.null_count, self.len));
        }
        let Some(end) = self.offset.checked_add(self.len) else {
            return invalid("offset + length overflows".into());
        };
        let layout = self.dtype.buffer_layout();
        if self.buffers.len() != layout.len() {
            return invalid(format!(
                "expected {} buffers, found {}",
                layout.len(),
                self.buffers.len()
            ));
        }

        // Upper bound of the variable-length range, once offsets are checked
        let mut last_offset = 0usize;
        for (i, (kind, buffer)) in layout.iter().zip(&self.buffers).enumerate() {
            match (kind, buffer) {
                (BufferKind::Validity, None) => {
                    if self.null_count > 0 {
                        return invalid(format!(
                            "{} nulls declared without a validity buffer",
                            self.null_count
                        ));
                    }
                }
                (BufferKind::Validity, Some(b)) => {
                    if b.len() < bytes_for_bits(end) {
                        return invalid(format!(
                            "validity buffer of {} bytes cannot cover {end} slots",
                            b.len()
                        ));
                    }
                }
                (_, None) => return invalid(format!("buffer {i} is required")),
                (BufferKind::Values(bits), Some(b)) => {
                    let needed = end
                        .checked_mul(*bits)
                        .map(bytes_for_bits)
                        .ok_or_else(|| BridgeError::InvalidData("values size overflows".into()))?;
                    if b.len() < needed {
                        return invalid(format!(
                            "values buffer of {} bytes cannot cover {end} slots",
                            b.len()
                        ));
                    }
                }
                (BufferKind::Offsets(4), Some(b)) => {
                    last_offset = check_offsets::<i32>(b, self.offset, self.len)?;
                }
                (BufferKind::Offsets(_), Some(b)) => {
                    last_offset = check_offsets::<i64>(b, self.offset, self.len)?;
                }
                (BufferKind::Data, Some(b)) => {
                    if b.len() < last_offset {
                        return invalid(format!(
                            "data buffer of {} bytes ends before offset {last_offset}",
                            b.len()
                        ));
                    }
                }
            }
        }

        match &self.dtype {
            ArrowType::List(item) => {
                let [child] = self.children.as_slice() else {
                    return invalid(format!("expected 1 child, found {}", self.children.len()));
                };
                if child.dtype != item.dtype {
                    return invalid(format!("child type {} does not match item", child.dtype));
                }
                if child.len < last_offset {
                    return invalid(format!(
                        "child of {} slots ends before offset {last_offset}",
                        child.len
                    ));
                }
            }
            ArrowType::Struct(fields) => {
                if self.children.len() != fields.len() {
                    return invalid(format!(
                        "expected {} children, found {}",
                        fields.len(),
                        self.children.len()
                    ));
                }
                for (field, child) in fields.iter().zip(&self.children) {
                    if child.dtype != field.dtype {
                        return invalid(format!(
                            "child '{}' has type {}, expected {}",
                            field.name, child.dtype, field.dtype
                        ));
                    }
                    if child.len < end {
                        return invalid(format!(
                            "child '{}' has {} slots, parent frames {end}",
                            field.name, child.len
                        ));
                    }
                }
            }
            _ => {
                if !self.children.is_empty() {
                    return invalid(format!("leaf type with {} children", self.children.len()));
                }
            }
        }
        Ok(())
    }

    #[inline]
    pub fn dtype(&self) -> &ArrowType {
        &self.dtype
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
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Null count as stored, `-1` when unknown.
    #[inline]
    pub fn declared_null_count(&self) -> i64 {
        self.null_count
    }

    /// Null count, counting the validity bitmap when it is unknown.
    ///
    /// Every slot of a `Null` array is null, whatever the producer declared.
    pub fn null_count(&self) -> usize {
        if self.dtype == ArrowType::Null {
            return self.len;
        }
        if self.null_count >= 0 {
            return self.null_count as usize;
        }
        match self.validity() {
            Some(mask) => mask.count_unset(),
            None => 0,
        }
    }

    #[inline]
    pub fn buffers(&self) -> &[Option<SharedBuffer>] {
        &self.buffers
    }

    #[inline]
    pub fn buffer(&self, i: usize) -> Option<&SharedBuffer> {
        self.buffers.get(i).and_then(Option::as_ref)
    }

    #[inline]
    pub fn children(&self) -> &[Arc<ArrayData>] {
        &self.children
    }

    #[inline]
    pub fn child(&self, i: usize) -> Option<&Arc<ArrayData>> {
        self.children.get(i)
    }

    /// Validity window over this array's logical slots.
    pub fn validity(&self) -> Option<BitmaskView<'_>> {
        if self.dtype == ArrowType::Null {
            return None;
        }
        self.buffer(0).map(|b| BitmaskView::new(b.as_slice(), self.offset, self.len))
    }

    pub fn is_valid(&self, i: usize) -> bool {
        assert!(i < self.len, "ArrayData: index {i} out of bounds for {}", self.len);
        if self.dtype == ArrowType::Null {
            return false;
        }
        self.validity().map_or(true, |v| v.get(i))
    }

    #[inline]
    pub fn is_null(&self, i: usize) -> bool {
        !self.is_valid(i)
    }

    /// Zero-copy window `[offset, offset + len)` of this array.
    pub fn slice(&self, offset: usize, len: usize) -> Result<Self> {
        if offset.checked_add(len).is_none_or(|end| end > self.len) {
            return Err(BridgeError::InvalidArgument(format!(
                "slice {offset}+{len} out of bounds for array of {}",
                self.len
            )));
        }
        let null_count = match self.null_count {
            _ if self.dtype == ArrowType::Null => len as i64,
            0 => 0,
            _ => UNKNOWN_NULL_COUNT,
        };
        Ok(Self {
            dtype: self.dtype.clone(),
            len,
            offset: self.offset + offset,
            null_count,
            buffers: self.buffers.clone(),
            children: self.children.clone(),
        })
    }

    /// Offsets window `[offset, offset + len]` of a variable-length column.
    pub(crate) fn offsets<O: OffsetType>(&self) -> Result<&[O]> {
        let buffer = self
            .buffer(1)
            .ok_or_else(|| BridgeError::InvalidData(format!("{} has no offsets", self.dtype)))?;
        let all = buffer.typed::<O>()?;
        Ok(&all[self.offset..=self.offset + self.len])
    }

    /// Total bytes referenced by this array and its children.
    pub fn byte_size(&self) -> usize {
        let own: usize = self.buffers.iter().flatten().map(SharedBuffer::len).sum();
        own + self.children.iter().map(|c| c.byte_size()).sum::<usize>()
    }
}

/// Checks an offsets buffer and returns the last offset of the window.
fn check_offsets<O: OffsetType>(buffer: &SharedBuffer, offset: usize, len: usize) -> Result<usize> {
    let offsets = buffer.typed::<O>()?;
    if offsets.len() < offset + len + 1 {
        return Err(BridgeError::InvalidData(format!(
            "offsets buffer holds {} entries, need {}",
            offsets.len(),
            offset + len + 1
        )));
    }
    let window = &offsets[offset..=offset + len];
    if window[0] < O::zero() {
        return Err(BridgeError::InvalidData("negative offset".into()));
    }
    if window.windows(2).any(|w| w[1] < w[0]) {
        return Err(BridgeError::InvalidData("offsets are not monotonic".into()));
    }
    Ok(window[len].as_usize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structs::field::Field;
    use crate::vec64;

    fn int32(values: &[i32], validity: Option<&[u8]>, null_count: i64) -> ArrayData {
        let mut v = vec64![];
        v.extend_from_slice(values);
        ArrayData::try_new(
            ArrowType::Int32,
            values.len(),
            0,
            null_count,
            vec![validity.map(|b| SharedBuffer::from_owner(b.to_vec())), Some(SharedBuffer::from_vec64(v))],
            vec![],
        )
        .unwrap()
    }

    #[test]
    fn test_validates_buffer_count_and_sizes() {
        let short = ArrayData::try_new(
            ArrowType::Int64,
            4,
            0,
            0,
            vec![None, Some(SharedBuffer::from_vec64(vec64![1i64, 2]))],
            vec![],
        );
        assert!(matches!(short, Err(BridgeError::InvalidData(_))));

        let missing = ArrayData::try_new(ArrowType::Int64, 0, 0, 0, vec![None], vec![]);
        assert!(missing.is_err());

        let nulls_without_mask = ArrayData::try_new(
            ArrowType::Int32,
            2,
            0,
            1,
            vec![None, Some(SharedBuffer::from_vec64(vec64![1i32, 2]))],
            vec![],
        );
        assert!(nulls_without_mask.is_err());
    }

    #[test]
    fn test_rejects_non_monotonic_offsets() {
        let bad = ArrayData::try_new(
            ArrowType::String,
            2,
            0,
            0,
            vec![
                None,
                Some(SharedBuffer::from_vec64(vec64![0i32, 3, 1])),
                Some(SharedBuffer::from_owner(b"abc".to_vec())),
            ],
            vec![],
        );
        assert!(matches!(bad, Err(BridgeError::InvalidData(_))));

        let past_end = ArrayData::try_new(
            ArrowType::String,
            1,
            0,
            0,
            vec![
                None,
                Some(SharedBuffer::from_vec64(vec64![0i32, 9])),
                Some(SharedBuffer::from_owner(b"abc".to_vec())),
            ],
            vec![],
        );
        assert!(past_end.is_err());
    }

    #[test]
    fn test_struct_children_must_cover_parent() {
        let child = Arc::new(int32(&[1, 2], None, 0));
        let dtype = ArrowType::Struct(vec![Field::new("a", ArrowType::Int32, true, None)]);
        assert!(ArrayData::try_new(dtype.clone(), 2, 0, 0, vec![None], vec![child.clone()]).is_ok());
        assert!(ArrayData::try_new(dtype.clone(), 3, 0, 0, vec![None], vec![child.clone()]).is_err());

        let wrong = ArrowType::Struct(vec![Field::new("a", ArrowType::Int64, true, None)]);
        assert!(ArrayData::try_new(wrong, 2, 0, 0, vec![None], vec![child]).is_err());
    }

    #[test]
    fn test_slice_is_offset_aware() {
        // validity: 1,0,1,1
        let data = int32(&[10, 20, 30, 40], Some(&[0b1101]), 1);
        let sliced = data.slice(1, 3).unwrap();
        assert_eq!(sliced.offset(), 1);
        assert_eq!(sliced.declared_null_count(), UNKNOWN_NULL_COUNT);
        assert_eq!(sliced.null_count(), 1);
        assert!(sliced.is_null(0));
        assert!(sliced.is_valid(1));
        assert!(data.slice(2, 3).is_err());

        let again = sliced.slice(1, 2).unwrap();
        assert_eq!(again.offset(), 2);
        assert_eq!(again.null_count(), 0);
    }

    #[test]
    fn test_null_array() {
        let data = ArrayData::new_null(3);
        assert_eq!(data.null_count(), 3);
        assert!(data.is_null(2));
        assert_eq!(data.slice(1, 2).unwrap().null_count(), 2);

        // Producers commonly declare zero nulls for the Null type.
        let declared_zero = ArrayData::try_new(ArrowType::Null, 4, 0, 0, vec![], vec![]).unwrap();
        assert_eq!(declared_zero.declared_null_count(), 0);
        assert_eq!(declared_zero.null_count(), 4);
        assert!((0..4).all(|i| declared_zero.is_null(i)));
    }

    #[test]
    fn test_byte_size_counts_children() {
        let child = Arc::new(int32(&[1, 2, 3], None, 0));
        let dtype = ArrowType::List(Box::new(Field::new("item", ArrowType::Int32, true, None)));
        let list = ArrayData::try_new(
            dtype,
            2,
            0,
            0,
            vec![None, Some(SharedBuffer::from_vec64(vec64![0i32, 1, 3]))],
            vec![child],
        )
        .unwrap();
        assert_eq!(list.byte_size(), 12 + 12);
    }
}
