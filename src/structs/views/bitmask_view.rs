//! # BitmaskView Module
//!
//! `BitmaskView` is a **logical, zero-copy, read-only window** into a
//! bit-packed buffer: a validity bitmap or the values of a boolean column.
//!
//! ## Behaviour
//! - All logical indices are **relative to the window**. The window's bit
//!   offset, which is the owning array's `offset`, is applied internally.
//! - `Copy`: the view is just a byte slice plus two integers.

use std::fmt::{self, Debug, Formatter};

use crate::utils::{count_unset_bits, get_bit};

/// # BitmaskView
///
/// Bounds-checked window `[offset, offset + len)` over packed bits.
///
/// ## Example
/// ```rust
/// use colbridge::BitmaskView;
///
/// let bytes = [0b0000_1101u8];
/// let view = BitmaskView::new(&bytes, 1, 3); // window: false, true, true
///
/// assert_eq!(view.len(), 3);
/// assert!(!view.get(0));
/// assert!(view.get(1));
/// assert!(view.get(2));
/// ```
#[derive(Clone, Copy, PartialEq)]
pub struct BitmaskView<'a> {
    bytes: &'a [u8],
    offset: usize,
    len: usize,
}

impl<'a> BitmaskView<'a> {
    /// Construct a view over bits `[offset, offset + len)` of `bytes`.
    #[inline]
    pub fn new(bytes: &'a [u8], offset: usize, len: usize) -> Self {
        assert!(
            (offset + len).div_ceil(8) <= bytes.len(),
            "BitmaskView: out of bounds (offset + len = {}, bytes = {})",
            offset + len,
            bytes.len()
        );
        Self { bytes, offset, len }
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
    pub fn get(&self, i: usize) -> bool {
        assert!(i < self.len, "BitmaskView: index {i} out of bounds for {}", self.len);
        get_bit(self.bytes, self.offset + i)
    }

    /// Narrower window; indices are relative to this view.
    #[inline]
    pub fn slice(&self, start: usize, len: usize) -> Self {
        assert!(start + len <= self.len, "BitmaskView: slice out of bounds");
        Self { bytes: self.bytes, offset: self.offset + start, len }
    }

    #[inline]
    pub fn count_unset(&self) -> usize {
        count_unset_bits(self.bytes, self.offset, self.len)
    }

    #[inline]
    pub fn count_set(&self) -> usize {
        self.len - self.count_unset()
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + 'a {
        let view = *self;
        (0..view.len).map(move |i| view.get(i))
    }
}

impl Debug for BitmaskView<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "BitmaskView[")?;
        for (i, bit) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", bit as u8)?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_is_offset_relative() {
        let bytes = [0b1100_1101u8, 0b0000_0010];
        let full = BitmaskView::new(&bytes, 0, 10);
        let window = BitmaskView::new(&bytes, 3, 6);
        for i in 0..6 {
            assert_eq!(window.get(i), full.get(i + 3));
        }
        assert_eq!(window.count_unset(), 3);
        assert_eq!(window.slice(2, 2).iter().collect::<Vec<_>>(), vec![false, true]);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn test_rejects_short_buffer() {
        let bytes = [0u8];
        BitmaskView::new(&bytes, 4, 5);
    }
}
