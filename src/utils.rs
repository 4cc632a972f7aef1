//! # Utilities - *Internal Helper Utilities*
//!
//! Bit-level helpers shared by the validity and boolean paths. Bit `i` lives
//! in byte `i / 8` at position `i % 8`, least significant bit first.

/// Bytes needed to hold `bits` bits.
#[inline(always)]
pub fn bytes_for_bits(bits: usize) -> usize {
    bits.div_ceil(8)
}

#[inline(always)]
pub fn get_bit(bytes: &[u8], i: usize) -> bool {
    bytes[i >> 3] & (1u8 << (i & 7)) != 0
}

#[inline(always)]
pub fn set_bit(bytes: &mut [u8], i: usize) {
    bytes[i >> 3] |= 1u8 << (i & 7);
}

#[inline(always)]
pub fn unset_bit(bytes: &mut [u8], i: usize) {
    bytes[i >> 3] &= !(1u8 << (i & 7));
}

/// Number of unset bits in `bytes[offset..offset + len)` (bit positions).
pub fn count_unset_bits(bytes: &[u8], offset: usize, len: usize) -> usize {
    let mut unset = 0;
    let mut i = offset;
    let end = offset + len;
    // Leading partial byte
    while i < end && i & 7 != 0 {
        unset += !get_bit(bytes, i) as usize;
        i += 1;
    }
    // Whole bytes
    while i + 8 <= end {
        unset += bytes[i >> 3].count_zeros() as usize;
        i += 8;
    }
    while i < end {
        unset += !get_bit(bytes, i) as usize;
        i += 1;
    }
    unset
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_ops() {
        let mut bytes = [0u8; 2];
        set_bit(&mut bytes, 0);
        set_bit(&mut bytes, 9);
        assert_eq!(bytes, [0b0000_0001, 0b0000_0010]);
        assert!(get_bit(&bytes, 9));
        unset_bit(&mut bytes, 9);
        assert!(!get_bit(&bytes, 9));
        assert_eq!(bytes_for_bits(0), 0);
        assert_eq!(bytes_for_bits(9), 2);
    }

    #[test]
    fn test_count_unset_with_offsets() {
        // bits (LSB first): 1,0,1,1,0,0,1,1 | 0,1
        let bytes = [0b1100_1101u8, 0b0000_0010];
        assert_eq!(count_unset_bits(&bytes, 0, 10), 4);
        assert_eq!(count_unset_bits(&bytes, 1, 4), 2);
        assert_eq!(count_unset_bits(&bytes, 3, 7), 3);
        assert_eq!(count_unset_bits(&bytes, 0, 0), 0);
    }
}
