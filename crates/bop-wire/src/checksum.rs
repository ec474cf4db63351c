use crate::error::WireError;

/// Standard CRC-32 (IEEE 802.3, reflected) over `data`.
///
/// Used for the header trailer at 0x7FC, the obscured chip-id field and the
/// encrypted challenge.
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

/// Fletcher-32 over little-endian 16-bit words.
///
/// This is the variant the configuration firmware implements: both sums are
/// plain wrapping `u32` accumulators with no modulo reduction, and the low
/// half of the result is the two's-complement negation of `c0 + c1`.
///
/// ```text
///   for each u16 word w:  c0 += w;  c1 += c0
///   result = (c1 << 16) | (-(c1 + c0) & 0xFFFF)
/// ```
///
/// # Errors
///
/// - [`WireError::EmptyChecksumInput`] if `data` is empty.
/// - [`WireError::UnalignedChecksumInput`] if `data.len() % 4 != 0`.
pub fn fletcher32(data: &[u8]) -> Result<u32, WireError> {
    if data.is_empty() {
        return Err(WireError::EmptyChecksumInput);
    }
    if data.len() % 4 != 0 {
        return Err(WireError::UnalignedChecksumInput { len: data.len() });
    }

    let mut c0: u32 = 0;
    let mut c1: u32 = 0;
    for word in data.chunks_exact(2) {
        c0 = c0.wrapping_add(u32::from(u16::from_le_bytes([word[0], word[1]])));
        c1 = c1.wrapping_add(c0);
    }
    Ok((c1 << 16) | (c1.wrapping_add(c0).wrapping_neg() & 0xFFFF))
}
