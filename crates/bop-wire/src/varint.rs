//! Size and flag varints of the `CFG_CMP` stream.
//!
//! Seven value bits per byte, least significant group first, MSB set
//! while more groups follow. A `u64` needs at most ten groups.

use crate::error::WireError;

/// Longest varint a `u64` can need: ceil(64 / 7).
pub const MAX_VARINT_BYTES: usize = 10;

const GROUP_BITS: u32 = 7;
const GROUP_MASK: u64 = 0x7F;
const MORE: u8 = 0x80;

/// Write `value` into `buf` and return how many bytes it took.
///
/// A token flag of length 0x20, pattern High, no repeat (`0x204`) becomes
/// `[0x84, 0x04]`; an original size of 2048 becomes `[0x80, 0x10]`.
pub fn encode_varint(value: u64, buf: &mut [u8; MAX_VARINT_BYTES]) -> usize {
    let mut rest = value;
    for (i, slot) in buf.iter_mut().enumerate() {
        let group = (rest & GROUP_MASK) as u8;
        rest >>= GROUP_BITS;
        if rest == 0 {
            *slot = group;
            return i + 1;
        }
        *slot = group | MORE;
    }
    MAX_VARINT_BYTES
}

/// Append the encoding of `value` to `out`.
pub fn write_varint(out: &mut Vec<u8>, value: u64) {
    let mut scratch = [0u8; MAX_VARINT_BYTES];
    let n = encode_varint(value, &mut scratch);
    out.extend_from_slice(&scratch[..n]);
}

/// Read one varint from the front of `buf`, returning it with the number
/// of bytes it spanned.
///
/// # Errors
///
/// [`WireError::VarintTooLong`] when ten bytes all carry the MSB, and
/// [`WireError::UnexpectedEof`] when `buf` stops before the last group.
pub fn decode_varint(buf: &[u8]) -> Result<(u64, usize), WireError> {
    let mut value = 0u64;
    for (i, &byte) in buf.iter().take(MAX_VARINT_BYTES).enumerate() {
        value |= (u64::from(byte) & GROUP_MASK) << (GROUP_BITS * i as u32);
        if byte & MORE == 0 {
            return Ok((value, i + 1));
        }
    }
    if buf.len() > MAX_VARINT_BYTES {
        Err(WireError::VarintTooLong)
    } else {
        Err(WireError::UnexpectedEof { offset: buf.len() })
    }
}

/// Read a varint at `*cursor` without looking past `end`, moving the
/// cursor over it on success.
///
/// # Errors
///
/// As [`decode_varint`], with the EOF offset reported against `buf`.
pub fn read_varint(buf: &[u8], end: usize, cursor: &mut usize) -> Result<u64, WireError> {
    let end = end.min(buf.len());
    let start = *cursor;
    let window = buf
        .get(start..end)
        .ok_or(WireError::UnexpectedEof { offset: start })?;
    match decode_varint(window) {
        Ok((value, n)) => {
            *cursor += n;
            Ok(value)
        }
        Err(WireError::UnexpectedEof { .. }) => Err(WireError::UnexpectedEof { offset: end }),
        Err(e) => Err(e),
    }
}
