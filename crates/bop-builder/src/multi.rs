use bop_wire::BLOCK_SIZE;
use bop_wire::checksum::crc32;
use bop_wire::layout::{CRC, END_SIZE, FLAGS, LAST_BOP_FLAG};

use crate::error::BuildError;

/// Rewrite one header's end size and last-BOP flag, then its CRC.
///
/// The existing CRC must be valid; patching a corrupted header would
/// launder the corruption.
///
/// # Errors
///
/// - [`BuildError::MisalignedStream`] if `header` is shorter than a block.
/// - [`BuildError::CrcMismatch`] if the stored CRC is wrong.
pub fn patch_end_size(header: &mut [u8], end_size: u64, is_last: bool) -> Result<(), BuildError> {
    if header.len() < BLOCK_SIZE {
        return Err(BuildError::MisalignedStream { len: header.len() });
    }
    if crc32(&header[..CRC]) != stored_crc(header) {
        return Err(BuildError::CrcMismatch { offset: CRC });
    }
    if is_last {
        header[FLAGS] |= LAST_BOP_FLAG;
    } else {
        header[FLAGS] &= !LAST_BOP_FLAG;
    }
    header[END_SIZE..END_SIZE + 8].copy_from_slice(&end_size.to_le_bytes());
    let crc = crc32(&header[..CRC]);
    header[CRC..CRC + 4].copy_from_slice(&crc.to_le_bytes());
    Ok(())
}

/// Patch every header of a multi-BOP stream given each BOP's length.
///
/// Each header gets the byte count from itself to the end of the stream;
/// only the final one is flagged last.
///
/// # Errors
///
/// Returns [`BuildError::MisalignedStream`] if `sizes` do not add up to
/// the stream length in whole blocks, or the first patch error.
pub fn patch_end_sizes(stream: &mut [u8], sizes: &[usize]) -> Result<(), BuildError> {
    let total: usize = sizes.iter().sum();
    if sizes.is_empty()
        || total != stream.len()
        || sizes.iter().any(|&s| s == 0 || s % BLOCK_SIZE != 0)
    {
        return Err(BuildError::MisalignedStream { len: stream.len() });
    }
    let mut start = 0;
    let mut remaining = total;
    for (i, &size) in sizes.iter().enumerate() {
        let end_size = u64::try_from(remaining).map_err(|_| BuildError::MisalignedStream { len: stream.len() })?;
        patch_end_size(&mut stream[start..start + size], end_size, i + 1 == sizes.len())?;
        start += size;
        remaining -= size;
    }
    Ok(())
}

fn stored_crc(header: &[u8]) -> u32 {
    u32::from_le_bytes([header[CRC], header[CRC + 1], header[CRC + 2], header[CRC + 3]])
}
