use crate::error::WireError;

/// Every BOP block is exactly this many bytes.
pub const BLOCK_SIZE: usize = 2048;

/// The four roles a 2 KiB block can play inside a BOP.
///
/// ```text
/// ┌────────┬────────────────────────────────────────────────────┐
/// │ Kind   │ Content                                            │
/// ├────────┼────────────────────────────────────────────────────┤
/// │ Header │ Fixed fields, first action records, first digest   │
/// │ Action │ Continuation of the action record stream           │
/// │ Data   │ Compressed and/or encrypted payload bytes          │
/// │ Hash   │ Digests of the blocks that follow it               │
/// └────────┴────────────────────────────────────────────────────┘
/// ```
///
/// The kind is never written to the wire; it is implied by position and by
/// the action records that reference the blocks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Header,
    Action,
    Data,
    Hash,
}

/// One zero-initialised 2 KiB block with typed little-endian accessors.
///
/// Offsets passed to the accessors are the compile-time constants from
/// [`crate::layout`]; the fallible slice helpers below are used when the
/// offset comes from untrusted input.
#[derive(Clone, PartialEq, Eq)]
pub struct Block {
    kind: BlockKind,
    data: Box<[u8; BLOCK_SIZE]>,
}

impl std::fmt::Debug for Block {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Block").field("kind", &self.kind).finish_non_exhaustive()
    }
}

impl Block {
    #[must_use]
    pub fn new(kind: BlockKind) -> Self {
        Self {
            kind,
            data: Box::new([0u8; BLOCK_SIZE]),
        }
    }

    /// Wrap an existing 2 KiB image.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::FieldOutOfBounds`] if `bytes` is not exactly
    /// [`BLOCK_SIZE`] long.
    pub fn from_bytes(kind: BlockKind, bytes: &[u8]) -> Result<Self, WireError> {
        if bytes.len() != BLOCK_SIZE {
            return Err(WireError::FieldOutOfBounds {
                offset: 0,
                width: BLOCK_SIZE,
                len: bytes.len(),
            });
        }
        let mut block = Self::new(kind);
        block.data.copy_from_slice(bytes);
        Ok(block)
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    pub fn as_bytes(&self) -> &[u8; BLOCK_SIZE] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8; BLOCK_SIZE] {
        &mut self.data
    }

    pub fn u8_at(&self, offset: usize) -> u8 {
        self.data[offset]
    }

    pub fn u32_at(&self, offset: usize) -> u32 {
        let mut raw = [0u8; 4];
        raw.copy_from_slice(&self.data[offset..offset + 4]);
        u32::from_le_bytes(raw)
    }

    pub fn u64_at(&self, offset: usize) -> u64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&self.data[offset..offset + 8]);
        u64::from_le_bytes(raw)
    }

    pub fn set_u8(&mut self, offset: usize, value: u8) {
        self.data[offset] = value;
    }

    pub fn set_u32(&mut self, offset: usize, value: u32) {
        self.data[offset..offset + 4].copy_from_slice(&value.to_le_bytes());
    }

    pub fn set_u64(&mut self, offset: usize, value: u64) {
        self.data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
    }

    /// Copy `bytes` into the block starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::FieldOutOfBounds`] if the bytes would run past
    /// the end of the block.
    pub fn write_at(&mut self, offset: usize, bytes: &[u8]) -> Result<(), WireError> {
        let dest = offset
            .checked_add(bytes.len())
            .and_then(|end| self.data.get_mut(offset..end))
            .ok_or(WireError::FieldOutOfBounds {
                offset,
                width: bytes.len(),
                len: BLOCK_SIZE,
            })?;
        dest.copy_from_slice(bytes);
        Ok(())
    }
}

/// Borrow `width` bytes at `offset`, failing instead of panicking.
///
/// # Errors
///
/// Returns [`WireError::FieldOutOfBounds`] when the range exceeds `buf`.
pub fn slice_at(buf: &[u8], offset: usize, width: usize) -> Result<&[u8], WireError> {
    offset
        .checked_add(width)
        .and_then(|end| buf.get(offset..end))
        .ok_or(WireError::FieldOutOfBounds {
            offset,
            width,
            len: buf.len(),
        })
}

/// Read a little-endian u16 at `offset`.
///
/// # Errors
///
/// Returns [`WireError::FieldOutOfBounds`] when the field exceeds `buf`.
pub fn read_u16_le(buf: &[u8], offset: usize) -> Result<u16, WireError> {
    let bytes = slice_at(buf, offset, 2)?;
    Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
}

/// Read a little-endian u32 at `offset`.
///
/// # Errors
///
/// Returns [`WireError::FieldOutOfBounds`] when the field exceeds `buf`.
pub fn read_u32_le(buf: &[u8], offset: usize) -> Result<u32, WireError> {
    let bytes = slice_at(buf, offset, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Read a little-endian u64 at `offset`.
///
/// # Errors
///
/// Returns [`WireError::FieldOutOfBounds`] when the field exceeds `buf`.
pub fn read_u64_le(buf: &[u8], offset: usize) -> Result<u64, WireError> {
    let bytes = slice_at(buf, offset, 8)?;
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    Ok(u64::from_le_bytes(raw))
}

/// Read a NUL-terminated string of at most `max_len` bytes.
///
/// Non-UTF-8 bytes are replaced rather than rejected; the string is only
/// used for display and whitelist comparison.
///
/// # Errors
///
/// Returns [`WireError::FieldOutOfBounds`] when the field exceeds `buf`.
pub fn read_cstr(buf: &[u8], offset: usize, max_len: usize) -> Result<String, WireError> {
    let bytes = slice_at(buf, offset, max_len)?;
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    Ok(String::from_utf8_lossy(&bytes[..end]).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout;

    #[test]
    fn new_block_is_zeroed() {
        let block = Block::new(BlockKind::Data);
        assert!(block.as_bytes().iter().all(|&b| b == 0));
        assert_eq!(block.kind(), BlockKind::Data);
    }

    #[test]
    fn roundtrip_le_fields() {
        let mut block = Block::new(BlockKind::Header);
        block.set_u32(layout::VERSION, 0xDEAD_BEEF);
        block.set_u64(layout::SIZE, 0x1234_5678_9ABC);
        assert_eq!(block.u32_at(layout::VERSION), 0xDEAD_BEEF);
        assert_eq!(block.u64_at(layout::SIZE), 0x1234_5678_9ABC);
        assert_eq!(&block.as_bytes()[4..8], &[0xEF, 0xBE, 0xAD, 0xDE]);
    }

    #[test]
    fn write_at_rejects_overflow() {
        let mut block = Block::new(BlockKind::Header);
        let result = block.write_at(BLOCK_SIZE - 2, &[1, 2, 3]);
        assert!(matches!(result, Err(WireError::FieldOutOfBounds { .. })));
    }

    #[test]
    fn from_bytes_rejects_wrong_length() {
        let result = Block::from_bytes(BlockKind::Data, &[0u8; 100]);
        assert!(matches!(result, Err(WireError::FieldOutOfBounds { len: 100, .. })));
    }

    #[test]
    fn read_cstr_stops_at_nul() {
        let buf = *b"FCB\0garbage";
        assert_eq!(read_cstr(&buf, 0, 4).unwrap(), "FCB");
        assert_eq!(read_cstr(&buf, 4, 7).unwrap(), "garbage");
    }

    #[test]
    fn read_u32_le_out_of_bounds() {
        let buf = [0u8; 6];
        assert!(read_u32_le(&buf, 2).is_ok());
        assert!(matches!(
            read_u32_le(&buf, 3),
            Err(WireError::FieldOutOfBounds { offset: 3, width: 4, len: 6 })
        ));
    }
}
