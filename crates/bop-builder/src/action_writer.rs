use bop_types::{ActionFlags, CommandId, FieldValue};
use bop_wire::layout::{ACTION_REGION, HASH};
use bop_wire::{BLOCK_SIZE, Block, BlockKind};
use zeroize::Zeroizing;

use crate::error::BuildError;

/// Smallest record: command word, size and payload size.
pub const MIN_RECORD_LEN: usize = 8;

/// One action record, ready to be encoded.
///
/// Wire layout (little endian):
///
/// ```text
/// ┌──────────────────────┬─────────────────────────────────────────────┐
/// │ u16 cmd | flags      │ cmd in bits 0..11, flags in 12..15          │
/// │ u16 record size      │ whole record, multiple of 4                 │
/// │ u32 payload size     │ stored size after compress/encrypt, 0=none  │
/// │ [u32 original size]  │ when ORIGINAL_SIZE                          │
/// │ [u32 checksum]       │ when CHECKSUM, over the original payload    │
/// │ [field words]        │ FieldValue bytes in order                   │
/// │ [16-byte IV]         │ when DEDICATED_IV                           │
/// └──────────────────────┴─────────────────────────────────────────────┘
/// ```
pub struct ActionRecord<'a> {
    pub cmd: CommandId,
    pub flags: ActionFlags,
    pub stored_len: u32,
    pub original_len: u32,
    pub checksum: u32,
    pub fields: &'a [FieldValue],
    pub iv: Option<&'a [u8; 16]>,
}

impl ActionRecord<'_> {
    /// Encoded length in bytes.
    pub fn encoded_len(&self) -> usize {
        let mut len = MIN_RECORD_LEN;
        if self.flags.has_original_size() {
            len += 4;
        }
        if self.flags.has_checksum() {
            len += 4;
        }
        len += self.fields.iter().map(FieldValue::wire_len).sum::<usize>();
        if self.flags.has_dedicated_iv() {
            len += 16;
        }
        len
    }

    /// # Errors
    ///
    /// Returns [`BuildError::RecordTooLarge`] if the record would not fit
    /// in one block.
    pub fn encode(&self) -> Result<Zeroizing<Vec<u8>>, BuildError> {
        let len = self.encoded_len();
        let size = u16::try_from(len)
            .ok()
            .filter(|_| len <= BLOCK_SIZE)
            .ok_or(BuildError::RecordTooLarge {
                cmd: self.cmd.get(),
                size: len,
            })?;

        let mut out = Zeroizing::new(Vec::with_capacity(len));
        out.extend_from_slice(&(self.cmd.get() | self.flags.raw()).to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&self.stored_len.to_le_bytes());
        if self.flags.has_original_size() {
            out.extend_from_slice(&self.original_len.to_le_bytes());
        }
        if self.flags.has_checksum() {
            out.extend_from_slice(&self.checksum.to_le_bytes());
        }
        for field in self.fields {
            field.write_to(&mut out);
        }
        if let Some(iv) = self.iv.filter(|_| self.flags.has_dedicated_iv()) {
            out.extend_from_slice(iv);
        }
        Ok(out)
    }
}

/// Where the next record will be written.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Target {
    Header,
    Body(usize),
}

/// Lays records and payload blocks out in package order.
///
/// Records go into the header's action region first. A record that does
/// not fit the space left is written whole into a fresh Action block
/// appended after every block emitted so far. Payload Data blocks are
/// appended as soon as their record is written, so a payload always
/// follows the block holding its record.
pub struct ActionWriter {
    header: Block,
    body: Vec<Block>,
    target: Target,
    offset: usize,
    end: usize,
}

impl ActionWriter {
    #[must_use]
    pub fn new(header: Block) -> Self {
        Self {
            header,
            body: Vec::new(),
            target: Target::Header,
            offset: ACTION_REGION,
            end: HASH,
        }
    }

    /// Append raw action-stream bytes (version, count or a record).
    ///
    /// # Errors
    ///
    /// Returns [`BuildError::RecordTooLarge`] for more than one block of
    /// bytes, or a wire error if the copy fails.
    pub fn write(&mut self, bytes: &[u8]) -> Result<(), BuildError> {
        if bytes.len() > BLOCK_SIZE {
            return Err(BuildError::RecordTooLarge {
                cmd: 0,
                size: bytes.len(),
            });
        }
        if self.end - self.offset < bytes.len() {
            self.body.push(Block::new(BlockKind::Action));
            self.target = Target::Body(self.body.len() - 1);
            self.offset = 0;
            self.end = BLOCK_SIZE;
        }
        let block = match self.target {
            Target::Header => &mut self.header,
            Target::Body(index) => &mut self.body[index],
        };
        block.write_at(self.offset, bytes)?;
        self.offset += bytes.len();
        Ok(())
    }

    /// Append `payload` as zero-padded Data blocks.
    pub fn push_payload(&mut self, payload: &[u8]) {
        for chunk in payload.chunks(BLOCK_SIZE) {
            let mut block = Block::new(BlockKind::Data);
            block.as_bytes_mut()[..chunk.len()].copy_from_slice(chunk);
            self.body.push(block);
        }
    }

    pub fn header_mut(&mut self) -> &mut Block {
        &mut self.header
    }

    /// Hand back the header and every block after it.
    pub fn finish(self) -> (Block, Vec<Block>) {
        (self.header, self.body)
    }
}
