use bop_wire::varint::read_varint;

use crate::error::CodecError;
use crate::token::Token;
use crate::{MAGIC, VERSION};

/// Streams of this many bytes or fewer cannot hold a header plus a token.
const MIN_STREAM_LEN: usize = 10;

/// Upper bound on the output reserved up front; the rest grows on demand.
const MAX_PREALLOC: usize = 1 << 20;

/// The fixed prefix of a compressed stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StreamHeader {
    pub original_size: u64,
    pub compressed_size: u64,
    /// Offset of the first token byte.
    pub header_len: usize,
}

impl StreamHeader {
    /// Validate magic, version and both sizes.
    ///
    /// # Errors
    ///
    /// Any framing problem is reported as the matching [`CodecError`]
    /// variant.
    pub fn parse(input: &[u8]) -> Result<Self, CodecError> {
        if input.len() <= MIN_STREAM_LEN {
            return Err(CodecError::TooShort { len: input.len() });
        }
        if input[..7] != MAGIC[..7] {
            return Err(CodecError::BadMagic);
        }
        if input[7] != VERSION {
            return Err(CodecError::UnsupportedVersion { version: input[7] });
        }

        let mut cursor = MAGIC.len();
        let original_size = read_varint(input, input.len(), &mut cursor)?;
        let compressed_size = read_varint(input, input.len(), &mut cursor)?;
        if original_size == 0 {
            return Err(CodecError::ZeroOriginalSize);
        }
        if compressed_size == 0 {
            return Err(CodecError::ZeroCompressedSize);
        }
        let fits = usize::try_from(compressed_size)
            .ok()
            .and_then(|size| cursor.checked_add(size))
            .is_some_and(|end| end <= input.len());
        if !fits {
            return Err(CodecError::TokensOutOfBounds {
                offset: cursor,
                compressed_size,
                len: input.len(),
            });
        }
        Ok(Self {
            original_size,
            compressed_size,
            header_len: cursor,
        })
    }

    /// End offset of the token section.
    pub fn tokens_end(&self) -> usize {
        // Bounded by the input length in `parse`.
        self.header_len + usize::try_from(self.compressed_size).unwrap_or(0)
    }
}

/// Decompress a whole `CFG_CMP` stream.
///
/// Bytes after the token section are ignored.
///
/// # Errors
///
/// Fails if the stream is malformed, if a token would overrun the
/// declared original size, or if the decoded length does not match it.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>, CodecError> {
    let header = StreamHeader::parse(input)?;
    let original = header.original_size;
    let end = header.tokens_end();

    let reserve = usize::try_from(original).map_or(MAX_PREALLOC, |n| n.min(MAX_PREALLOC));
    let mut out = Vec::with_capacity(reserve);
    let mut cursor = header.header_len;

    while cursor < end {
        let token = Token::decode(input, end, &mut cursor)?;
        let produced = out.len() as u64;
        let fits = token
            .expanded_len()
            .and_then(|len| produced.checked_add(len))
            .is_some_and(|total| total <= original);
        if !fits {
            return Err(CodecError::OutputOverrun {
                original_size: original,
            });
        }
        token.expand_into(&mut out);
    }

    if out.len() as u64 != original {
        return Err(CodecError::SizeMismatch {
            expected: original,
            actual: out.len() as u64,
        });
    }
    Ok(out)
}
