use bop_wire::WireError;

use crate::pattern::Pattern;

/// Errors from compressing or decompressing a `CFG_CMP` stream.
///
/// ```text
/// ┌──────────────────────────────────────────────────────────────┐
/// │ CodecError (this crate)                                      │
/// │   ├── EmptyInput on the compress side                        │
/// │   ├── framing: TooShort, BadMagic, UnsupportedVersion,       │
/// │   │   ZeroOriginalSize, ZeroCompressedSize, TokensOutOfBounds│
/// │   ├── tokens: ZeroLengthToken, InvalidRepeat, ZeroRepeat,    │
/// │   │   RepeatedLiteralTooLong, TokenTooLong                   │
/// │   ├── totals: OutputOverrun, InputOverrun, SizeMismatch,     │
/// │   │   CompressedSizeMismatch                                 │
/// │   ├── engine misuse: EmptyOutputBuffer, CalledAfterDone,     │
/// │   │   EngineFailed, UnexpectedEndOfStream                    │
/// │   ├── Wire(WireError) from varint reads                      │
/// │   └── Io(std::io::Error) from the async reader               │
/// └──────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("cannot compress empty input")]
    EmptyInput,

    #[error("compressed stream of {len} bytes is too short")]
    TooShort { len: usize },

    #[error("compressed stream does not start with CFG_CMP")]
    BadMagic,

    #[error("unsupported CFG_CMP version {version}")]
    UnsupportedVersion { version: u8 },

    #[error("compressed stream declares an original size of zero")]
    ZeroOriginalSize,

    #[error("compressed stream declares a token size of zero")]
    ZeroCompressedSize,

    #[error("token section of {compressed_size} bytes at offset {offset} exceeds stream of {len} bytes")]
    TokensOutOfBounds {
        offset: usize,
        compressed_size: u64,
        len: usize,
    },

    #[error("zero-length {pattern} token at token offset {offset}")]
    ZeroLengthToken { pattern: Pattern, offset: usize },

    #[error("repeat flag is not allowed on {pattern} tokens")]
    InvalidRepeat { pattern: Pattern },

    #[error("repeat count of zero at token offset {offset}")]
    ZeroRepeat { offset: usize },

    #[error("repeated literal run of {len} bytes exceeds the {limit}-byte scratch buffer")]
    RepeatedLiteralTooLong { len: u64, limit: usize },

    #[error("token length {length} does not fit in memory")]
    TokenTooLong { length: u64 },

    #[error("decoded output exceeds the declared original size of {original_size} bytes")]
    OutputOverrun { original_size: u64 },

    #[error("token bytes exceed the declared token size of {compressed_size} bytes")]
    InputOverrun { compressed_size: u64 },

    #[error("decoded {actual} bytes but the stream declares {expected}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("consumed {actual} token bytes but the stream declares {expected}")]
    CompressedSizeMismatch { expected: u64, actual: u64 },

    #[error("output buffer is empty")]
    EmptyOutputBuffer,

    #[error("decompressor called again after it finished; reset it first")]
    CalledAfterDone,

    #[error("decompressor is in the error state; reset it first")]
    EngineFailed,

    #[error("input ended before the compressed stream was complete")]
    UnexpectedEndOfStream,

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
