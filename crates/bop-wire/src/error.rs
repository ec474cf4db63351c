/// Errors raised by the byte-level primitives of the BOP format.
///
/// These sit at the bottom of the error stack. Higher crates wrap them:
///
/// ```text
/// ┌──────────────────────────────────────────────────────────┐
/// │ WireError (this crate)                                   │
/// │   ├── VarintTooLong / UnexpectedEof for varint parsing   │
/// │   ├── FieldOutOfBounds for little-endian field access    │
/// │   └── Empty/UnalignedChecksumInput for Fletcher-32       │
/// └──────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// Varint encoding exceeded 10 bytes without terminating.
    #[error("varint too long: exceeded 10-byte limit")]
    VarintTooLong,

    /// Input ended before a complete varint could be read.
    #[error("unexpected end of input at offset {offset}")]
    UnexpectedEof { offset: usize },

    /// A fixed-width field does not fit in the buffer it was read from.
    #[error("field of {width} bytes at offset {offset:#X} exceeds buffer of {len} bytes")]
    FieldOutOfBounds {
        offset: usize,
        width: usize,
        len: usize,
    },

    /// Fletcher-32 was asked to checksum zero bytes.
    #[error("checksum input is empty")]
    EmptyChecksumInput,

    /// Fletcher-32 input must be a whole number of 32-bit words.
    #[error("checksum input of {len} bytes is not a multiple of 4")]
    UnalignedChecksumInput { len: usize },
}
