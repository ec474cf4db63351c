use bop_codec::CodecError;
use bop_crypto::CryptoError;
use bop_types::{ErrorClass, TypeError};
use bop_wire::WireError;

/// Errors raised while building a package. Every one of them is fatal.
///
/// Error hierarchy:
///
/// ```text
///   BuildError
///   ├── NoBops                   ← build() called before any add_bop/add_action
///   ├── EmptyBop                 ← a BOP without actions
///   ├── FieldTooLong             ← tool/opn string wider than its header slot
///   ├── RecordTooLarge           ← one action record exceeds a block
///   ├── PayloadTooLarge          ← payload length does not fit the u32 size field
///   ├── UnalignedChecksumPayload ← checksum requested on a non-word-aligned payload
///   ├── KeyMaterialTooLarge      ← public key or signature wider than its slot
///   ├── CrcMismatch              ← end-size patch on a header with a bad CRC
///   ├── MisalignedStream         ← stream or BOP length not a block multiple
///   ├── Codec(CodecError)        ← from payload compression
///   ├── Crypto(CryptoError)      ← from the crypto provider
///   ├── Type(TypeError)          ← from bop-types
///   └── Wire(WireError)          ← from bop-wire field access
/// ```
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no BOP has been added to the builder")]
    NoBops,

    #[error("BOP #{index} has no actions")]
    EmptyBop { index: usize },

    #[error("{field} is {len} bytes, the header holds at most {max}")]
    FieldTooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },

    #[error("action 0x{cmd:03X} record is {size} bytes, limit is one 2048-byte block")]
    RecordTooLarge { cmd: u16, size: usize },

    #[error("action 0x{cmd:03X} payload is {size} bytes, larger than a u32 size field")]
    PayloadTooLarge { cmd: u16, size: usize },

    #[error("action 0x{cmd:03X} requests a checksum but its {len}-byte payload is not a multiple of 4")]
    UnalignedChecksumPayload { cmd: u16, len: usize },

    #[error("{what} is {len} bytes, the header slot holds {max}")]
    KeyMaterialTooLarge {
        what: &'static str,
        len: usize,
        max: usize,
    },

    #[error("header CRC at offset 0x{offset:X} does not match, refusing to patch end size")]
    CrcMismatch { offset: usize },

    #[error("stream of {len} bytes is not a sequence of whole 2048-byte blocks")]
    MisalignedStream { len: usize },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Wire(#[from] WireError),
}

impl BuildError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NoBops
            | Self::EmptyBop { .. }
            | Self::FieldTooLong { .. }
            | Self::MisalignedStream { .. }
            | Self::Codec(_)
            | Self::Type(_)
            | Self::Wire(_) => ErrorClass::Format,
            Self::RecordTooLarge { .. } | Self::PayloadTooLarge { .. } | Self::KeyMaterialTooLarge { .. } => {
                ErrorClass::Overflow
            }
            Self::UnalignedChecksumPayload { .. } => ErrorClass::Protocol,
            Self::CrcMismatch { .. } => ErrorClass::Integrity,
            Self::Crypto(e) => match e {
                CryptoError::InvalidKeyLength { .. } => ErrorClass::Confidentiality,
                CryptoError::Pem(_) | CryptoError::Hex(_) => ErrorClass::Format,
                CryptoError::UnsupportedScheme { .. }
                | CryptoError::InvalidPublicKey { .. }
                | CryptoError::InvalidSignatureEncoding { .. } => ErrorClass::Authenticity,
            },
        }
    }
}
