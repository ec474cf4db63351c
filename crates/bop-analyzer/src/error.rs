use bop_builder::BuildError;
use bop_types::{ErrorClass, TypeError};
use bop_wire::WireError;

/// Structural errors that stop analysis outright.
///
/// Everything else the analyzer notices (hash, CRC inside a BOP, challenge,
/// signature, action legality) becomes a [`Finding`](crate::Finding) on the
/// report instead of an error.
///
/// Error hierarchy:
///
/// ```text
///   AnalyzeError
///   ├── InvalidStreamLength  ← stream empty or not whole 2048-byte blocks
///   ├── UnknownIdentifier    ← BOP identifier outside the accepted set
///   ├── InvalidBopSize       ← size field zero, misaligned or past the end
///   ├── SizeFieldMismatch    ← parse_bop given a slice its header disagrees with
///   ├── CrcMismatch          ← header CRC32 wrong (structural pass only)
///   ├── EndSizeMismatch      ← end-size field does not reach the stream end
///   ├── LastFlagMismatch     ← last-BOP flag disagrees with position
///   ├── Build(BuildError)    ← from end-size patching
///   ├── Type(TypeError)      ← from bop-types
///   └── Wire(WireError)      ← from bop-wire field access
/// ```
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    #[error("stream has invalid length of {len} bytes")]
    InvalidStreamLength { len: usize },

    #[error("BOP identifier {identifier:?} at offset 0x{offset:X} is not supported")]
    UnknownIdentifier { offset: usize, identifier: String },

    #[error("BOP {identifier} at offset 0x{offset:X} has invalid size {size}")]
    InvalidBopSize {
        offset: usize,
        identifier: String,
        size: u64,
    },

    #[error("header declares {declared} bytes but the BOP is {actual} bytes")]
    SizeFieldMismatch { declared: u64, actual: usize },

    #[error("BOP {identifier} at offset 0x{offset:X} has invalid CRC: expected 0x{expected:08X}, found 0x{found:08X}")]
    CrcMismatch {
        offset: usize,
        identifier: String,
        expected: u32,
        found: u32,
    },

    #[error("BOP {identifier} at offset 0x{offset:X} has end size {found}, expected {expected}")]
    EndSizeMismatch {
        offset: usize,
        identifier: String,
        expected: u64,
        found: u64,
    },

    #[error("BOP {identifier} at offset 0x{offset:X}: last-BOP flag is {flag} but the BOP {position}")]
    LastFlagMismatch {
        offset: usize,
        identifier: String,
        flag: &'static str,
        position: &'static str,
    },

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Type(#[from] TypeError),

    #[error(transparent)]
    Wire(#[from] WireError),
}

impl AnalyzeError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::CrcMismatch { .. } => ErrorClass::Integrity,
            Self::Build(e) => e.class(),
            _ => ErrorClass::Format,
        }
    }
}
