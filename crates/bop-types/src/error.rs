use bop_wire::WireError;

/// Errors raised while building or interpreting typed BOP values.
///
/// These are one level above [`WireError`]: they concern the meaning of
/// selector bytes, identifiers and action parameters rather than raw byte
/// access.
///
/// # Error hierarchy
///
/// ```text
/// ┌─────────────────────────────────────────────────────┐
/// │ TypeError (this crate)                              │
/// │   ├── wraps WireError for low-level access failures │
/// │   ├── InvalidEnumValue for unknown selector bytes   │
/// │   ├── UnknownName for unknown selector names        │
/// │   ├── InvalidCommand for out-of-range command ids   │
/// │   └── UnalignedField for non-word field data        │
/// └─────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, thiserror::Error)]
pub enum TypeError {
  /// A selector byte did not match any known variant.
  #[error("invalid {enum_name} value: {value:#04X}")]
  InvalidEnumValue { enum_name: &'static str, value: u8 },

  /// A selector or identifier name (from a manifest) is not recognised.
  #[error("unknown {enum_name} name: {name:?}")]
  UnknownName { enum_name: &'static str, name: String },

  /// Command ids are 12-bit and must be nonzero.
  #[error("invalid action command {cmd:#06X}: must be in 0x001..=0xFFF")]
  InvalidCommand { cmd: u16 },

  /// Action field data must be a whole number of 32-bit words.
  #[error("action field of {len} bytes is not a multiple of 4")]
  UnalignedField { len: usize },

  /// A dedicated IV was not exactly 16 bytes.
  #[error("dedicated IV must be 16 bytes, got {len}")]
  InvalidIvLength { len: usize },

  /// An underlying wire-level error.
  #[error(transparent)]
  Wire(#[from] WireError),
}
