use std::fmt;
use std::str::FromStr;

use crate::error::TypeError;

// ── Macro for selector-byte enum boilerplate ──────────────────────────
//
// Each feature selector in the header is one byte with a fixed set of
// values and a canonical lowercase name used in manifests and traces.
// The macro generates the byte conversion pair, the name lookup and the
// Display/FromStr impls while the call site keeps its docs and derives.

macro_rules! selector_enum {
  (
    $(#[$meta:meta])*
    pub enum $name:ident {
      $( $(#[$vmeta:meta])* $variant:ident = $wire:expr => $label:literal ),+ $(,)?
    }
  ) => {
    $(#[$meta])*
    pub enum $name {
      $( $(#[$vmeta])* $variant ),+
    }

    impl $name {
      /// Every variant, in wire order.
      pub const ALL: &'static [Self] = &[$( Self::$variant ),+];

      /// Encode this variant as its header byte.
      pub fn to_wire_byte(self) -> u8 {
        match self {
          $( Self::$variant => $wire ),+
        }
      }

      /// Decode a header byte.
      ///
      /// Returns `Err(TypeError::InvalidEnumValue)` for unknown bytes.
      pub fn from_wire_byte(value: u8) -> Result<Self, TypeError> {
        match value {
          $( $wire => Ok(Self::$variant), )+
          other => Err(TypeError::InvalidEnumValue {
            enum_name: stringify!($name),
            value: other,
          }),
        }
      }

      /// Canonical lowercase name.
      pub fn name(self) -> &'static str {
        match self {
          $( Self::$variant => $label ),+
        }
      }
    }

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
      }
    }

    impl FromStr for $name {
      type Err = TypeError;

      fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
          $( $label => Ok(Self::$variant), )+
          other => Err(TypeError::UnknownName {
            enum_name: stringify!($name),
            name: other.to_string(),
          }),
        }
      }
    }
  };
}

// ── Checksum ──────────────────────────────────────────────────────────

selector_enum! {
  /// Payload checksum algorithm, header byte 0x60.
  ///
  /// ```text
  /// ┌──────┬────────────┬───────┐
  /// │ Wire │ Name       │ Bytes │
  /// ├──────┼────────────┼───────┤
  /// │ 0x10 │ fletcher32 │ 4     │
  /// └──────┴────────────┴───────┘
  /// ```
  #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
  pub enum ChecksumKind {
    #[default]
    Fletcher32 = 0x10 => "fletcher32",
  }
}

// ── Compression ───────────────────────────────────────────────────────

selector_enum! {
  /// Payload compression, header byte 0x61.
  ///
  /// `dcmp0` is the `CFG_CMP` byte-run codec.
  #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
  pub enum CompressionKind {
    #[default]
    None = 0x00 => "none",
    Dcmp0 = 0x10 => "dcmp0",
  }
}

impl CompressionKind {
  pub fn is_enabled(self) -> bool {
    self != Self::None
  }
}

// ── Integrity ─────────────────────────────────────────────────────────

selector_enum! {
  /// Hash-chain digest algorithm, header byte 0x62.
  ///
  /// ```text
  /// ┌──────┬────────┬─────────────┐
  /// │ Wire │ Name   │ Digest size │
  /// ├──────┼────────┼─────────────┤
  /// │ 0x10 │ sha256 │ 32          │
  /// │ 0x11 │ sha384 │ 48          │
  /// │ 0x12 │ sha512 │ 64          │
  /// └──────┴────────┴─────────────┘
  /// ```
  #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
  pub enum IntegrityKind {
    #[default]
    Sha256 = 0x10 => "sha256",
    Sha384 = 0x11 => "sha384",
    Sha512 = 0x12 => "sha512",
  }
}

impl IntegrityKind {
  /// Digest length in bytes.
  pub fn digest_len(self) -> usize {
    match self {
      Self::Sha256 => 32,
      Self::Sha384 => 48,
      Self::Sha512 => 64,
    }
  }
}

// ── Encryption ────────────────────────────────────────────────────────

selector_enum! {
  /// Payload confidentiality, header byte 0x80.
  ///
  /// The selector is derived from the AES key length at build time.
  #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
  pub enum EncryptionKind {
    #[default]
    None = 0x00 => "none",
    Ctr128 = 0x10 => "ctr128",
    Ctr256 = 0x12 => "ctr256",
  }
}

impl EncryptionKind {
  /// AES key length this selector requires, or `None` for no encryption.
  pub fn key_len(self) -> Option<usize> {
    match self {
      Self::None => None,
      Self::Ctr128 => Some(16),
      Self::Ctr256 => Some(32),
    }
  }

  /// Selector for a key of `len` bytes.
  pub fn for_key_len(len: usize) -> Option<Self> {
    match len {
      16 => Some(Self::Ctr128),
      32 => Some(Self::Ctr256),
      _ => None,
    }
  }

  pub fn is_enabled(self) -> bool {
    self != Self::None
  }
}

// ── Authentication ────────────────────────────────────────────────────

selector_enum! {
  /// Header signature scheme, header byte 0x81.
  ///
  /// ```text
  /// ┌──────┬──────────────┬────────────┬───────────┐
  /// │ Wire │ Name         │ Public key │ Signature │
  /// ├──────┼──────────────┼────────────┼───────────┤
  /// │ 0x00 │ none         │ -          │ -         │
  /// │ 0x10 │ ecdsa256     │ 64 (x‖y)   │ 64 (r‖s)  │
  /// │ 0x11 │ ecdsa384     │ 96 (x‖y)   │ 96 (r‖s)  │
  /// │ 0x20 │ rsa2048      │ 260        │ 256       │
  /// │ 0x30 │ brainpool256 │ 64         │ 64        │
  /// │ 0x31 │ brainpool384 │ 96         │ 96        │
  /// │ 0x40 │ sm2          │ 64         │ 64        │
  /// └──────┴──────────────┴────────────┴───────────┘
  /// ```
  #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
  pub enum AuthenticationKind {
    #[default]
    None = 0x00 => "none",
    Ecdsa256 = 0x10 => "ecdsa256",
    Ecdsa384 = 0x11 => "ecdsa384",
    Rsa2048 = 0x20 => "rsa2048",
    Brainpool256 = 0x30 => "brainpool256",
    Brainpool384 = 0x31 => "brainpool384",
    Sm2 = 0x40 => "sm2",
  }
}

impl AuthenticationKind {
  /// Size of the embedded public key, or `None` when unsigned.
  pub fn public_key_len(self) -> Option<usize> {
    match self {
      Self::None => None,
      Self::Ecdsa256 | Self::Brainpool256 | Self::Sm2 => Some(64),
      Self::Ecdsa384 | Self::Brainpool384 => Some(96),
      Self::Rsa2048 => Some(260),
    }
  }

  /// Size of the stored signature, or `None` when unsigned.
  pub fn signature_len(self) -> Option<usize> {
    match self {
      Self::None => None,
      Self::Ecdsa256 | Self::Brainpool256 | Self::Sm2 => Some(64),
      Self::Ecdsa384 | Self::Brainpool384 => Some(96),
      Self::Rsa2048 => Some(256),
    }
  }
}
