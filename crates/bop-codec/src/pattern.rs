use std::fmt;

/// The eight token shapes of the byte-run codec, stored in the low three
/// bits of every flag varint.
///
/// ```text
/// ┌──────┬──────────┬──────────────────────────────────────┐
/// │ Bits │ Pattern  │ Expands to                           │
/// ├──────┼──────────┼──────────────────────────────────────┤
/// │ 0    │ None     │ `length` literal bytes               │
/// │ 1    │ Zero     │ `length` × 0x00                      │
/// │ 2    │ ZeroVar  │ `length` × 0x00, then one byte       │
/// │ 3    │ VarZero  │ one byte, then `length` × 0x00       │
/// │ 4    │ High     │ `length` × 0xFF                      │
/// │ 5    │ HighVar  │ `length` × 0xFF, then one byte       │
/// │ 6    │ VarHigh  │ one byte, then `length` × 0xFF       │
/// │ 7    │ Var      │ `length` × one explicit byte         │
/// └──────┴──────────┴──────────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Pattern {
    None = 0,
    Zero = 1,
    ZeroVar = 2,
    VarZero = 3,
    High = 4,
    HighVar = 5,
    VarHigh = 6,
    Var = 7,
}

impl Pattern {
    /// Decode the low three bits of a flag.
    pub fn from_bits(bits: u64) -> Self {
        match bits & 0x7 {
            0 => Self::None,
            1 => Self::Zero,
            2 => Self::ZeroVar,
            3 => Self::VarZero,
            4 => Self::High,
            5 => Self::HighVar,
            6 => Self::VarHigh,
            _ => Self::Var,
        }
    }

    pub fn bits(self) -> u64 {
        self as u64
    }

    /// Byte repeated by the run, for patterns where it is implied.
    pub fn implied_fill(self) -> u8 {
        match self {
            Self::High | Self::HighVar | Self::VarHigh => 0xFF,
            _ => 0x00,
        }
    }

    /// One explicit byte follows the flag.
    pub fn has_explicit_byte(self) -> bool {
        !matches!(self, Self::None | Self::Zero | Self::High)
    }

    /// The explicit byte is emitted before the run.
    pub fn is_leading(self) -> bool {
        matches!(self, Self::VarZero | Self::VarHigh)
    }

    /// The explicit byte is emitted after the run.
    pub fn is_trailing(self) -> bool {
        matches!(self, Self::ZeroVar | Self::HighVar)
    }

    /// Pure runs are always merged by the encoder and may not repeat.
    pub fn allows_repeat(self) -> bool {
        !matches!(self, Self::Zero | Self::High | Self::Var)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::Zero => "ZERO",
            Self::ZeroVar => "ZERO-VAR",
            Self::VarZero => "VAR-ZERO",
            Self::High => "HIGH",
            Self::HighVar => "HIGH-VAR",
            Self::VarHigh => "VAR-HIGH",
            Self::Var => "VAR",
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded flag varint: `(length << 4) | repeat << 3 | pattern`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Flag {
    pub pattern: Pattern,
    pub repeat: bool,
    pub length: u64,
}

impl Flag {
    pub const REPEAT_BIT: u64 = 0x08;

    pub fn from_raw(raw: u64) -> Self {
        Self {
            pattern: Pattern::from_bits(raw),
            repeat: raw & Self::REPEAT_BIT != 0,
            length: raw >> 4,
        }
    }

    pub fn raw(self) -> u64 {
        let repeat = if self.repeat { Self::REPEAT_BIT } else { 0 };
        (self.length << 4) | repeat | self.pattern.bits()
    }

    /// Coverage slot of this flag: pattern plus repeat bit.
    #[allow(clippy::cast_possible_truncation)]
    pub fn kind_index(self) -> u32 {
        (self.raw() & 0xF) as u32
    }
}
