use std::fmt;

/// Which property of a package an error or finding is about.
///
/// The builder treats every class as fatal. The analyzer aborts on
/// [`Format`](Self::Format) and [`Overflow`](Self::Overflow) and reports
/// the rest as findings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Bad magic, version, size, identifier or varint.
    Format,
    /// CRC or hash mismatch.
    Integrity,
    /// Challenge or decryption failure.
    Confidentiality,
    /// Signature failure.
    Authenticity,
    /// Action flags inconsistent with the features the header enables.
    Protocol,
    /// A buffer is too small or a size invariant does not hold.
    Overflow,
}

impl ErrorClass {
    /// `true` for the classes the analyzer cannot continue past.
    pub fn is_fatal_for_analysis(self) -> bool {
        matches!(self, Self::Format | Self::Overflow)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Format => "format",
            Self::Integrity => "integrity",
            Self::Confidentiality => "confidentiality",
            Self::Authenticity => "authenticity",
            Self::Protocol => "protocol",
            Self::Overflow => "overflow",
        })
    }
}
