use std::fmt;
use std::str::FromStr;

use bop_wire::layout::IDENTIFIER_LEN;

use crate::error::TypeError;

/// The 4-byte tag at header offset 0x00 naming what a BOP configures.
///
/// `FCB` and `ICB` are three characters; the fourth byte is NUL.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BopIdentifier {
    #[default]
    Fsbl,
    Fcb,
    Icb,
    Pcb,
    Ubot,
}

impl BopIdentifier {
    pub const ALL: &'static [Self] = &[Self::Fsbl, Self::Fcb, Self::Icb, Self::Pcb, Self::Ubot];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fsbl => "FSBL",
            Self::Fcb => "FCB",
            Self::Icb => "ICB",
            Self::Pcb => "PCB",
            Self::Ubot => "UBOT",
        }
    }

    /// The identifier as stored on the wire, NUL padded.
    pub fn to_wire(self) -> [u8; IDENTIFIER_LEN] {
        let mut out = [0u8; IDENTIFIER_LEN];
        let name = self.as_str().as_bytes();
        out[..name.len()].copy_from_slice(name);
        out
    }

    /// Match the raw identifier bytes against the whitelist.
    ///
    /// Bytes after the first NUL are ignored.
    pub fn from_wire(raw: &[u8]) -> Option<Self> {
        let name = raw.split(|&b| b == 0).next().unwrap_or(raw);
        Self::ALL.iter().copied().find(|id| id.as_str().as_bytes() == name)
    }
}

impl fmt::Display for BopIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BopIdentifier {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|id| id.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| TypeError::UnknownName {
                enum_name: "BopIdentifier",
                name: s.to_string(),
            })
    }
}
