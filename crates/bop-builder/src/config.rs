use bop_types::{BopIdentifier, ChecksumKind, IntegrityKind};
use bop_wire::layout::{OPN_LEN, TOOL_LEN};

use crate::error::BuildError;

/// Per-BOP header settings.
///
/// Compression, the AES key and the signing key are package-wide and live
/// on [`PackageBuilder`](crate::PackageBuilder) instead.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BopConfig {
    pub identifier: BopIdentifier,
    pub version: u32,
    pub tool: String,
    pub opn: String,
    pub jtag_id: u32,
    pub jtag_mask: u32,
    pub chip_id: u8,
    pub checksum: ChecksumKind,
    pub integrity: IntegrityKind,
    /// Starting IV for the challenge and the rolling payload IV. A random
    /// one is drawn from the crypto provider when unset.
    pub iv: Option<[u8; 16]>,
}

impl Default for BopConfig {
    fn default() -> Self {
        Self {
            identifier: BopIdentifier::Fsbl,
            version: 0,
            tool: String::new(),
            opn: String::new(),
            jtag_id: 0,
            jtag_mask: 0,
            chip_id: 0,
            checksum: ChecksumKind::Fletcher32,
            integrity: IntegrityKind::Sha256,
            iv: None,
        }
    }
}

impl BopConfig {
    #[must_use]
    pub fn new(identifier: BopIdentifier) -> Self {
        Self {
            identifier,
            ..Self::default()
        }
    }

    /// # Errors
    ///
    /// Returns [`BuildError::FieldTooLong`] if `tool` or `opn` does not fit
    /// its header slot.
    pub fn validate(&self) -> Result<(), BuildError> {
        for (field, value, max) in [("tool", &self.tool, TOOL_LEN), ("opn", &self.opn, OPN_LEN)] {
            if value.len() > max {
                return Err(BuildError::FieldTooLong {
                    field,
                    len: value.len(),
                    max,
                });
            }
        }
        Ok(())
    }
}
