use zeroize::Zeroize;

use crate::error::TypeError;

/// 12-bit nonzero command number of an action record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommandId(u16);

impl CommandId {
    pub const MASK: u16 = 0x0FFF;

    /// # Errors
    ///
    /// Returns [`TypeError::InvalidCommand`] for zero or values above 0xFFF.
    pub fn new(cmd: u16) -> Result<Self, TypeError> {
        if cmd == 0 || cmd > Self::MASK {
            return Err(TypeError::InvalidCommand { cmd });
        }
        Ok(Self(cmd))
    }

    pub fn get(self) -> u16 {
        self.0
    }
}

/// The four flag bits sharing the `u16` command word with [`CommandId`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ActionFlags(u16);

impl ActionFlags {
    pub const NONE: Self = Self(0);
    pub const CHECKSUM: Self = Self(0x1000);
    pub const NO_COMPRESSION: Self = Self(0x2000);
    pub const DEDICATED_IV: Self = Self(0x4000);
    pub const ORIGINAL_SIZE: Self = Self(0x8000);
    pub const MASK: u16 = 0xF000;

    pub fn from_raw(raw: u16) -> Self {
        Self(raw & Self::MASK)
    }

    pub fn raw(self) -> u16 {
        self.0
    }

    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    pub fn has_checksum(self) -> bool {
        self.contains(Self::CHECKSUM)
    }

    pub fn is_compression_forced_off(self) -> bool {
        self.contains(Self::NO_COMPRESSION)
    }

    pub fn has_dedicated_iv(self) -> bool {
        self.contains(Self::DEDICATED_IV)
    }

    pub fn has_original_size(self) -> bool {
        self.contains(Self::ORIGINAL_SIZE)
    }
}

impl std::ops::BitOr for ActionFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// One typed parameter carried in an action record's field area.
///
/// Integers are written little-endian. `Bytes` is copied verbatim and must
/// already be word aligned.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldValue {
    U32(u32),
    U64(u64),
    Bytes(Vec<u8>),
}

impl FieldValue {
    /// Encoded size in bytes.
    pub fn wire_len(&self) -> usize {
        match self {
            Self::U32(_) => 4,
            Self::U64(_) => 8,
            Self::Bytes(bytes) => bytes.len(),
        }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        match self {
            Self::U32(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::U64(v) => out.extend_from_slice(&v.to_le_bytes()),
            Self::Bytes(bytes) => out.extend_from_slice(bytes),
        }
    }
}

/// A command plus its parameters and optional payload, ready for packing.
///
/// Payload and dedicated IV are wiped when the action is dropped.
///
/// ```text
/// let action = Action::new(CommandId::new(0x001)?)
///     .with_payload(bitstream)
///     .with_checksum()
///     .with_field(FieldValue::U32(0x4000_0000))?;
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Action {
    cmd: CommandId,
    checksum: bool,
    original_size: bool,
    fields: Vec<FieldValue>,
    iv: Option<[u8; 16]>,
    payload: Vec<u8>,
}

impl Action {
    #[must_use]
    pub fn new(cmd: CommandId) -> Self {
        Self {
            cmd,
            checksum: false,
            original_size: false,
            fields: Vec::new(),
            iv: None,
            payload: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = payload;
        self
    }

    /// Store a Fletcher-32 checksum of the original payload in the record.
    #[must_use]
    pub fn with_checksum(mut self) -> Self {
        self.checksum = true;
        self
    }

    /// Store the uncompressed payload length in the record.
    #[must_use]
    pub fn with_original_size(mut self) -> Self {
        self.original_size = true;
        self
    }

    /// # Errors
    ///
    /// Returns [`TypeError::UnalignedField`] if a `Bytes` value is not a
    /// multiple of 4 bytes long.
    pub fn with_field(mut self, field: FieldValue) -> Result<Self, TypeError> {
        if let FieldValue::Bytes(bytes) = &field {
            if bytes.len() % 4 != 0 {
                return Err(TypeError::UnalignedField { len: bytes.len() });
            }
        }
        self.fields.push(field);
        Ok(self)
    }

    /// Encrypt this action's payload under its own IV instead of the
    /// package's rolling IV.
    #[must_use]
    pub fn with_dedicated_iv(mut self, iv: [u8; 16]) -> Self {
        self.iv = Some(iv);
        self
    }

    pub fn cmd(&self) -> CommandId {
        self.cmd
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn has_payload(&self) -> bool {
        !self.payload.is_empty()
    }

    pub fn fields(&self) -> &[FieldValue] {
        &self.fields
    }

    pub fn dedicated_iv(&self) -> Option<&[u8; 16]> {
        self.iv.as_ref()
    }

    /// Total encoded length of all field values.
    pub fn field_len(&self) -> usize {
        self.fields.iter().map(FieldValue::wire_len).sum()
    }

    /// Flag bits as they will be written for this action.
    ///
    /// Checksum and original size are only meaningful with a payload, so
    /// they are dropped when there is none. [`ActionFlags::NO_COMPRESSION`]
    /// is decided by the builder after compressing.
    pub fn flags(&self) -> ActionFlags {
        let mut flags = ActionFlags::NONE;
        if self.has_payload() {
            if self.checksum {
                flags.insert(ActionFlags::CHECKSUM);
            }
            if self.original_size {
                flags.insert(ActionFlags::ORIGINAL_SIZE);
            }
        }
        if self.iv.is_some() {
            flags.insert(ActionFlags::DEDICATED_IV);
        }
        flags
    }
}

impl Drop for Action {
    fn drop(&mut self) {
        self.payload.zeroize();
        if let Some(iv) = self.iv.as_mut() {
            iv.zeroize();
        }
    }
}
