use bop_wire::WireError;
use bop_wire::block::{read_cstr, read_u32_le, read_u64_le, slice_at};
use bop_wire::layout;

/// How a header field is stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldKind {
    /// NUL padded ASCII of at most `max` bytes.
    Text { max: usize },
    /// One selector or flag byte.
    U8,
    U32,
    U64,
    /// Opaque bytes of fixed length.
    Bytes { len: usize },
}

impl FieldKind {
    pub fn width(self) -> usize {
        match self {
            Self::Text { max } => max,
            Self::U8 => 1,
            Self::U32 => 4,
            Self::U64 => 8,
            Self::Bytes { len } => len,
        }
    }
}

/// Descriptor of one fixed-position header field.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeaderField {
    pub name: &'static str,
    pub offset: usize,
    pub kind: FieldKind,
}

const fn field(name: &'static str, offset: usize, kind: FieldKind) -> HeaderField {
    HeaderField { name, offset, kind }
}

/// Every fixed-position field of the header block, in offset order.
///
/// The public key and signature are left out: their width depends on the
/// authentication selector.
pub const HEADER_FIELDS: &[HeaderField] = &[
    field("identifier", layout::IDENTIFIER, FieldKind::Text { max: layout::IDENTIFIER_LEN }),
    field("version", layout::VERSION, FieldKind::U32),
    field("size", layout::SIZE, FieldKind::U64),
    field("tool", layout::TOOL, FieldKind::Text { max: layout::TOOL_LEN }),
    field("opn", layout::OPN, FieldKind::Text { max: layout::OPN_LEN }),
    field("jtag_id", layout::JTAG_ID, FieldKind::U32),
    field("jtag_mask", layout::JTAG_MASK, FieldKind::U32),
    field("chip_id", layout::OBSCURED, FieldKind::Bytes { len: layout::OBSCURED_LEN }),
    field("checksum", layout::CHECKSUM, FieldKind::U8),
    field("compression", layout::COMPRESSION, FieldKind::U8),
    field("integrity", layout::INTEGRITY, FieldKind::U8),
    field("encryption", layout::ENCRYPTION, FieldKind::U8),
    field("authentication", layout::AUTHENTICATION, FieldKind::U8),
    field("action_version", layout::ACTION_VERSION, FieldKind::U32),
    field("action_count", layout::ACTION_COUNT, FieldKind::U32),
    field("hash", layout::HASH, FieldKind::Bytes { len: layout::HASH_LEN }),
    field("challenge", layout::CHALLENGE, FieldKind::Bytes { len: layout::CHALLENGE_LEN }),
    field("iv", layout::IV, FieldKind::Bytes { len: layout::IV_LEN }),
    field("flags", layout::FLAGS, FieldKind::U8),
    field("end_size", layout::END_SIZE, FieldKind::U64),
    field("crc", layout::CRC, FieldKind::U32),
];

/// A decoded header field value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldReading<'a> {
    Text(String),
    U8(u8),
    U32(u32),
    U64(u64),
    Bytes(&'a [u8]),
}

impl std::fmt::Display for FieldReading<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{s:?}"),
            Self::U8(v) => write!(f, "0x{v:02X}"),
            Self::U32(v) => write!(f, "0x{v:08X}"),
            Self::U64(v) => write!(f, "{v}"),
            Self::Bytes(bytes) => {
                for b in *bytes {
                    write!(f, "{b:02X}")?;
                }
                Ok(())
            }
        }
    }
}

/// Receives each header field in table order.
pub trait HeaderVisitor {
    fn visit(&mut self, field: &HeaderField, value: FieldReading<'_>);
}

impl HeaderField {
    /// Read this field out of a header image.
    ///
    /// # Errors
    ///
    /// Returns [`WireError::FieldOutOfBounds`] if `header` is too short.
    pub fn read<'a>(&self, header: &'a [u8]) -> Result<FieldReading<'a>, WireError> {
        Ok(match self.kind {
            FieldKind::Text { max } => FieldReading::Text(read_cstr(header, self.offset, max)?),
            FieldKind::U8 => FieldReading::U8(slice_at(header, self.offset, 1)?[0]),
            FieldKind::U32 => FieldReading::U32(read_u32_le(header, self.offset)?),
            FieldKind::U64 => FieldReading::U64(read_u64_le(header, self.offset)?),
            FieldKind::Bytes { len } => FieldReading::Bytes(slice_at(header, self.offset, len)?),
        })
    }
}

/// Walk [`HEADER_FIELDS`] over `header`, handing each value to `visitor`.
///
/// # Errors
///
/// Fails on the first field that does not fit inside `header`.
pub fn visit_header<V: HeaderVisitor>(header: &[u8], visitor: &mut V) -> Result<(), WireError> {
    for field in HEADER_FIELDS {
        let value = field.read(header)?;
        visitor.visit(field, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bop_wire::BLOCK_SIZE;

    struct Collect(Vec<(&'static str, String)>);

    impl HeaderVisitor for Collect {
        fn visit(&mut self, field: &HeaderField, value: FieldReading<'_>) {
            self.0.push((field.name, value.to_string()));
        }
    }

    #[test]
    fn table_is_sorted_and_fits_in_a_block() {
        for pair in HEADER_FIELDS.windows(2) {
            assert!(pair[0].offset + pair[0].kind.width() <= pair[1].offset, "{}", pair[1].name);
        }
        let last = HEADER_FIELDS[HEADER_FIELDS.len() - 1];
        assert_eq!(last.offset + last.kind.width(), BLOCK_SIZE);
    }

    #[test]
    fn visits_every_field() {
        let mut header = vec![0u8; BLOCK_SIZE];
        header[..4].copy_from_slice(b"FCB\0");
        header[layout::SIZE..layout::SIZE + 8].copy_from_slice(&4096u64.to_le_bytes());
        header[layout::COMPRESSION] = 0x10;

        let mut collect = Collect(Vec::new());
        visit_header(&header, &mut collect).unwrap();
        assert_eq!(collect.0.len(), HEADER_FIELDS.len());
        assert_eq!(collect.0[0], ("identifier", "\"FCB\"".to_string()));
        assert_eq!(collect.0[2], ("size", "4096".to_string()));
        assert_eq!(collect.0[9], ("compression", "0x10".to_string()));
    }

    #[test]
    fn reject_short_header() {
        let mut collect = Collect(Vec::new());
        let result = visit_header(&[0u8; 64], &mut collect);
        assert!(matches!(result, Err(WireError::FieldOutOfBounds { .. })));
    }
}
