use std::fmt;

use bop_types::{
    ActionFlags, AuthenticationKind, ChecksumKind, CompressionKind, Diagnostics, EncryptionKind,
    ErrorClass, FieldReading, HeaderField, HeaderVisitor, IntegrityKind, Severity,
};
use zeroize::Zeroizing;

/// One problem noticed while analysing a BOP.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Finding {
    pub class: ErrorClass,
    pub severity: Severity,
    /// Byte offset inside the BOP the finding is about, when there is one.
    pub offset: Option<usize>,
    pub message: String,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}]", self.severity, self.class)?;
        if let Some(offset) = self.offset {
            write!(f, " @0x{offset:04X}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Pass/fail per property. A flag starts `true` and is cleared by the
/// first failure concerning it; `overall` is cleared by any error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct StatusFlags {
    pub overall: bool,
    pub action: bool,
    pub checksum: bool,
    pub compression: bool,
    pub integrity: bool,
    pub encryption: bool,
    pub authentication: bool,
    pub decompression: bool,
}

impl Default for StatusFlags {
    fn default() -> Self {
        Self {
            overall: true,
            action: true,
            checksum: true,
            compression: true,
            integrity: true,
            encryption: true,
            authentication: true,
            decompression: true,
        }
    }
}

/// The decoded header fields of one BOP.
///
/// Selectors are `None` when the stored byte is not a known value.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeaderSummary {
    pub identifier: String,
    pub version: u32,
    pub size: u64,
    pub tool: String,
    pub opn: String,
    pub jtag_id: u32,
    pub jtag_mask: u32,
    /// `None` if the obscured chip-id field fails its CRC.
    pub chip_id: Option<u8>,
    pub checksum: Option<ChecksumKind>,
    pub compression: Option<CompressionKind>,
    pub integrity: Option<IntegrityKind>,
    pub encryption: Option<EncryptionKind>,
    pub authentication: Option<AuthenticationKind>,
    pub action_version: u32,
    pub action_count: u32,
    pub is_last: bool,
    pub end_size: u64,
    pub crc: u32,
}

/// One action record as read back from the action stream.
#[derive(Clone, Debug)]
pub struct DecodedAction {
    pub cmd: u16,
    pub flags: ActionFlags,
    /// Offset of the record's command word inside the BOP.
    pub record_offset: usize,
    /// Record length in bytes, from the command word.
    pub record_len: usize,
    /// Stored (compressed, encrypted) payload length.
    pub payload_size: u32,
    pub original_size: Option<u32>,
    pub checksum: Option<u32>,
    /// Raw field words in record order.
    pub fields: Vec<u32>,
    pub iv: Option<[u8; 16]>,
    /// Recovered plaintext, when the payload could be decrypted and
    /// decompressed.
    pub payload: Option<Zeroizing<Vec<u8>>>,
}

impl DecodedAction {
    pub(crate) fn new(command: u32, record_offset: usize) -> Self {
        let low = (command & 0xFFFF) as u16;
        Self {
            cmd: low & 0x0FFF,
            flags: ActionFlags::from_raw(low & ActionFlags::MASK),
            record_offset,
            record_len: (command >> 16) as usize,
            payload_size: 0,
            original_size: None,
            checksum: None,
            fields: Vec::new(),
            iv: None,
            payload: None,
        }
    }

    pub fn payload_blocks(&self) -> usize {
        (self.payload_size as usize).div_ceil(bop_wire::BLOCK_SIZE)
    }
}

/// Everything learned about one BOP.
#[derive(Clone, Debug, Default)]
pub struct BopReport {
    pub index: usize,
    /// Offset of this BOP inside the stream.
    pub offset: usize,
    pub len: usize,
    pub header: HeaderSummary,
    pub actions: Vec<DecodedAction>,
    pub findings: Vec<Finding>,
    pub status: StatusFlags,
    /// One line per header field.
    pub header_table: Vec<String>,
    /// Action records, hash walk and payload results in walk order.
    pub trace: Vec<String>,
}

impl BopReport {
    pub fn is_ok(&self) -> bool {
        self.status.overall
    }

    pub fn errors(&self) -> impl Iterator<Item = &Finding> {
        self.findings.iter().filter(|f| f.severity >= Severity::Error)
    }

    pub fn has_error(&self, class: ErrorClass) -> bool {
        self.errors().any(|f| f.class == class)
    }

    /// The full textual trace: a title, the header table, then the walk.
    pub fn render(&self) -> String {
        let mut out = format!("BOP #{} at 0x{:08X} ({} bytes)\n", self.index, self.offset, self.len);
        out.push_str("  Header\n");
        for line in &self.header_table {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
        for line in &self.trace {
            out.push_str("  ");
            out.push_str(line);
            out.push('\n');
        }
        out
    }
}

/// Reports for every BOP of a stream, in stream order.
#[derive(Clone, Debug, Default)]
pub struct PackageReport {
    pub bops: Vec<BopReport>,
}

impl PackageReport {
    pub fn is_ok(&self) -> bool {
        self.bops.iter().all(BopReport::is_ok)
    }

    pub fn findings(&self) -> impl Iterator<Item = (usize, &Finding)> {
        self.bops.iter().flat_map(|b| b.findings.iter().map(move |f| (b.index, f)))
    }

    pub fn render(&self) -> String {
        let mut out = format!("BOP count: {}\n", self.bops.len());
        for bop in &self.bops {
            out.push_str(&bop.render());
        }
        out
    }
}

/// Collects trace lines and findings for one BOP and mirrors them to the
/// diagnostics sink.
pub(crate) struct Recorder<'a> {
    diagnostics: &'a dyn Diagnostics,
    depth: usize,
    pub(crate) trace: Vec<String>,
    pub(crate) findings: Vec<Finding>,
}

impl<'a> Recorder<'a> {
    pub(crate) fn new(diagnostics: &'a dyn Diagnostics) -> Self {
        Self {
            diagnostics,
            depth: 0,
            trace: Vec::new(),
            findings: Vec::new(),
        }
    }

    fn push(&mut self, text: String) {
        self.trace.push(format!("{:width$}{text}", "", width = self.depth * 2));
    }

    /// Trace-only detail.
    pub(crate) fn line(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.diagnostics.emit(Severity::Debug, &text);
        self.push(text);
    }

    /// A check that passed.
    pub(crate) fn info(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.diagnostics.emit(Severity::Info, &text);
        self.push(format!("Info: {text}"));
    }

    pub(crate) fn warn(&mut self, class: ErrorClass, offset: Option<usize>, message: impl Into<String>) {
        self.finding(Severity::Warning, class, offset, message.into());
    }

    pub(crate) fn error(&mut self, class: ErrorClass, offset: Option<usize>, message: impl Into<String>) {
        self.finding(Severity::Error, class, offset, message.into());
    }

    pub(crate) fn report(&mut self, finding: Finding) {
        self.finding(finding.severity, finding.class, finding.offset, finding.message);
    }

    fn finding(&mut self, severity: Severity, class: ErrorClass, offset: Option<usize>, message: String) {
        self.diagnostics.emit(severity, &message);
        let label = if severity >= Severity::Error { "Error" } else { "Warning" };
        self.push(format!("{label}: {message}"));
        self.findings.push(Finding {
            class,
            severity,
            offset,
            message,
        });
    }

    pub(crate) fn indent(&mut self) {
        self.depth += 1;
    }

    pub(crate) fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

/// Renders the header descriptor table as `offset  name  value` lines.
#[derive(Default)]
pub(crate) struct HeaderTable {
    pub(crate) lines: Vec<String>,
}

impl HeaderVisitor for HeaderTable {
    fn visit(&mut self, field: &HeaderField, value: FieldReading<'_>) {
        self.lines.push(format!("0x{:03X}  {:<15} {value}", field.offset, field.name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bop_types::MemoryDiagnostics;

    #[test]
    fn recorder_indents_and_mirrors() {
        let sink = MemoryDiagnostics::new();
        let mut rec = Recorder::new(&sink);
        rec.line("Block: Action");
        rec.indent();
        rec.info("verified");
        rec.error(ErrorClass::Integrity, Some(0x800), "hash mismatch");
        rec.dedent();
        rec.warn(ErrorClass::Protocol, None, "odd size");

        assert_eq!(
            rec.trace,
            ["Block: Action", "  Info: verified", "  Error: hash mismatch", "Warning: odd size"]
        );
        assert_eq!(rec.findings.len(), 2);
        assert_eq!(rec.findings[0].to_string(), "error [integrity] @0x0800: hash mismatch");
        assert_eq!(sink.count_at_least(Severity::Warning), 2);
    }

    #[test]
    fn decoded_action_splits_command_word() {
        let action = DecodedAction::new(0x0018_5003, 0xC8);
        assert_eq!(action.cmd, 0x003);
        assert!(action.flags.has_checksum());
        assert!(action.flags.has_dedicated_iv());
        assert!(!action.flags.has_original_size());
        assert_eq!(action.record_len, 24);
    }

    #[test]
    fn payload_block_count_rounds_up() {
        let mut action = DecodedAction::new(0x0008_0001, 0xC8);
        action.payload_size = 2049;
        assert_eq!(action.payload_blocks(), 2);
        action.payload_size = 2048;
        assert_eq!(action.payload_blocks(), 1);
    }
}
