use std::collections::VecDeque;
use std::sync::Arc;

use bop_builder::patch_end_sizes;
use bop_crypto::{AES_BLOCK_LEN, AesKey, CryptoProvider, RustCryptoProvider, advance_counter, increment_iv};
use bop_types::{
    AuthenticationKind, BopIdentifier, ChecksumKind, CompressionKind, Diagnostics, EncryptionKind, ErrorClass,
    IntegrityKind, Severity, TracingDiagnostics, visit_header,
};
use bop_wire::BLOCK_SIZE;
use bop_wire::block::{read_cstr, read_u32_le, read_u64_le, slice_at};
use bop_wire::checksum::{crc32, fletcher32};
use bop_wire::layout::{
    ACTION_COUNT, ACTION_RECORDS, ACTION_REGION, ACTION_STREAM_VERSION, ACTION_VERSION, AUTHENTICATION, CHALLENGE,
    CHALLENGE_LEN, CHECKSUM, COMPRESSION, CRC, ENCRYPTION, END_SIZE, FLAGS, HASH, HASH_LEN, IDENTIFIER,
    IDENTIFIER_LEN, INTEGRITY, IV, IV_LEN, JTAG_ID, JTAG_MASK, LAST_BOP_FLAG, OBSCURED, OBSCURED_LEN, OPN, OPN_LEN,
    PUBLIC_KEY, SIGNATURE, SIGNED_LEN, SIZE, TOOL, TOOL_LEN, VERSION,
};
use bop_wire::obscure::{obscure, open_chip_id};
use zeroize::Zeroizing;

use crate::action_reader::ActionReader;
use crate::error::AnalyzeError;
use crate::integrity::HashWalker;
use crate::options::AnalyzerOptions;
use crate::payload::PayloadDecoder;
use crate::report::{BopReport, DecodedAction, Finding, HeaderSummary, HeaderTable, PackageReport, Recorder, StatusFlags};

/// Parses and verifies `.cfgbit` streams.
///
/// Two levels of checking are offered:
///
///   1. [`parse`](Self::parse): a structural pass over the BOP sequence
///      (identifier, size, optionally CRC and end size). It either
///      succeeds for the whole stream or fails with an [`AnalyzeError`].
///   2. [`analyze`](Self::analyze) / [`parse_bop`](Self::parse_bop): a
///      full decode of each BOP. Header fields, the action stream, the
///      hash chain, the signature, the challenge and every payload are
///      checked. Problems are collected as [`Finding`]s and
///      [`StatusFlags`] on a [`BopReport`]; only structural damage aborts.
///
/// # Example
///
/// ```rust
/// use bop_analyzer::PackageAnalyzer;
/// use bop_builder::PackageBuilder;
/// use bop_types::{Action, CommandId};
///
/// let stream = PackageBuilder::new()
///     .add_action(Action::new(CommandId::new(0x001).unwrap()).with_payload(vec![0xAB; 256]))
///     .build()
///     .unwrap();
///
/// let report = PackageAnalyzer::new().analyze(&stream).unwrap();
/// assert!(report.is_ok());
/// assert_eq!(report.bops[0].actions[0].payload.as_deref().map(Vec::len), Some(256));
/// ```
pub struct PackageAnalyzer {
    options: AnalyzerOptions,
    crypto: Arc<dyn CryptoProvider>,
    diagnostics: Arc<dyn Diagnostics>,
}

impl Default for PackageAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl PackageAnalyzer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            options: AnalyzerOptions::default(),
            crypto: Arc::new(RustCryptoProvider),
            diagnostics: Arc::new(TracingDiagnostics),
        }
    }

    pub fn with_options(&mut self, options: AnalyzerOptions) -> &mut Self {
        self.options = options;
        self
    }

    pub fn with_aes_key(&mut self, key: AesKey) -> &mut Self {
        self.options.aes_key = Some(key);
        self
    }

    pub fn set_crypto(&mut self, crypto: Arc<dyn CryptoProvider>) -> &mut Self {
        self.crypto = crypto;
        self
    }

    pub fn set_diagnostics(&mut self, diagnostics: Arc<dyn Diagnostics>) -> &mut Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn options(&self) -> &AnalyzerOptions {
        &self.options
    }

    /// Structural pass: split `stream` into BOPs and return their lengths.
    ///
    /// Each BOP must carry an accepted identifier and a size field that is
    /// a positive multiple of 2048 inside the stream. With `check_crc` the
    /// header CRC32 is recomputed. With `check_end_size` every end-size
    /// field must reach the end of the stream and only the final BOP may
    /// carry the last-BOP flag.
    ///
    /// # Errors
    ///
    /// The first violation; no partial result is returned.
    pub fn parse(stream: &[u8], check_end_size: bool, check_crc: bool) -> Result<Vec<usize>, AnalyzeError> {
        if stream.is_empty() || stream.len() % BLOCK_SIZE != 0 {
            return Err(AnalyzeError::InvalidStreamLength { len: stream.len() });
        }
        let mut sizes = Vec::new();
        let mut index = 0;
        while index < stream.len() {
            let header = &stream[index..index + BLOCK_SIZE];
            let identifier = read_cstr(header, IDENTIFIER, IDENTIFIER_LEN)?;
            if BopIdentifier::from_wire(slice_at(header, IDENTIFIER, IDENTIFIER_LEN)?).is_none() {
                return Err(AnalyzeError::UnknownIdentifier {
                    offset: index,
                    identifier,
                });
            }
            let declared = read_u64_le(header, SIZE)?;
            let size = usize::try_from(declared)
                .ok()
                .filter(|&s| s != 0 && s % BLOCK_SIZE == 0 && s <= stream.len() - index)
                .ok_or_else(|| AnalyzeError::InvalidBopSize {
                    offset: index,
                    identifier: identifier.clone(),
                    size: declared,
                })?;
            if check_crc {
                let expected = crc32(&header[..CRC]);
                let found = read_u32_le(header, CRC)?;
                if expected != found {
                    return Err(AnalyzeError::CrcMismatch {
                        offset: index,
                        identifier,
                        expected,
                        found,
                    });
                }
            }
            if check_end_size {
                check_end_fields(header, index, size, stream.len(), &identifier)?;
            }
            index += size;
            sizes.push(size);
        }
        Ok(sizes)
    }

    /// Rewrite every end-size field and last-BOP flag so `stream` validates
    /// as one multi-BOP stream. Returns the BOP lengths.
    ///
    /// # Errors
    ///
    /// Structural errors from [`parse`](Self::parse) (CRCs are checked, end
    /// sizes are not), or a patch failure.
    pub fn update_end_size(stream: &mut [u8]) -> Result<Vec<usize>, AnalyzeError> {
        let sizes = Self::parse(stream, false, true)?;
        patch_end_sizes(stream, &sizes)?;
        Self::parse(stream, true, true)
    }

    /// Concatenate already-built streams into one multi-BOP stream.
    ///
    /// # Errors
    ///
    /// Any input that does not validate on its own, or an empty input list.
    pub fn combine(streams: &[&[u8]]) -> Result<Vec<u8>, AnalyzeError> {
        if streams.is_empty() {
            return Err(AnalyzeError::InvalidStreamLength { len: 0 });
        }
        let mut out = Vec::with_capacity(streams.iter().map(|s| s.len()).sum());
        for stream in streams {
            Self::parse(stream, true, true)?;
            out.extend_from_slice(stream);
        }
        Self::update_end_size(&mut out)?;
        Ok(out)
    }

    /// Structural pass, then a full [`parse_bop`](Self::parse_bop) of every
    /// BOP.
    ///
    /// # Errors
    ///
    /// Structural errors only; everything else is on the report.
    pub fn analyze(&self, stream: &[u8]) -> Result<PackageReport, AnalyzeError> {
        let sizes = Self::parse(stream, self.options.check_end_size, false)?;
        self.diagnostics.emit(Severity::Info, &format!("stream holds {} BOP(s)", sizes.len()));
        let mut report = PackageReport::default();
        let mut offset = 0;
        for (index, size) in sizes.into_iter().enumerate() {
            report.bops.push(self.parse_bop(&stream[offset..offset + size], index, offset)?);
            offset += size;
        }
        Ok(report)
    }

    /// Fully decode one BOP found at `offset` in its stream.
    ///
    /// # Errors
    ///
    /// [`AnalyzeError::InvalidStreamLength`] if `bop` is not whole blocks,
    /// [`AnalyzeError::SizeFieldMismatch`] if its size field disagrees.
    pub fn parse_bop(&self, bop: &[u8], index: usize, offset: usize) -> Result<BopReport, AnalyzeError> {
        if bop.is_empty() || bop.len() % BLOCK_SIZE != 0 {
            return Err(AnalyzeError::InvalidStreamLength { len: bop.len() });
        }
        let declared = read_u64_le(bop, SIZE)?;
        if usize::try_from(declared).ok() != Some(bop.len()) {
            return Err(AnalyzeError::SizeFieldMismatch {
                declared,
                actual: bop.len(),
            });
        }
        self.diagnostics.emit(Severity::Debug, &format!("BOP #{index} at 0x{offset:08X}"));

        let mut table = HeaderTable::default();
        visit_header(&bop[..BLOCK_SIZE], &mut table)?;

        let mut session = Session {
            bop,
            crypto: self.crypto.as_ref(),
            rec: Recorder::new(self.diagnostics.as_ref()),
            status: StatusFlags::default(),
            header: HeaderSummary::default(),
            iv: Zeroizing::new([0; IV_LEN]),
            key: None,
            actions: Vec::new(),
        };
        session.read_header()?;
        let header_actions = session.read_header_actions();
        session.authenticate();
        session.challenge(self.options.aes_key.as_ref());
        if let Some((reader, queue)) = header_actions {
            session.walk(reader, queue, self.options.decode_payloads);
        }

        Ok(BopReport {
            index,
            offset,
            len: bop.len(),
            header: session.header,
            actions: session.actions,
            findings: session.rec.findings,
            status: session.status,
            header_table: table.lines,
            trace: session.rec.trace,
        })
    }
}

fn check_end_fields(
    header: &[u8],
    index: usize,
    size: usize,
    total: usize,
    identifier: &str,
) -> Result<(), AnalyzeError> {
    let found = read_u64_le(header, END_SIZE)?;
    let expected = u64::try_from(total - index).unwrap_or(u64::MAX);
    if found != expected {
        return Err(AnalyzeError::EndSizeMismatch {
            offset: index,
            identifier: identifier.to_string(),
            expected,
            found,
        });
    }
    let is_last = header[FLAGS] & LAST_BOP_FLAG != 0;
    let at_end = index + size == total;
    if is_last != at_end {
        return Err(AnalyzeError::LastFlagMismatch {
            offset: index,
            identifier: identifier.to_string(),
            flag: if is_last { "set" } else { "clear" },
            position: if at_end { "is the last" } else { "is not the last" },
        });
    }
    Ok(())
}

/// Transient state of one `parse_bop` call.
struct Session<'a> {
    bop: &'a [u8],
    crypto: &'a dyn CryptoProvider,
    rec: Recorder<'a>,
    status: StatusFlags,
    header: HeaderSummary,
    /// Rolling IV, advanced by the challenge and each shared-IV payload.
    iv: Zeroizing<[u8; IV_LEN]>,
    /// Key that passed the challenge.
    key: Option<&'a AesKey>,
    actions: Vec<DecodedAction>,
}

impl<'a> Session<'a> {
    fn fail(&mut self, finding: Finding) {
        self.status.overall = false;
        self.rec.report(finding);
    }

    fn error(&mut self, class: ErrorClass, offset: Option<usize>, message: impl Into<String>) {
        self.fail(Finding {
            class,
            severity: Severity::Error,
            offset,
            message: message.into(),
        });
    }

    fn encryption_on(&self) -> bool {
        self.header.encryption.is_some_and(EncryptionKind::is_enabled)
    }

    fn compression_on(&self) -> bool {
        self.header.compression.is_some_and(CompressionKind::is_enabled)
    }

    fn read_header(&mut self) -> Result<(), AnalyzeError> {
        let bop = self.bop;
        let h = &mut self.header;
        h.identifier = read_cstr(bop, IDENTIFIER, IDENTIFIER_LEN)?;
        h.version = read_u32_le(bop, VERSION)?;
        h.size = read_u64_le(bop, SIZE)?;
        h.tool = read_cstr(bop, TOOL, TOOL_LEN)?;
        h.opn = read_cstr(bop, OPN, OPN_LEN)?;
        h.jtag_id = read_u32_le(bop, JTAG_ID)?;
        h.jtag_mask = read_u32_le(bop, JTAG_MASK)?;
        h.action_version = read_u32_le(bop, ACTION_VERSION)?;
        h.action_count = read_u32_le(bop, ACTION_COUNT)?;
        h.is_last = bop[FLAGS] & LAST_BOP_FLAG != 0;
        h.end_size = read_u64_le(bop, END_SIZE)?;
        h.crc = read_u32_le(bop, CRC)?;

        if BopIdentifier::from_wire(&bop[IDENTIFIER..IDENTIFIER + IDENTIFIER_LEN]).is_none() {
            let message = format!("unsupported identifier {:?}", self.header.identifier);
            self.error(ErrorClass::Format, Some(IDENTIFIER), message);
        }

        let mut field = [0u8; OBSCURED_LEN];
        field.copy_from_slice(&bop[OBSCURED..OBSCURED + OBSCURED_LEN]);
        let mut key = [0u8; HASH_LEN];
        key.copy_from_slice(&bop[HASH..HASH + HASH_LEN]);
        obscure(&mut field, &key);
        self.header.chip_id = open_chip_id(&field);
        match self.header.chip_id {
            Some(id) => self.rec.info(format!("chip id 0x{id:02X}")),
            None => self.error(ErrorClass::Integrity, Some(OBSCURED), "obscured chip-id CRC fails"),
        }

        self.header.checksum = self.selector(CHECKSUM, "checksum", ChecksumKind::from_wire_byte);
        if self.header.checksum.is_none() {
            self.status.checksum = false;
        }
        self.header.compression = self.selector(COMPRESSION, "compression", CompressionKind::from_wire_byte);
        if self.header.compression.is_none() {
            self.status.compression = false;
        }
        self.header.integrity = self.selector(INTEGRITY, "integrity", IntegrityKind::from_wire_byte);
        if self.header.integrity.is_none() {
            self.status.integrity = false;
        }
        self.header.encryption = self.selector(ENCRYPTION, "encryption", EncryptionKind::from_wire_byte);
        if self.header.encryption.is_none() {
            self.status.encryption = false;
        }
        self.header.authentication =
            self.selector(AUTHENTICATION, "authentication", AuthenticationKind::from_wire_byte);
        if self.header.authentication.is_none() {
            self.status.authentication = false;
        }

        if self.header.action_version != ACTION_STREAM_VERSION {
            let message = format!("unexpected action stream version {}", self.header.action_version);
            self.rec.warn(ErrorClass::Format, Some(ACTION_VERSION), message);
        }
        if self.encryption_on() {
            self.iv.copy_from_slice(&bop[IV..IV + IV_LEN]);
        }

        let expected = crc32(&bop[..CRC]);
        if expected == self.header.crc {
            self.rec.info("header CRC verified");
        } else {
            let message = format!("invalid CRC: expected 0x{expected:08X}, found 0x{:08X}", self.header.crc);
            self.error(ErrorClass::Integrity, Some(CRC), message);
        }

        if bop.len() == BLOCK_SIZE {
            if let Some(kind) = self.header.integrity {
                let digest = self.crypto.hash(kind, &bop[ACTION_REGION..HASH]);
                if digest.as_slice() == &bop[HASH..HASH + kind.digest_len()] {
                    self.rec.info("header action region hash verified");
                } else {
                    self.status.integrity = false;
                    self.error(ErrorClass::Integrity, Some(HASH), "header action region hash mismatch");
                }
            }
        }
        Ok(())
    }

    fn selector<T, E>(&mut self, offset: usize, name: &str, decode: impl Fn(u8) -> Result<T, E>) -> Option<T> {
        let byte = self.bop[offset];
        let value = decode(byte).ok();
        if value.is_none() {
            self.error(ErrorClass::Format, Some(offset), format!("unknown {name} selector 0x{byte:02X}"));
        }
        value
    }

    /// Decode the records embedded in the header. `None` means the action
    /// stream is unusable and no block walk can follow.
    fn read_header_actions(&mut self) -> Option<(ActionReader, VecDeque<DecodedAction>)> {
        if self.header.action_count == 0 {
            self.status.action = false;
            self.error(ErrorClass::Format, Some(ACTION_COUNT), "invalid action count of zero");
            return None;
        }
        if !self.status.compression || !self.status.encryption {
            return None;
        }
        self.rec.line("Header actions");
        self.rec.indent();
        let mut reader = ActionReader::new(self.compression_on(), self.encryption_on(), self.header.action_count);
        let result = reader.read(&self.bop[ACTION_RECORDS..HASH], ACTION_RECORDS, &mut self.rec);
        self.rec.dedent();
        match result {
            Ok(actions) => Some((reader, actions.into())),
            Err(finding) => {
                self.status.action = false;
                self.fail(finding);
                None
            }
        }
    }

    fn authenticate(&mut self) {
        let Some(scheme) = self.header.authentication else {
            return;
        };
        let (Some(key_len), Some(sig_len)) = (scheme.public_key_len(), scheme.signature_len()) else {
            return;
        };
        let public_key = &self.bop[PUBLIC_KEY..PUBLIC_KEY + key_len];
        let signature = &self.bop[SIGNATURE..SIGNATURE + sig_len];
        match self.crypto.verify(scheme, public_key, &self.bop[..SIGNED_LEN], signature) {
            Ok(true) => self.rec.info(format!("{scheme} signature verified")),
            Ok(false) => {
                self.status.authentication = false;
                self.error(ErrorClass::Authenticity, Some(SIGNATURE), format!("{scheme} signature does not verify"));
            }
            Err(e) => {
                self.status.authentication = false;
                self.error(ErrorClass::Authenticity, Some(SIGNATURE), format!("cannot authenticate: {e}"));
            }
        }
    }

    /// Check the key against the encrypted challenge. Only a key that
    /// passes is used for payloads.
    fn challenge(&mut self, key: Option<&'a AesKey>) {
        let Some(kind) = self.header.encryption.filter(|k| k.is_enabled()) else {
            return;
        };
        let Some(key) = key else {
            self.rec.warn(ErrorClass::Confidentiality, None, "no AES key provided, payloads stay encrypted");
            return;
        };
        if key.encryption_kind() != kind {
            self.rec.warn(
                ErrorClass::Confidentiality,
                None,
                format!("AES key of {} bytes does not match {kind}, decryption turned off", key.len()),
            );
            return;
        }

        let mut challenge = Zeroizing::new([0u8; CHALLENGE_LEN]);
        challenge.copy_from_slice(&self.bop[CHALLENGE..CHALLENGE + CHALLENGE_LEN]);
        if let Err(e) = self.crypto.ctr(key, &self.iv, &mut challenge[..]) {
            self.status.encryption = false;
            self.error(ErrorClass::Confidentiality, Some(CHALLENGE), format!("cannot decrypt challenge: {e}"));
            return;
        }
        increment_iv(&mut self.iv);

        let body = CHALLENGE_LEN - 4;
        let stored = u32::from_le_bytes([challenge[body], challenge[body + 1], challenge[body + 2], challenge[body + 3]]);
        if stored == crc32(&challenge[..body]) {
            self.rec.info("challenge verified");
            self.key = Some(key);
        } else {
            self.status.encryption = false;
            self.error(
                ErrorClass::Confidentiality,
                Some(CHALLENGE),
                "challenge fails, decryption turned off",
            );
        }
    }

    /// Walk the blocks after the header in action order.
    fn walk(&mut self, mut reader: ActionReader, mut queue: VecDeque<DecodedAction>, decode: bool) {
        let Some(kind) = self.header.integrity else {
            return;
        };
        let mut walker = HashWalker::new(kind, self.bop.len());
        for _ in 0..self.header.action_count {
            if queue.is_empty() && !self.read_action_block(&mut reader, &mut walker, &mut queue) {
                return;
            }
            let Some(mut action) = queue.pop_front() else {
                return;
            };
            let keep_going = self.run_action(&mut walker, &mut action, decode);
            self.actions.push(action);
            if !keep_going {
                return;
            }
        }
        let unused = (self.bop.len() - walker.cursor()) / BLOCK_SIZE;
        if unused > 0 {
            self.rec.warn(
                ErrorClass::Format,
                Some(walker.cursor()),
                format!("{unused} trailing block(s) not used by any action"),
            );
        }
    }

    fn next_block(&mut self, walker: &mut HashWalker, what: &str) -> Option<usize> {
        match walker.next_block(self.bop, self.crypto, &mut self.rec, what) {
            Ok(offset) => Some(offset),
            Err(finding) => {
                if finding.class == ErrorClass::Integrity {
                    self.status.integrity = false;
                }
                self.fail(finding);
                None
            }
        }
    }

    fn read_action_block(
        &mut self,
        reader: &mut ActionReader,
        walker: &mut HashWalker,
        queue: &mut VecDeque<DecodedAction>,
    ) -> bool {
        self.rec.info("running out of actions, reading an Action block");
        self.rec.indent();
        let Some(offset) = self.next_block(walker, "action") else {
            self.rec.dedent();
            return false;
        };
        self.rec.line(format!("Block: Action at 0x{offset:08X}"));
        self.rec.indent();
        let result = reader.read(&self.bop[offset..offset + BLOCK_SIZE], offset, &mut self.rec);
        self.rec.dedent();
        self.rec.dedent();
        match result {
            Ok(actions) if !actions.is_empty() => {
                queue.extend(actions);
                true
            }
            Ok(_) => {
                self.status.action = false;
                self.error(ErrorClass::Format, Some(offset), "Action block holds no actions");
                false
            }
            Err(finding) => {
                self.status.action = false;
                self.fail(finding);
                false
            }
        }
    }

    /// Fetch, decrypt and decompress one action's payload. Returns `false`
    /// when block positions can no longer be trusted.
    fn run_action(&mut self, walker: &mut HashWalker, action: &mut DecodedAction, decode: bool) -> bool {
        let cmd = action.cmd;
        if action.payload_size == 0 {
            self.rec.info(format!("action 0x{cmd:03X} has no payload"));
            return true;
        }
        let blocks = action.payload_blocks();
        self.rec.info(format!(
            "action 0x{cmd:03X} needs {} payload bytes ({blocks} block(s))",
            action.payload_size
        ));

        let key = self.key;
        let plaintext = !self.encryption_on() || key.is_some();
        let decompress = self.compression_on() && !action.flags.is_compression_forced_off();
        let mut decoder = (decode && plaintext).then(|| PayloadDecoder::new(decompress));
        let iv = Zeroizing::new(action.iv.unwrap_or(*self.iv));
        let size = action.payload_size as usize;

        self.rec.indent();
        for j in 0..blocks {
            let Some(offset) = self.next_block(walker, "payload") else {
                self.rec.dedent();
                return false;
            };
            if decoder.is_none() {
                continue;
            }
            let len = (size - j * BLOCK_SIZE).min(BLOCK_SIZE);
            let mut chunk = Zeroizing::new(self.bop[offset..offset + len].to_vec());
            if let Some(key) = key {
                let counter = advance_counter(&iv, (j * (BLOCK_SIZE / AES_BLOCK_LEN)) as u128);
                if let Err(e) = self.crypto.ctr(key, &counter, &mut chunk) {
                    decoder = None;
                    self.status.encryption = false;
                    self.error(ErrorClass::Confidentiality, Some(offset), format!("cannot decrypt payload: {e}"));
                    continue;
                }
            }
            let fed = decoder.as_mut().map(|d| d.feed(&chunk, j + 1 == blocks, offset));
            if let Some(Err(finding)) = fed {
                self.status.decompression = false;
                self.fail(finding);
            }
        }
        self.rec.dedent();

        if key.is_some() && action.iv.is_none() {
            increment_iv(&mut self.iv);
        }

        match decoder.and_then(PayloadDecoder::finish) {
            Some(data) => {
                self.verify_payload(action, &data);
                action.payload = Some(data);
            }
            None if !plaintext => self.rec.line(format!("payload of action 0x{cmd:03X} left encrypted")),
            None => {}
        }
        true
    }

    fn verify_payload(&mut self, action: &DecodedAction, data: &[u8]) {
        let cmd = action.cmd;
        self.rec.info(format!("payload of action 0x{cmd:03X} recovered ({} bytes)", data.len()));
        if data.is_empty() || data.len() % 4 != 0 {
            self.rec.warn(
                ErrorClass::Format,
                Some(action.record_offset),
                format!("recovered payload of {} bytes is not whole words, size and checksum not checked", data.len()),
            );
            return;
        }
        if let Some(original) = action.original_size {
            if original as usize == data.len() {
                self.rec.info("original payload size verified");
            } else {
                self.status.checksum = false;
                self.error(
                    ErrorClass::Integrity,
                    Some(action.record_offset),
                    format!("original payload size {original} does not match {} recovered bytes", data.len()),
                );
            }
        }
        if let Some(stored) = action.checksum {
            let computed = match self.header.checksum {
                Some(ChecksumKind::Fletcher32) => fletcher32(data).ok(),
                None => None,
            };
            if computed == Some(stored) {
                self.rec.info("payload checksum verified");
            } else {
                self.status.checksum = false;
                self.error(
                    ErrorClass::Integrity,
                    Some(action.record_offset),
                    format!("payload checksum mismatch, stored 0x{stored:08X}"),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bop_builder::{BopConfig, PackageBuilder};
    use bop_crypto::SigningKey;
    use bop_types::{Action, CommandId, FieldValue, NullDiagnostics};

    fn cmd(id: u16) -> CommandId {
        CommandId::new(id).unwrap()
    }

    fn builder() -> PackageBuilder {
        let mut builder = PackageBuilder::new();
        builder.set_diagnostics(Arc::new(NullDiagnostics));
        builder
    }

    fn analyzer() -> PackageAnalyzer {
        let mut analyzer = PackageAnalyzer::new();
        analyzer.set_diagnostics(Arc::new(NullDiagnostics));
        analyzer
    }

    fn noise(len: usize, seed: u32) -> Vec<u8> {
        let mut x = seed | 1;
        (0..len)
            .map(|_| {
                x ^= x << 13;
                x ^= x >> 17;
                x ^= x << 5;
                x.to_le_bytes()[0]
            })
            .collect()
    }

    fn sparse(len: usize) -> Vec<u8> {
        (0..len).map(|i| if i % 64 < 40 { 0 } else { (i % 7) as u8 }).collect()
    }

    #[test]
    fn parse_splits_multi_bop_stream() {
        let stream = builder()
            .add_bop(BopConfig::new(BopIdentifier::Fsbl))
            .add_action(Action::new(cmd(1)).with_payload(noise(5000, 3)))
            .add_bop(BopConfig::new(BopIdentifier::Ubot))
            .add_action(Action::new(cmd(2)))
            .build()
            .unwrap();
        let sizes = PackageAnalyzer::parse(&stream, true, true).unwrap();
        assert_eq!(sizes, [5 * BLOCK_SIZE, BLOCK_SIZE]);
    }

    #[test]
    fn reject_structural_damage() {
        let stream = builder().add_action(Action::new(cmd(1))).build().unwrap();
        assert!(matches!(
            PackageAnalyzer::parse(&stream[..100], true, true),
            Err(AnalyzeError::InvalidStreamLength { len: 100 })
        ));

        let mut bad = stream.clone();
        bad[0] = b'X';
        assert!(matches!(
            PackageAnalyzer::parse(&bad, false, false),
            Err(AnalyzeError::UnknownIdentifier { offset: 0, .. })
        ));

        let mut bad = stream.clone();
        bad[SIZE] = 0x01;
        assert!(matches!(
            PackageAnalyzer::parse(&bad, false, false),
            Err(AnalyzeError::InvalidBopSize { .. })
        ));

        let mut bad = stream.clone();
        bad[TOOL] ^= 0x20;
        assert!(matches!(
            PackageAnalyzer::parse(&bad, false, true),
            Err(AnalyzeError::CrcMismatch { .. })
        ));
        assert!(PackageAnalyzer::parse(&bad, false, false).is_ok());
    }

    #[test]
    fn reject_end_size_faults() {
        let one = builder().add_action(Action::new(cmd(1))).build().unwrap();
        let doubled = [one.clone(), one.clone()].concat();
        let err = PackageAnalyzer::parse(&doubled, true, true).unwrap_err();
        assert!(matches!(err, AnalyzeError::EndSizeMismatch { offset: 0, expected: 4096, found: 2048, .. }));

        let mut patched = doubled.clone();
        PackageAnalyzer::update_end_size(&mut patched).unwrap();
        assert!(PackageAnalyzer::parse(&patched, true, true).is_ok());

        // Right end size, wrong flag.
        let mut bad = patched.clone();
        bad[FLAGS] |= LAST_BOP_FLAG;
        let crc = crc32(&bad[..CRC]);
        bad[CRC..CRC + 4].copy_from_slice(&crc.to_le_bytes());
        assert!(matches!(
            PackageAnalyzer::parse(&bad, true, true),
            Err(AnalyzeError::LastFlagMismatch { flag: "set", .. })
        ));
    }

    #[test]
    fn combine_validates_as_one_stream() {
        let a = builder().add_action(Action::new(cmd(1)).with_payload(vec![5; 64])).build().unwrap();
        let b = builder()
            .add_bop(BopConfig::new(BopIdentifier::Icb))
            .add_action(Action::new(cmd(2)))
            .build()
            .unwrap();
        let combined = PackageAnalyzer::combine(&[&a, &b]).unwrap();
        assert_eq!(combined.len(), a.len() + b.len());
        assert_eq!(PackageAnalyzer::parse(&combined, true, true).unwrap(), [a.len(), b.len()]);
        let report = analyzer().analyze(&combined).unwrap();
        assert!(report.is_ok(), "{}", report.render());

        assert!(PackageAnalyzer::combine(&[]).is_err());
        let mut broken = a.clone();
        broken[CRC] ^= 1;
        assert!(matches!(
            PackageAnalyzer::combine(&[&broken, &b]),
            Err(AnalyzeError::CrcMismatch { .. })
        ));
    }

    #[test]
    fn recovers_compressed_and_raw_payloads() {
        let compressible = sparse(9000);
        let incompressible = noise(100, 9);
        let stream = builder()
            .add_action(
                Action::new(cmd(1))
                    .with_payload(compressible.clone())
                    .with_checksum()
                    .with_original_size(),
            )
            .add_action(Action::new(cmd(2)).with_payload(incompressible.clone()))
            .add_action(Action::new(cmd(3)).with_field(FieldValue::U32(0x4000_0000)).unwrap())
            .build()
            .unwrap();
        let report = analyzer().analyze(&stream).unwrap();
        let bop = &report.bops[0];
        assert!(bop.is_ok(), "{}", bop.render());
        assert_eq!(bop.actions.len(), 3);
        assert_eq!(bop.actions[0].payload.as_deref().unwrap(), &compressible);
        assert_eq!(bop.actions[0].original_size, Some(9000));
        assert!(bop.actions[1].flags.is_compression_forced_off());
        assert_eq!(bop.actions[1].payload.as_deref().unwrap(), &incompressible);
        assert_eq!(bop.actions[2].fields, [0x4000_0000]);
        assert!(bop.actions[2].payload.is_none());
        assert_eq!(bop.header.chip_id, Some(0));
    }

    #[test]
    fn decrypts_with_rolling_and_dedicated_iv() {
        let key = AesKey::new(&[0x5C; 32]).unwrap();
        let first = sparse(5000);
        let second = noise(3000, 77);
        let third = noise(64, 5);
        let stream = builder()
            .with_aes_key(key.clone())
            .add_action(Action::new(cmd(1)).with_payload(first.clone()).with_checksum())
            .add_action(Action::new(cmd(2)).with_payload(second.clone()).with_dedicated_iv([3; 16]))
            .add_action(Action::new(cmd(3)).with_payload(third.clone()))
            .build()
            .unwrap();

        let mut with_key = analyzer();
        with_key.with_aes_key(key);
        let report = with_key.analyze(&stream).unwrap();
        let bop = &report.bops[0];
        assert!(bop.is_ok(), "{}", bop.render());
        assert_eq!(bop.actions[0].payload.as_deref().unwrap(), &first);
        assert_eq!(bop.actions[1].iv, Some([3; 16]));
        assert_eq!(bop.actions[1].payload.as_deref().unwrap(), &second);
        assert_eq!(bop.actions[2].payload.as_deref().unwrap(), &third);

        // Without a key the walk still verifies every block.
        let report = analyzer().analyze(&stream).unwrap();
        let bop = &report.bops[0];
        assert!(bop.is_ok());
        assert!(bop.actions.iter().all(|a| a.payload.is_none()));
        assert_eq!(bop.findings.len(), 1);
        assert_eq!(bop.findings[0].class, ErrorClass::Confidentiality);
    }

    #[test]
    fn wrong_key_fails_challenge() {
        let stream = builder()
            .with_aes_key(AesKey::new(&[1; 16]).unwrap())
            .add_action(Action::new(cmd(1)).with_payload(vec![9; 32]))
            .build()
            .unwrap();

        let mut wrong = analyzer();
        wrong.with_aes_key(AesKey::new(&[2; 16]).unwrap());
        let bop = &wrong.analyze(&stream).unwrap().bops[0];
        assert!(!bop.status.encryption);
        assert!(!bop.is_ok());
        assert!(bop.has_error(ErrorClass::Confidentiality));
        assert!(bop.status.integrity);
        assert!(bop.actions[0].payload.is_none());

        let mut mismatched = analyzer();
        mismatched.with_aes_key(AesKey::new(&[1; 32]).unwrap());
        let bop = &mismatched.analyze(&stream).unwrap().bops[0];
        assert!(bop.is_ok());
        assert_eq!(bop.findings[0].severity, Severity::Warning);
    }

    #[test]
    fn signature_is_checked() {
        let key = SigningKey::generate(AuthenticationKind::Ecdsa256).unwrap();
        let mut stream = builder()
            .with_signing_key(key)
            .add_action(Action::new(cmd(1)).with_payload(vec![1; 16]))
            .build()
            .unwrap();
        let bop = &analyzer().analyze(&stream).unwrap().bops[0];
        assert!(bop.is_ok(), "{}", bop.render());
        assert!(bop.trace.iter().any(|l| l.contains("signature verified")));

        stream[SIGNATURE + 3] ^= 0x40;
        let crc = crc32(&stream[..CRC]);
        stream[CRC..CRC + 4].copy_from_slice(&crc.to_le_bytes());
        let bop = &analyzer().analyze(&stream).unwrap().bops[0];
        assert!(!bop.status.authentication);
        assert!(bop.has_error(ErrorClass::Authenticity));
        assert!(bop.status.integrity);
    }

    #[test]
    fn spilled_actions_are_read_from_action_blocks() {
        let mut b = builder();
        for i in 1..=30 {
            b.add_action(
                Action::new(cmd(i))
                    .with_field(FieldValue::Bytes(vec![0x11; 16]))
                    .unwrap()
                    .with_payload(vec![u8::try_from(i).unwrap(); 8]),
            );
        }
        let stream = b.build().unwrap();
        let bop = &analyzer().analyze(&stream).unwrap().bops[0];
        assert!(bop.is_ok(), "{}", bop.render());
        assert_eq!(bop.actions.len(), 30);
        for (i, action) in bop.actions.iter().enumerate() {
            assert_eq!(usize::from(action.cmd), i + 1);
            assert_eq!(action.payload.as_deref().unwrap(), &vec![u8::try_from(i + 1).unwrap(); 8]);
        }
        assert!(bop.trace.iter().any(|l| l.contains("reading an Action block")));
    }

    #[test]
    fn tampered_data_block_stops_the_walk() {
        let mut stream = builder()
            .add_action(Action::new(cmd(1)).with_payload(noise(3000, 1)))
            .add_action(Action::new(cmd(2)).with_payload(noise(100, 2)))
            .build()
            .unwrap();
        // Header, Hash, Data, Data, Data.
        stream[3 * BLOCK_SIZE + 10] ^= 0xFF;
        let bop = &analyzer().analyze(&stream).unwrap().bops[0];
        assert!(!bop.status.integrity);
        let errors: Vec<_> = bop.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].offset, Some(3 * BLOCK_SIZE));
        assert_eq!(bop.actions.len(), 1);
    }

    #[test]
    fn header_only_bop_checks_its_own_hash() {
        let mut stream = builder().add_action(Action::new(cmd(7))).build().unwrap();
        let bop = &analyzer().analyze(&stream).unwrap().bops[0];
        assert!(bop.is_ok(), "{}", bop.render());
        assert_eq!(bop.header.action_count, 1);

        // An extra zero word after the terminator stays legal; a stray
        // nonzero one breaks both the hash and the action stream.
        stream[ACTION_RECORDS + 16] = 0x55;
        let crc = crc32(&stream[..CRC]);
        stream[CRC..CRC + 4].copy_from_slice(&crc.to_le_bytes());
        let bop = &analyzer().analyze(&stream).unwrap().bops[0];
        assert!(bop.has_error(ErrorClass::Integrity));
        assert!(!bop.status.action);
    }

    #[test]
    fn reject_parse_bop_size_mismatch() {
        let stream = builder().add_action(Action::new(cmd(1)).with_payload(vec![1; 8])).build().unwrap();
        let err = analyzer().parse_bop(&stream[..BLOCK_SIZE], 0, 0).unwrap_err();
        assert!(matches!(err, AnalyzeError::SizeFieldMismatch { declared: 4096, actual: 2048 }));
    }
}
