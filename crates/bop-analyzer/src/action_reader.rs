use bop_types::{ErrorClass, Severity};

use crate::report::{DecodedAction, Finding, Recorder};

/// Word the reader expects next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Expect {
    Command,
    PayloadSize,
    OriginalSize,
    Checksum,
    /// Field words, then the dedicated IV.
    Tail,
    /// A zero command word ended the list; only zero padding may follow.
    Terminated,
}

/// In-progress record.
struct Pending {
    action: DecodedAction,
    field_len: usize,
    iv_len: usize,
    field_seen: usize,
    iv_seen: usize,
    iv: [u8; 16],
}

/// Reads action records word by word, mirroring the builder's layout:
///
/// ```text
///   cmd|flags|size ─► payload size ─► [original size] ─► [checksum]
///                  ─► field words ─► [IV words] ─► next cmd | 0
/// ```
///
/// One reader lives for a whole BOP so the action count is enforced
/// across the header region and every Action block.
pub(crate) struct ActionReader {
    compression_on: bool,
    encryption_on: bool,
    expected: u32,
    parsed: u32,
}

impl ActionReader {
    pub(crate) fn new(compression_on: bool, encryption_on: bool, expected: u32) -> Self {
        Self {
            compression_on,
            encryption_on,
            expected,
            parsed: 0,
        }
    }

    pub(crate) fn parsed(&self) -> u32 {
        self.parsed
    }

    /// Decode every record in `area`, which starts at BOP offset `base`.
    ///
    /// # Errors
    ///
    /// The first malformed or illegal record, as an error finding. Records
    /// decoded before it are lost with it: the positions of everything
    /// after a bad record cannot be trusted.
    pub(crate) fn read(
        &mut self,
        area: &[u8],
        base: usize,
        rec: &mut Recorder<'_>,
    ) -> Result<Vec<DecodedAction>, Finding> {
        let words: Vec<u32> = area
            .chunks_exact(4)
            .map(|w| u32::from_le_bytes([w[0], w[1], w[2], w[3]]))
            .collect();
        let mut out = Vec::new();
        let mut expect = Expect::Command;
        let mut pending: Option<Pending> = None;

        for (i, &word) in words.iter().enumerate() {
            let offset = base + i * 4;
            match expect {
                Expect::Command => {
                    if word & 0x0FFF == 0 {
                        if word != 0 {
                            return Err(fault(ErrorClass::Format, offset, "invalid action termination"));
                        }
                        expect = Expect::Terminated;
                        if self.parsed < self.expected {
                            rec.line(format!("0x{offset:03X}: no more actions here (more in an Action block)"));
                        } else {
                            rec.line(format!("0x{offset:03X}: no more actions"));
                        }
                        continue;
                    }
                    if self.parsed == self.expected {
                        return Err(fault(
                            ErrorClass::Format,
                            offset,
                            format!("exceeding maximum action count ({})", self.expected),
                        ));
                    }
                    let next = words.get(i + 1).copied().unwrap_or(0);
                    let record = self.start_record(word, next, offset, words.len() - i)?;
                    let action = &record.action;
                    rec.line(format!(
                        "0x{offset:03X}: action 0x{:03X} (checksum: {}, no compression: {}, IV: {}, original size: {}), size {}",
                        action.cmd,
                        u8::from(action.flags.has_checksum()),
                        u8::from(action.flags.is_compression_forced_off()),
                        u8::from(action.flags.has_dedicated_iv()),
                        u8::from(action.flags.has_original_size()),
                        action.record_len,
                    ));
                    self.parsed += 1;
                    pending = Some(record);
                    expect = Expect::PayloadSize;
                }
                Expect::PayloadSize => {
                    let Some(p) = pending.as_mut() else { break };
                    p.action.payload_size = word;
                    let raw = !self.compression_on || p.action.flags.is_compression_forced_off();
                    if raw && word % 4 != 0 {
                        rec.warn(
                            ErrorClass::Protocol,
                            Some(offset),
                            format!("compression is effectively off but payload size {word} is not a multiple of 4"),
                        );
                    } else {
                        rec.line(format!("0x{offset:03X}:   payload size {word}"));
                    }
                    let flags = p.action.flags;
                    expect = if p.action.record_len == 8 {
                        Expect::Command
                    } else if flags.has_original_size() {
                        Expect::OriginalSize
                    } else if flags.has_checksum() {
                        Expect::Checksum
                    } else {
                        Expect::Tail
                    };
                }
                Expect::OriginalSize => {
                    let Some(p) = pending.as_mut() else { break };
                    p.action.original_size = Some(word);
                    rec.line(format!("0x{offset:03X}:   original size {word}"));
                    expect = if p.action.record_len == 12 {
                        Expect::Command
                    } else if p.action.flags.has_checksum() {
                        Expect::Checksum
                    } else {
                        Expect::Tail
                    };
                }
                Expect::Checksum => {
                    let Some(p) = pending.as_mut() else { break };
                    p.action.checksum = Some(word);
                    rec.line(format!("0x{offset:03X}:   checksum 0x{word:08X}"));
                    let header_len = if p.action.flags.has_original_size() { 16 } else { 12 };
                    expect = if p.action.record_len == header_len {
                        Expect::Command
                    } else {
                        Expect::Tail
                    };
                }
                Expect::Tail => {
                    let Some(p) = pending.as_mut() else { break };
                    if p.field_seen < p.field_len {
                        rec.line(format!("0x{offset:03X}:   field #{} 0x{word:08X}", p.field_seen / 4));
                        p.action.fields.push(word);
                        p.field_seen += 4;
                    } else if p.iv_seen < p.iv_len {
                        rec.line(format!("0x{offset:03X}:   IV #{} 0x{word:08X}", p.iv_seen / 4));
                        p.iv[p.iv_seen..p.iv_seen + 4].copy_from_slice(&word.to_le_bytes());
                        p.iv_seen += 4;
                    }
                    if p.field_seen == p.field_len && p.iv_seen == p.iv_len {
                        expect = Expect::Command;
                    }
                }
                Expect::Terminated => {
                    if word != 0 {
                        return Err(fault(ErrorClass::Format, offset, "action found after the terminator"));
                    }
                }
            }
            if expect == Expect::Command {
                if let Some(mut p) = pending.take() {
                    if p.iv_len > 0 {
                        p.action.iv = Some(p.iv);
                    }
                    out.push(p.action);
                }
            }
        }
        Ok(out)
    }

    /// Check one command word against its size and the header features.
    fn start_record(&self, word: u32, payload_size: u32, offset: usize, words_left: usize) -> Result<Pending, Finding> {
        let action = DecodedAction::new(word, offset);
        let size = action.record_len;
        if size == 0 {
            return Err(fault(ErrorClass::Format, offset, "invalid zero-size action"));
        }
        if size % 4 != 0 {
            return Err(fault(ErrorClass::Format, offset, "action size is not a multiple of 4"));
        }
        if size < 8 {
            return Err(fault(ErrorClass::Format, offset, "action size is below the 8-byte minimum"));
        }
        if size / 4 > words_left {
            return Err(fault(ErrorClass::Overflow, offset, "action size overflows its area"));
        }

        let flags = action.flags;
        if payload_size == 0 && flags.has_checksum() {
            return Err(fault(ErrorClass::Protocol, offset, "checksum bit set but there is no payload"));
        }
        if !self.compression_on && flags.is_compression_forced_off() {
            return Err(fault(
                ErrorClass::Protocol,
                offset,
                "compression-off bit set but the compression feature is off",
            ));
        }
        if !self.encryption_on && flags.has_dedicated_iv() {
            return Err(fault(ErrorClass::Protocol, offset, "IV bit set but the encryption feature is off"));
        }
        if payload_size == 0 && flags.has_original_size() {
            return Err(fault(ErrorClass::Protocol, offset, "original-size bit set but there is no payload"));
        }

        let mut minimum = 8;
        if flags.has_checksum() {
            minimum += 4;
        }
        let iv_len = if flags.has_dedicated_iv() { 16 } else { 0 };
        minimum += iv_len;
        if flags.has_original_size() {
            minimum += 4;
        }
        if size < minimum {
            return Err(fault(
                ErrorClass::Format,
                offset,
                format!("invalid action size, expected at least {minimum} bytes"),
            ));
        }
        Ok(Pending {
            action,
            field_len: size - minimum,
            iv_len,
            field_seen: 0,
            iv_seen: 0,
            iv: [0; 16],
        })
    }
}

fn fault(class: ErrorClass, offset: usize, message: impl Into<String>) -> Finding {
    Finding {
        class,
        severity: Severity::Error,
        offset: Some(offset),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bop_types::NullDiagnostics;

    fn area(words: &[u32]) -> Vec<u8> {
        let mut out: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        out.resize(312, 0);
        out
    }

    fn read(reader: &mut ActionReader, words: &[u32]) -> Result<Vec<DecodedAction>, Finding> {
        let sink = NullDiagnostics;
        let mut rec = Recorder::new(&sink);
        reader.read(&area(words), 0xC8, &mut rec)
    }

    #[test]
    fn reads_full_record() {
        // cmd 0x123 with checksum, IV, original size; one field word.
        let mut words = vec![0x0024_D123, 64, 256, 0xCAFE_F00D, 0x4000_0000];
        words.extend([0x0302_0100, 0x0706_0504, 0x0B0A_0908, 0x0F0E_0D0C]);
        words.push(0x0008_0002);
        words.push(0);
        let mut reader = ActionReader::new(true, true, 2);
        let actions = read(&mut reader, &words).unwrap();
        assert_eq!(actions.len(), 2);
        let first = &actions[0];
        assert_eq!(first.cmd, 0x123);
        assert_eq!(first.record_offset, 0xC8);
        assert_eq!(first.payload_size, 64);
        assert_eq!(first.original_size, Some(256));
        assert_eq!(first.checksum, Some(0xCAFE_F00D));
        assert_eq!(first.fields, [0x4000_0000]);
        let iv: Vec<u8> = (0..16).collect();
        assert_eq!(first.iv.unwrap().as_slice(), &iv[..]);
        assert_eq!(actions[1].cmd, 2);
        assert_eq!(actions[1].record_offset, 0xC8 + 36);
        assert_eq!(reader.parsed(), 2);
    }

    #[test]
    fn count_spans_areas() {
        let mut reader = ActionReader::new(true, false, 2);
        assert_eq!(read(&mut reader, &[0x0008_0001, 0, 0]).unwrap().len(), 1);
        assert_eq!(read(&mut reader, &[0x0008_0002, 0]).unwrap().len(), 1);
        let err = read(&mut reader, &[0x0008_0003, 0]).unwrap_err();
        assert!(err.message.starts_with("exceeding maximum action count"));
    }

    #[test]
    fn reject_bad_termination() {
        let mut reader = ActionReader::new(true, false, 1);
        let err = read(&mut reader, &[0x0008_1000]).unwrap_err();
        assert_eq!(err.class, ErrorClass::Format);
        assert_eq!(err.offset, Some(0xC8));

        let mut reader = ActionReader::new(true, false, 1);
        let err = read(&mut reader, &[0x0008_0001, 0, 0, 7]).unwrap_err();
        assert_eq!(err.message, "action found after the terminator");
        assert_eq!(err.offset, Some(0xC8 + 12));
    }

    #[test]
    fn reject_bad_sizes() {
        for (word, message) in [
            (0x0000_0001, "invalid zero-size action"),
            (0x0006_0001, "action size is not a multiple of 4"),
            (0x0004_0001, "action size is below the 8-byte minimum"),
            (0x0008_1001, "invalid action size, expected at least 12 bytes"),
        ] {
            let mut reader = ActionReader::new(true, false, 1);
            let err = read(&mut reader, &[word, 4]).unwrap_err();
            assert_eq!(err.message, message);
        }
        let mut reader = ActionReader::new(true, false, 1);
        let err = read(&mut reader, &[0x0140_0001, 0]).unwrap_err();
        assert_eq!(err.class, ErrorClass::Overflow);
    }

    #[test]
    fn reject_flags_against_features() {
        let cases = [
            (true, true, [0x000C_1001, 0], "checksum bit set but there is no payload"),
            (false, true, [0x0008_2001, 4], "compression-off bit set but the compression feature is off"),
            (true, false, [0x0018_4001, 4], "IV bit set but the encryption feature is off"),
            (true, true, [0x000C_8001, 0], "original-size bit set but there is no payload"),
        ];
        for (compression, encryption, words, message) in cases {
            let mut reader = ActionReader::new(compression, encryption, 1);
            let err = read(&mut reader, &words).unwrap_err();
            assert_eq!(err.class, ErrorClass::Protocol);
            assert_eq!(err.message, message);
        }
    }

    #[test]
    fn unaligned_raw_payload_is_a_warning() {
        let sink = NullDiagnostics;
        let mut rec = Recorder::new(&sink);
        let mut reader = ActionReader::new(false, false, 1);
        let actions = reader.read(&area(&[0x0008_0001, 3, 0]), 0xC8, &mut rec).unwrap();
        assert_eq!(actions[0].payload_size, 3);
        assert_eq!(rec.findings.len(), 1);
        assert_eq!(rec.findings[0].severity, Severity::Warning);
    }
}
