use bop_wire::varint::MAX_VARINT_BYTES;

use crate::error::CodecError;
use crate::pattern::{Flag, Pattern};
use crate::{MAGIC, VERSION};

/// Literal bytes of a repeated `None` token are held here until the repeat
/// count arrives.
pub const SCRATCH_LEN: usize = 2048;

/// Outcome of one successful [`ResumableDecompressor::process`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    /// The whole stream has been decoded and every size matched.
    Done,
    /// The output buffer filled up; call again with a fresh buffer.
    Good,
    /// Every input byte was consumed; call again with more input.
    NeedInput,
}

/// Result of a [`ResumableDecompressor::process`] call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Progress {
    pub status: Status,
    /// Input bytes consumed from the front of the chunk.
    pub consumed: usize,
    /// Output bytes written to the front of the buffer.
    pub written: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum State {
    GetIdentifier,
    GetOriginalSize,
    GetCompressSize,
    GetFlag,
    GetVariable,
    GetRepeat,
    OutputCmp,
    OutputNone,
    OutputNoneRepeat,
    Done,
    Error,
}

/// What a state handler needs next.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Step {
    Continue,
    NeedInput,
    OutputFull,
}

/// Per-call view of the caller's buffers.
struct Io<'i, 'o> {
    input: &'i [u8],
    consumed: usize,
    output: &'o mut [u8],
    written: usize,
}

impl Io<'_, '_> {
    fn next_input(&mut self) -> Option<u8> {
        let byte = self.input.get(self.consumed).copied()?;
        self.consumed += 1;
        Some(byte)
    }

    fn output_full(&self) -> bool {
        self.written == self.output.len()
    }

    fn put(&mut self, byte: u8) {
        self.output[self.written] = byte;
        self.written += 1;
    }
}

/// A varint being assembled across calls.
#[derive(Clone, Copy, Debug, Default)]
struct PartialVarint {
    value: u64,
    bytes: usize,
}

/// Suspend/resume decoder for `CFG_CMP` streams.
///
/// Input and output may be handed over in pieces of any size. Each call
/// reads from the start of `input`; the caller re-submits whatever
/// [`Progress::consumed`] did not cover.
///
/// ```text
///  GetIdentifier → GetOriginalSize → GetCompressSize → GetFlag ─┐
///        ┌───────────────────────────────────────────────────────┘
///        ├─ None ──────────────→ OutputNone ─┬────────────→ GetFlag
///        │                                   └ GetRepeat → OutputNoneRepeat
///        ├─ Zero / High ───────→ OutputCmp ───────────────→ GetFlag
///        └─ boundary / Var ─→ GetVariable ─┬─────────────→ OutputCmp
///                                          └ GetRepeat ──→ OutputCmp
/// ```
///
/// Once [`Status::Done`] is returned, or any error, the engine must be
/// [`reset`](Self::reset) before it decodes anything else.
pub struct ResumableDecompressor {
    state: State,
    identifier: [u8; 8],
    identifier_len: usize,
    original_size: u64,
    compressed_size: u64,
    total_in: u64,
    total_out: u64,
    flag: Flag,
    flag_index: u64,
    repeat_index: u64,
    repeat_size: u64,
    varint: PartialVarint,
    fill: u8,
    variable: u8,
    track: u8,
    variable_emitted: bool,
    done: bool,
    coverage: u16,
    scratch: Vec<u8>,
}

impl Default for ResumableDecompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ResumableDecompressor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResumableDecompressor")
            .field("state", &self.state)
            .field("original_size", &self.original_size)
            .field("compressed_size", &self.compressed_size)
            .field("total_in", &self.total_in)
            .field("total_out", &self.total_out)
            .finish_non_exhaustive()
    }
}

const TRACK_VARIABLE: u8 = 1;
const TRACK_RUN: u8 = 2;
const TRACK_COMPLETE: u8 = TRACK_VARIABLE | TRACK_RUN;

impl ResumableDecompressor {
    #[must_use]
    pub fn new() -> Self {
        Self::with_scratch(vec![0; SCRATCH_LEN])
    }

    fn with_scratch(scratch: Vec<u8>) -> Self {
        Self {
            state: State::GetIdentifier,
            identifier: [0; 8],
            identifier_len: 0,
            original_size: 0,
            compressed_size: 0,
            total_in: 0,
            total_out: 0,
            flag: Flag::from_raw(0),
            flag_index: 0,
            repeat_index: 0,
            repeat_size: 0,
            varint: PartialVarint::default(),
            fill: 0,
            variable: 0,
            track: 0,
            variable_emitted: false,
            done: false,
            coverage: 0,
            scratch,
        }
    }

    /// Return to the initial state, ready for a new stream.
    ///
    /// Literal bytes left in the scratch buffer are wiped.
    pub fn reset(&mut self) {
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.fill(0);
        scratch.resize(SCRATCH_LEN, 0);
        *self = Self::with_scratch(scratch);
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    pub fn is_failed(&self) -> bool {
        self.state == State::Error
    }

    /// Declared original size, once the header has been read.
    pub fn original_size(&self) -> u64 {
        self.original_size
    }

    /// Declared token byte count, once the header has been read.
    pub fn compressed_size(&self) -> u64 {
        self.compressed_size
    }

    pub fn total_output(&self) -> u64 {
        self.total_out
    }

    /// Bitmask of `flag & 0xF` values seen so far.
    pub fn coverage(&self) -> u16 {
        self.coverage
    }

    /// Names of the token kinds a finished stream never used.
    ///
    /// Empty until the engine reaches [`Status::Done`].
    pub fn uncovered_kinds(&self) -> Vec<&'static str> {
        if self.state != State::Done {
            return Vec::new();
        }
        (0u32..16)
            .filter(|bit| self.coverage & (1 << bit) == 0)
            .filter_map(kind_name)
            .collect()
    }

    /// Human-readable coverage summary.
    pub fn coverage_info(&self) -> String {
        if self.state != State::Done {
            return "decompression has not finished, no coverage info".to_string();
        }
        let missing = self.uncovered_kinds();
        if missing.is_empty() {
            "all token kinds are covered".to_string()
        } else {
            format!("stream does not cover token kinds: {}", missing.join(", "))
        }
    }

    /// Decode as much as possible from `input` into `output`.
    ///
    /// # Errors
    ///
    /// - [`CodecError::EmptyOutputBuffer`] if `output` is empty; the engine
    ///   is left untouched.
    /// - [`CodecError::CalledAfterDone`] if the stream already finished.
    /// - [`CodecError::EngineFailed`] if an earlier call failed.
    /// - Any stream error; the engine then stays failed until reset.
    pub fn process(&mut self, input: &[u8], output: &mut [u8]) -> Result<Progress, CodecError> {
        if output.is_empty() {
            return Err(CodecError::EmptyOutputBuffer);
        }
        match self.state {
            State::Done => {
                self.state = State::Error;
                return Err(CodecError::CalledAfterDone);
            }
            State::Error => return Err(CodecError::EngineFailed),
            _ => {}
        }

        let mut io = Io {
            input,
            consumed: 0,
            output,
            written: 0,
        };
        match self.drive(&mut io) {
            Ok(status) => Ok(Progress {
                status,
                consumed: io.consumed,
                written: io.written,
            }),
            Err(e) => {
                self.state = State::Error;
                Err(e)
            }
        }
    }

    fn drive(&mut self, io: &mut Io<'_, '_>) -> Result<Status, CodecError> {
        loop {
            self.check_totals()?;
            let step = match self.state {
                State::GetIdentifier => self.get_identifier(io)?,
                State::GetOriginalSize | State::GetCompressSize => self.get_sizes(io)?,
                State::GetFlag => self.get_flag(io)?,
                State::GetVariable => self.get_variable(io),
                State::GetRepeat => self.get_repeat(io)?,
                State::OutputCmp => self.output_cmp(io)?,
                State::OutputNone => self.output_none(io)?,
                State::OutputNoneRepeat => self.output_none_repeat(io),
                State::Done | State::Error => return Err(CodecError::EngineFailed),
            };

            if self.done {
                if self.total_in != self.compressed_size {
                    return Err(CodecError::CompressedSizeMismatch {
                        expected: self.compressed_size,
                        actual: self.total_in,
                    });
                }
                self.state = State::Done;
                return Ok(Status::Done);
            }
            match step {
                Step::NeedInput => return Ok(Status::NeedInput),
                Step::OutputFull => return Ok(Status::Good),
                Step::Continue => {}
            }
        }
    }

    /// Cumulative cursors checked on entry to every state past the sizes.
    fn check_totals(&self) -> Result<(), CodecError> {
        if matches!(self.state, State::GetIdentifier | State::GetOriginalSize) {
            return Ok(());
        }
        if self.total_out >= self.original_size {
            return Err(CodecError::OutputOverrun {
                original_size: self.original_size,
            });
        }
        if self.state != State::GetCompressSize && self.total_in > self.compressed_size {
            return Err(CodecError::InputOverrun {
                compressed_size: self.compressed_size,
            });
        }
        Ok(())
    }

    /// Feed bytes into the pending varint. `Ok(None)` means more input is
    /// needed.
    fn read_varint(&mut self, io: &mut Io<'_, '_>, counted: bool) -> Result<Option<u64>, CodecError> {
        loop {
            if self.varint.bytes == MAX_VARINT_BYTES {
                return Err(bop_wire::WireError::VarintTooLong.into());
            }
            let Some(byte) = io.next_input() else {
                return Ok(None);
            };
            if counted {
                self.total_in += 1;
            }
            let shift = 7 * self.varint.bytes;
            self.varint.value |= u64::from(byte & 0x7F) << shift;
            self.varint.bytes += 1;
            if byte & 0x80 == 0 {
                let value = self.varint.value;
                self.varint = PartialVarint::default();
                return Ok(Some(value));
            }
        }
    }

    fn get_identifier(&mut self, io: &mut Io<'_, '_>) -> Result<Step, CodecError> {
        while self.identifier_len < self.identifier.len() {
            let Some(byte) = io.next_input() else {
                return Ok(Step::NeedInput);
            };
            self.identifier[self.identifier_len] = byte;
            self.identifier_len += 1;
        }
        if self.identifier[..7] != MAGIC[..7] {
            return Err(CodecError::BadMagic);
        }
        if self.identifier[7] != VERSION {
            return Err(CodecError::UnsupportedVersion {
                version: self.identifier[7],
            });
        }
        self.state = State::GetOriginalSize;
        Ok(Step::Continue)
    }

    fn get_sizes(&mut self, io: &mut Io<'_, '_>) -> Result<Step, CodecError> {
        let Some(value) = self.read_varint(io, false)? else {
            return Ok(Step::NeedInput);
        };
        if self.state == State::GetOriginalSize {
            if value == 0 {
                return Err(CodecError::ZeroOriginalSize);
            }
            self.original_size = value;
            self.state = State::GetCompressSize;
        } else {
            if value == 0 {
                return Err(CodecError::ZeroCompressedSize);
            }
            self.compressed_size = value;
            self.state = State::GetFlag;
        }
        Ok(Step::Continue)
    }

    fn get_flag(&mut self, io: &mut Io<'_, '_>) -> Result<Step, CodecError> {
        let offset = self.total_in;
        let Some(raw) = self.read_varint(io, true)? else {
            return Ok(Step::NeedInput);
        };
        let flag = Flag::from_raw(raw);
        self.flag = flag;
        self.flag_index = 0;
        self.repeat_index = 0;
        self.variable_emitted = false;
        self.track = if flag.pattern.has_explicit_byte() && flag.pattern != Pattern::Var {
            0
        } else {
            TRACK_VARIABLE
        };
        self.coverage |= 1 << flag.kind_index();

        if flag.length == 0 {
            return Err(CodecError::ZeroLengthToken {
                pattern: flag.pattern,
                offset: usize::try_from(offset).unwrap_or(usize::MAX),
            });
        }
        if flag.repeat && !flag.pattern.allows_repeat() {
            return Err(CodecError::InvalidRepeat {
                pattern: flag.pattern,
            });
        }
        if flag.repeat && flag.pattern == Pattern::None && flag.length > SCRATCH_LEN as u64 {
            return Err(CodecError::RepeatedLiteralTooLong {
                len: flag.length,
                limit: SCRATCH_LEN,
            });
        }

        self.fill = flag.pattern.implied_fill();
        self.state = match flag.pattern {
            Pattern::None => State::OutputNone,
            Pattern::Zero | Pattern::High => State::OutputCmp,
            _ => State::GetVariable,
        };
        Ok(Step::Continue)
    }

    fn get_variable(&mut self, io: &mut Io<'_, '_>) -> Step {
        let Some(byte) = io.next_input() else {
            return Step::NeedInput;
        };
        self.total_in += 1;
        self.variable = byte;
        if self.flag.pattern == Pattern::Var {
            self.fill = byte;
        }
        self.state = if self.flag.repeat {
            State::GetRepeat
        } else {
            State::OutputCmp
        };
        Step::Continue
    }

    fn get_repeat(&mut self, io: &mut Io<'_, '_>) -> Result<Step, CodecError> {
        let offset = self.total_in;
        let Some(count) = self.read_varint(io, true)? else {
            return Ok(Step::NeedInput);
        };
        if count == 0 {
            return Err(CodecError::ZeroRepeat {
                offset: usize::try_from(offset).unwrap_or(usize::MAX),
            });
        }
        self.repeat_size = count;
        self.state = if self.flag.pattern == Pattern::None {
            State::OutputNoneRepeat
        } else {
            State::OutputCmp
        };
        Ok(Step::Continue)
    }

    fn emit(&mut self, io: &mut Io<'_, '_>, byte: u8) -> Result<(), CodecError> {
        if self.total_out >= self.original_size {
            return Err(CodecError::OutputOverrun {
                original_size: self.original_size,
            });
        }
        io.put(byte);
        self.total_out += 1;
        Ok(())
    }

    /// Fill runs: optional leading byte, `length` fill bytes, optional
    /// trailing byte, repeated `repeat_size` more times.
    fn output_cmp(&mut self, io: &mut Io<'_, '_>) -> Result<Step, CodecError> {
        let pattern = self.flag.pattern;
        while !io.output_full() {
            if !self.variable_emitted && pattern.is_leading() {
                self.variable_emitted = true;
                self.emit(io, self.variable)?;
                self.track |= TRACK_VARIABLE;
            } else if self.flag_index < self.flag.length {
                self.emit(io, self.fill)?;
                self.flag_index += 1;
                if self.flag_index == self.flag.length {
                    self.track |= TRACK_RUN;
                }
            } else if !self.variable_emitted && pattern.is_trailing() {
                self.variable_emitted = true;
                self.emit(io, self.variable)?;
                self.track |= TRACK_VARIABLE;
            }

            if self.track == TRACK_COMPLETE {
                self.track = if pattern.is_leading() || pattern.is_trailing() {
                    0
                } else {
                    TRACK_VARIABLE
                };
                if self.flag.repeat {
                    self.variable_emitted = false;
                    self.flag_index = 0;
                    self.repeat_index += 1;
                    if self.repeat_index == self.repeat_size + 1 {
                        self.finish_token();
                        break;
                    }
                } else {
                    self.finish_token();
                    break;
                }
            }
        }
        Ok(if io.output_full() {
            Step::OutputFull
        } else {
            Step::Continue
        })
    }

    fn output_none(&mut self, io: &mut Io<'_, '_>) -> Result<Step, CodecError> {
        while self.flag_index < self.flag.length && !io.output_full() {
            if self.total_in >= self.compressed_size {
                return Err(CodecError::InputOverrun {
                    compressed_size: self.compressed_size,
                });
            }
            let Some(byte) = io.next_input() else {
                break;
            };
            self.total_in += 1;
            if self.flag.repeat {
                // Bounded by SCRATCH_LEN in get_flag.
                let slot = usize::try_from(self.flag_index).unwrap_or(SCRATCH_LEN);
                if let Some(cell) = self.scratch.get_mut(slot) {
                    *cell = byte;
                }
            }
            self.emit(io, byte)?;
            self.flag_index += 1;
        }

        if self.flag_index == self.flag.length {
            self.flag_index = 0;
            self.done = self.total_out == self.original_size;
            if self.done && self.flag.repeat {
                return Err(CodecError::OutputOverrun {
                    original_size: self.original_size,
                });
            }
            self.state = if self.flag.repeat && !self.done {
                State::GetRepeat
            } else {
                State::GetFlag
            };
        }

        Ok(if io.consumed == io.input.len() {
            Step::NeedInput
        } else if io.output_full() {
            Step::OutputFull
        } else {
            Step::Continue
        })
    }

    fn output_none_repeat(&mut self, io: &mut Io<'_, '_>) -> Step {
        let len = usize::try_from(self.flag.length).unwrap_or(SCRATCH_LEN).min(SCRATCH_LEN);
        while self.repeat_index < self.repeat_size {
            let mut index = usize::try_from(self.flag_index).unwrap_or(len);
            while index < len && !io.output_full() {
                if self.total_out >= self.original_size {
                    break;
                }
                io.put(self.scratch[index]);
                self.total_out += 1;
                index += 1;
            }
            self.flag_index = index as u64;
            if index == len {
                self.flag_index = 0;
                self.repeat_index += 1;
            }
            if io.output_full() || self.total_out >= self.original_size {
                break;
            }
        }
        if self.repeat_index == self.repeat_size {
            self.finish_token();
        }
        if io.output_full() {
            Step::OutputFull
        } else {
            Step::Continue
        }
    }

    fn finish_token(&mut self) {
        self.state = State::GetFlag;
        self.done = self.total_out == self.original_size;
    }
}

fn kind_name(bit: u32) -> Option<&'static str> {
    Some(match bit {
        0 => "NONE",
        1 => "ZERO",
        2 => "ZERO-VAR",
        3 => "VAR-ZERO",
        4 => "HIGH",
        5 => "HIGH-VAR",
        6 => "VAR-HIGH",
        7 => "VAR",
        8 => "REPEATED-NONE",
        10 => "REPEATED-ZERO-VAR",
        11 => "REPEATED-VAR-ZERO",
        13 => "REPEATED-HIGH-VAR",
        14 => "REPEATED-VAR-HIGH",
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::compress;
    use bop_wire::varint::write_varint;

    fn framed(original: u64, tokens: &[u8]) -> Vec<u8> {
        let mut out = MAGIC.to_vec();
        write_varint(&mut out, original);
        write_varint(&mut out, tokens.len() as u64);
        out.extend_from_slice(tokens);
        out
    }

    /// Feed `stream` in `in_chunk` pieces into `out_chunk` sized buffers.
    fn drain(
        engine: &mut ResumableDecompressor,
        stream: &[u8],
        in_chunk: usize,
        out_chunk: usize,
    ) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        let mut buf = vec![0u8; out_chunk];
        let mut pos = 0;
        loop {
            let end = (pos + in_chunk).min(stream.len());
            let progress = engine.process(&stream[pos..end], &mut buf)?;
            pos += progress.consumed;
            out.extend_from_slice(&buf[..progress.written]);
            match progress.status {
                Status::Done => return Ok(out),
                Status::Good => {}
                Status::NeedInput => {
                    if pos == stream.len() {
                        return Err(CodecError::UnexpectedEndOfStream);
                    }
                }
            }
        }
    }

    fn sample() -> Vec<u8> {
        let mut data = vec![0u8; 300];
        data.extend_from_slice(&[1, 2, 3, 1, 2, 3, 1, 2, 3, 4]);
        data.extend(std::iter::repeat_n([0xFFu8, 0xFF, 0xFF, 0x10], 6).flatten());
        data.extend(std::iter::repeat_n([0x20u8, 0, 0, 0], 5).flatten());
        data.extend((0u8..=255).map(|b| b.wrapping_mul(37)));
        data.extend_from_slice(&[9, 9, 9, 9, 9, 1]);
        data
    }

    #[test]
    fn decodes_whole_stream_in_one_call() {
        let data = sample();
        let packed = compress(&data).unwrap();
        let mut engine = ResumableDecompressor::new();
        let mut out = vec![0u8; data.len()];
        let progress = engine.process(&packed, &mut out).unwrap();
        assert_eq!(progress.status, Status::Done);
        assert_eq!(progress.consumed, packed.len());
        assert_eq!(progress.written, data.len());
        assert_eq!(out, data);
        assert!(engine.is_done());
    }

    #[test]
    fn decodes_byte_by_byte() {
        let data = sample();
        let packed = compress(&data).unwrap();
        let mut engine = ResumableDecompressor::new();
        assert_eq!(drain(&mut engine, &packed, 1, 1).unwrap(), data);
    }

    #[test]
    fn decodes_with_mixed_chunk_sizes() {
        let data = sample();
        let packed = compress(&data).unwrap();
        for (in_chunk, out_chunk) in [(4, 7), (3, 2048), (64, 5), (1, 300), (17, 1)] {
            let mut engine = ResumableDecompressor::new();
            let out = drain(&mut engine, &packed, in_chunk, out_chunk).unwrap();
            assert_eq!(out, data, "in {in_chunk} out {out_chunk}");
        }
    }

    #[test]
    fn reject_empty_output_without_side_effects() {
        let packed = compress(&[1, 2, 3, 4]).unwrap();
        let mut engine = ResumableDecompressor::new();
        let result = engine.process(&packed, &mut []);
        assert!(matches!(result, Err(CodecError::EmptyOutputBuffer)));
        assert!(!engine.is_failed());
        assert_eq!(drain(&mut engine, &packed, 8, 8).unwrap(), vec![1, 2, 3, 4]);
    }

    #[test]
    fn reject_call_after_done() {
        let packed = compress(&[7; 10]).unwrap();
        let mut engine = ResumableDecompressor::new();
        drain(&mut engine, &packed, 64, 64).unwrap();
        let mut buf = [0u8; 4];
        assert!(matches!(engine.process(&[], &mut buf), Err(CodecError::CalledAfterDone)));
        assert!(matches!(engine.process(&[], &mut buf), Err(CodecError::EngineFailed)));

        engine.reset();
        assert_eq!(drain(&mut engine, &packed, 64, 64).unwrap(), vec![7; 10]);
    }

    #[test]
    fn reject_bad_identifier() {
        let mut packed = compress(&[1, 2, 3]).unwrap();
        packed[7] = 2;
        let mut engine = ResumableDecompressor::new();
        let result = drain(&mut engine, &packed, 3, 8);
        assert!(matches!(result, Err(CodecError::UnsupportedVersion { version: 2 })));
        assert!(engine.is_failed());
    }

    #[test]
    fn reject_repeated_zero() {
        let stream = framed(8, &[0x49, 0x01]);
        let mut engine = ResumableDecompressor::new();
        let result = drain(&mut engine, &stream, 16, 16);
        assert!(matches!(result, Err(CodecError::InvalidRepeat { pattern: Pattern::Zero })));
    }

    #[test]
    fn reject_oversized_repeated_literal() {
        let mut tokens = Vec::new();
        write_varint(&mut tokens, (2049 << 4) | 0x08);
        tokens.extend_from_slice(&[0u8; 16]);
        let stream = framed(10_000, &tokens);
        let mut engine = ResumableDecompressor::new();
        let result = drain(&mut engine, &stream, 64, 64);
        assert!(matches!(result, Err(CodecError::RepeatedLiteralTooLong { len: 2049, .. })));
    }

    #[test]
    fn reject_declared_size_mismatch() {
        // Token section declared one byte longer than the tokens.
        let mut stream = MAGIC.to_vec();
        stream.extend_from_slice(&[0x02, 0x04, 0x20, 1, 2, 0]);
        let mut engine = ResumableDecompressor::new();
        let result = drain(&mut engine, &stream, 16, 16);
        assert!(matches!(
            result,
            Err(CodecError::CompressedSizeMismatch { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn reject_output_beyond_original_size() {
        let stream = framed(3, &[0x51]);
        let mut engine = ResumableDecompressor::new();
        let result = drain(&mut engine, &stream, 16, 16);
        assert!(matches!(result, Err(CodecError::OutputOverrun { original_size: 3 })));
    }

    #[test]
    fn repeated_literal_replays_scratch() {
        // Literal [4,5] repeated three more times.
        let stream = framed(8, &[0x28, 4, 5, 3]);
        let mut engine = ResumableDecompressor::new();
        let out = drain(&mut engine, &stream, 2, 3).unwrap();
        assert_eq!(out, vec![4, 5, 4, 5, 4, 5, 4, 5]);
    }

    #[test]
    fn coverage_lists_unused_kinds() {
        let stream = framed(4, &[0x41]);
        let mut engine = ResumableDecompressor::new();
        assert!(engine.coverage_info().contains("not finished"));
        drain(&mut engine, &stream, 16, 16).unwrap();
        assert_eq!(engine.coverage(), 1 << 1);
        let missing = engine.uncovered_kinds();
        assert!(!missing.contains(&"ZERO"));
        assert!(missing.contains(&"NONE"));
        assert!(missing.contains(&"REPEATED-VAR-HIGH"));
        assert_eq!(missing.len(), 12);
        assert!(engine.coverage_info().starts_with("stream does not cover"));
    }
}
