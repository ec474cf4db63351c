use bop_wire::varint::write_varint;

use crate::MAGIC;
use crate::error::CodecError;
use crate::pattern::Pattern;
use crate::token::Token;

/// Shortest chunk the repeat search considers.
const MIN_REPEAT_LEN: usize = 3;

/// The repeat search gives up past this length unless a match is growing.
const MAX_REPEAT_LEN: usize = 50;

/// A same-byte run this long is left to the run scanner.
const MAX_SAME_BYTE_RUN: usize = 100;

/// Compress `input`, keeping the smaller of the follow-up and plain
/// encodings. On a tie the follow-up encoding wins.
///
/// # Errors
///
/// Returns [`CodecError::EmptyInput`] for an empty buffer.
pub fn compress(input: &[u8]) -> Result<Vec<u8>, CodecError> {
    let with_followup = compress_with(input, true)?;
    let plain = compress_with(input, false)?;
    if plain.len() < with_followup.len() {
        Ok(plain)
    } else {
        Ok(with_followup)
    }
}

/// Compress with follow-up byte absorption switched on or off.
///
/// With `followup` set, a zero or 0xFF run found by the repeat search
/// swallows the next differing byte as a `ZeroVar` / `HighVar` token.
///
/// # Errors
///
/// Returns [`CodecError::EmptyInput`] for an empty buffer.
pub fn compress_with(input: &[u8], followup: bool) -> Result<Vec<u8>, CodecError> {
    if input.is_empty() {
        return Err(CodecError::EmptyInput);
    }
    let mut encoder = Encoder {
        input,
        tokens: Vec::with_capacity(input.len() / 2 + 16),
        followup,
    };
    encoder.run();

    let mut out = Vec::with_capacity(encoder.tokens.len() + 28);
    out.extend_from_slice(&MAGIC);
    write_varint(&mut out, input.len() as u64);
    write_varint(&mut out, encoder.tokens.len() as u64);
    out.extend_from_slice(&encoder.tokens);
    Ok(out)
}

/// A chunk at the search position that is copied `count` more times.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Repeat {
    len: usize,
    count: usize,
}

/// Progress of the same-byte run probe inside [`find_repeat`].
#[derive(Clone, Copy, PartialEq, Eq)]
enum RunProbe {
    Pending,
    Running,
    Broken,
}

/// Find the longest chunk at `index` that is immediately followed by a copy
/// of itself.
fn find_repeat(input: &[u8], index: usize) -> Option<Repeat> {
    let remaining = input.len() - index;
    if remaining < 2 * MIN_REPEAT_LEN {
        return None;
    }

    let first = input[index];
    let mut probe = RunProbe::Pending;
    let mut probe_at = index;
    let mut probe_len = 0usize;
    let mut len = 0usize;
    let mut candidate = MIN_REPEAT_LEN;

    while candidate <= remaining / 2 {
        if len == 0 && candidate > MAX_REPEAT_LEN {
            break;
        }
        match probe {
            RunProbe::Pending => {
                probe = RunProbe::Running;
                for _ in 0..2 * MIN_REPEAT_LEN {
                    if input[probe_at] != first {
                        probe = RunProbe::Broken;
                        break;
                    }
                    probe_at += 1;
                    probe_len += 1;
                }
            }
            RunProbe::Running => {
                if input[probe_at] == first && input[probe_at + 1] == first {
                    probe_at += 2;
                    probe_len += 2;
                    if probe_len >= MAX_SAME_BYTE_RUN {
                        return None;
                    }
                } else {
                    probe = RunProbe::Broken;
                }
            }
            RunProbe::Broken => {}
        }

        let second = index + candidate;
        if input[index..second] == input[second..second + candidate] {
            len = candidate;
        } else if len != 0 {
            break;
        }
        candidate += 1;
    }

    if len == 0 {
        return None;
    }
    let chunk = &input[index..index + len];
    let mut count = 0;
    let mut next = index + len;
    while next + len <= input.len() && input[next..next + len] == *chunk {
        count += 1;
        next += len;
    }
    Some(Repeat { len, count })
}

/// Classify a repeated chunk.
///
/// A `None` result means the chunk is stored as literals.
fn classify(chunk: &[u8]) -> Pattern {
    let n = chunk.len();
    let zeros = chunk.iter().filter(|&&b| b == 0x00).count();
    let highs = chunk.iter().filter(|&&b| b == 0xFF).count();
    if zeros == n {
        Pattern::Zero
    } else if highs == n {
        Pattern::High
    } else if zeros == n - 1 {
        boundary_pattern(chunk, 0x00, Pattern::VarZero, Pattern::ZeroVar)
    } else if highs == n - 1 {
        boundary_pattern(chunk, 0xFF, Pattern::VarHigh, Pattern::HighVar)
    } else {
        Pattern::None
    }
}

fn boundary_pattern(chunk: &[u8], fill: u8, leading: Pattern, trailing: Pattern) -> Pattern {
    if chunk[0] != fill {
        leading
    } else if chunk[chunk.len() - 1] != fill {
        trailing
    } else {
        Pattern::None
    }
}

struct Encoder<'a> {
    input: &'a [u8],
    tokens: Vec<u8>,
    followup: bool,
}

impl Encoder<'_> {
    fn run(&mut self) {
        let mut index = 0;
        while index < self.input.len() {
            index = match find_repeat(self.input, index) {
                Some(repeat) => self.encode_repeat(index, repeat),
                None => self.scan(index),
            };
        }
    }

    fn push(&mut self, token: &Token<'_>) {
        token.encode(&mut self.tokens);
    }

    /// Emit a run of `len` copies of `fill`, optionally followed by one
    /// absorbed byte.
    fn push_run(&mut self, fill: u8, len: usize, followup: Option<u8>) {
        let (pattern, explicit) = match (fill, followup) {
            (0x00, None) => (Pattern::Zero, None),
            (0x00, Some(b)) => (Pattern::ZeroVar, Some(b)),
            (0xFF, None) => (Pattern::High, None),
            (0xFF, Some(b)) => (Pattern::HighVar, Some(b)),
            (other, _) => (Pattern::Var, Some(other)),
        };
        self.push(&Token::Fill {
            pattern,
            run: len as u64,
            explicit,
            repeat: None,
        });
    }

    fn push_literals(&mut self, start: usize, len: usize) {
        let bytes = &self.input[start..start + len];
        self.push(&Token::Literal {
            bytes,
            repeat: None,
        });
    }

    fn encode_repeat(&mut self, mut index: usize, repeat: Repeat) -> usize {
        let input = self.input;
        let chunk = &input[index..index + repeat.len];
        let pattern = classify(chunk);
        let copies = repeat.count + 1;

        if matches!(pattern, Pattern::Zero | Pattern::High) {
            let fill = pattern.implied_fill();
            let mut len = repeat.len * copies;
            index += len;
            let mut followup = None;
            while index < input.len() {
                let byte = input[index];
                if byte == fill {
                    len += 1;
                } else if !self.followup {
                    break;
                } else {
                    followup = Some(byte);
                }
                index += 1;
                if followup.is_some() {
                    break;
                }
            }
            self.push_run(fill, len, followup);
            return index;
        }

        let token = match pattern {
            Pattern::None => Token::Literal {
                bytes: chunk,
                repeat: Some(repeat.count as u64),
            },
            boundary => Token::Fill {
                pattern: boundary,
                run: (repeat.len - 1) as u64,
                explicit: Some(if boundary.is_leading() {
                    chunk[0]
                } else {
                    chunk[repeat.len - 1]
                }),
                repeat: Some(repeat.count as u64),
            },
        };
        self.push(&token);
        index + repeat.len * copies
    }

    /// Literal and run scanner for positions where no repeated chunk starts.
    ///
    /// Returns the index where the next search begins.
    fn scan(&mut self, mut index: usize) -> usize {
        let input = self.input;
        let mut byte = 0u8;
        let mut run = 0usize;
        let mut literals = 0usize;

        while index < input.len() {
            let current = input[index];
            if run == 0 && literals == 0 {
                byte = current;
                run = 1;
            } else if current == byte {
                if run > 0 {
                    run += 1;
                } else {
                    // The previous byte starts a run; it is not a literal.
                    self.push_literals(index - literals, literals - 1);
                    return index - 1;
                }
            } else if run == 1 {
                let next_matches = input.get(index + 1) == Some(&current);
                if (current == 0x00 || current == 0xFF) && next_matches {
                    let mut end = index + 1;
                    while end < input.len() && input[end] == current {
                        end += 1;
                    }
                    let pattern = if current == 0x00 {
                        Pattern::VarZero
                    } else {
                        Pattern::VarHigh
                    };
                    self.push(&Token::Fill {
                        pattern,
                        run: (end - index) as u64,
                        explicit: Some(byte),
                        repeat: None,
                    });
                    return end;
                }
                run = 0;
                literals = 2;
                byte = current;
            } else if run > 0 {
                if byte == 0x00 || byte == 0xFF {
                    self.push_run(byte, run, Some(current));
                    return index + 1;
                }
                self.push_run(byte, run, None);
                return index;
            } else {
                literals += 1;
                byte = current;
            }
            index += 1;
        }

        if run > 0 {
            self.push_run(byte, run, None);
        } else {
            self.push_literals(index - literals, literals);
        }
        index
    }
}
