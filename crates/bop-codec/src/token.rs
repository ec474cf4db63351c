use bop_wire::varint::{read_varint, write_varint};

use crate::error::CodecError;
use crate::pattern::{Flag, Pattern};

/// One unit of the compressed token stream.
///
/// `run` is the length field of the flag: the literal count for
/// [`Token::Literal`] and the fill count for [`Token::Fill`]. Boundary
/// patterns (`ZeroVar`, `VarZero`, `HighVar`, `VarHigh`) expand to one
/// more byte than `run`. `repeat` is the number of extra copies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token<'a> {
    Literal {
        bytes: &'a [u8],
        repeat: Option<u64>,
    },
    Fill {
        pattern: Pattern,
        run: u64,
        explicit: Option<u8>,
        repeat: Option<u64>,
    },
}

impl Token<'_> {
    pub fn flag(&self) -> Flag {
        match self {
            Self::Literal { bytes, repeat } => Flag {
                pattern: Pattern::None,
                repeat: repeat.is_some(),
                length: bytes.len() as u64,
            },
            Self::Fill {
                pattern,
                run,
                repeat,
                ..
            } => Flag {
                pattern: *pattern,
                repeat: repeat.is_some(),
                length: *run,
            },
        }
    }

    pub fn repeat(&self) -> Option<u64> {
        match self {
            Self::Literal { repeat, .. } | Self::Fill { repeat, .. } => *repeat,
        }
    }

    /// Bytes produced by one copy of the token.
    pub fn unit_len(&self) -> u64 {
        match self {
            Self::Literal { bytes, .. } => bytes.len() as u64,
            Self::Fill { pattern, run, .. } => {
                if pattern.is_leading() || pattern.is_trailing() {
                    run + 1
                } else {
                    *run
                }
            }
        }
    }

    /// Bytes produced including repeats, or `None` on overflow.
    pub fn expanded_len(&self) -> Option<u64> {
        let copies = self.repeat().unwrap_or(0).checked_add(1)?;
        self.unit_len().checked_mul(copies)
    }

    /// Append the wire form of this token.
    pub fn encode(&self, out: &mut Vec<u8>) {
        write_varint(out, self.flag().raw());
        match self {
            Self::Literal { bytes, .. } => out.extend_from_slice(bytes),
            Self::Fill { explicit, .. } => {
                if let Some(byte) = explicit {
                    out.push(*byte);
                }
            }
        }
        if let Some(count) = self.repeat() {
            write_varint(out, count);
        }
    }

    /// Append the decoded bytes, repeats included.
    ///
    /// The caller bounds the total with [`Token::expanded_len`] first.
    pub fn expand_into(&self, out: &mut Vec<u8>) {
        let start = out.len();
        match self {
            Self::Literal { bytes, .. } => out.extend_from_slice(bytes),
            Self::Fill {
                pattern,
                run,
                explicit,
                ..
            } => {
                let fill = if *pattern == Pattern::Var {
                    explicit.unwrap_or(0)
                } else {
                    pattern.implied_fill()
                };
                let boundary = explicit.unwrap_or(0);
                if pattern.is_leading() {
                    out.push(boundary);
                }
                for _ in 0..*run {
                    out.push(fill);
                }
                if pattern.is_trailing() {
                    out.push(boundary);
                }
            }
        }
        let end = out.len();
        for _ in 0..self.repeat().unwrap_or(0) {
            out.extend_from_within(start..end);
        }
    }
}

impl<'a> Token<'a> {
    /// Read one token from `buf[*cursor..end]`, advancing the cursor.
    ///
    /// # Errors
    ///
    /// - [`CodecError::ZeroLengthToken`] for a zero length field.
    /// - [`CodecError::InvalidRepeat`] for a repeated `Zero`/`High`/`Var`.
    /// - [`CodecError::ZeroRepeat`] for a repeat count of zero.
    /// - [`CodecError::Wire`] when the token runs past `end`.
    pub fn decode(buf: &'a [u8], end: usize, cursor: &mut usize) -> Result<Self, CodecError> {
        let offset = *cursor;
        let flag = Flag::from_raw(read_varint(buf, end, cursor)?);
        if flag.length == 0 {
            return Err(CodecError::ZeroLengthToken {
                pattern: flag.pattern,
                offset,
            });
        }
        if flag.repeat && !flag.pattern.allows_repeat() {
            return Err(CodecError::InvalidRepeat {
                pattern: flag.pattern,
            });
        }

        let token = if flag.pattern == Pattern::None {
            let len = usize::try_from(flag.length)
                .map_err(|_| CodecError::TokenTooLong { length: flag.length })?;
            let bytes = take(buf, end, cursor, len)?;
            Token::Literal {
                bytes,
                repeat: None,
            }
        } else {
            let explicit = if flag.pattern.has_explicit_byte() {
                Some(take(buf, end, cursor, 1)?[0])
            } else {
                None
            };
            Token::Fill {
                pattern: flag.pattern,
                run: flag.length,
                explicit,
                repeat: None,
            }
        };

        if !flag.repeat {
            return Ok(token);
        }
        let repeat_offset = *cursor;
        let count = read_varint(buf, end, cursor)?;
        if count == 0 {
            return Err(CodecError::ZeroRepeat {
                offset: repeat_offset,
            });
        }
        Ok(match token {
            Token::Literal { bytes, .. } => Token::Literal {
                bytes,
                repeat: Some(count),
            },
            Token::Fill {
                pattern,
                run,
                explicit,
                ..
            } => Token::Fill {
                pattern,
                run,
                explicit,
                repeat: Some(count),
            },
        })
    }
}

fn take<'a>(buf: &'a [u8], end: usize, cursor: &mut usize, len: usize) -> Result<&'a [u8], CodecError> {
    let end = end.min(buf.len());
    let start = *cursor;
    let stop = start
        .checked_add(len)
        .filter(|&stop| stop <= end)
        .ok_or(bop_wire::WireError::UnexpectedEof { offset: end })?;
    *cursor = stop;
    Ok(&buf[start..stop])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(token: &Token<'_>) -> Vec<u8> {
        let mut out = Vec::new();
        token.encode(&mut out);
        out
    }

    fn expand(token: &Token<'_>) -> Vec<u8> {
        let mut out = Vec::new();
        token.expand_into(&mut out);
        out
    }

    #[test]
    fn literal_with_repeat() {
        let token = Token::Literal {
            bytes: &[1, 2, 3],
            repeat: Some(2),
        };
        assert_eq!(encode(&token), vec![0x38, 1, 2, 3, 2]);
        assert_eq!(expand(&token), vec![1, 2, 3, 1, 2, 3, 1, 2, 3]);
        assert_eq!(token.expanded_len(), Some(9));
    }

    #[test]
    fn boundary_patterns_add_one_byte() {
        let leading = Token::Fill {
            pattern: Pattern::VarZero,
            run: 3,
            explicit: Some(9),
            repeat: None,
        };
        assert_eq!(expand(&leading), vec![9, 0, 0, 0]);

        let trailing = Token::Fill {
            pattern: Pattern::HighVar,
            run: 2,
            explicit: Some(7),
            repeat: Some(1),
        };
        assert_eq!(expand(&trailing), vec![0xFF, 0xFF, 7, 0xFF, 0xFF, 7]);
    }

    #[test]
    fn var_fills_with_explicit_byte() {
        let token = Token::Fill {
            pattern: Pattern::Var,
            run: 4,
            explicit: Some(0x42),
            repeat: None,
        };
        assert_eq!(encode(&token), vec![0x47, 0x42]);
        assert_eq!(expand(&token), vec![0x42; 4]);
    }

    #[test]
    fn decode_reads_what_encode_wrote() {
        let token = Token::Fill {
            pattern: Pattern::VarHigh,
            run: 20,
            explicit: Some(1),
            repeat: Some(300),
        };
        let wire = encode(&token);
        let mut cursor = 0;
        let decoded = Token::decode(&wire, wire.len(), &mut cursor).unwrap();
        assert_eq!(decoded, token);
        assert_eq!(cursor, wire.len());
    }

    #[test]
    fn reject_zero_length() {
        let mut cursor = 0;
        let result = Token::decode(&[0x01], 1, &mut cursor);
        assert!(matches!(result, Err(CodecError::ZeroLengthToken { pattern: Pattern::Zero, .. })));
    }

    #[test]
    fn reject_repeated_var() {
        let mut cursor = 0;
        let result = Token::decode(&[0x1F, 0x11, 0x01], 3, &mut cursor);
        assert!(matches!(result, Err(CodecError::InvalidRepeat { pattern: Pattern::Var })));
    }

    #[test]
    fn reject_zero_repeat() {
        let mut cursor = 0;
        let result = Token::decode(&[0x18, 0xAA, 0x00], 3, &mut cursor);
        assert!(matches!(result, Err(CodecError::ZeroRepeat { offset: 2 })));
    }

    #[test]
    fn reject_literal_past_end() {
        let wire = [0x30, 1, 2, 3];
        let mut cursor = 0;
        let result = Token::decode(&wire, 3, &mut cursor);
        assert!(matches!(result, Err(CodecError::Wire(_))));
    }
}
