use bop_codec::{ResumableDecompressor, Status};
use bop_types::{ErrorClass, Severity};
use zeroize::Zeroizing;

use crate::report::Finding;

const OUTPUT_CHUNK: usize = 2048;

/// Recovers one action's payload from its (already decrypted) Data block
/// contents.
///
/// With decompression on, each block's bytes are fed to the engine one
/// 4-byte word at a time, the way the target's loader consumes them.
/// Otherwise the bytes are copied as they are.
pub(crate) struct PayloadDecoder {
    engine: Option<ResumableDecompressor>,
    out: Zeroizing<Vec<u8>>,
    scratch: Zeroizing<Vec<u8>>,
    done: bool,
    failed: bool,
}

impl PayloadDecoder {
    pub(crate) fn new(decompress: bool) -> Self {
        Self {
            engine: decompress.then(ResumableDecompressor::new),
            out: Zeroizing::new(Vec::new()),
            scratch: Zeroizing::new(vec![0; OUTPUT_CHUNK]),
            done: false,
            failed: false,
        }
    }

    pub(crate) fn decompressing(&self) -> bool {
        self.engine.is_some()
    }

    /// Consume the payload bytes held by one Data block.
    ///
    /// # Errors
    ///
    /// A decompression finding at `offset`. Later calls after a failure
    /// are ignored.
    pub(crate) fn feed(&mut self, data: &[u8], is_last: bool, offset: usize) -> Result<(), Finding> {
        if self.failed {
            return Ok(());
        }
        let Some(engine) = self.engine.as_mut() else {
            self.out.extend_from_slice(data);
            return Ok(());
        };

        for chunk in data.chunks(4) {
            if self.done {
                break;
            }
            let mut word = [0u8; 4];
            word[..chunk.len()].copy_from_slice(chunk);
            let mut input = &word[..];
            loop {
                let progress = match engine.process(input, &mut self.scratch) {
                    Ok(progress) => progress,
                    Err(e) => {
                        self.failed = true;
                        return Err(decompression(offset, e.to_string()));
                    }
                };
                self.out.extend_from_slice(&self.scratch[..progress.written]);
                input = &input[progress.consumed..];
                match progress.status {
                    Status::Done => {
                        self.done = true;
                        break;
                    }
                    Status::NeedInput => break,
                    Status::Good => {}
                }
            }
        }

        if self.done && !is_last {
            self.failed = true;
            return Err(decompression(offset, "decompression finished before the last payload block"));
        }
        if is_last && !self.done {
            self.failed = true;
            return Err(decompression(offset, "last payload block reached but decompression is not finished"));
        }
        if is_last && self.out.len() % 4 != 0 {
            self.failed = true;
            return Err(decompression(
                offset,
                format!("decompression finished with {} byte(s) left over", self.out.len() % 4),
            ));
        }
        Ok(())
    }

    /// The recovered payload, or `None` after a failure.
    pub(crate) fn finish(self) -> Option<Zeroizing<Vec<u8>>> {
        if self.failed { None } else { Some(self.out) }
    }
}

fn decompression(offset: usize, message: impl Into<String>) -> Finding {
    Finding {
        class: ErrorClass::Format,
        severity: Severity::Error,
        offset: Some(offset),
        message: message.into(),
    }
}
