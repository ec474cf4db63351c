use bop_builder::needs_hash_block;
use bop_crypto::CryptoProvider;
use bop_types::{ErrorClass, IntegrityKind, Severity};
use bop_wire::BLOCK_SIZE;
use bop_wire::layout::HASH;

use crate::report::{Finding, Recorder};

/// Replays the builder's hash-chain walk, handing out each block after the
/// header only once its digest has been checked.
///
/// Hash blocks are verified and consumed transparently: they become the
/// new digest slot and the walk moves on to the block they cover.
pub(crate) struct HashWalker {
    kind: IntegrityKind,
    hash_len: usize,
    /// Offset of the next digest to compare against.
    slot: usize,
    remaining: usize,
    /// Offset of the next unread block.
    cursor: usize,
    len: usize,
}

impl HashWalker {
    pub(crate) fn new(kind: IntegrityKind, bop_len: usize) -> Self {
        let hash_len = kind.digest_len();
        Self {
            kind,
            hash_len,
            slot: HASH,
            remaining: hash_len,
            cursor: BLOCK_SIZE,
            len: bop_len,
        }
    }

    /// Offset of the first block not yet handed out.
    pub(crate) fn cursor(&self) -> usize {
        self.cursor
    }

    /// Verify and return the offset of the next `what` block.
    ///
    /// # Errors
    ///
    /// A Format finding when the BOP has no blocks left, an Integrity
    /// finding when a digest does not match.
    pub(crate) fn next_block(
        &mut self,
        bop: &[u8],
        crypto: &dyn CryptoProvider,
        rec: &mut Recorder<'_>,
        what: &str,
    ) -> Result<usize, Finding> {
        loop {
            if self.cursor + BLOCK_SIZE > self.len {
                return Err(Finding {
                    class: ErrorClass::Format,
                    severity: Severity::Error,
                    offset: Some(self.cursor),
                    message: format!("no block left for {what} data"),
                });
            }
            let is_last = self.len - self.cursor == BLOCK_SIZE;
            let via_hash_block = needs_hash_block(self.remaining, self.hash_len, is_last);
            if via_hash_block {
                rec.line(format!(
                    "Hash block at 0x{:08X}, digest at 0x{:08X}",
                    self.cursor, self.slot
                ));
            } else {
                rec.line(format!(
                    "Verify {what} block at 0x{:08X}, digest at 0x{:08X}",
                    self.cursor, self.slot
                ));
            }
            self.verify(bop, crypto)?;
            let block = self.cursor;
            self.cursor += BLOCK_SIZE;
            if via_hash_block {
                self.slot = block;
                self.remaining = BLOCK_SIZE;
                continue;
            }
            self.slot += self.hash_len;
            self.remaining -= self.hash_len;
            return Ok(block);
        }
    }

    fn verify(&self, bop: &[u8], crypto: &dyn CryptoProvider) -> Result<(), Finding> {
        let digest = crypto.hash(self.kind, &bop[self.cursor..self.cursor + BLOCK_SIZE]);
        if digest.as_slice() == &bop[self.slot..self.slot + self.hash_len] {
            Ok(())
        } else {
            Err(Finding {
                class: ErrorClass::Integrity,
                severity: Severity::Error,
                offset: Some(self.cursor),
                message: format!("hash mismatch for block at 0x{:08X}", self.cursor),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bop_builder::hash_chain::chain;
    use bop_crypto::RustCryptoProvider;
    use bop_types::NullDiagnostics;
    use bop_wire::{Block, BlockKind};

    fn chained(n: usize, kind: IntegrityKind) -> Vec<u8> {
        let body = (0..n)
            .map(|i| {
                let mut block = Block::new(BlockKind::Data);
                block.set_u32(0, u32::try_from(i).unwrap() + 1);
                block
            })
            .collect();
        let blocks = chain(Block::new(BlockKind::Header), body, kind, &RustCryptoProvider, &NullDiagnostics).unwrap();
        blocks.iter().flat_map(|b| b.as_bytes().to_vec()).collect()
    }

    fn walk(bop: &[u8], kind: IntegrityKind, n: usize) -> Result<Vec<usize>, Finding> {
        let sink = NullDiagnostics;
        let mut rec = Recorder::new(&sink);
        let mut walker = HashWalker::new(kind, bop.len());
        (0..n)
            .map(|_| walker.next_block(bop, &RustCryptoProvider, &mut rec, "payload"))
            .collect()
    }

    #[test]
    fn walk_skips_hash_blocks() {
        let bop = chained(3, IntegrityKind::Sha256);
        assert_eq!(bop.len(), 5 * BLOCK_SIZE);
        let blocks = walk(&bop, IntegrityKind::Sha256, 3).unwrap();
        assert_eq!(blocks, [2 * BLOCK_SIZE, 3 * BLOCK_SIZE, 4 * BLOCK_SIZE]);
    }

    #[test]
    fn walk_follows_second_hash_block() {
        let bop = chained(40, IntegrityKind::Sha512);
        let blocks = walk(&bop, IntegrityKind::Sha512, 40).unwrap();
        assert_eq!(blocks.len(), 40);
        assert!(!blocks.contains(&BLOCK_SIZE));
        assert!(!blocks.contains(&(33 * BLOCK_SIZE)));
        assert_eq!(blocks[39], 42 * BLOCK_SIZE);
    }

    #[test]
    fn single_block_is_covered_by_header() {
        let bop = chained(1, IntegrityKind::Sha384);
        assert_eq!(walk(&bop, IntegrityKind::Sha384, 1).unwrap(), [BLOCK_SIZE]);
    }

    #[test]
    fn reject_tampered_blocks() {
        let mut bop = chained(3, IntegrityKind::Sha256);
        bop[3 * BLOCK_SIZE + 100] ^= 1;
        let err = walk(&bop, IntegrityKind::Sha256, 3).unwrap_err();
        assert_eq!(err.class, ErrorClass::Integrity);
        assert_eq!(err.offset, Some(3 * BLOCK_SIZE));

        let mut bop = chained(3, IntegrityKind::Sha256);
        bop[BLOCK_SIZE + 5] ^= 1;
        let err = walk(&bop, IntegrityKind::Sha256, 1).unwrap_err();
        assert_eq!(err.offset, Some(BLOCK_SIZE));
    }

    #[test]
    fn reject_running_out_of_blocks() {
        let bop = chained(1, IntegrityKind::Sha256);
        let err = walk(&bop, IntegrityKind::Sha256, 2).unwrap_err();
        assert_eq!(err.class, ErrorClass::Format);
    }
}
