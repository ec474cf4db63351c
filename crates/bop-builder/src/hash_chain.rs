use bop_crypto::CryptoProvider;
use bop_types::{Diagnostics, IntegrityKind, Severity};
use bop_wire::layout::{ACTION_REGION, ACTION_REGION_LEN, HASH};
use bop_wire::{BLOCK_SIZE, Block, BlockKind};

use crate::error::BuildError;

/// Whether a fresh Hash block must be inserted before hashing the next
/// block into the current digest slot.
///
/// The current slot keeps hashing blocks directly while at least two
/// digests fit (one for the block, one spare for a future Hash block),
/// or when the block is the last of the BOP.
pub fn needs_hash_block(remaining: usize, hash_len: usize, is_last: bool) -> bool {
    !(remaining >= 2 * hash_len || is_last)
}

/// Next free digest slot.
#[derive(Clone, Copy)]
struct Slot {
    block: usize,
    offset: usize,
    remaining: usize,
}

/// Insert Hash blocks and fill in every digest.
///
/// ```text
///   Header[0x200] ──► H1 ──► B0, B1, ... , H2 ──► ...
/// ```
///
/// Each block after the header is covered by exactly one digest stored
/// either in the header's hash field or in an earlier Hash block. A Hash
/// block's own digest lives in the slot that was current when it was
/// created, and is computed after all of its entries are final.
///
/// With no blocks after the header, the header hashes its own action
/// region into its hash field instead.
///
/// # Errors
///
/// Only wire errors from writing digests, which indicate a bug.
pub fn chain(
    header: Block,
    body: Vec<Block>,
    integrity: IntegrityKind,
    crypto: &dyn CryptoProvider,
    diagnostics: &dyn Diagnostics,
) -> Result<Vec<Block>, BuildError> {
    let hash_len = integrity.digest_len();
    let mut out = Vec::with_capacity(body.len() + 1 + body.len() / (BLOCK_SIZE / hash_len));
    out.push(header);

    if body.is_empty() {
        let digest = crypto.hash(integrity, &out[0].as_bytes()[ACTION_REGION..ACTION_REGION + ACTION_REGION_LEN]);
        out[0].write_at(HASH, &digest)?;
        diagnostics.emit(Severity::Debug, "header-only BOP: action region hashed into header");
        return Ok(out);
    }

    let mut slot = Slot {
        block: 0,
        offset: HASH,
        remaining: hash_len,
    };
    // (hash block index, slot that receives its digest)
    let mut deferred: Vec<(usize, Slot)> = Vec::new();
    let count = body.len();

    for (i, block) in body.into_iter().enumerate() {
        if needs_hash_block(slot.remaining, hash_len, i + 1 == count) {
            let index = out.len();
            out.push(Block::new(BlockKind::Hash));
            deferred.push((index, slot));
            diagnostics.emit(
                Severity::Debug,
                &format!("hash block at offset 0x{:X}", index * BLOCK_SIZE),
            );
            slot = Slot {
                block: index,
                offset: 0,
                remaining: BLOCK_SIZE,
            };
        }
        let digest = crypto.hash(integrity, block.as_bytes());
        out[slot.block].write_at(slot.offset, &digest)?;
        slot.offset += hash_len;
        slot.remaining -= hash_len;
        out.push(block);
    }

    for &(index, parent) in deferred.iter().rev() {
        let digest = crypto.hash(integrity, out[index].as_bytes());
        out[parent.block].write_at(parent.offset, &digest)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bop_crypto::RustCryptoProvider;
    use bop_types::NullDiagnostics;

    fn body(n: usize) -> Vec<Block> {
        (0..n)
            .map(|i| {
                let mut block = Block::new(BlockKind::Data);
                block.set_u32(0, u32::try_from(i).unwrap() + 1);
                block
            })
            .collect()
    }

    fn run(n: usize, integrity: IntegrityKind) -> Vec<Block> {
        chain(Block::new(BlockKind::Header), body(n), integrity, &RustCryptoProvider, &NullDiagnostics).unwrap()
    }

    fn digest_at(block: &Block, offset: usize, integrity: IntegrityKind) -> &[u8] {
        &block.as_bytes()[offset..offset + integrity.digest_len()]
    }

    #[test]
    fn placement_rule() {
        assert!(!needs_hash_block(64, 32, false));
        assert!(needs_hash_block(32, 32, false));
        assert!(!needs_hash_block(32, 32, true));
    }

    #[test]
    fn header_only_hashes_action_region() {
        let blocks = run(0, IntegrityKind::Sha256);
        assert_eq!(blocks.len(), 1);
        let expected = RustCryptoProvider.hash(IntegrityKind::Sha256, &[0u8; ACTION_REGION_LEN]);
        assert_eq!(digest_at(&blocks[0], HASH, IntegrityKind::Sha256), &expected[..]);
    }

    #[test]
    fn single_block_goes_straight_into_header() {
        let blocks = run(1, IntegrityKind::Sha384);
        assert_eq!(blocks.len(), 2);
        let expected = RustCryptoProvider.hash(IntegrityKind::Sha384, blocks[1].as_bytes());
        assert_eq!(digest_at(&blocks[0], HASH, IntegrityKind::Sha384), &expected[..]);
    }

    #[test]
    fn several_blocks_get_a_hash_block() {
        let integrity = IntegrityKind::Sha256;
        let blocks = run(3, integrity);
        let kinds: Vec<_> = blocks.iter().map(Block::kind).collect();
        assert_eq!(
            kinds,
            [BlockKind::Header, BlockKind::Hash, BlockKind::Data, BlockKind::Data, BlockKind::Data]
        );
        let hash_block = RustCryptoProvider.hash(integrity, blocks[1].as_bytes());
        assert_eq!(digest_at(&blocks[0], HASH, integrity), &hash_block[..]);
        for (i, block) in blocks[2..].iter().enumerate() {
            let expected = RustCryptoProvider.hash(integrity, block.as_bytes());
            assert_eq!(digest_at(&blocks[1], i * 32, integrity), &expected[..]);
        }
    }

    #[test]
    fn full_hash_block_chains_to_the_next() {
        // sha512: 32 slots per Hash block; the 31st child leaves 64 bytes,
        // the 32nd needs a new Hash block unless it is last.
        let integrity = IntegrityKind::Sha512;
        let blocks = run(40, integrity);
        let hash_positions: Vec<_> = blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.kind() == BlockKind::Hash)
            .map(|(i, _)| i)
            .collect();
        assert_eq!(hash_positions, [1, 33]);
        let second = RustCryptoProvider.hash(integrity, blocks[33].as_bytes());
        assert_eq!(digest_at(&blocks[1], 31 * 64, integrity), &second[..]);
        assert_eq!(blocks.len(), 1 + 2 + 40);
    }
}
