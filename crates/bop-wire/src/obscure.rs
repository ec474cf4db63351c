use crate::checksum::crc32;
use crate::layout::{HASH_LEN, OBSCURED_LEN};

/// Bytes of the chip-id field covered by its own CRC.
const SEALED_LEN: usize = 12;

/// XOR-fold `region` against the 64-byte hash area of the header.
///
/// Four rounds, each consuming the next 16 bytes of `key`. Rounds 0 and 2
/// XOR byte `i` with `key[i]`; rounds 1 and 3 XOR it with `key[15 - i]`.
/// XOR is its own inverse, so the same call obscures and reveals.
pub fn obscure(region: &mut [u8; OBSCURED_LEN], key: &[u8; HASH_LEN]) {
    for (round, slice) in key.chunks_exact(OBSCURED_LEN).enumerate() {
        for (i, byte) in region.iter_mut().enumerate() {
            *byte ^= if round % 2 == 0 {
                slice[i]
            } else {
                slice[OBSCURED_LEN - 1 - i]
            };
        }
    }
}

/// Build the clear-text chip-id field: id byte, 11 reserved zero bytes and
/// the CRC32 of those 12 bytes.
pub fn seal_chip_id(chip_id: u8) -> [u8; OBSCURED_LEN] {
    let mut field = [0u8; OBSCURED_LEN];
    field[0] = chip_id;
    let crc = crc32(&field[..SEALED_LEN]);
    field[SEALED_LEN..].copy_from_slice(&crc.to_le_bytes());
    field
}

/// Return the chip id if the clear-text field's CRC matches.
pub fn open_chip_id(field: &[u8; OBSCURED_LEN]) -> Option<u8> {
    let stored = u32::from_le_bytes([field[12], field[13], field[14], field[15]]);
    (crc32(&field[..SEALED_LEN]) == stored).then_some(field[0])
}
