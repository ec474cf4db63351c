//! IV arithmetic owned by the format, not the cipher.

/// Advance the package's rolling IV: the first word is a little-endian
/// counter that wraps.
pub fn increment_iv(iv: &mut [u8; 16]) {
    let mut word = [0u8; 4];
    word.copy_from_slice(&iv[..4]);
    let next = u32::from_le_bytes(word).wrapping_add(1);
    iv[..4].copy_from_slice(&next.to_le_bytes());
}

/// The CTR counter block reached after `blocks` AES blocks of keystream.
///
/// Counters are 128-bit big endian, so decrypting a payload from the
/// middle starts at `advance_counter(iv, offset / 16)`.
pub fn advance_counter(iv: &[u8; 16], blocks: u128) -> [u8; 16] {
    u128::from_be_bytes(*iv).wrapping_add(blocks).to_be_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_touches_first_word_only() {
        let mut iv = [0u8; 16];
        iv[4] = 0xAA;
        increment_iv(&mut iv);
        assert_eq!(&iv[..5], &[1, 0, 0, 0, 0xAA]);
    }

    #[test]
    fn increment_wraps() {
        let mut iv = [0xFFu8; 16];
        increment_iv(&mut iv);
        assert_eq!(&iv[..4], &[0, 0, 0, 0]);
        assert_eq!(&iv[4..], &[0xFF; 12]);
    }

    #[test]
    fn counter_carries_big_endian() {
        let mut iv = [0u8; 16];
        iv[15] = 0xFF;
        let next = advance_counter(&iv, 1);
        assert_eq!(next[14], 1);
        assert_eq!(next[15], 0);
        assert_eq!(advance_counter(&[0xFF; 16], 1), [0; 16]);
    }
}
