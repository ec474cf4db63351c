#![no_main]

use libfuzzer_sys::fuzz_target;

// Encode a u64 as a varint, decode it back and compare. Decoding the raw
// input must never panic either.
fuzz_target!(|data: &[u8]| {
    let _ = bop_wire::varint::decode_varint(data);

    if data.len() < 8 {
        return;
    }
    let value = u64::from_le_bytes(data[..8].try_into().unwrap());

    let mut buf = [0u8; bop_wire::varint::MAX_VARINT_BYTES];
    let encoded_len = bop_wire::varint::encode_varint(value, &mut buf);

    let (decoded, decoded_len) = bop_wire::varint::decode_varint(&buf[..encoded_len]).unwrap();
    assert_eq!(decoded, value);
    assert_eq!(decoded_len, encoded_len);
});
