#![no_main]

use libfuzzer_sys::fuzz_target;

// Arbitrary bytes, with or without a valid stream header, must decode or
// fail cleanly.
fuzz_target!(|data: &[u8]| {
    let _ = bop_codec::decompress(data);

    let mut framed = bop_codec::MAGIC.to_vec();
    framed.extend_from_slice(data);
    let _ = bop_codec::decompress(&framed);
});
