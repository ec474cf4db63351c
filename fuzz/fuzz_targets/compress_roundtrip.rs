#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    for followup in [false, true] {
        let packed = bop_codec::compress_with(data, followup).unwrap();
        assert_eq!(bop_codec::decompress(&packed).unwrap(), data);
    }
});
