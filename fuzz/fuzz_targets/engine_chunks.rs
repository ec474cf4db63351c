#![no_main]

use arbitrary::Arbitrary;
use bop_codec::{ResumableDecompressor, Status};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct Input {
    data: Vec<u8>,
    in_size: u8,
    out_size: u8,
}

// The resumable engine fed in small pieces produces exactly what the
// whole-buffer compressor took in.
fuzz_target!(|input: Input| {
    if input.data.is_empty() {
        return;
    }
    let packed = bop_codec::compress(&input.data).unwrap();
    let in_size = usize::from(input.in_size.max(1));
    let mut buf = vec![0u8; usize::from(input.out_size.max(1))];

    let mut engine = ResumableDecompressor::new();
    let mut out = Vec::new();
    let mut rest = packed.as_slice();
    loop {
        let take = in_size.min(rest.len());
        let progress = engine.process(&rest[..take], &mut buf).unwrap();
        out.extend_from_slice(&buf[..progress.written]);
        rest = &rest[progress.consumed..];
        if progress.status == Status::Done {
            break;
        }
        assert!(!(progress.status == Status::NeedInput && rest.is_empty()), "stream ended early");
    }
    assert_eq!(out, input.data);
});
