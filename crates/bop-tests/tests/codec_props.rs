//! Codec properties: whole-buffer roundtrip, and the resumable engine
//! reproducing the input under any split of input and output buffers.

use bop_codec::{CodecError, MAGIC, ResumableDecompressor, Status, compress, compress_with, decompress};
use bop_tests::bitstream;
use proptest::prelude::*;

/// Feed `stream` through a fresh engine, cycling through `in_sizes` for
/// the input chunks and using `out_size`-byte output buffers.
fn drive(stream: &[u8], in_sizes: &[usize], out_size: usize) -> Result<Vec<u8>, CodecError> {
    let mut engine = ResumableDecompressor::new();
    let mut buf = vec![0u8; out_size];
    let mut out = Vec::new();
    let mut rest = stream;
    for &size in in_sizes.iter().cycle() {
        assert!(!rest.is_empty(), "engine wants input past the end of the stream");
        let take = size.min(rest.len());
        let mut chunk = &rest[..take];
        rest = &rest[take..];
        loop {
            let progress = engine.process(chunk, &mut buf)?;
            out.extend_from_slice(&buf[..progress.written]);
            chunk = &chunk[progress.consumed..];
            match progress.status {
                Status::Done => return Ok(out),
                Status::NeedInput => break,
                Status::Good => {}
            }
        }
        assert!(chunk.is_empty());
    }
    unreachable!("cycle never ends")
}

/// Inputs with the run and repeat structure the compressor looks for.
fn structured() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(
        prop_oneof![
            (any::<u8>(), 1usize..300).prop_map(|(b, n)| vec![b; n]),
            prop::collection::vec(any::<u8>(), 1..40),
            (1usize..8, 2usize..20).prop_map(|(w, n)| (0..w * n).map(|i| (i % w) as u8).collect()),
        ],
        1..20,
    )
    .prop_map(|parts| parts.concat())
}

#[test]
fn known_vector_roundtrips() {
    let input = [0, 0, 0, 1, 2, 3, 4, 4, 4, 5, 5, 5, 6, 6, 6];
    let packed = compress(&input).unwrap();
    assert_eq!(decompress(&packed).unwrap(), input);
}

#[test]
fn large_bitstream_shrinks() {
    let data = bitstream(256 * 1024);
    let packed = compress(&data).unwrap();
    assert!(packed.len() < data.len(), "{} -> {}", data.len(), packed.len());
    assert_eq!(drive(&packed, &[2048], 2048).unwrap(), data);
}

#[test]
fn reject_empty_input() {
    assert!(matches!(compress(&[]), Err(CodecError::EmptyInput)));
}

proptest! {
    #[test]
    fn roundtrip_any_bytes(data in prop::collection::vec(any::<u8>(), 1..4096)) {
        let packed = compress(&data).unwrap();
        prop_assert_eq!(&packed[..MAGIC.len()], &MAGIC[..]);
        prop_assert_eq!(decompress(&packed).unwrap(), data);
    }

    #[test]
    fn roundtrip_structured(data in structured(), followup in any::<bool>()) {
        let packed = compress_with(&data, followup).unwrap();
        prop_assert_eq!(decompress(&packed).unwrap(), data);
    }

    #[test]
    fn any_chunking_reproduces_input(
        data in structured(),
        in_sizes in prop::collection::vec(1usize..64, 1..8),
        out_size in 1usize..300,
    ) {
        let packed = compress(&data).unwrap();
        prop_assert_eq!(drive(&packed, &in_sizes, out_size).unwrap(), data);
    }

    #[test]
    fn truncation_never_reaches_done(data in structured(), cut in any::<prop::sample::Index>()) {
        let packed = compress(&data).unwrap();
        let cut = cut.index(packed.len());
        let mut engine = ResumableDecompressor::new();
        let mut buf = vec![0u8; data.len() + 16];
        let mut input = &packed[..cut];
        let mut done = false;
        while let Ok(progress) = engine.process(input, &mut buf) {
            input = &input[progress.consumed..];
            match progress.status {
                Status::Done => {
                    done = true;
                    break;
                }
                Status::NeedInput => break,
                Status::Good => {}
            }
        }
        prop_assert!(!done);
    }
}
