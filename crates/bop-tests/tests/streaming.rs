//! Async decompression of files on disk through `StreamingDecompressor`.

use std::path::PathBuf;

use bop_codec::{CodecError, StreamingDecompressor, compress};
use bop_tests::{bitstream, noise};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("bop-tests-{}-{name}", std::process::id()))
}

#[tokio::test]
async fn file_stream_matches_source() {
    let data = bitstream(300_000);
    let path = temp_path("bitstream.cmp");
    tokio::fs::write(&path, compress(&data).unwrap()).await.unwrap();

    let file = tokio::fs::File::open(&path).await.unwrap();
    let mut stream = StreamingDecompressor::with_sizes(file, 1000, 777);
    let mut out = Vec::new();
    let mut chunks = 0;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.unwrap();
        assert!(chunk.len() <= 777);
        out.extend_from_slice(&chunk);
        chunks += 1;
    }
    tokio::fs::remove_file(&path).await.unwrap();

    assert_eq!(out, data);
    assert!(chunks >= data.len() / 777);
    let coverage = stream.engine().coverage_info();
    assert!(!coverage.is_empty());
}

#[tokio::test]
async fn trailing_bytes_stay_unread() {
    let data = noise(5_000, 9);
    let mut file_bytes = compress(&data).unwrap();
    file_bytes.extend_from_slice(b"trailer");
    let path = temp_path("trailer.cmp");
    tokio::fs::write(&path, &file_bytes).await.unwrap();

    let file = tokio::fs::File::open(&path).await.unwrap();
    let out = StreamingDecompressor::new(file).read_to_end().await.unwrap();
    tokio::fs::remove_file(&path).await.unwrap();
    assert_eq!(out, data);
}

#[tokio::test]
async fn reject_truncated_file() {
    let packed = compress(&bitstream(20_000)).unwrap();
    let path = temp_path("truncated.cmp");
    tokio::fs::write(&path, &packed[..packed.len() / 2]).await.unwrap();

    let file = tokio::fs::File::open(&path).await.unwrap();
    let result = StreamingDecompressor::new(file).read_to_end().await;
    tokio::fs::remove_file(&path).await.unwrap();
    assert!(matches!(result, Err(CodecError::UnexpectedEndOfStream)), "{result:?}");
}
