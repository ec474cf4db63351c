/// Implementation of `bop decompress`.
///
/// Drives the resumable engine over the whole file so that `--coverage`
/// can report which token kinds the stream exercised.
use std::fs;

use anyhow::{Context, Result, bail};
use bop_codec::{ResumableDecompressor, Status};

use crate::DecompressArgs;

const OUTPUT_CHUNK: usize = 64 * 1024;

/// Run the `bop decompress` command.
///
/// # Errors
///
/// Returns an error on I/O failure or if the input is not a valid
/// `CFG_CMP` stream.
pub fn run(args: &DecompressArgs) -> Result<()> {
    let input =
        fs::read(&args.input).with_context(|| format!("cannot read {}", args.input.display()))?;

    let mut engine = ResumableDecompressor::new();
    let mut chunk = vec![0u8; OUTPUT_CHUNK];
    let mut output = Vec::new();
    let mut rest = &input[..];
    loop {
        let progress = engine
            .process(rest, &mut chunk)
            .with_context(|| format!("cannot decompress {}", args.input.display()))?;
        output.extend_from_slice(&chunk[..progress.written]);
        rest = &rest[progress.consumed..];
        match progress.status {
            Status::Done => break,
            Status::Good => {}
            Status::NeedInput => bail!("{} is truncated", args.input.display()),
        }
    }
    if !rest.is_empty() {
        tracing::warn!(extra = rest.len(), "trailing bytes after the compressed stream");
    }

    fs::write(&args.output, &output)
        .with_context(|| format!("cannot write {}", args.output.display()))?;
    println!("{} -> {} bytes written to {}", input.len(), output.len(), args.output.display());
    if args.coverage {
        println!("{}", engine.coverage_info());
    }
    Ok(())
}
