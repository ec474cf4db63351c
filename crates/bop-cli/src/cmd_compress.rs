/// Implementation of `bop compress`.
use std::fs;

use anyhow::{Context, Result};

use crate::CompressArgs;

/// Run the `bop compress` command.
///
/// # Errors
///
/// Returns an error on I/O failure or for an empty input file.
pub fn run(args: &CompressArgs) -> Result<()> {
    let input =
        fs::read(&args.input).with_context(|| format!("cannot read {}", args.input.display()))?;
    let output = bop_codec::compress(&input)
        .with_context(|| format!("cannot compress {}", args.input.display()))?;
    fs::write(&args.output, &output)
        .with_context(|| format!("cannot write {}", args.output.display()))?;

    #[allow(clippy::cast_precision_loss)]
    let ratio = output.len() as f64 / input.len() as f64;
    println!(
        "{} -> {} bytes ({:.1}%) written to {}",
        input.len(),
        output.len(),
        ratio * 100.0,
        args.output.display()
    );
    Ok(())
}
