/// Implementation of `bop combine`.
///
/// Each input must validate on its own. The inputs are concatenated in
/// order and every end-size field and last-BOP flag is rewritten, along
/// with the header CRCs, so the output validates as one stream.
use std::fs;

use anyhow::{Context, Result};
use bop_analyzer::PackageAnalyzer;

use crate::CombineArgs;

/// Run the `bop combine` command.
///
/// # Errors
///
/// Returns an error if an input cannot be read or does not validate.
pub fn run(args: &CombineArgs) -> Result<()> {
    let inputs = args
        .inputs
        .iter()
        .map(|path| fs::read(path).with_context(|| format!("cannot read {}", path.display())))
        .collect::<Result<Vec<_>>>()?;
    let slices: Vec<&[u8]> = inputs.iter().map(Vec::as_slice).collect();

    let combined = PackageAnalyzer::combine(&slices).context("cannot combine packages")?;
    let count = PackageAnalyzer::parse(&combined, true, true)?.len();

    fs::write(&args.output, &combined)
        .with_context(|| format!("cannot write {}", args.output.display()))?;
    println!("Wrote {} bytes ({count} BOPs) to {}", combined.len(), args.output.display());
    Ok(())
}
