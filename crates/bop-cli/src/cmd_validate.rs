/// Implementation of `bop validate`.
///
/// Checks a `.cfgbit` file and prints either success checkmarks (`✓`) or
/// one failure line (`✗`) per error finding. The command exits with code 0
/// only if every BOP passes every check.
///
/// # Success output
///
/// ```text
/// ✓ Structure: 2 BOPs, end sizes and CRCs consistent
/// ✓ BOP #0 FSBL: 3 actions, all checks passed
/// ✓ BOP #1 UBOT: 1 action, all checks passed
/// ```
///
/// # Failure output
///
/// ```text
/// ✓ Structure: 1 BOP, end sizes and CRCs consistent
/// ✗ BOP #0 FSBL: error [integrity] @0x1800: hash mismatch for block at 0x00001800
/// ```
///
/// Warnings (for example a missing AES key) are printed with `!` and do not
/// fail validation.
use std::fs;

use anyhow::{Context, Result, anyhow};
use bop_analyzer::{AnalyzerOptions, PackageAnalyzer};
use bop_types::Severity;

use crate::ValidateArgs;
use crate::keys::load_optional_aes_key;

/// Run the `bop validate` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or any check fails.
pub fn run(args: &ValidateArgs) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;

    let sizes = match PackageAnalyzer::parse(&bytes, true, true) {
        Ok(sizes) => sizes,
        Err(e) => {
            println!("✗ Structure: {e}");
            return Err(anyhow!("validation failed"));
        }
    };
    println!(
        "✓ Structure: {} BOP{}, end sizes and CRCs consistent",
        sizes.len(),
        plural(sizes.len())
    );
    if args.structure_only {
        return Ok(());
    }

    let mut analyzer = PackageAnalyzer::new();
    analyzer.with_options(AnalyzerOptions {
        aes_key: load_optional_aes_key(args.aes_key.as_deref())?,
        ..AnalyzerOptions::default()
    });
    let report = analyzer.analyze(&bytes)?;

    for bop in &report.bops {
        let label = format!("BOP #{} {}", bop.index, bop.header.identifier);
        for finding in bop.findings.iter().filter(|f| f.severity == Severity::Warning) {
            println!("! {label}: {finding}");
        }
        if bop.is_ok() {
            println!(
                "✓ {label}: {} action{}, all checks passed",
                bop.actions.len(),
                plural(bop.actions.len())
            );
        } else {
            for finding in bop.errors() {
                println!("✗ {label}: {finding}");
            }
        }
    }

    if report.is_ok() {
        Ok(())
    } else {
        Err(anyhow!("validation failed"))
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}
