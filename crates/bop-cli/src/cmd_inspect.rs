/// Implementation of `bop inspect`.
///
/// Runs the full analyzer over a `.cfgbit` file and prints, for every BOP,
/// the header table followed by the walk trace. A closing line counts the
/// findings. Errors inside a BOP are part of the output, not a command
/// failure; only a stream that cannot be split into BOPs fails.
///
/// # Output format
///
/// ```text
/// BOP count: 1
/// BOP #0 at 0x00000000 (6144 bytes)
///   Header
///     0x000  identifier      FSBL
///     ...
///   Info: chip id 0x00
///   Info: header CRC verified
///   Header actions
///     0x0C8: action 0x001 (checksum: 1, no compression: 0, IV: 0, original size: 0), size 12
///   ...
/// ---
/// 0 error(s), 1 warning(s)
/// ```
use std::fs;

use anyhow::{Context, Result};
use bop_analyzer::{AnalyzerOptions, PackageAnalyzer};
use bop_types::Severity;

use crate::InspectArgs;
use crate::keys::load_optional_aes_key;

const PAYLOAD_PREVIEW: usize = 64;

/// Run the `bop inspect` command.
///
/// # Errors
///
/// Returns an error if the file or key cannot be read, or if the stream
/// fails the structural pass.
pub fn run(args: &InspectArgs) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;

    let options = AnalyzerOptions {
        aes_key: load_optional_aes_key(args.aes_key.as_deref())?,
        decode_payloads: !args.no_payloads,
        ..AnalyzerOptions::default()
    };
    let mut analyzer = PackageAnalyzer::new();
    analyzer.with_options(options);
    let report = analyzer
        .analyze(&bytes)
        .with_context(|| format!("failed to parse {}", args.file.display()))?;

    println!("BOP count: {}", report.bops.len());
    for bop in &report.bops {
        // When --bop N is specified, skip all other indices.
        if let Some(target) = args.bop
            && bop.index != target
        {
            continue;
        }
        print!("{}", bop.render());
        if args.show_payload {
            for action in &bop.actions {
                if let Some(payload) = &action.payload {
                    println!("  Payload of action 0x{:03X} ({} bytes):", action.cmd, payload.len());
                    hex_dump(&payload[..payload.len().min(PAYLOAD_PREVIEW)]);
                }
            }
        }
    }

    let errors = report.findings().filter(|(_, f)| f.severity >= Severity::Error).count();
    let warnings = report.findings().filter(|(_, f)| f.severity == Severity::Warning).count();
    println!("---");
    println!("{errors} error(s), {warnings} warning(s)");
    Ok(())
}

fn hex_dump(bytes: &[u8]) {
    for (i, chunk) in bytes.chunks(16).enumerate() {
        let ascii: String = chunk
            .iter()
            .map(|&b| if b.is_ascii_graphic() { b as char } else { '.' })
            .collect();
        println!("    {:04x}  {:<32}  {ascii}", i * 16, hex::encode(chunk));
    }
}
