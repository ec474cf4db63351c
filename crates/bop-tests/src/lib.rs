//! Shared fixtures for the integration tests and benchmarks.

use std::sync::Arc;

use bop_analyzer::PackageAnalyzer;
use bop_builder::PackageBuilder;
use bop_types::{CommandId, NullDiagnostics};

/// A builder that reports nothing.
pub fn quiet_builder() -> PackageBuilder {
    let mut builder = PackageBuilder::new();
    builder.set_diagnostics(Arc::new(NullDiagnostics));
    builder
}

/// An analyzer that reports nothing.
pub fn quiet_analyzer() -> PackageAnalyzer {
    let mut analyzer = PackageAnalyzer::new();
    analyzer.set_diagnostics(Arc::new(NullDiagnostics));
    analyzer
}

/// # Panics
///
/// If `id` is not a valid command id.
pub fn cmd(id: u16) -> CommandId {
    CommandId::new(id).expect("valid command id")
}

/// Deterministic high-entropy bytes (xorshift32).
pub fn noise(len: usize, seed: u32) -> Vec<u8> {
    let mut x = seed | 1;
    (0..len)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 17;
            x ^= x << 5;
            x.to_le_bytes()[0]
        })
        .collect()
}

/// Bitstream-like data: long zero runs, repeated frames, a little noise.
pub fn bitstream(len: usize) -> Vec<u8> {
    let frame: Vec<u8> = (0..=255u8).collect();
    let mut out = Vec::with_capacity(len);
    let mut i = 0u32;
    while out.len() < len {
        match i % 4 {
            0 => out.extend_from_slice(&[0; 300]),
            1 => out.extend_from_slice(&frame),
            2 => out.extend_from_slice(&noise(40, i)),
            _ => out.extend_from_slice(&[0xFF; 96]),
        }
        i += 1;
    }
    out.truncate(len);
    out
}
