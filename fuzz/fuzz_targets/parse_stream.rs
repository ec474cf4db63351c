#![no_main]

use std::sync::Arc;

use bop_analyzer::PackageAnalyzer;
use bop_types::NullDiagnostics;
use libfuzzer_sys::fuzz_target;

// Structural parsing and the full analysis must never panic on hostile
// input, with or without a valid-looking first block.
fuzz_target!(|data: &[u8]| {
    let _ = PackageAnalyzer::parse(data, true, true);
    let _ = PackageAnalyzer::parse(data, false, false);

    let mut analyzer = PackageAnalyzer::new();
    analyzer.set_diagnostics(Arc::new(NullDiagnostics));
    let _ = analyzer.analyze(data);
    let _ = analyzer.parse_bop(data, 0, 0);
});
