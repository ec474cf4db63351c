#![no_main]

use std::sync::Arc;

use arbitrary::Arbitrary;
use bop_analyzer::PackageAnalyzer;
use bop_builder::PackageBuilder;
use bop_types::{Action, CommandId, NullDiagnostics};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
struct FuzzAction {
    cmd: u16,
    payload: Vec<u8>,
    checksum: bool,
    original_size: bool,
}

// Whatever the builder accepts, the analyzer reads back cleanly with the
// same payloads.
fuzz_target!(|actions: Vec<FuzzAction>| {
    if actions.is_empty() || actions.len() > 64 {
        return;
    }
    let mut builder = PackageBuilder::new();
    builder.set_diagnostics(Arc::new(NullDiagnostics));
    let mut expected = Vec::new();
    for action in &actions {
        let Ok(cmd) = CommandId::new(action.cmd) else { return };
        let mut built = Action::new(cmd);
        let payload = action.payload.as_slice();
        if !payload.is_empty() {
            built = built.with_payload(payload.to_vec());
            if action.checksum {
                built = built.with_checksum();
            }
            if action.original_size {
                built = built.with_original_size();
            }
            expected.push(Some(payload.to_vec()));
        } else {
            expected.push(None);
        }
        builder.add_action(built);
    }
    let Ok(stream) = builder.build() else { return };

    let mut analyzer = PackageAnalyzer::new();
    analyzer.set_diagnostics(Arc::new(NullDiagnostics));
    let report = analyzer.analyze(&stream).unwrap();
    assert!(report.is_ok(), "{}", report.render());
    let got: Vec<Option<Vec<u8>>> =
        report.bops[0].actions.iter().map(|a| a.payload.as_deref().cloned()).collect();
    assert_eq!(got, expected);
});
