//! Snapshot of the analyzer trace for a fixed, unencrypted package.
//!
//! Digests, CRCs and IVs never appear in the trace, so the walk output of an
//! unencrypted package is stable across builds. A changed snapshot is
//! either an intentional format change (accept via `cargo insta review`)
//! or an accidental regression.

use bop_tests::{cmd, quiet_analyzer, quiet_builder};
use bop_types::Action;
use insta::assert_snapshot;

#[test]
fn trace_of_two_uncompressed_actions() {
    let stream = quiet_builder()
        .with_compression(false)
        .add_action(Action::new(cmd(0x001)).with_payload(vec![0x5A; 64]))
        .add_action(
            Action::new(cmd(0x002))
                .with_payload(vec![0x5A; 64])
                .with_checksum()
                .with_original_size(),
        )
        .build()
        .unwrap();

    let report = quiet_analyzer().analyze(&stream).unwrap();
    assert!(report.is_ok(), "{}", report.render());
    assert_snapshot!(report.bops[0].trace.join("\n"), @r"
    Info: chip id 0x00
    Info: header CRC verified
    Header actions
      0x0C8: action 0x001 (checksum: 0, no compression: 0, IV: 0, original size: 0), size 8
      0x0CC:   payload size 64
      0x0D0: action 0x002 (checksum: 1, no compression: 0, IV: 0, original size: 1), size 16
      0x0D4:   payload size 64
      0x0D8:   original size 64
      0x0DC:   checksum 0x59A05B20
      0x0E0: no more actions
    Info: action 0x001 needs 64 payload bytes (1 block(s))
      Hash block at 0x00000800, digest at 0x00000200
      Verify payload block at 0x00001000, digest at 0x00000800
    Info: payload of action 0x001 recovered (64 bytes)
    Info: action 0x002 needs 64 payload bytes (1 block(s))
      Verify payload block at 0x00001800, digest at 0x00000820
    Info: payload of action 0x002 recovered (64 bytes)
    Info: original payload size verified
    Info: payload checksum verified
    ");
}

#[test]
fn header_table_lists_every_field() {
    let stream = quiet_builder().add_action(Action::new(cmd(0x001))).build().unwrap();
    let report = quiet_analyzer().analyze(&stream).unwrap();
    let table = &report.bops[0].header_table;
    assert_eq!(table.len(), bop_types::HEADER_FIELDS.len());
    assert!(table[0].starts_with("0x000  identifier"));
    assert!(table[0].ends_with("\"FSBL\""), "{}", table[0]);
}
