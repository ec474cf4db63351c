//! Single-byte corruption is always caught.
//!
//! Bytes after the header are covered by the hash chain, so a flip there
//! must produce an integrity error for exactly the block that holds it.
//! Header bytes are not hashed; a flip there must break the header CRC.

use std::sync::OnceLock;

use bop_analyzer::{AnalyzeError, PackageAnalyzer};
use bop_crypto::AesKey;
use bop_tests::{bitstream, cmd, noise, quiet_analyzer, quiet_builder};
use bop_types::{Action, ErrorClass};
use bop_wire::BLOCK_SIZE;
use bop_wire::layout::{CRC, SIZE};
use proptest::prelude::*;

fn package() -> &'static [u8] {
    static PACKAGE: OnceLock<Vec<u8>> = OnceLock::new();
    PACKAGE.get_or_init(|| {
        let mut builder = quiet_builder();
        builder.with_aes_key(AesKey::new(&[0x11; 16]).unwrap());
        for i in 0..6u16 {
            builder.add_action(
                Action::new(cmd(0x001 + i))
                    .with_payload(if i % 2 == 0 { bitstream(9_000) } else { noise(5_000, u32::from(i)) })
                    .with_checksum(),
            );
        }
        builder.build().unwrap()
    })
}

fn analyzer() -> PackageAnalyzer {
    let mut analyzer = quiet_analyzer();
    analyzer.with_aes_key(AesKey::new(&[0x11; 16]).unwrap());
    analyzer
}

#[test]
fn untouched_package_is_clean() {
    let report = analyzer().analyze(package()).unwrap();
    assert!(report.is_ok(), "{}", report.render());
    assert_eq!(report.findings().count(), 0);
}

#[test]
fn reject_flipped_size_field_structurally() {
    let mut stream = package().to_vec();
    stream[SIZE + 1] ^= 0x01;
    assert!(matches!(
        PackageAnalyzer::parse(&stream, false, false),
        Err(AnalyzeError::InvalidBopSize { .. })
    ));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn body_flip_is_an_integrity_error_for_its_block(pos in any::<usize>(), mask in 1u8..=255) {
        let mut stream = package().to_vec();
        let pos = BLOCK_SIZE + pos % (stream.len() - BLOCK_SIZE);
        stream[pos] ^= mask;
        let block = pos - pos % BLOCK_SIZE;

        let report = analyzer().analyze(&stream).unwrap();
        let bop = &report.bops[0];
        prop_assert!(!bop.status.integrity);
        prop_assert!(
            bop.errors().any(|f| f.class == ErrorClass::Integrity && f.offset == Some(block)),
            "{}",
            bop.render()
        );
    }

    #[test]
    fn header_flip_breaks_the_crc(pos in 0..CRC, mask in 1u8..=255) {
        prop_assume!(!(SIZE..SIZE + 8).contains(&pos));
        let mut stream = package().to_vec();
        stream[pos] ^= mask;

        let bop = analyzer().parse_bop(&stream, 0, 0).unwrap();
        prop_assert!(bop.errors().any(|f| f.class == ErrorClass::Integrity && f.offset == Some(CRC)));
    }
}
