use bop_analyzer::{AnalyzerOptions, PackageAnalyzer};
use bop_crypto::AesKey;
use bop_tests::{bitstream, cmd, quiet_analyzer, quiet_builder};
use bop_types::Action;
use criterion::{Criterion, criterion_group, criterion_main};

fn package(key: Option<&AesKey>) -> Vec<u8> {
    let mut builder = quiet_builder();
    if let Some(key) = key {
        builder.with_aes_key(key.clone());
    }
    for i in 0..8u16 {
        builder.add_action(Action::new(cmd(0x001 + i)).with_payload(bitstream(32 * 1024)).with_checksum());
    }
    builder.build().unwrap()
}

fn bench_build(c: &mut Criterion) {
    let key = AesKey::new(&[0x3C; 32]).unwrap();
    let mut group = c.benchmark_group("build");

    group.bench_function("plain", |b| b.iter(|| package(None)));
    group.bench_function("encrypted", |b| b.iter(|| package(Some(&key))));

    group.finish();
}

fn bench_analyze(c: &mut Criterion) {
    let key = AesKey::new(&[0x3C; 32]).unwrap();
    let plain = package(None);
    let encrypted = package(Some(&key));
    let mut group = c.benchmark_group("analyze");

    group.bench_function("plain", |b| {
        let analyzer = quiet_analyzer();
        b.iter(|| analyzer.analyze(&plain).unwrap());
    });
    group.bench_function("encrypted", |b| {
        let mut analyzer = quiet_analyzer();
        analyzer.with_aes_key(key.clone());
        b.iter(|| analyzer.analyze(&encrypted).unwrap());
    });
    group.bench_function("hash_walk_only", |b| {
        let mut analyzer = quiet_analyzer();
        analyzer.with_options(AnalyzerOptions { decode_payloads: false, ..AnalyzerOptions::default() });
        b.iter(|| analyzer.analyze(&plain).unwrap());
    });

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let stream = package(None);
    c.bench_function("parse_structure", |b| {
        b.iter(|| PackageAnalyzer::parse(&stream, true, true).unwrap());
    });
}

criterion_group!(benches, bench_build, bench_analyze, bench_parse);
criterion_main!(benches);
