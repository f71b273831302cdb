//! Hot-path benchmarks: value parsing, shard ingestion, and the full
//! pipeline over a generated input file.

use std::hint::black_box;
use std::io::Write;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tallyrust_rs::parse::parse_tenths;
use tallyrust_rs::shard::Shard;
use tallyrust_rs::test_support::generate_measurements;
use tallyrust_rs::{IngestMode, PipelineTuning, Tally};

fn bench_parse(c: &mut Criterion) {
    let values: [&[u8]; 6] = [b"0.0", b"-0.5", b"9.9", b"12.3", b"-99.9", b"123.4"];
    let mut group = c.benchmark_group("parse_tenths");
    group.throughput(Throughput::Elements(values.len() as u64));
    group.bench_function("mixed_widths", |b| {
        b.iter(|| {
            for value in &values {
                black_box(parse_tenths(black_box(value)));
            }
        })
    });
    group.finish();
}

fn bench_shard_scan(c: &mut Criterion) {
    let input = generate_measurements(&["alpha", "beta", "gamma", "delta"], 100_000, 17);
    let body = input.body.as_bytes();
    let mut group = c.benchmark_group("shard_scan");
    group.throughput(Throughput::Bytes(body.len() as u64));
    group.bench_function("consume_lines_100k", |b| {
        b.iter(|| {
            let mut shard = Shard::with_capacity(1 << 10).unwrap();
            shard.consume_lines(black_box(body)).unwrap();
            black_box(shard.len())
        })
    });
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let input = generate_measurements(&["hot", "cold", "warm", "mild"], 200_000, 5);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(input.body.as_bytes()).unwrap();
    file.flush().unwrap();

    let mut group = c.benchmark_group("end_to_end");
    group.sample_size(20);
    group.throughput(Throughput::Bytes(input.body.len() as u64));
    for (label, mode) in [
        ("streaming", IngestMode::Streaming),
        ("partitioned", IngestMode::Partitioned),
    ] {
        group.bench_with_input(BenchmarkId::new("mode", label), &mode, |b, &mode| {
            let tuning = PipelineTuning::default().with_stride(1 << 18).with_mode(mode);
            b.iter(|| {
                let tally = Tally::with_tuning(file.path(), tuning.clone()).unwrap();
                black_box(tally.run().unwrap().len())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_shard_scan, bench_end_to_end);
criterion_main!(benches);
