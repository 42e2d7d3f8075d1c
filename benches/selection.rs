//! Benchmarks for the CPU-only part of a selection cycle
//!
//! This benchmark measures:
//! - Node list parsing
//! - Scoring and freshness ordering
//! - The final decision

use cfbalance::protocol::parse_records;
use cfbalance::{PoolSnapshot, ScoringPolicy};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

fn node_list(nodes: usize) -> String {
    let mut raw = String::new();
    for i in 0..nodes {
        let cpu = (i * 37 % 100) as f64 + 0.25;
        let net = (i * 53 % 100) as f64 + 0.5;
        let age = i % 7;
        if i == nodes / 2 {
            raw.push_str(&format!("{},{}.download.example.org,{},{},*\r\n", age, i, cpu, net));
        } else {
            raw.push_str(&format!("{},{}.download.example.org,{},{}\r\n", age, i, cpu, net));
        }
    }
    raw
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    for nodes in [8usize, 64, 512] {
        let raw = node_list(nodes);
        group.throughput(Throughput::Bytes(raw.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(nodes), &raw, |b, raw| {
            b.iter(|| parse_records(black_box(raw.as_bytes())).unwrap())
        });
    }
    group.finish();
}

fn bench_score_and_decide(c: &mut Criterion) {
    let policy = ScoringPolicy::default();
    let mut group = c.benchmark_group("score_and_decide");
    for nodes in [8usize, 64, 512] {
        let records = parse_records(node_list(nodes).as_bytes()).unwrap();
        group.throughput(Throughput::Elements(nodes as u64));
        group.bench_with_input(BenchmarkId::from_parameter(nodes), &records, |b, records| {
            b.iter(|| {
                let snapshot = PoolSnapshot::from_records(black_box(records.clone()), &policy);
                snapshot.decide(&policy).unwrap()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_parse, bench_score_and_decide);
criterion_main!(benches);
