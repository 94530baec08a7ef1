//! Benchmarks for identifier hashing.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use ember_core::hash::fnv1a_64_str;

fn bench_fnv1a(c: &mut Criterion) {
    let mut group = c.benchmark_group("fnv1a_64");

    for len in [8usize, 32, 128] {
        let name: String = "a".repeat(len);
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_with_input(BenchmarkId::from_parameter(len), &name, |b, name| {
            b.iter(|| fnv1a_64_str(black_box(name)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fnv1a);
criterion_main!(benches);
