//! Merge benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use shelfsync_bench::library_state;
use shelfsync_protocol::{merge, DeviceId};

/// Benchmark merging two overlapping libraries.
fn bench_merge_overlapping(c: &mut Criterion) {
    let mut group = c.benchmark_group("merge_overlapping");
    let local_id = DeviceId::parse("local").unwrap();
    let remote_id = DeviceId::parse("remote").unwrap();

    for books in [10, 100, 1000] {
        let local = library_state(books, 0);
        let remote = library_state(books, 1);
        group.bench_with_input(BenchmarkId::from_parameter(books), &books, |b, _| {
            b.iter(|| black_box(merge(black_box(&local), black_box(&remote), &local_id, &remote_id)));
        });
    }

    group.finish();
}

/// Benchmark the steady state: merging an identical snapshot.
fn bench_merge_identical(c: &mut Criterion) {
    let local_id = DeviceId::parse("local").unwrap();
    let remote_id = DeviceId::parse("remote").unwrap();
    let state = library_state(1000, 0);

    c.bench_function("merge_identical_1000", |b| {
        b.iter(|| black_box(merge(black_box(&state), black_box(&state), &local_id, &remote_id)));
    });
}

/// Benchmark the self-echo short-circuit.
fn bench_self_echo(c: &mut Criterion) {
    let device = DeviceId::parse("local").unwrap();
    let local = library_state(1000, 0);
    let remote = library_state(1000, 1);

    c.bench_function("merge_self_echo_1000", |b| {
        b.iter(|| black_box(merge(black_box(&local), black_box(&remote), &device, &device)));
    });
}

criterion_group!(
    benches,
    bench_merge_overlapping,
    bench_merge_identical,
    bench_self_echo,
);

criterion_main!(benches);
