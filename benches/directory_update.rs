//! Benchmarks for entry directory updates and free-space reuse

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use xdbf_rs::Container;

fn filled(count: u64, size: usize) -> Container {
    let mut container = Container::new();
    for id in 0..count {
        container.update_entry(1, id, &vec![id as u8; size]).unwrap();
    }
    container
}

fn benchmark_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("directory_insert");

    for count in [100u64, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| black_box(filled(count, 64)));
        });
    }

    group.finish();
}

fn benchmark_update_in_place(c: &mut Criterion) {
    let mut group = c.benchmark_group("directory_update_in_place");

    for count in [100u64, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let mut container = filled(count, 64);
            let payload = vec![0xAB; 64];
            let mut id = 0;
            b.iter(|| {
                container.update_entry(1, black_box(id), &payload).unwrap();
                id = (id + 1) % count;
            });
        });
    }

    group.finish();
}

fn benchmark_resize_churn(c: &mut Criterion) {
    let mut group = c.benchmark_group("directory_resize_churn");

    for count in [100u64, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            b.iter(|| {
                let mut container = filled(count, 64);
                // Alternate shrinking and growing to exercise best-fit reuse
                for id in 0..count {
                    let size = if id % 2 == 0 { 32 } else { 96 };
                    container.update_entry(1, id, &vec![0u8; size]).unwrap();
                }
                black_box(container.directory().free_range_count())
            });
        });
    }

    group.finish();
}

fn benchmark_lookup(c: &mut Criterion) {
    let container = filled(10000, 16);

    c.bench_function("directory_lookup_hit", |b| {
        let mut id = 0u64;
        b.iter(|| {
            black_box(container.data(1, id));
            id = (id + 7) % 10000;
        });
    });

    c.bench_function("directory_lookup_miss", |b| {
        b.iter(|| black_box(container.data(2, black_box(42))));
    });
}

criterion_group!(
    benches,
    benchmark_insert,
    benchmark_update_in_place,
    benchmark_resize_churn,
    benchmark_lookup
);
criterion_main!(benches);
