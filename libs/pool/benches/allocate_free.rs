//! Hot path benchmarks for pool allocate/free
//!
//! Verifies the per-message cost stays flat regardless of pool size.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use pool::PoolAllocator;

fn bench_allocate_free(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate_free");

    for &capacity in &[64usize, 4096, 65_536] {
        let mut allocator = PoolAllocator::create_pools(1);
        allocator.add_pool(capacity, 256).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(capacity), &capacity, |b, _| {
            b.iter(|| {
                let handle = allocator.allocate(criterion::black_box(200), 1, 0).unwrap();
                allocator.free(criterion::black_box(handle), 1).unwrap();
            })
        });
    }

    group.finish();
}

fn bench_best_fit(c: &mut Criterion) {
    let mut allocator = PoolAllocator::create_pools(8);
    for shift in 5..13 {
        allocator.add_pool(1024, 1 << shift).unwrap();
    }

    c.bench_function("best_fit_8_classes", |b| {
        b.iter(|| {
            let handle = allocator.allocate(criterion::black_box(3000), 1, 0).unwrap();
            allocator.free(handle, 1).unwrap();
        })
    });
}

fn bench_write_payload(c: &mut Criterion) {
    let mut allocator = PoolAllocator::create_pools(1);
    allocator.add_pool(16, 1024).unwrap();
    let payload = [0xABu8; 512];

    c.bench_function("write_512_bytes", |b| {
        b.iter(|| {
            let handle = allocator.allocate(512, 1, 0).unwrap();
            allocator.write(handle, 0, criterion::black_box(&payload)).unwrap();
            allocator.free(handle, 1).unwrap();
        })
    });
}

criterion_group!(benches, bench_allocate_free, bench_best_fit, bench_write_payload);
criterion_main!(benches);
