use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fixed_pool::pool::{Config as PoolConfig, ThreadPool};
use std::hint::black_box;

// Benchmark 1: Submit overhead (задачи только копятся в очереди)
fn bench_submit_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_overhead");

    for size in [100, 1000, 10000] {
        group.throughput(Throughput::Elements(size as u64));

        group.bench_with_input(BenchmarkId::new("queue_only", size), &size, |b, &size| {
            b.iter(|| {
                let pool = ThreadPool::new(1);
                for i in 0..size {
                    black_box(pool.submit(move || black_box(i)));
                }
                black_box(pool.queue_size())
            });
        });
    }

    group.finish();
}

// Benchmark 2: Submit + get через работающий пул
fn bench_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("round_trip");

    for (name, config) in [
        ("cpu_bound", PoolConfig::cpu_bound()),
        ("io_bound", PoolConfig::io_bound()),
    ] {
        let pool = ThreadPool::with_config(config);
        pool.init(false).expect("pool init");

        for size in [100, 1000] {
            group.throughput(Throughput::Elements(size as u64));
            group.bench_with_input(BenchmarkId::new(name, size), &size, |b, &size| {
                b.iter(|| {
                    let handles: Vec<_> = (0..size)
                        .map(|i| pool.submit(move || black_box(i * 2)))
                        .collect();
                    for handle in handles {
                        black_box(handle.get().unwrap());
                    }
                });
            });
        }

        pool.shutdown();
    }

    group.finish();
}

// Benchmark 3: CPU-bound вычисления
fn bench_compute(c: &mut Criterion) {
    let mut group = c.benchmark_group("compute");
    let pool = ThreadPool::with_config(PoolConfig::cpu_bound());
    pool.init(false).expect("pool init");

    group.bench_function("sum_of_squares_x64", |b| {
        b.iter(|| {
            let handles: Vec<_> = (0..64u64)
                .map(|n| pool.submit(move || (0..10_000u64).map(|x| x * x % (n + 1)).sum::<u64>()))
                .collect();
            handles
                .into_iter()
                .map(|h| h.get().unwrap())
                .fold(0u64, u64::wrapping_add)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_submit_overhead, bench_round_trip, bench_compute);
criterion_main!(benches);
