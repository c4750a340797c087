use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fluxgate::{
    FrequencyEstimator, HeavyHitterTracker, PerKeyLimiter, Policy, RateLimitOrchestrator,
    RequestKey,
};
use std::sync::Arc;
use std::time::Duration;

fn lookup(limit: f64, burst: f64) -> impl Fn(u64) -> Option<Policy> + Send + Sync + 'static {
    let policy = Policy::new("bench", limit, burst, 60).unwrap();
    move |_key| Some(policy.clone())
}

/// Benchmark request key hashing
fn bench_key_computation(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_computation");

    group.bench_function("ip_and_route", |b| {
        let builder = RequestKey::builder().ip("192.168.1.1").route("/api/v1/users");
        b.iter(|| black_box(&builder).build(black_box("secret")))
    });

    group.bench_function("many_headers", |b| {
        let builder = (0..10).fold(RequestKey::builder().ip("10.0.0.1"), |builder, i| {
            builder.header(&format!("x-header-{}", i), format!("value{}", i))
        });
        b.iter(|| black_box(&builder).build(black_box("secret")))
    });

    group.finish();
}

/// Benchmark the lock-free GCRA decision alone
fn bench_gcra(c: &mut Criterion) {
    let mut group = c.benchmark_group("gcra");
    group.throughput(Throughput::Elements(1000));

    group.bench_function("allowing", |b| {
        let limiter = PerKeyLimiter::per_second(1e9, 1e9);
        let mut now = 0i64;
        b.iter(|| {
            for _ in 0..1000 {
                now += 1;
                black_box(limiter.try_acquire(black_box(now)));
            }
        })
    });

    group.bench_function("blocking", |b| {
        let limiter = PerKeyLimiter::per_second(1.0, 1.0);
        limiter.try_acquire(0);
        b.iter(|| {
            for _ in 0..1000 {
                black_box(limiter.try_acquire(black_box(0)));
            }
        })
    });

    group.finish();
}

/// Benchmark Tier B structures
fn bench_tier_b(c: &mut Criterion) {
    let mut group = c.benchmark_group("tier_b");
    group.throughput(Throughput::Elements(1000));

    group.bench_function("sketch_increment", |b| {
        let sketch = FrequencyEstimator::new(4, 65_536, Duration::from_secs(10)).unwrap();
        b.iter(|| {
            for key in 0..1000u64 {
                sketch.increment(black_box(key), 0);
            }
        })
    });

    group.bench_function("heavy_hitter_offer", |b| {
        let tracker = HeavyHitterTracker::new(1024, 0.9).unwrap();
        b.iter(|| {
            for key in 0..1000u64 {
                tracker.offer(black_box(key % 64));
            }
        })
    });

    group.finish();
}

/// Benchmark full checks with different key diversity
fn bench_key_diversity(c: &mut Criterion) {
    let mut group = c.benchmark_group("key_diversity");
    group.throughput(Throughput::Elements(1000));

    for num_keys in [1u64, 10, 1000, 100_000] {
        group.bench_with_input(BenchmarkId::new("keys", num_keys), &num_keys, |b, &num_keys| {
            let orchestrator = RateLimitOrchestrator::builder()
                .with_shard_capacity(10_000)
                .build()
                .unwrap();
            let lookup = lookup(1_000.0, 100.0);
            let mut i = 0u64;
            b.iter(|| {
                for _ in 0..1000 {
                    i = i.wrapping_add(1);
                    black_box(orchestrator.check(black_box(i % num_keys), &lookup, i as i64));
                }
            })
        });
    }

    group.finish();
}

/// Benchmark multi-threaded concurrent throughput
fn bench_concurrent_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent");

    for num_threads in [2u64, 4, 8] {
        group.throughput(Throughput::Elements(num_threads * 1000));

        group.bench_with_input(
            BenchmarkId::new("threads", num_threads),
            &num_threads,
            |b, &num_threads| {
                let orchestrator = Arc::new(RateLimitOrchestrator::builder().build().unwrap());
                b.iter(|| {
                    let handles: Vec<_> = (0..num_threads)
                        .map(|t| {
                            let orchestrator = Arc::clone(&orchestrator);
                            std::thread::spawn(move || {
                                let lookup = lookup(1e6, 1e6);
                                for i in 0..1000u64 {
                                    // Half the traffic on one shared key, the rest per thread
                                    let key = if i % 2 == 0 { 0 } else { t + 1 };
                                    black_box(orchestrator.check(key, &lookup, i as i64));
                                }
                            })
                        })
                        .collect();

                    for handle in handles {
                        handle.join().unwrap();
                    }
                })
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_key_computation,
    bench_gcra,
    bench_tier_b,
    bench_key_diversity,
    bench_concurrent_throughput,
);
criterion_main!(benches);
