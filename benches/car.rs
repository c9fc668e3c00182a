//! Micro-operation benchmarks for the CAR engine and façade.
//!
//! Run with: `cargo bench --bench car`
//!
//! Measures per-load latency for hits, misses under eviction pressure, a
//! skewed mixed workload, and read-tier hits from several threads.

use std::hint::black_box;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use carcache::policy::car::{CarCache, CarCore};
use carcache::slot::SlotId;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const CAPACITY: usize = 16_384;
const OPS: u64 = 100_000;

fn filled_cache() -> CarCache<u64, Arc<u64>> {
    let cache = CarCache::builder(CAPACITY)
        .loader(|key: &u64, _slot: SlotId| Arc::new(*key))
        .build();
    for i in 0..CAPACITY as u64 {
        cache.load(&i);
    }
    cache
}

// ============================================================================
// Hit / miss latency (ns/op)
// ============================================================================

fn bench_core(c: &mut Criterion) {
    let mut group = c.benchmark_group("car_core_ns");
    group.throughput(Throughput::Elements(OPS));

    group.bench_function("get_hit", |b| {
        b.iter_custom(|iters| {
            let mut core: CarCore<u64, u64> = CarCore::new(CAPACITY);
            for i in 0..CAPACITY as u64 {
                core.admit(i, |k, _| Some(*k), |_, _, _| {});
            }
            let start = Instant::now();
            for _ in 0..iters {
                for i in 0..OPS {
                    black_box(core.get(&(i % CAPACITY as u64)));
                }
            }
            start.elapsed()
        })
    });

    group.bench_function("admit_evicting", |b| {
        b.iter_custom(|iters| {
            let mut core: CarCore<u64, u64> = CarCore::new(CAPACITY);
            for i in 0..CAPACITY as u64 {
                core.admit(i, |k, _| Some(*k), |_, _, _| {});
            }
            let mut next = CAPACITY as u64;
            let start = Instant::now();
            for _ in 0..iters {
                for _ in 0..OPS {
                    core.admit(next, |k, _| Some(*k), |_, v, _| {
                        black_box(v);
                    });
                    next += 1;
                }
            }
            start.elapsed()
        })
    });

    group.finish();
}

fn bench_cache(c: &mut Criterion) {
    let mut group = c.benchmark_group("car_cache_ns");
    group.throughput(Throughput::Elements(OPS));

    group.bench_function("load_hit", |b| {
        b.iter_custom(|iters| {
            let cache = filled_cache();
            let start = Instant::now();
            for _ in 0..iters {
                for i in 0..OPS {
                    black_box(cache.load(&(i % CAPACITY as u64)));
                }
            }
            start.elapsed()
        })
    });

    group.bench_function("load_skewed_mixed", |b| {
        b.iter_custom(|iters| {
            let cache = filled_cache();
            let mut rng = StdRng::seed_from_u64(42);
            let keys: Vec<u64> = (0..OPS)
                .map(|_| {
                    if rng.gen_bool(0.8) {
                        rng.gen_range(0..CAPACITY as u64 / 2)
                    } else {
                        rng.gen_range(0..CAPACITY as u64 * 8)
                    }
                })
                .collect();
            let start = Instant::now();
            for _ in 0..iters {
                for key in &keys {
                    black_box(cache.load(key));
                }
            }
            start.elapsed()
        })
    });

    group.finish();
}

// ============================================================================
// Read-tier scaling
// ============================================================================

fn bench_parallel_hits(c: &mut Criterion) {
    let mut group = c.benchmark_group("car_parallel_hits");
    group.throughput(Throughput::Elements(OPS));

    for threads in [1usize, 2, 4, 8] {
        group.bench_function(format!("threads_{}", threads), |b| {
            b.iter_custom(|iters| {
                let cache = filled_cache();
                let per_thread = OPS / threads as u64;
                let start = Instant::now();
                let handles: Vec<_> = (0..threads)
                    .map(|t| {
                        let cache = cache.clone();
                        thread::spawn(move || {
                            for _ in 0..iters {
                                for i in 0..per_thread {
                                    let key = (i * 31 + t as u64) % CAPACITY as u64;
                                    black_box(cache.load(&key));
                                }
                            }
                        })
                    })
                    .collect();
                for handle in handles {
                    handle.join().expect("bench thread panicked");
                }
                start.elapsed()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_core, bench_cache, bench_parallel_hits);
criterion_main!(benches);
