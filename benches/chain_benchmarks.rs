use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use forgetful_bloom_rs::WindowChain;
use rand::Rng;
use std::hint::black_box;

// Helper to create random keys
fn generate_keys(count: usize) -> Vec<u64> {
    let mut rng = rand::rng();
    (0..count).map(|_| rng.random::<u64>()).collect()
}

// Helper to create a chain with `fill` keys inserted
fn create_chain(window_count: usize, fill: &[u64]) -> WindowChain {
    let mut chain = WindowChain::new(window_count, 1 << 16, 3)
        .expect("Failed to create window chain");
    for &key in fill {
        chain.insert(key);
    }
    chain
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_operations");
    let keys = generate_keys(1_000);

    for window_count in [3, 8, 32] {
        group.bench_with_input(
            BenchmarkId::new("insert", window_count),
            &window_count,
            |b, &window_count| {
                b.iter_batched(
                    || create_chain(window_count, &[]),
                    |mut chain| {
                        for &key in &keys {
                            chain.insert(black_box(key));
                        }
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }

    group.finish();
}

fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_operations");
    let inserted = generate_keys(5_000);
    let queries = generate_keys(1_000);

    for window_count in [3, 8, 32] {
        let chain = create_chain(window_count, &inserted);

        group.bench_with_input(
            BenchmarkId::new("contains_any", window_count),
            &chain,
            |b, chain| {
                b.iter(|| {
                    for &key in &queries {
                        black_box(chain.contains_any(key));
                    }
                });
            },
        );

        group.bench_with_input(
            BenchmarkId::new("contains_correlated", window_count),
            &chain,
            |b, chain| {
                b.iter(|| {
                    for &key in &queries {
                        black_box(chain.contains_correlated(key));
                    }
                });
            },
        );
    }

    group.finish();
}

fn bench_maintenance(c: &mut Criterion) {
    let mut group = c.benchmark_group("maintenance_operations");
    let inserted = generate_keys(5_000);

    for window_count in [3, 8, 32] {
        group.bench_with_input(
            BenchmarkId::new("refresh", window_count),
            &window_count,
            |b, &window_count| {
                b.iter_batched(
                    || create_chain(window_count, &inserted),
                    |mut chain| chain.refresh(),
                    criterion::BatchSize::SmallInput,
                );
            },
        );

        let chain = create_chain(window_count, &inserted);
        group.bench_with_input(
            BenchmarkId::new("effective_fpr", window_count),
            &chain,
            |b, chain| b.iter(|| black_box(chain.effective_fpr())),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_insert, bench_query, bench_maintenance);
criterion_main!(benches);
