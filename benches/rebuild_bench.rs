// model = "claude-opus-4-5"
// created = "2026-10-18"
// modified = "2026-10-18"
// driver = "Isaac Clayton"

// Rebuild benchmark suite
//
// Compares the three rebuild strategies on the same key sets:
// - Sequential: one thread, recursive flatten and build
// - ForkJoin: scoped threads, one per fork
// - Pool: a fixed rayon pool shared by every fork

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use reforest::{
    BalancedTree, RebuildConfig, Rebuilder, ScapegoatPolicy, WeightBalancePolicy,
    WeightBalancedTree,
};

const SIZES: [u32; 3] = [10_000, 100_000, 1_000_000];

fn shuffled_keys(n: u32, seed: u64) -> Vec<u32> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut keys: Vec<u32> = (0..n).collect();
    keys.shuffle(&mut rng);
    keys
}

fn strategies() -> Vec<(&'static str, RebuildConfig)> {
    vec![
        ("sequential", RebuildConfig::sequential()),
        ("fork_join", RebuildConfig::fork_join()),
        ("pool", RebuildConfig::pool()),
    ]
}

// =============================================================================
// Forced rebuild
// =============================================================================

/// Rebuild the whole tree. A balanced tree still flattens and rebuilds every node.
fn bench_forced_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("forced_rebuild");
    group.sample_size(20);

    for &size in &SIZES {
        let keys = shuffled_keys(size, 42);
        group.throughput(Throughput::Elements(size as u64));

        for (name, config) in strategies() {
            let rebuilder = Rebuilder::new(config).unwrap();
            let mut tree: WeightBalancedTree<u32> =
                BalancedTree::with_rebuilder(WeightBalancePolicy::default(), rebuilder);
            tree.extend(keys.iter().copied());

            group.bench_function(BenchmarkId::new(name, size), |b| {
                b.iter(|| {
                    tree.rebuild();
                    black_box(tree.height())
                });
            });
        }
    }

    group.finish();
}

// =============================================================================
// Insert workloads
// =============================================================================

/// Ascending inserts keep triggering large scapegoat rebuilds.
fn bench_ascending_inserts(c: &mut Criterion) {
    let mut group = c.benchmark_group("ascending_inserts");
    group.sample_size(10);
    let size = 100_000u32;
    group.throughput(Throughput::Elements(size as u64));

    for (name, config) in strategies() {
        let rebuilder = Rebuilder::new(config).unwrap();
        group.bench_with_input(BenchmarkId::new(name, size), &size, |b, &size| {
            b.iter(|| {
                let mut tree =
                    BalancedTree::with_rebuilder(ScapegoatPolicy::default(), rebuilder.clone());
                for key in 0..size {
                    tree.insert(key);
                }
                black_box(tree.len())
            });
        });
    }

    group.finish();
}

fn bench_random_inserts(c: &mut Criterion) {
    let mut group = c.benchmark_group("random_inserts");
    group.sample_size(10);
    let size = 100_000u32;
    let keys = shuffled_keys(size, 7);
    group.throughput(Throughput::Elements(size as u64));

    for (name, config) in strategies() {
        let rebuilder = Rebuilder::new(config).unwrap();
        group.bench_with_input(BenchmarkId::new(name, size), &keys, |b, keys| {
            b.iter(|| {
                let mut tree =
                    BalancedTree::with_rebuilder(WeightBalancePolicy::default(), rebuilder.clone());
                for &key in keys {
                    tree.insert(key);
                }
                black_box(tree.len())
            });
        });
    }

    group.finish();
}

// =============================================================================
// Criterion Configuration
// =============================================================================

criterion_group!(
    benches,
    bench_forced_rebuild,
    bench_ascending_inserts,
    bench_random_inserts,
);

criterion_main!(benches);
