//! Build and query benchmarks for the double-array trie, against BTreeSet.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use dat_rs::{BuildConfig, BuildMode, Trie, TrieBuilder};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeSet;

/// Sorted, unique word-like keys with shared prefixes and suffixes.
fn generate_keys(n: usize) -> Vec<String> {
    let stems = ["run", "walk", "talk", "jump", "read", "write", "play", "work"];
    let endings = ["", "s", "ed", "ing", "er", "ers"];
    let mut rng = StdRng::seed_from_u64(42);
    let mut set = BTreeSet::new();
    while set.len() < n {
        let stem = stems[rng.gen_range(0..stems.len())];
        let ending = endings[rng.gen_range(0..endings.len())];
        set.insert(format!("{}{:x}{}", stem, rng.gen_range(0..n as u32), ending));
    }
    set.into_iter().collect()
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    group.sample_size(10);

    for size in [1_000, 10_000, 100_000].iter() {
        let keys = generate_keys(*size);

        group.bench_with_input(BenchmarkId::new("sequential", size), size, |b, _| {
            b.iter(|| black_box(Trie::build(&keys, false).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("sequential+shrink", size), size, |b, _| {
            b.iter(|| black_box(Trie::build(&keys, true).unwrap()));
        });

        group.bench_with_input(BenchmarkId::new("parallel", size), size, |b, _| {
            b.iter(|| {
                let trie = TrieBuilder::new(&keys)
                    .unwrap()
                    .config(BuildConfig::new().mode(BuildMode::parallel()))
                    .build()
                    .unwrap();
                black_box(trie)
            });
        });
    }

    group.finish();
}

fn bench_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("search");

    for size in [1_000, 10_000, 100_000].iter() {
        let keys = generate_keys(*size);
        let trie = Trie::build(&keys, true).unwrap();
        let btree: BTreeSet<&str> = keys.iter().map(String::as_str).collect();

        group.bench_with_input(BenchmarkId::new("BTreeSet", size), size, |b, _| {
            b.iter(|| {
                let mut hits = 0usize;
                for key in keys.iter() {
                    if btree.contains(key.as_str()) {
                        hits += 1;
                    }
                }
                black_box(hits)
            });
        });

        group.bench_with_input(BenchmarkId::new("Trie", size), size, |b, _| {
            b.iter(|| {
                let mut sum = 0u64;
                for key in keys.iter() {
                    if let Some(id) = trie.search(key) {
                        sum += id as u64;
                    }
                }
                black_box(sum)
            });
        });
    }

    group.finish();
}

fn bench_common_prefix(c: &mut Criterion) {
    let mut group = c.benchmark_group("common_prefix");

    for size in [1_000, 10_000, 100_000].iter() {
        let keys = generate_keys(*size);
        let trie = Trie::build(&keys, true).unwrap();
        let queries: Vec<String> = keys.iter().step_by(7).map(|k| format!("{k}suffix")).collect();

        group.bench_with_input(BenchmarkId::new("Trie", size), size, |b, _| {
            b.iter(|| {
                let mut matches = 0usize;
                for q in queries.iter() {
                    matches += trie.common_prefixes(q).count();
                }
                black_box(matches)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_build, bench_search, bench_common_prefix);
criterion_main!(benches);
