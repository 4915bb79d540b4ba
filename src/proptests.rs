use super::*;

use proptest::prelude::*;
use std::collections::BTreeSet;
use std::num::NonZeroUsize;

/// Every structural invariant a built trie must satisfy for `keys`.
fn validate_trie(trie: &Trie, keys: &[String]) {
    assert_eq!(trie.key_count() as usize, keys.len(), "key count");

    let mut ids: Vec<u32> = keys
        .iter()
        .map(|k| {
            trie.search(k)
                .unwrap_or_else(|| panic!("stored key {k:?} not found"))
        })
        .collect();
    ids.sort_unstable();
    let expected: Vec<u32> = (0..keys.len() as u32).collect();
    assert_eq!(ids, expected, "ids must be exactly 0..n");
}

/// Prefixes of `query` that are keys, shortest first, computed by brute force.
fn naive_prefixes<'q>(set: &BTreeSet<String>, query: &'q str) -> Vec<&'q str> {
    let mut ends: Vec<usize> = query.char_indices().map(|(i, _)| i).collect();
    ends.push(query.len());
    ends.into_iter()
        .map(|e| &query[..e])
        .filter(|p| set.contains(*p))
        .collect()
}

fn key_set(pattern: &'static str, max: usize) -> impl Strategy<Value = BTreeSet<String>> {
    proptest::collection::btree_set(pattern, 0..max)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn prop_ids_dense_and_distinct(set in key_set("[a-d]{0,6}", 60)) {
        let keys: Vec<String> = set.into_iter().collect();
        let trie = Trie::build(&keys, false).unwrap();
        validate_trie(&trie, &keys);
    }

    #[test]
    fn prop_absent_keys_not_found(
        set in key_set("[a-c]{0,5}", 40),
        probes in proptest::collection::vec("[a-d]{0,6}", 0..40),
    ) {
        let keys: Vec<String> = set.iter().cloned().collect();
        let trie = Trie::build(&keys, false).unwrap();
        for p in &probes {
            prop_assert_eq!(trie.search(p).is_some(), set.contains(p), "probe {:?}", p);
        }
    }

    #[test]
    fn prop_shrink_preserves_answers(
        set in key_set("[a-c]{0,4}(ing|ed|s)?", 50),
        probes in proptest::collection::vec("[a-c]{0,4}(ing|ed|s)?x?", 0..30),
    ) {
        let keys: Vec<String> = set.iter().cloned().collect();
        let plain = Trie::build(&keys, false).unwrap();
        let shrunk = Trie::build(&keys, true).unwrap();
        prop_assert!(shrunk.tail_len() <= plain.tail_len());
        prop_assert_eq!(shrunk.node_count(), plain.node_count());
        for k in keys.iter().chain(probes.iter()) {
            prop_assert_eq!(shrunk.search(k), plain.search(k));
            let a: Vec<_> = plain.common_prefixes(k).collect();
            let b: Vec<_> = shrunk.common_prefixes(k).collect();
            prop_assert_eq!(a, b);
        }
    }

    #[test]
    fn prop_common_prefix_matches_naive(
        set in key_set("[ab]{0,5}", 30),
        query in "[ab]{0,8}",
    ) {
        let keys: Vec<String> = set.iter().cloned().collect();
        let trie = Trie::build(&keys, false).unwrap();
        let got: Vec<(&str, u32)> = trie.common_prefixes(&query).collect();
        let expected = naive_prefixes(&set, &query);
        let got_prefixes: Vec<&str> = got.iter().map(|(p, _)| *p).collect();
        prop_assert_eq!(got_prefixes, expected);
        for (p, id) in got {
            prop_assert_eq!(trie.search(p), Some(id));
        }
    }

    #[test]
    fn prop_multi_plane_keys(
        set in key_set("[aé日😀😁]{0,4}", 40),
        query in "[aé日😀😁]{0,6}",
    ) {
        let keys: Vec<String> = set.iter().cloned().collect();
        let trie = Trie::build(&keys, true).unwrap();
        validate_trie(&trie, &keys);
        let got: Vec<&str> = trie.common_prefixes(&query).map(|(p, _)| p).collect();
        prop_assert_eq!(got, naive_prefixes(&set, &query));
    }

    #[test]
    fn prop_round_trip(set in key_set("[a-e]{0,5}", 40), probe in "[a-f]{0,5}") {
        let keys: Vec<String> = set.iter().cloned().collect();
        let trie = Trie::build(&keys, true).unwrap();
        let back = Trie::from_bytes(&trie.to_bytes().unwrap()).unwrap();
        for k in keys.iter().chain(std::iter::once(&probe)) {
            prop_assert_eq!(back.search(k), trie.search(k));
        }
        prop_assert_eq!(back.key_count(), trie.key_count());
    }

    #[test]
    fn prop_sequential_deterministic(set in key_set("[a-d]{0,6}", 60)) {
        let keys: Vec<String> = set.into_iter().collect();
        let a = Trie::build(&keys, true).unwrap();
        let b = Trie::build(&keys, true).unwrap();
        prop_assert_eq!(a.to_bytes().unwrap(), b.to_bytes().unwrap());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_parallel_consistent(set in key_set("[a-f]{0,7}", 300), shrink in any::<bool>()) {
        let keys: Vec<String> = set.into_iter().collect();
        let threads = NonZeroUsize::new(3);
        let trie = TrieBuilder::new(&keys)
            .unwrap()
            .config(BuildConfig::new().shrink_tail(shrink).mode(BuildMode::Parallel { threads }))
            .build()
            .unwrap();
        validate_trie(&trie, &keys);
        prop_assert_eq!(trie.search("zz"), None);
    }
}

#[test]
fn test_stress_url_like_keys() {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(7);
    let hosts = ["example.com", "example.org", "rust-lang.org", "docs.rs"];
    let mut set = BTreeSet::new();
    while set.len() < 5_000 {
        let host = hosts[rng.gen_range(0..hosts.len())];
        let depth = rng.gen_range(0..4);
        let mut key = format!("https://{host}");
        for _ in 0..depth {
            key.push('/');
            key.push_str(&format!("{:x}", rng.gen_range(0..512u32)));
        }
        set.insert(key);
    }
    let keys: Vec<String> = set.into_iter().collect();

    let plain = Trie::build(&keys, false).unwrap();
    let shrunk = Trie::build(&keys, true).unwrap();
    validate_trie(&plain, &keys);
    validate_trie(&shrunk, &keys);
    assert!(shrunk.tail_len() < plain.tail_len());

    let parallel = TrieBuilder::new(&keys)
        .unwrap()
        .config(BuildConfig::new().mode(BuildMode::parallel()))
        .build()
        .unwrap();
    validate_trie(&parallel, &keys);
}
