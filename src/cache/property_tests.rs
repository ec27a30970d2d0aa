//! Property-Based Tests for Cache Module
//!
//! Uses proptest to verify the coordinator's correctness properties.

use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::{
    CacheCoordinator, CacheOptions, GlobPattern, LocalStore, MemoryRemoteStore, Ttl,
};
use crate::config::{Config, StrategyConfig};

// == Test Configuration ==
const TEST_MAX_KEYS: usize = 100;
const TEST_DEFAULT_TTL: u64 = 300;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Payload {
    name: String,
    count: u32,
    tags: Vec<String>,
    ratio: Option<i64>,
}

// == Strategies ==
fn key_suffix_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,32}"
}

fn payload_strategy() -> impl Strategy<Value = Payload> {
    (
        "[a-zA-Z0-9 ]{0,64}",
        any::<u32>(),
        prop::collection::vec("[a-z]{1,8}", 0..5),
        any::<Option<i64>>(),
    )
        .prop_map(|(name, count, tags, ratio)| Payload {
            name,
            count,
            tags,
            ratio,
        })
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .unwrap()
}

fn coordinator(strategy: StrategyConfig) -> (CacheCoordinator, Arc<MemoryRemoteStore>) {
    let remote = Arc::new(MemoryRemoteStore::new());
    let local = LocalStore::new(TEST_MAX_KEYS * 10, TEST_DEFAULT_TTL);
    (CacheCoordinator::new(local, remote.clone(), strategy), remote)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // Round trip: a value written with `set` reads back deep-equal, from L1
    // and, independently, from L2.
    #[test]
    fn prop_roundtrip(suffix in key_suffix_strategy(), payload in payload_strategy()) {
        let rt = runtime();
        let (cache, _) = coordinator(Config::default().strategy);
        let key = format!("order:{}", suffix);

        rt.block_on(async {
            let opts = CacheOptions::default();
            prop_assert!(cache.set(&key, &payload, &opts).await);

            let from_l1: Option<Payload> = cache.get(&key, &opts).await;
            prop_assert_eq!(from_l1.as_ref(), Some(&payload));

            let l2_only = CacheOptions::new().layer(crate::cache::CacheLayer::L2Only);
            let from_l2: Option<Payload> = cache.get(&key, &l2_only).await;
            prop_assert_eq!(from_l2, Some(payload.clone()));
            Ok(())
        })?;
    }

    // Pattern deletion precision: exactly the distinct matching keys go,
    // everything else stays retrievable.
    #[test]
    fn prop_pattern_deletion_precision(
        users in prop::collection::hash_set(key_suffix_strategy(), 0..30),
        roles in prop::collection::hash_set(key_suffix_strategy(), 0..30),
    ) {
        let rt = runtime();
        let (cache, remote) = coordinator(Config::default().strategy);

        rt.block_on(async {
            let opts = CacheOptions::default();
            for id in &users {
                cache.set(&format!("user:{}", id), id, &opts).await;
            }
            for id in &roles {
                cache.set(&format!("role:{}", id), id, &opts).await;
            }

            let removed = cache.del_pattern("user:*").await;
            prop_assert_eq!(removed, users.len() as u64);
            prop_assert_eq!(remote.len(), roles.len());

            for id in &users {
                let key = format!("user:{}", id);
                prop_assert!(!cache.exists(&key).await);
            }
            for id in &roles {
                let value: Option<String> = cache.get(&format!("role:{}", id), &opts).await;
                prop_assert_eq!(value.as_ref(), Some(id));
            }
            Ok(())
        })?;
    }

    // Jitter bound: effective TTL stays within [base, base + range).
    #[test]
    fn prop_jitter_bound(base in 1u64..10_000, range in 1u64..600, suffix in key_suffix_strategy()) {
        let strategy = StrategyConfig {
            random_ttl_range: range,
            ..Config::default().strategy
        };
        let (cache, _) = coordinator(strategy);
        let opts = CacheOptions::new().ttl(base).jitter();
        let key = format!("order:{}", suffix);

        for _ in 0..20 {
            match cache.effective_ttl(&key, &opts) {
                Ttl::Expires(ttl) => {
                    prop_assert!(ttl >= Duration::from_secs(base));
                    prop_assert!(ttl < Duration::from_secs(base + range));
                }
                Ttl::Never => prop_assert!(false, "non-hot key must expire"),
            }
        }
    }

    // Hot keys never expire, whatever TTL or jitter was requested.
    #[test]
    fn prop_hot_keys_never_expire(ttl in 0u64..100_000, jitter in any::<bool>(), suffix in key_suffix_strategy()) {
        let (cache, _) = coordinator(Config::default().strategy);
        let mut opts = CacheOptions::new().ttl(ttl);
        opts.random_ttl_jitter = jitter;

        prop_assert_eq!(cache.effective_ttl(&format!("user:{}", suffix), &opts), Ttl::Never);
    }

    // Prefix globs agree with a plain prefix test.
    #[test]
    fn prop_prefix_glob_matches_starts_with(prefix in "[a-z:]{1,8}", key in "[a-z:0-9]{0,16}") {
        let pattern = GlobPattern::new(&format!("{}*", prefix)).unwrap();
        prop_assert_eq!(pattern.matches(&key), key.starts_with(&prefix));
    }

    // L1 capacity: the local store never holds more than max_keys.
    #[test]
    fn prop_local_capacity_enforcement(
        keys in prop::collection::vec(key_suffix_strategy(), 1..200)
    ) {
        let max_keys = 50;
        let mut local = LocalStore::new(max_keys, TEST_DEFAULT_TTL);

        for key in keys {
            local.set(&key, "1".to_string(), None);
            prop_assert!(local.len() <= max_keys);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    // Statistics accuracy: counters match the outcomes callers observed.
    #[test]
    fn prop_statistics_accuracy(
        writes in prop::collection::hash_set(key_suffix_strategy(), 0..20),
        reads in prop::collection::vec(key_suffix_strategy(), 1..40),
    ) {
        let rt = runtime();
        let (cache, _) = coordinator(Config::default().strategy);

        rt.block_on(async {
            let opts = CacheOptions::default();
            for key in &writes {
                cache.set(&format!("order:{}", key), &1u8, &opts).await;
            }

            let written: HashSet<&String> = writes.iter().collect();
            let mut expected_hits = 0;
            let mut expected_misses = 0;
            for key in &reads {
                let found: Option<u8> = cache.get(&format!("order:{}", key), &opts).await;
                prop_assert_eq!(found.is_some(), written.contains(key));
                if found.is_some() {
                    expected_hits += 1;
                } else {
                    expected_misses += 1;
                }
            }

            let report = cache.stats().await;
            prop_assert_eq!(report.l1.hits, expected_hits);
            prop_assert_eq!(report.l2.hits, 0);
            prop_assert_eq!(report.total.misses, expected_misses);
            prop_assert_eq!(report.total.sets, writes.len() as u64);
            Ok(())
        })?;
    }
}
