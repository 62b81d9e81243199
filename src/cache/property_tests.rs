//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the contract shared by both backends.

use proptest::prelude::*;
use std::collections::HashMap;
use std::time::Duration;

use tempfile::TempDir;

use crate::cache::file::envelope;
use crate::cache::{is_valid_name, Cache, FileCache, MemoryCache};
use crate::error::CacheError;

// == Strategies ==
/// Generates valid section or key names
fn valid_name_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9,+#_~()$\\[\\]-]{1,40}"
}

/// Generates names containing at least one forbidden character
fn invalid_name_strategy() -> impl Strategy<Value = String> {
    ("[a-z]{0,8}", "[ ./:;?*!@%^&=<>|\"'`{}]", "[a-z]{0,8}")
        .prop_map(|(head, bad, tail)| format!("{}{}{}", head, bad, tail))
}

/// Generates cache values
fn value_strategy() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 0..256)
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Put { key: String, value: Vec<u8> },
    PutIfAbsent { key: String, value: Vec<u8> },
    Get { key: String },
    Remove { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    // A small key space so operations collide
    let key = "[a-d]{1,2}";
    prop_oneof![
        (key, value_strategy()).prop_map(|(key, value)| CacheOp::Put { key, value }),
        (key, value_strategy()).prop_map(|(key, value)| CacheOp::PutIfAbsent { key, value }),
        key.prop_map(|key| CacheOp::Get { key }),
        key.prop_map(|key| CacheOp::Remove { key }),
    ]
}

/// Replays `ops` against `cache` and a HashMap model, comparing every result.
fn check_against_model<C: Cache<Vec<u8>>>(cache: &C, ops: Vec<CacheOp>) -> Result<(), TestCaseError> {
    let mut model: HashMap<String, Vec<u8>> = HashMap::new();

    for op in ops {
        match op {
            CacheOp::Put { key, value } => {
                cache.put("model", &key, value.clone(), None).unwrap();
                model.insert(key, value);
            }
            CacheOp::PutIfAbsent { key, value } => {
                let wrote = cache.put_if_absent("model", &key, value.clone(), None).unwrap();
                prop_assert_eq!(wrote, !model.contains_key(&key));
                model.entry(key).or_insert(value);
            }
            CacheOp::Get { key } => {
                prop_assert_eq!(cache.get("model", &key).unwrap(), model.get(&key).cloned());
            }
            CacheOp::Remove { key } => {
                prop_assert_eq!(cache.remove("model", &key).unwrap(), model.remove(&key).is_some());
            }
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Property: every name drawn from the allowed charset is accepted
    #[test]
    fn prop_valid_names_accepted(name in valid_name_strategy()) {
        prop_assert!(is_valid_name(&name));
    }

    // Property: any forbidden character causes InvalidArgument and no write
    #[test]
    fn prop_invalid_names_rejected(name in invalid_name_strategy(), value in value_strategy()) {
        let cache: MemoryCache<Vec<u8>> = MemoryCache::new().unwrap();

        let as_section = cache.put(&name, "key", value.clone(), None);
        let as_key = cache.put("section", &name, value, None);

        prop_assert!(matches!(as_section, Err(CacheError::InvalidArgument(_))));
        prop_assert!(matches!(as_key, Err(CacheError::InvalidArgument(_))));
        prop_assert!(cache.is_empty());
    }

    // Property: storing then retrieving (no TTL) returns the same value
    #[test]
    fn prop_roundtrip_storage(
        section in valid_name_strategy(),
        key in valid_name_strategy(),
        value in value_strategy()
    ) {
        let cache: MemoryCache<Vec<u8>> = MemoryCache::new().unwrap();
        cache.put(&section, &key, value.clone(), None).unwrap();
        prop_assert_eq!(cache.get(&section, &key).unwrap(), Some(value));
    }

    // Property: put always overwrites, put_if_absent never does
    #[test]
    fn prop_overwrite_semantics(
        key in valid_name_strategy(),
        value1 in value_strategy(),
        value2 in value_strategy(),
        value3 in value_strategy()
    ) {
        let cache: MemoryCache<Vec<u8>> = MemoryCache::new().unwrap();
        cache.put("s", &key, value1, None).unwrap();
        cache.put("s", &key, value2.clone(), None).unwrap();
        prop_assert!(!cache.put_if_absent("s", &key, value3, None).unwrap());

        prop_assert_eq!(cache.get("s", &key).unwrap(), Some(value2));
        prop_assert_eq!(cache.len(), 1);
    }

    // Property: the in-memory cache behaves like a map for any operation sequence
    #[test]
    fn prop_memory_matches_model(ops in prop::collection::vec(cache_op_strategy(), 1..60)) {
        let cache: MemoryCache<Vec<u8>> = MemoryCache::new().unwrap();
        check_against_model(&cache, ops)?;
    }

    // Property: decoding arbitrary bytes never panics
    #[test]
    fn prop_envelope_decode_total(bytes in prop::collection::vec(any::<u8>(), 0..128)) {
        if let Ok(decoded) = envelope::decode(&bytes) {
            let _ = decoded.verify();
        }
    }
}

// Filesystem-backed properties run fewer cases
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    // Property: the file cache behaves like a map for any operation sequence
    #[test]
    fn prop_file_matches_model(
        ops in prop::collection::vec(cache_op_strategy(), 1..30),
        compress in any::<bool>()
    ) {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::open(dir.path(), compress).unwrap();
        check_against_model(&cache, ops)?;
    }

    // Property: file round trip is byte-identical for payloads up to 1 MB
    #[test]
    fn prop_file_roundtrip_sizes(
        size in prop_oneof![0usize..64, 64usize..65_536, Just(1024 * 1024)],
        seed in any::<u8>(),
        compress in any::<bool>()
    ) {
        let dir = TempDir::new().unwrap();
        let cache = FileCache::open(dir.path(), compress).unwrap();
        let payload: Vec<u8> = (0..size).map(|i| (i as u8).wrapping_mul(31) ^ seed).collect();

        cache.put("blobs", "payload", payload.clone(), None).unwrap();
        prop_assert_eq!(cache.get("blobs", "payload").unwrap(), Some(payload));
    }
}

// Time-sensitive TTL properties use few cases
proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]

    // Property: an entry stored with a TTL is readable before and absent after it
    #[test]
    fn prop_ttl_expiration_behavior(key in valid_name_strategy(), value in value_strategy()) {
        let cache: MemoryCache<Vec<u8>> = MemoryCache::new().unwrap();
        cache.put("ttl", &key, value.clone(), Some(Duration::from_millis(40))).unwrap();

        prop_assert_eq!(cache.get("ttl", &key).unwrap(), Some(value));
        std::thread::sleep(Duration::from_millis(80));
        prop_assert_eq!(cache.get("ttl", &key).unwrap(), None);
    }
}
