//! Concurrency Tests for the In-Memory Cache
//!
//! Stress the two-tier locking and the reaper against concurrent callers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use section_cache::{Cache, MemoryCache};

const THREADS: usize = 16;
const OPS_PER_THREAD: usize = 10_000;

fn cache() -> MemoryCache<Vec<u8>> {
    MemoryCache::new().unwrap()
}

/// Polls `check` until it holds or `timeout` elapses.
fn eventually(timeout: Duration, check: impl Fn() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < timeout {
        if check() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    check()
}

#[test]
fn test_disjoint_sections_do_not_interfere() {
    let cache = cache();

    thread::scope(|scope| {
        for t in 0..THREADS {
            let cache = &cache;
            scope.spawn(move || {
                let section = format!("section{}", t);
                let mut model: HashMap<String, Vec<u8>> = HashMap::new();

                for i in 0..OPS_PER_THREAD {
                    let key = format!("k{}", i % 64);
                    match i % 4 {
                        0 | 1 => {
                            let value = vec![t as u8, (i % 256) as u8];
                            cache.put(&section, &key, value.clone(), None).unwrap();
                            model.insert(key, value);
                        }
                        2 => {
                            assert_eq!(cache.get(&section, &key).unwrap(), model.get(&key).cloned());
                        }
                        _ => {
                            let removed = cache.remove(&section, &key).unwrap();
                            assert_eq!(removed, model.remove(&key).is_some());
                        }
                    }
                }

                for (key, value) in &model {
                    assert_eq!(cache.get(&section, key).unwrap().as_ref(), Some(value));
                }
            });
        }
    });

    let stats = cache.stats();
    assert_eq!(stats.expirations, 0);
}

#[test]
fn test_shared_section_writers_and_clear() {
    let cache = cache();
    let done = AtomicBool::new(false);

    thread::scope(|scope| {
        for t in 0..8u8 {
            let cache = &cache;
            let done = &done;
            scope.spawn(move || {
                let mut i = 0u32;
                while !done.load(Ordering::Relaxed) {
                    let key = format!("k{}", i % 32);
                    cache.put("shared", &key, vec![t], None).unwrap();
                    if let Some(value) = cache.get("shared", &key).unwrap() {
                        assert_eq!(value.len(), 1);
                    }
                    i += 1;
                }
            });
        }

        for _ in 0..50 {
            cache.clear_section("shared").unwrap();
            cache.clear();
            thread::sleep(Duration::from_millis(1));
        }
        done.store(true, Ordering::Relaxed);
    });

    assert!(cache.validate());
}

#[test]
fn test_close_races_with_writers() {
    let cache = cache();

    thread::scope(|scope| {
        for t in 0..THREADS {
            let cache = &cache;
            scope.spawn(move || {
                let section = format!("s{}", t);
                for i in 0..2_000 {
                    let key = format!("k{}", i % 16);
                    // Every call must keep succeeding, before and after close
                    cache
                        .put(&section, &key, vec![1], Some(Duration::from_millis(5)))
                        .unwrap();
                    cache.get(&section, &key).unwrap();
                    cache.remove(&section, &key).unwrap();
                }
            });
        }

        thread::sleep(Duration::from_millis(5));
        cache.close();
        cache.close();
    });

    assert!(!cache.validate());
    assert!(cache.is_empty());
}

#[test]
fn test_writes_during_reaper_sweeps() {
    let cache = cache();

    thread::scope(|scope| {
        for t in 0..8 {
            let cache = &cache;
            scope.spawn(move || {
                let section = format!("s{}", t);
                for i in 0..1_000u64 {
                    let key = format!("short{}", i);
                    let ttl = Duration::from_millis(1 + i % 20);
                    cache.put(&section, &key, vec![0], Some(ttl)).unwrap();
                }
                cache.put(&section, "pinned", vec![1], None).unwrap();
            });
        }
    });

    // Only the eight untimed entries remain once the reaper catches up
    assert!(eventually(Duration::from_secs(3), || cache.len() == 8));
    for t in 0..8 {
        let section = format!("s{}", t);
        assert_eq!(cache.get(&section, "pinned").unwrap(), Some(vec![1]));
    }
    assert_eq!(cache.stats().expirations, 8_000);
}

#[test]
fn test_overwrite_during_sweeps_keeps_latest_entry() {
    let cache = cache();

    for round in 0..50u8 {
        cache
            .put("s", "hot", vec![round], Some(Duration::from_millis(2)))
            .unwrap();
    }
    cache.put("s", "hot", vec![255], None).unwrap();

    // Stale expiration records for "hot" must not delete the untimed value
    thread::sleep(Duration::from_millis(50));
    assert_eq!(cache.get("s", "hot").unwrap(), Some(vec![255]));
    assert_eq!(cache.len(), 1);
}
