//! Per-section storage: the key map plus a min-heap of pending expirations.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use crate::cache::CacheEntry;

/// A section's state behind its own read/write lock.
pub(super) type Section<V> = RwLock<SectionState<V>>;

// == Expiration Record ==
/// A pending expiration, pointing back at the entry it was created for.
///
/// The pointer is weak so an overwritten value is freed right away; the
/// record itself lingers until its deadline and is then discarded as stale.
pub(super) struct ExpirationRecord<V> {
    pub expires_at: u64,
    pub key: String,
    pub entry: Weak<CacheEntry<V>>,
}

impl<V> PartialEq for ExpirationRecord<V> {
    fn eq(&self, other: &Self) -> bool {
        self.expires_at == other.expires_at && self.key == other.key
    }
}

impl<V> Eq for ExpirationRecord<V> {}

impl<V> PartialOrd for ExpirationRecord<V> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<V> Ord for ExpirationRecord<V> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.expires_at
            .cmp(&other.expires_at)
            .then_with(|| self.key.cmp(&other.key))
    }
}

// == Section State ==
pub(super) struct SectionState<V> {
    entries: HashMap<String, Arc<CacheEntry<V>>>,
    expirations: BinaryHeap<Reverse<ExpirationRecord<V>>>,
}

impl<V> Default for SectionState<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            expirations: BinaryHeap::new(),
        }
    }
}

impl<V> SectionState<V> {
    /// Returns the entry for `key` unless it is missing or expired at `now`.
    pub fn live(&self, key: &str, now: u64) -> Option<&Arc<CacheEntry<V>>> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
    }

    /// Stores `entry` under `key`, replacing whatever was there.
    ///
    /// Returns the entry's deadline so the caller can wake the reaper.
    pub fn insert(&mut self, key: &str, entry: CacheEntry<V>) -> Option<u64> {
        let entry = Arc::new(entry);
        let deadline = entry.expires_at;
        if let Some(expires_at) = deadline {
            self.expirations.push(Reverse(ExpirationRecord {
                expires_at,
                key: key.to_string(),
                entry: Arc::downgrade(&entry),
            }));
        }
        self.entries.insert(key.to_string(), entry);
        deadline
    }

    /// Drops the entry for `key`. Returns true if it was live at `now`.
    pub fn remove(&mut self, key: &str, now: u64) -> bool {
        self.entries
            .remove(key)
            .is_some_and(|entry| !entry.is_expired_at(now))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.expirations.clear();
    }

    /// Earliest pending deadline, stale records included.
    pub fn next_deadline(&self) -> Option<u64> {
        self.expirations.peek().map(|Reverse(record)| record.expires_at)
    }

    /// Pops every record whose deadline passed before `now` and removes the
    /// entries they still own. Returns the number of entries removed.
    pub fn purge_expired(&mut self, now: u64) -> usize {
        let mut purged = 0;
        while self
            .expirations
            .peek()
            .is_some_and(|Reverse(record)| now > record.expires_at)
        {
            let Some(Reverse(record)) = self.expirations.pop() else {
                break;
            };
            if self.is_current(&record) {
                self.entries.remove(&record.key);
                purged += 1;
            }
        }
        purged
    }

    /// True if `record` was created for the entry currently stored.
    fn is_current(&self, record: &ExpirationRecord<V>) -> bool {
        self.entries
            .get(&record.key)
            .is_some_and(|entry| Arc::as_ptr(entry) == record.entry.as_ptr())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub fn pending_expirations(&self) -> usize {
        self.expirations.len()
    }
}
