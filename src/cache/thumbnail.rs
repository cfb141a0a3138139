/// Bounded, time-expiring thumbnail store
///
/// Entries expire a fixed duration after insertion and are purged lazily on
/// lookup. When full, the entry with the oldest insertion is evicted.
use std::collections::HashMap;
use std::hash::Hash;
use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::trace;

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Bytes,
    inserted_at: Instant,
    /// Insertion order, breaks ties between equal timestamps
    sequence: u64,
}

#[derive(Debug)]
struct Entries<K> {
    map: HashMap<K, CacheEntry>,
    next_sequence: u64,
}

#[derive(Debug)]
pub struct ThumbnailCache<K> {
    entries: Mutex<Entries<K>>,
    max_entries: usize,
    ttl: Duration,
}

impl<K> ThumbnailCache<K>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
{
    pub fn new(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(Entries {
                map: HashMap::new(),
                next_sequence: 0,
            }),
            max_entries,
            ttl,
        }
    }

    /// Cached bytes for `key`, if present and younger than the TTL
    ///
    /// An expired entry is removed as a side effect.
    pub fn get(&self, key: &K) -> Option<Bytes> {
        let mut entries = self.entries.lock();
        let entry = entries.map.get(key)?;
        if entry.inserted_at.elapsed() < self.ttl {
            return Some(entry.data.clone());
        }

        trace!(key = ?key, "Thumbnail expired");
        entries.map.remove(key);
        None
    }

    /// Insert or overwrite `key`, evicting the oldest entry when full
    pub fn put(&self, key: K, data: impl Into<Bytes>) {
        if self.max_entries == 0 {
            return;
        }

        let mut entries = self.entries.lock();
        if !entries.map.contains_key(&key) && entries.map.len() >= self.max_entries {
            let oldest = entries
                .map
                .iter()
                .min_by_key(|(_, entry)| (entry.inserted_at, entry.sequence))
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                trace!(key = ?oldest, "Evicting oldest thumbnail");
                entries.map.remove(&oldest);
            }
        }

        let sequence = entries.next_sequence;
        entries.next_sequence += 1;
        entries.map.insert(
            key,
            CacheEntry {
                data: data.into(),
                inserted_at: Instant::now(),
                sequence,
            },
        );
    }

    /// True if `key` has a live entry (does not purge)
    pub fn contains(&self, key: &K) -> bool {
        self.entries
            .lock()
            .map
            .get(key)
            .is_some_and(|entry| entry.inserted_at.elapsed() < self.ttl)
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        entries.map.clear();
        entries.next_sequence = 0;
    }

    /// Number of stored entries, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.entries.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.max_entries
    }
}
