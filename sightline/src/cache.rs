//! Partition-existence cache
//!
//! Remembers whether a daily partition exists so that queries can skip
//! partitions that were never created. Entries expire after a fixed TTL,
//! which lets partitions created or deleted later be picked up again.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Hit, miss and expiration counters
#[derive(Debug, Default)]
pub struct PartitionCacheStats {
    hits: AtomicU64,
    misses: AtomicU64,
    expirations: AtomicU64,
}

impl PartitionCacheStats {
    fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("sightline_partition_cache_hits_total").increment(1);
    }

    fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("sightline_partition_cache_misses_total").increment(1);
    }

    fn expire(&self) {
        self.expirations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    pub fn expirations(&self) -> u64 {
        self.expirations.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits() + self.misses();
        if total == 0 {
            0.0
        } else {
            self.hits() as f64 / total as f64
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    exists: bool,
    checked_at: Instant,
}

#[derive(Debug, Clone)]
pub struct PartitionCache {
    entries: Arc<RwLock<HashMap<String, Entry>>>,
    ttl: Duration,
    stats: Arc<PartitionCacheStats>,
}

impl PartitionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            stats: Arc::new(PartitionCacheStats::default()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Cached existence of `partition`, `None` when unknown or expired
    pub fn get(&self, partition: &str) -> Option<bool> {
        let entry = self.entries.read().get(partition).copied();

        match entry {
            Some(entry) if entry.checked_at.elapsed() < self.ttl => {
                self.stats.hit();
                Some(entry.exists)
            }
            Some(_) => {
                self.entries.write().remove(partition);
                self.stats.expire();
                self.stats.miss();
                None
            }
            None => {
                self.stats.miss();
                None
            }
        }
    }

    pub fn insert(&self, partition: impl Into<String>, exists: bool) {
        self.entries.write().insert(
            partition.into(),
            Entry {
                exists,
                checked_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, partition: &str) {
        self.entries.write().remove(partition);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn stats(&self) -> Arc<PartitionCacheStats> {
        Arc::clone(&self.stats)
    }
}
