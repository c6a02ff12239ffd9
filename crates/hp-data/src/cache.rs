use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use hp_types::Dataset;
use parking_lot::RwLock;

/// Cached dataset with access metadata
#[derive(Debug)]
struct CacheEntry {
    dataset: Arc<Dataset>,
    last_accessed: DateTime<Utc>,
    access_count: u64,
}

impl CacheEntry {
    fn new(dataset: Arc<Dataset>) -> Self {
        Self {
            dataset,
            last_accessed: Utc::now(),
            access_count: 0,
        }
    }

    fn access(&mut self) -> Arc<Dataset> {
        self.last_accessed = Utc::now();
        self.access_count += 1;
        Arc::clone(&self.dataset)
    }
}

/// In-memory cache of parsed datasets keyed by dataset id
#[derive(Debug)]
pub struct CacheManager {
    cache: DashMap<u32, RwLock<CacheEntry>>,
    max_entries: usize,
    stats: RwLock<CacheStats>,
}

impl CacheManager {
    pub fn new() -> Self {
        Self::with_limit(64)
    }

    pub fn with_limit(max_entries: usize) -> Self {
        Self {
            cache: DashMap::new(),
            max_entries: max_entries.max(1),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    pub fn get(&self, id: u32) -> Option<Arc<Dataset>> {
        if let Some(entry_lock) = self.cache.get(&id) {
            let dataset = entry_lock.write().access();
            self.stats.write().hits += 1;
            return Some(dataset);
        }

        self.stats.write().misses += 1;
        None
    }

    pub fn store(&self, id: u32, dataset: Arc<Dataset>) {
        if !self.cache.contains_key(&id) && self.cache.len() >= self.max_entries {
            self.evict_lru();
        }
        self.cache.insert(id, RwLock::new(CacheEntry::new(dataset)));
    }

    fn evict_lru(&self) {
        let oldest = self
            .cache
            .iter()
            .min_by_key(|entry| entry.value().read().last_accessed)
            .map(|entry| *entry.key());

        if let Some(id) = oldest {
            self.cache.remove(&id);
            self.stats.write().evictions += 1;
            tracing::debug!("Evicted dataset {} from memory cache", id);
        }
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.stats.read().clone()
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache hit/miss counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
