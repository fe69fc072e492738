use dashmap::DashMap;
use extract::{EntityMention, ModelTask};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Per-chunk model outputs, keyed by a hash of the task and chunk text.
pub struct Cache {
    summaries: DashMap<String, String>,
    entities: DashMap<String, Vec<EntityMention>>,
    max_entries: usize,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl Cache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            summaries: DashMap::new(),
            entities: DashMap::new(),
            max_entries,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn get_summary(&self, chunk: &str) -> Option<String> {
        let found = self
            .summaries
            .get(&cache_key(ModelTask::Summarize, chunk))
            .map(|r| r.value().clone());
        self.count(found.is_some());
        found
    }

    pub fn set_summary(&self, chunk: &str, summary: String) {
        insert_bounded(
            &self.summaries,
            self.max_entries,
            cache_key(ModelTask::Summarize, chunk),
            summary,
        );
    }

    pub fn get_entities(&self, chunk: &str) -> Option<Vec<EntityMention>> {
        let found = self
            .entities
            .get(&cache_key(ModelTask::TagEntities, chunk))
            .map(|r| r.value().clone());
        self.count(found.is_some());
        found
    }

    pub fn set_entities(&self, chunk: &str, entities: Vec<EntityMention>) {
        insert_bounded(
            &self.entities,
            self.max_entries,
            cache_key(ModelTask::TagEntities, chunk),
            entities,
        );
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            summaries_cached: self.summaries.len(),
            entities_cached: self.entities.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    pub fn clear(&self) {
        self.summaries.clear();
        self.entities.clear();
    }

    fn count(&self, hit: bool) {
        if hit {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }
    }
}

fn insert_bounded<V>(map: &DashMap<String, V>, max_entries: usize, key: String, value: V) {
    if max_entries == 0 {
        return;
    }
    if map.len() >= max_entries {
        // Simple eviction: clear 25% when full
        let to_remove: Vec<_> = map
            .iter()
            .take((max_entries / 4).max(1))
            .map(|r| r.key().clone())
            .collect();
        for key in to_remove {
            map.remove(&key);
        }
    }
    map.insert(key, value);
}

fn cache_key(task: ModelTask, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(task.as_str().as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub summaries_cached: usize,
    pub entities_cached: usize,
    pub hits: usize,
    pub misses: usize,
}
