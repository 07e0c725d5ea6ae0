use std::{num::NonZeroUsize, time::Duration};

use async_trait::async_trait;
use log::trace;
use lru::LruCache;
use serde_json::Value as JsonValue;
use tokio::{sync::Mutex, time::Instant};

use crate::core::ResponseCache;

/// Bounded, time-expiring in-memory response store.
///
/// Holds at most `max` entries; a full store drops the least recently used
/// one on insert. Entries older than `ttl` are never returned.
pub struct MemoryCache {
    entries: Mutex<LruCache<String, (JsonValue, Instant)>>,
    max: NonZeroUsize,
    ttl: Duration,
}

impl MemoryCache {
    pub fn new(max: usize, ttl: Duration) -> Self {
        let max = NonZeroUsize::new(max).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(max)),
            max,
            ttl,
        }
    }

    pub fn max(&self) -> usize {
        self.max.get()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of stored entries, expired ones included until they are read
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[async_trait]
impl ResponseCache for MemoryCache {
    async fn get(&self, key: &str) -> Option<JsonValue> {
        let mut entries = self.entries.lock().await;

        match entries.get(key) {
            Some((value, stored)) if stored.elapsed() < self.ttl => return Some(value.clone()),
            Some(_) => {}
            None => return None,
        }

        entries.pop(key);
        trace!("Cache entry expired: {key}");
        None
    }

    async fn set(&self, key: &str, value: JsonValue) {
        let evicted = self
            .entries
            .lock()
            .await
            .push(key.to_string(), (value, Instant::now()));

        if let Some((old_key, _)) = evicted.filter(|(old_key, _)| old_key != key) {
            trace!("Evicted least recently used cache entry: {old_key}");
        }
    }

    async fn remove(&self, key: &str) -> bool {
        self.entries.lock().await.pop(key).is_some()
    }

    async fn clear(&self) {
        self.entries.lock().await.clear();
    }
}
