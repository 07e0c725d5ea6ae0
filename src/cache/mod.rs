//! Response caching
//!
//! [`CacheLayer`] wraps SOAP calls in a [`ResponseCache`]: a hit skips the
//! call, a miss runs it once per key even with concurrent callers, and only
//! successful responses are stored.

pub mod memory;

use std::{future::Future, sync::Arc, time::Duration};

use dashmap::DashMap;
use log::trace;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::sync::Mutex;

use crate::core::{ErrorContext, Params, ResponseCache, SoapResult};

pub use memory::MemoryCache;

pub const DEFAULT_MAX_ENTRIES: usize = 100;
pub const DEFAULT_TTL: Duration = Duration::from_secs(100);

static DEFAULT_CACHE: Lazy<Arc<MemoryCache>> =
    Lazy::new(|| Arc::new(MemoryCache::new(DEFAULT_MAX_ENTRIES, DEFAULT_TTL)));

/// Process-wide store shared by every wrapper built without an explicit cache
pub fn default_cache() -> Arc<MemoryCache> {
    DEFAULT_CACHE.clone()
}

/// What goes into a cache key besides the merged parameters
#[derive(Clone, Copy, Default, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheKeyScope {
    /// Serialized parameters only, shared across operations and services
    #[default]
    Params,
    /// WSDL location and operation name prefixed to the parameters
    Action,
}

/// Derive the cache key for a request.
///
/// Object keys serialize in sorted order, so equal maps always produce the
/// same key regardless of insertion order.
pub fn cache_key(
    scope: CacheKeyScope,
    wsdl: &str,
    action: &str,
    params: &Params,
) -> SoapResult<String> {
    let serialized = serde_json::to_string(params).with_context("Unable to serialize cache key")?;
    Ok(match scope {
        CacheKeyScope::Params => serialized,
        CacheKeyScope::Action => format!("{wsdl}#{action}:{serialized}"),
    })
}

/// A value produced by [`CacheLayer::wrap`]
#[derive(Debug)]
pub struct Cached {
    pub value: JsonValue,
    /// Served from the store without running the call
    pub hit: bool,
}

/// Read-through wrapper around a response store
pub struct CacheLayer {
    store: Arc<dyn ResponseCache>,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl CacheLayer {
    pub fn new(store: Arc<dyn ResponseCache>) -> Self {
        Self {
            store,
            in_flight: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn ResponseCache> {
        &self.store
    }

    /// Return the stored value for `key`, or run `call` and store its result.
    ///
    /// Callers that miss on the same key while a call is running wait for it
    /// and then read the stored value instead of calling again. Errors are
    /// returned to the caller that ran the call and never stored; each waiter
    /// then makes its own call, one at a time, and newcomers queue behind
    /// them until the last one is done.
    pub async fn wrap<F, Fut>(&self, key: &str, call: F) -> SoapResult<Cached>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = SoapResult<JsonValue>>,
    {
        if let Some(value) = self.store.get(key).await {
            trace!("Cache hit for {key}");
            return Ok(Cached { value, hit: true });
        }

        let lock = self
            .in_flight
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let guard = lock.lock().await;

        // another caller may have filled the entry while we waited
        if let Some(value) = self.store.get(key).await {
            drop(guard);
            self.release(key, &lock);
            trace!("Cache filled by concurrent call for {key}");
            return Ok(Cached { value, hit: true });
        }

        trace!("Cache miss for {key}");
        let result = call().await;
        if let Ok(value) = &result {
            self.store.set(key, value.clone()).await;
        }

        drop(guard);
        self.release(key, &lock);

        result.map(|value| Cached { value, hit: false })
    }

    pub async fn invalidate(&self, key: &str) -> bool {
        self.store.remove(key).await
    }

    pub async fn clear(&self) {
        self.store.clear().await;
    }

    /// Drop the key's lock once no other caller holds a handle to it.
    ///
    /// The map and `lock` account for two strong references. Clones are only
    /// taken under the shard lock that `remove_if` also holds.
    fn release(&self, key: &str, lock: &Arc<Mutex<()>>) {
        self.in_flight.remove_if(key, |_, current| {
            Arc::ptr_eq(current, lock) && Arc::strong_count(current) <= 2
        });
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::core::SoapError;

    fn layer() -> CacheLayer {
        CacheLayer::new(Arc::new(MemoryCache::new(10, Duration::from_secs(60))))
    }

    #[test]
    fn test_cache_key_scopes() {
        let mut params = Params::new();
        params.insert("b".to_string(), json!(2));
        params.insert("a".to_string(), json!(1));

        let key = cache_key(CacheKeyScope::Params, "svc.wsdl", "Get", &params).unwrap();
        assert_eq!(key, r#"{"a":1,"b":2}"#);

        let key = cache_key(CacheKeyScope::Action, "svc.wsdl", "Get", &params).unwrap();
        assert_eq!(key, r#"svc.wsdl#Get:{"a":1,"b":2}"#);
    }

    #[test]
    fn test_scope_from_yaml() {
        let scope: CacheKeyScope = serde_yaml::from_str("action").unwrap();
        assert_eq!(scope, CacheKeyScope::Action);
        assert_eq!(CacheKeyScope::default(), CacheKeyScope::Params);
    }

    #[test]
    fn test_default_cache_is_shared() {
        let a = default_cache();
        let b = default_cache();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.max(), DEFAULT_MAX_ENTRIES);
        assert_eq!(a.ttl(), DEFAULT_TTL);
    }

    #[tokio::test]
    async fn test_wrap_miss_then_hit() {
        let layer = layer();
        let calls = AtomicUsize::new(0);

        let first = layer
            .wrap("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!("v"))
            })
            .await
            .unwrap();
        assert!(!first.hit);

        let second = layer
            .wrap("k", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!("other"))
            })
            .await
            .unwrap();
        assert!(second.hit);
        assert_eq!(second.value, json!("v"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_wrap_does_not_store_errors() {
        let layer = layer();

        let err = layer
            .wrap("k", || async { Err(SoapError::Fault("down".into())) })
            .await
            .unwrap_err();
        assert!(matches!(err, SoapError::Fault(_)));
        assert!(layer.store().get("k").await.is_none());

        let ok = layer.wrap("k", || async { Ok(json!(1)) }).await.unwrap();
        assert!(!ok.hit);
    }

    #[tokio::test]
    async fn test_wrap_coalesces_concurrent_misses() {
        let layer = Arc::new(layer());
        let calls = Arc::new(AtomicUsize::new(0));

        let tasks = (0..8).map(|_| {
            let layer = layer.clone();
            let calls = calls.clone();
            async move {
                layer
                    .wrap("k", || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(json!("v"))
                    })
                    .await
                    .unwrap()
            }
        });
        let results = futures::future::join_all(tasks).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(results.iter().filter(|r| !r.hit).count(), 1);
        assert!(results.iter().all(|r| r.value == json!("v")));
        assert!(layer.in_flight.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_call_keeps_later_callers_serialized() {
        let layer = Arc::new(layer());
        let calls = Arc::new(AtomicUsize::new(0));
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks = (0..4u64).map(|i| {
            let layer = layer.clone();
            let calls = calls.clone();
            let active = active.clone();
            let peak = peak.clone();
            async move {
                // the last caller shows up while a waiter is retrying
                if i == 3 {
                    tokio::time::sleep(Duration::from_millis(30)).await;
                }
                layer
                    .wrap("k", || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        active.fetch_sub(1, Ordering::SeqCst);
                        Err(SoapError::Fault("down".into()))
                    })
                    .await
            }
        });
        let results = futures::future::join_all(tasks).await;

        assert!(results.iter().all(|r| r.is_err()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert!(layer.in_flight.is_empty());
    }

    #[tokio::test]
    async fn test_invalidate_and_clear() {
        let layer = layer();
        layer.wrap("a", || async { Ok(json!(1)) }).await.unwrap();
        layer.wrap("b", || async { Ok(json!(2)) }).await.unwrap();

        assert!(layer.invalidate("a").await);
        assert!(layer.store().get("a").await.is_none());

        layer.clear().await;
        assert!(layer.store().get("b").await.is_none());
    }
}
