use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::helpers::time::Clock;
use crate::observability::metrics::get_metrics;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    expires_at: DateTime<Utc>,
}

/// One namespace of the response cache: key -> (value, expires_at).
///
/// Expired entries are never evicted, only ignored until the next `put` for the
/// same key overwrites them.
#[derive(Clone)]
pub struct ResponseCache<V> {
    namespace: &'static str,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    inner: Arc<RwLock<HashMap<String, CacheEntry<V>>>>,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(namespace: &'static str, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            namespace,
            ttl,
            clock,
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get value if it exists and is not expired
    pub async fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let hit = self
            .inner
            .read()
            .await
            .get(key)
            .filter(|entry| now < entry.expires_at)
            .map(|entry| entry.value.clone());

        let result = if hit.is_some() { "hit" } else { "miss" };
        debug!(namespace = self.namespace, key, result, "cache lookup");
        get_metrics()
            .await
            .cache_lookups
            .with_label_values(&[self.namespace, result])
            .inc();
        hit
    }

    /// Store value with the namespace TTL, replacing any previous entry as a whole.
    pub async fn put(&self, key: impl Into<String>, value: V) {
        self.put_with_ttl(key, value, self.ttl).await
    }

    pub async fn put_with_ttl(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = CacheEntry {
            value,
            expires_at: self.clock.now() + ttl,
        };
        self.inner.write().await.insert(key.into(), entry);
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}
