use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::{Cache, CacheKey, CacheValue};

/// Tracks the hit ratio and logs it on every access (spec.md §4.2:
/// "Logging"). Outermost by default so it observes what a caller actually
/// experienced, after every other decorator has had a chance to satisfy the
/// request.
pub struct LoggingCache {
    delegate: Arc<dyn Cache>,
    id: String,
    hits: AtomicU64,
    requests: AtomicU64,
}

impl LoggingCache {
    pub fn new(delegate: Arc<dyn Cache>, id: impl Into<String>) -> Self {
        Self {
            delegate,
            id: id.into(),
            hits: AtomicU64::new(0),
            requests: AtomicU64::new(0),
        }
    }

    pub fn hit_ratio(&self) -> f64 {
        let requests = self.requests.load(Ordering::Relaxed);
        if requests == 0 {
            return 0.0;
        }
        self.hits.load(Ordering::Relaxed) as f64 / requests as f64
    }
}

impl Cache for LoggingCache {
    fn id(&self) -> &str {
        &self.id
    }

    fn put(&self, key: CacheKey, value: CacheValue) {
        self.delegate.put(key, value);
    }

    fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        let value = self.delegate.get(key);
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        }
        log::debug!(
            "cache {}: hit ratio {:.4} ({} requests)",
            self.id,
            self.hit_ratio(),
            self.requests.load(Ordering::Relaxed)
        );
        value
    }

    fn remove(&self, key: &CacheKey) -> Option<CacheValue> {
        self.delegate.remove(key)
    }

    fn clear(&self) {
        log::debug!("cache {}: cleared", self.id);
        self.delegate.clear();
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }
}
