use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::{Cache, CacheKey, CacheValue};

/// Clears the delegate wholesale once `flush_interval` has elapsed since the
/// last clear, checked lazily on each call rather than via a background
/// timer (spec.md §4.2: "Scheduled (interval)").
pub struct ScheduledCache {
    delegate: Arc<dyn Cache>,
    flush_interval: Duration,
    last_clear: Mutex<Instant>,
}

impl ScheduledCache {
    pub fn new(delegate: Arc<dyn Cache>, flush_interval: Duration) -> Self {
        Self {
            delegate,
            flush_interval,
            last_clear: Mutex::new(Instant::now()),
        }
    }

    fn flush_if_due(&self) {
        let mut last_clear = self.last_clear.lock().unwrap();
        if last_clear.elapsed() >= self.flush_interval {
            self.delegate.clear();
            *last_clear = Instant::now();
        }
    }
}

impl Cache for ScheduledCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: CacheValue) {
        self.flush_if_due();
        self.delegate.put(key, value);
    }

    fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        self.flush_if_due();
        self.delegate.get(key)
    }

    fn remove(&self, key: &CacheKey) -> Option<CacheValue> {
        self.flush_if_due();
        self.delegate.remove(key)
    }

    fn clear(&self) {
        self.delegate.clear();
        *self.last_clear.lock().unwrap() = Instant::now();
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }
}
