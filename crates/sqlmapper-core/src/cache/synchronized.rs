use std::sync::{Arc, Mutex};

use super::{Cache, CacheKey, CacheValue};

/// Serializes all access behind a single mutex. Most decorators below this
/// one are already internally synchronized, but composing arbitrary
/// third-party delegates (or a `Cache` impl supplied by an embedder) isn't
/// guaranteed to be, so this sits outermost-but-one in the default stack
/// (spec.md §4.2: "Synchronized").
pub struct SynchronizedCache {
    delegate: Arc<dyn Cache>,
    guard: Mutex<()>,
}

impl SynchronizedCache {
    pub fn new(delegate: Arc<dyn Cache>) -> Self {
        Self {
            delegate,
            guard: Mutex::new(()),
        }
    }
}

impl Cache for SynchronizedCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: CacheValue) {
        let _lock = self.guard.lock().unwrap();
        self.delegate.put(key, value);
    }

    fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        let _lock = self.guard.lock().unwrap();
        self.delegate.get(key)
    }

    fn remove(&self, key: &CacheKey) -> Option<CacheValue> {
        let _lock = self.guard.lock().unwrap();
        self.delegate.remove(key)
    }

    fn clear(&self) {
        let _lock = self.guard.lock().unwrap();
        self.delegate.clear();
    }

    fn size(&self) -> usize {
        let _lock = self.guard.lock().unwrap();
        self.delegate.size()
    }
}
