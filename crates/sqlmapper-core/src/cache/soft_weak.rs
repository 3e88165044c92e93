use std::collections::VecDeque;
use std::sync::{Arc, Mutex, Weak};

use crate::value::Value;

use super::{Cache, CacheKey, CacheValue};

/// Keeps only weak references to cached values: a value survives exactly as
/// long as something outside the cache still holds a strong `Arc` to it
/// (spec.md §4.2: "Weak"). Implemented by never storing into the delegate;
/// the delegate here only provides the shared `id()`/`size()` surface while
/// the slots map is the actual store.
pub struct WeakCache {
    delegate: Arc<dyn Cache>,
    slots: Mutex<sqlmapper_helpers::IndexMap<CacheKey, Weak<Value>>>,
}

impl WeakCache {
    pub fn new(delegate: Arc<dyn Cache>) -> Self {
        Self {
            delegate,
            slots: Mutex::new(sqlmapper_helpers::IndexMap::default()),
        }
    }
}

impl Cache for WeakCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: CacheValue) {
        self.slots.lock().unwrap().insert(key, Arc::downgrade(&value));
    }

    fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        let mut slots = self.slots.lock().unwrap();
        match slots.get(key).and_then(Weak::upgrade) {
            Some(value) => Some(value),
            None => {
                slots.shift_remove(key);
                None
            }
        }
    }

    fn remove(&self, key: &CacheKey) -> Option<CacheValue> {
        self.slots.lock().unwrap().shift_remove(key).and_then(|w| w.upgrade())
    }

    fn clear(&self) {
        self.slots.lock().unwrap().clear();
    }

    fn size(&self) -> usize {
        self.slots.lock().unwrap().len()
    }
}

/// Like [`WeakCache`], but keeps the most recently used `hard_links`
/// entries alive with a strong reference, so a value that would otherwise
/// be collected immediately survives a little eviction pressure (spec.md
/// §4.2: "Soft (numHardLinks)").
pub struct SoftCache {
    delegate: Arc<dyn Cache>,
    slots: Mutex<sqlmapper_helpers::IndexMap<CacheKey, Weak<Value>>>,
    hard_links: Mutex<VecDeque<CacheValue>>,
    capacity: usize,
}

impl SoftCache {
    pub fn new(delegate: Arc<dyn Cache>, capacity: usize) -> Self {
        Self {
            delegate,
            slots: Mutex::new(sqlmapper_helpers::IndexMap::default()),
            hard_links: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    fn hold(&self, value: CacheValue) {
        let mut links = self.hard_links.lock().unwrap();
        links.push_back(value);
        while links.len() > self.capacity {
            links.pop_front();
        }
    }
}

impl Cache for SoftCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: CacheValue) {
        self.slots.lock().unwrap().insert(key, Arc::downgrade(&value));
        self.hold(value);
    }

    fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        let mut slots = self.slots.lock().unwrap();
        match slots.get(key).and_then(Weak::upgrade) {
            Some(value) => {
                drop(slots);
                self.hold(value.clone());
                Some(value)
            }
            None => {
                slots.shift_remove(key);
                None
            }
        }
    }

    fn remove(&self, key: &CacheKey) -> Option<CacheValue> {
        self.slots.lock().unwrap().shift_remove(key).and_then(|w| w.upgrade())
    }

    fn clear(&self) {
        self.slots.lock().unwrap().clear();
        self.hard_links.lock().unwrap().clear();
    }

    fn size(&self) -> usize {
        self.slots.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PerpetualCache;

    fn key(n: i64) -> CacheKey {
        let mut k = CacheKey::new();
        k.update(Value::Int(n));
        k
    }

    #[test]
    fn weak_cache_drops_value_once_no_strong_ref_remains() {
        let cache = WeakCache::new(Arc::new(PerpetualCache::new("ns")));
        cache.put(key(1), Arc::new(Value::Int(1)));
        assert!(cache.get(&key(1)).is_none());
    }

    #[test]
    fn soft_cache_keeps_recent_entries_alive() {
        let cache = SoftCache::new(Arc::new(PerpetualCache::new("ns")), 1);
        cache.put(key(1), Arc::new(Value::Int(1)));
        assert!(cache.get(&key(1)).is_some());
    }

    #[test]
    fn soft_cache_lets_old_entries_lapse_past_capacity() {
        let cache = SoftCache::new(Arc::new(PerpetualCache::new("ns")), 1);
        cache.put(key(1), Arc::new(Value::Int(1)));
        cache.put(key(2), Arc::new(Value::Int(2)));
        assert!(cache.get(&key(1)).is_none());
        assert!(cache.get(&key(2)).is_some());
    }
}
