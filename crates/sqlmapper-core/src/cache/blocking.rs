use std::sync::{Arc, Condvar, Mutex};

use sqlmapper_helpers::IndexMap;

use super::{Cache, CacheKey, CacheValue};

/// Serializes misses on the same key: the first caller to miss holds the
/// per-key lock until it calls `put` (or `remove`, to give up), and every
/// other caller for that key blocks rather than racing to recompute the
/// same value (spec.md §4.2: "Blocking"). This is the decorator that turns
/// a cache-stampede into a single winner.
pub struct BlockingCache {
    delegate: Arc<dyn Cache>,
    locks: Mutex<IndexMap<CacheKey, Arc<(Mutex<bool>, Condvar)>>>,
}

impl BlockingCache {
    pub fn new(delegate: Arc<dyn Cache>) -> Self {
        Self {
            delegate,
            locks: Mutex::new(IndexMap::default()),
        }
    }

    fn lock_for(&self, key: &CacheKey) -> Arc<(Mutex<bool>, Condvar)> {
        self.locks
            .lock()
            .unwrap()
            .entry(key.clone())
            .or_insert_with(|| Arc::new((Mutex::new(false), Condvar::new())))
            .clone()
    }

    fn acquire(&self, key: &CacheKey) {
        let lock = self.lock_for(key);
        let (held, cvar) = &*lock;
        let mut held = held.lock().unwrap();
        while *held {
            held = cvar.wait(held).unwrap();
        }
        *held = true;
    }

    fn release(&self, key: &CacheKey) {
        let lock = self.lock_for(key);
        let (held, cvar) = &*lock;
        *held.lock().unwrap() = false;
        cvar.notify_all();
    }
}

impl Cache for BlockingCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: CacheValue) {
        self.delegate.put(key.clone(), value);
        self.release(&key);
    }

    fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        self.acquire(key);
        let value = self.delegate.get(key);
        if value.is_some() {
            // hit: release immediately, nothing to compute
            self.release(key);
        }
        // miss: stays locked until the caller calls `put` (or `remove`)
        value
    }

    fn remove(&self, key: &CacheKey) -> Option<CacheValue> {
        let value = self.delegate.remove(key);
        self.release(key);
        value
    }

    fn clear(&self) {
        self.delegate.clear();
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PerpetualCache;
    use crate::value::Value;

    #[test]
    fn hit_does_not_hold_the_lock() {
        let cache = BlockingCache::new(Arc::new(PerpetualCache::new("ns")));
        let mut key = CacheKey::new();
        key.update(Value::Int(1));
        cache.put(key.clone(), Arc::new(Value::Int(1)));

        assert!(cache.get(&key).is_some());
        assert!(cache.get(&key).is_some());
    }

    #[test]
    fn miss_then_put_releases_for_the_next_caller() {
        let cache = BlockingCache::new(Arc::new(PerpetualCache::new("ns")));
        let mut key = CacheKey::new();
        key.update(Value::Int(1));

        assert!(cache.get(&key).is_none());
        cache.put(key.clone(), Arc::new(Value::Int(42)));
        assert_eq!(cache.get(&key), Some(Arc::new(Value::Int(42))));
    }
}
