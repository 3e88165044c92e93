use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::{Cache, CacheKey, CacheValue};

/// Bounds the delegate to `capacity` entries, evicting in pure insertion
/// order regardless of access pattern (spec.md §4.2: "FIFO (size)").
pub struct FifoCache {
    delegate: Arc<dyn Cache>,
    capacity: usize,
    order: Mutex<VecDeque<CacheKey>>,
}

impl FifoCache {
    pub fn new(delegate: Arc<dyn Cache>, capacity: usize) -> Self {
        Self {
            delegate,
            capacity: capacity.max(1),
            order: Mutex::new(VecDeque::new()),
        }
    }
}

impl Cache for FifoCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: CacheValue) {
        self.delegate.put(key.clone(), value);

        let evict = {
            let mut order = self.order.lock().unwrap();
            order.push_back(key);
            if order.len() > self.capacity {
                order.pop_front()
            } else {
                None
            }
        };
        if let Some(evicted) = evict {
            self.delegate.remove(&evicted);
        }
    }

    fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        self.delegate.get(key)
    }

    fn remove(&self, key: &CacheKey) -> Option<CacheValue> {
        let mut order = self.order.lock().unwrap();
        if let Some(pos) = order.iter().position(|k| k == key) {
            order.remove(pos);
        }
        drop(order);
        self.delegate.remove(key)
    }

    fn clear(&self) {
        self.order.lock().unwrap().clear();
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

    fn key(n: i64) -> CacheKey {
        let mut k = CacheKey::new();
        k.update(Value::Int(n));
        k
    }

    #[test]
    fn evicts_in_insertion_order_regardless_of_access() {
        let cache = FifoCache::new(Arc::new(PerpetualCache::new("ns")), 2);
        cache.put(key(1), Arc::new(Value::Int(1)));
        cache.put(key(2), Arc::new(Value::Int(2)));
        cache.get(&key(1)); // no effect on FIFO order
        cache.put(key(3), Arc::new(Value::Int(3)));

        assert!(cache.get(&key(1)).is_none());
        assert!(cache.get(&key(2)).is_some());
        assert!(cache.get(&key(3)).is_some());
    }
}
