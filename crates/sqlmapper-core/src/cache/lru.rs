use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::{Cache, CacheKey, CacheValue};

/// Bounds the delegate to `capacity` entries, evicting the least-recently
/// used key — recency updated on both `get` and `put` (spec.md §4.2: "LRU
/// (size)").
pub struct LruCache {
    delegate: Arc<dyn Cache>,
    capacity: usize,
    order: Mutex<VecDeque<CacheKey>>,
}

impl LruCache {
    pub fn new(delegate: Arc<dyn Cache>, capacity: usize) -> Self {
        Self {
            delegate,
            capacity: capacity.max(1),
            order: Mutex::new(VecDeque::new()),
        }
    }

    fn touch(&self, key: &CacheKey) {
        let mut order = self.order.lock().unwrap();
        if let Some(pos) = order.iter().position(|k| k == key) {
            order.remove(pos);
        }
        order.push_back(key.clone());
    }
}

impl Cache for LruCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: CacheValue) {
        self.delegate.put(key.clone(), value);
        self.touch(&key);

        let evict = {
            let mut order = self.order.lock().unwrap();
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
        let value = self.delegate.get(key);
        if value.is_some() {
            self.touch(key);
        }
        value
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
