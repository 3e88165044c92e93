use std::sync::Mutex;

use sqlmapper_helpers::IndexMap;

use super::{Cache, CacheKey, CacheValue};

/// The mandatory base cache: an unbounded map, no eviction. Every decorator
/// in this module eventually bottoms out here (spec.md §4.2: "mandatory
/// base + decorator stack").
pub struct PerpetualCache {
    id: String,
    store: Mutex<IndexMap<CacheKey, CacheValue>>,
}

impl PerpetualCache {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            store: Mutex::new(IndexMap::default()),
        }
    }
}

impl Cache for PerpetualCache {
    fn id(&self) -> &str {
        &self.id
    }

    fn put(&self, key: CacheKey, value: CacheValue) {
        self.store.lock().unwrap().insert(key, value);
    }

    fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        self.store.lock().unwrap().get(key).cloned()
    }

    fn remove(&self, key: &CacheKey) -> Option<CacheValue> {
        self.store.lock().unwrap().shift_remove(key)
    }

    fn clear(&self) {
        self.store.lock().unwrap().clear();
    }

    fn size(&self) -> usize {
        self.store.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use std::sync::Arc;

    #[test]
    fn put_then_get_round_trips() {
        let cache = PerpetualCache::new("ns");
        let mut key = CacheKey::new();
        key.update(Value::Int(1));
        cache.put(key.clone(), Arc::new(Value::Str("row".into())));
        assert_eq!(cache.get(&key), Some(Arc::new(Value::Str("row".into()))));
        assert_eq!(cache.size(), 1);
    }
}
