use std::sync::Arc;

use super::{Cache, CacheKey, CacheValue};

/// Deep-clones values on the way in and out, so a caller can never mutate
/// the instance another caller is holding (spec.md §4.2: "Serialized
/// (independent copies)"). `Value` owns all its data, so `Value::clone` is
/// already the deep copy a real serialize/deserialize round trip would
/// produce.
pub struct SerializedCache {
    delegate: Arc<dyn Cache>,
}

impl SerializedCache {
    pub fn new(delegate: Arc<dyn Cache>) -> Self {
        Self { delegate }
    }
}

impl Cache for SerializedCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: CacheValue) {
        self.delegate.put(key, Arc::new((*value).clone()));
    }

    fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        self.delegate.get(key).map(|value| Arc::new((*value).clone()))
    }

    fn remove(&self, key: &CacheKey) -> Option<CacheValue> {
        self.delegate.remove(key)
    }

    fn clear(&self) {
        self.delegate.clear();
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }
}
