//! [`TransactionalCache`]: stages writes to a namespace (L2) cache for the
//! duration of one session so that an uncommitted transaction never lets
//! other sessions observe its writes, and a rollback never pollutes the
//! shared cache (spec.md §4.2 "Transactional").

use std::sync::{Arc, Mutex};

use sqlmapper_helpers::{IndexMap, IndexSet};

use super::{Cache, CacheKey, CacheValue};

pub struct TransactionalCache {
    delegate: Arc<dyn Cache>,
    clear_on_commit: Mutex<bool>,
    entries_to_add_on_commit: Mutex<IndexMap<CacheKey, CacheValue>>,
    entries_missed_in_cache: Mutex<IndexSet<CacheKey>>,
}

impl TransactionalCache {
    pub fn new(delegate: Arc<dyn Cache>) -> Self {
        Self {
            delegate,
            clear_on_commit: Mutex::new(false),
            entries_to_add_on_commit: Mutex::new(IndexMap::default()),
            entries_missed_in_cache: Mutex::new(IndexSet::default()),
        }
    }

    /// Reads straight through to the delegate; a value staged by this same
    /// transaction is deliberately invisible to `get` until `commit` — a
    /// caller should not observe its own uncommitted write as a cache hit.
    /// Once `clear` has been called mid-transaction, every read returns
    /// `None` regardless of what the delegate still holds, since the
    /// delegate itself isn't wiped until `commit`.
    pub fn get(&self, key: &CacheKey) -> Option<CacheValue> {
        let value = self.delegate.get(key);
        if value.is_none() {
            self.entries_missed_in_cache.lock().unwrap().insert(key.clone());
        }
        if *self.clear_on_commit.lock().unwrap() {
            return None;
        }
        value
    }

    /// Stages a write; nothing reaches the delegate until `commit`.
    pub fn put(&self, key: CacheKey, value: CacheValue) {
        self.entries_to_add_on_commit.lock().unwrap().insert(key, value);
    }

    /// Marks the whole delegate to be wiped at the next `commit`, and
    /// discards everything staged so far in this transaction.
    pub fn clear(&self) {
        *self.clear_on_commit.lock().unwrap() = true;
        self.entries_to_add_on_commit.lock().unwrap().clear();
        self.entries_missed_in_cache.lock().unwrap().clear();
    }

    /// Flushes staged writes into the delegate, clearing it first if
    /// `clear` was called mid-transaction, then releases any blocking
    /// locks acquired for keys this transaction queried and missed.
    pub fn commit(&self) {
        if std::mem::take(&mut *self.clear_on_commit.lock().unwrap()) {
            self.delegate.clear();
        }
        self.unlock_missed_entries();
        for (key, value) in self.entries_to_add_on_commit.lock().unwrap().drain(..) {
            self.delegate.put(key, value);
        }
    }

    /// Discards every staged write without touching the delegate, but
    /// still releases blocking locks for missed keys — a rolled-back miss
    /// must not leave [`super::BlockingCache`] locked forever.
    pub fn rollback(&self) {
        self.entries_to_add_on_commit.lock().unwrap().clear();
        *self.clear_on_commit.lock().unwrap() = false;
        self.unlock_missed_entries();
    }

    fn unlock_missed_entries(&self) {
        for key in self.entries_missed_in_cache.lock().unwrap().drain(..) {
            self.delegate.remove(&key);
        }
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
    fn staged_write_is_invisible_until_commit() {
        let delegate: Arc<dyn Cache> = Arc::new(PerpetualCache::new("ns"));
        let txn = TransactionalCache::new(delegate.clone());

        txn.put(key(1), Arc::new(Value::Int(1)));
        assert!(txn.get(&key(1)).is_none());
        assert!(delegate.get(&key(1)).is_none());

        txn.commit();
        assert_eq!(delegate.get(&key(1)), Some(Arc::new(Value::Int(1))));
    }

    #[test]
    fn rollback_discards_staged_writes() {
        let delegate: Arc<dyn Cache> = Arc::new(PerpetualCache::new("ns"));
        let txn = TransactionalCache::new(delegate.clone());

        txn.put(key(1), Arc::new(Value::Int(1)));
        txn.rollback();
        txn.commit();

        assert!(delegate.get(&key(1)).is_none());
    }

    #[test]
    fn clear_wipes_delegate_on_next_commit() {
        let delegate: Arc<dyn Cache> = Arc::new(PerpetualCache::new("ns"));
        delegate.put(key(9), Arc::new(Value::Int(9)));

        let txn = TransactionalCache::new(delegate.clone());
        txn.clear();
        txn.commit();

        assert!(delegate.get(&key(9)).is_none());
    }

    #[test]
    fn get_is_invisible_after_clear_even_before_commit() {
        let delegate: Arc<dyn Cache> = Arc::new(PerpetualCache::new("ns"));
        delegate.put(key(9), Arc::new(Value::Int(9)));

        let txn = TransactionalCache::new(delegate.clone());
        txn.clear();

        assert!(txn.get(&key(9)).is_none());
        assert_eq!(delegate.get(&key(9)), Some(Arc::new(Value::Int(9))));
    }
}
