//! The cache layer (spec.md §3/§4.2): [`CacheKey`] identity plus the
//! `Cache` decorator stack (Perpetual base + LRU/FIFO/Scheduled/Soft/Weak/
//! Serialized/Blocking/Synchronized/Logging), terminating in
//! [`transactional::TransactionalCache`] for per-session staging.

mod blocking;
mod fifo;
mod key;
mod logging;
mod lru;
mod perpetual;
mod scheduled;
mod serialized;
mod soft_weak;
mod synchronized;
pub mod transactional;

pub use blocking::BlockingCache;
pub use fifo::FifoCache;
pub use key::CacheKey;
pub use logging::LoggingCache;
pub use lru::LruCache;
pub use perpetual::PerpetualCache;
pub use scheduled::ScheduledCache;
pub use serialized::SerializedCache;
pub use soft_weak::{SoftCache, WeakCache};
pub use synchronized::SynchronizedCache;
pub use transactional::TransactionalCache;

use std::sync::Arc;

use crate::value::Value;

/// A cached query result or OUT-parameter object; always behind an `Arc` so
/// the soft/weak decorators can hand out references without copying while
/// still letting the cache's own strong reference lapse.
pub type CacheValue = Arc<Value>;

/// Capability shared by every cache variant (spec.md §3 "Cache (variants,
/// decorator stack)"). Decorators compose by holding an `Arc<dyn Cache>`
/// delegate and forwarding through their own policy.
pub trait Cache: Send + Sync {
    fn id(&self) -> &str;
    fn put(&self, key: CacheKey, value: CacheValue);
    fn get(&self, key: &CacheKey) -> Option<CacheValue>;
    fn remove(&self, key: &CacheKey) -> Option<CacheValue>;
    fn clear(&self);
    fn size(&self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eviction {
    Lru,
    Fifo,
    Soft,
    Weak,
}

/// Configuration for the namespace cache stack, matching the `<cache>`
/// attributes in spec.md §6.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub eviction: Eviction,
    pub size: usize,
    pub flush_interval: Option<std::time::Duration>,
    pub read_only: bool,
    pub blocking: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            eviction: Eviction::Lru,
            size: 1024,
            flush_interval: None,
            read_only: false,
            blocking: false,
        }
    }
}

/// Builds the decorator stack for one namespace cache, in the declared
/// order from spec.md §4.2: "mandatory base + LRU (or declared eviction) +
/// Scheduled (if flushInterval) + Serialized (if readWrite=false ... i.e.
/// copies required when read-only=true) + Synchronized + Logging".
pub fn build_namespace_cache(id: String, config: &CacheConfig) -> Arc<dyn Cache> {
    let mut cache: Arc<dyn Cache> = Arc::new(PerpetualCache::new(id.clone()));

    cache = match config.eviction {
        Eviction::Lru => Arc::new(LruCache::new(cache, config.size)),
        Eviction::Fifo => Arc::new(FifoCache::new(cache, config.size)),
        Eviction::Soft => Arc::new(SoftCache::new(cache, config.size)),
        Eviction::Weak => Arc::new(WeakCache::new(cache)),
    };

    if let Some(interval) = config.flush_interval {
        cache = Arc::new(ScheduledCache::new(cache, interval));
    }

    if config.blocking {
        cache = Arc::new(BlockingCache::new(cache));
    }

    if config.read_only {
        cache = Arc::new(SerializedCache::new(cache));
    }

    cache = Arc::new(SynchronizedCache::new(cache));
    Arc::new(LoggingCache::new(cache, id))
}
