//! Lazy loading (spec.md §9 "Lazy loading"): a materialized row holds an
//! opaque handle carrying its pending nested queries instead of a
//! subclassed proxy object.

use std::sync::Mutex;

use sqlmapper_core::{Result, Value};

type LoadFn = dyn FnOnce() -> Result<Value> + Send;

enum Slot {
    Pending(Box<LoadFn>),
    Loaded(Value),
    Failed(String),
}

/// Carried by a materialized row for each property that was registered as
/// a lazy nested query. `resolve` loads (and memoizes) on first access;
/// later calls return the cached value without re-querying.
pub struct LazyLoaderHandle {
    property: String,
    slot: Mutex<Option<Slot>>,
}

impl LazyLoaderHandle {
    pub fn new(property: impl Into<String>, load: impl FnOnce() -> Result<Value> + Send + 'static) -> Self {
        Self {
            property: property.into(),
            slot: Mutex::new(Some(Slot::Pending(Box::new(load)))),
        }
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    pub fn is_loaded(&self) -> bool {
        matches!(*self.slot.lock().unwrap(), Some(Slot::Loaded(_)))
    }

    /// Resolves on first call; every later call returns the memoized result
    /// (or re-raises the memoized failure, matching spec.md §7's
    /// propagation policy that a triggering getter's failure reaches its
    /// caller).
    pub fn resolve(&self) -> Result<Value> {
        let mut guard = self.slot.lock().unwrap();
        match guard.take() {
            Some(Slot::Loaded(value)) => {
                *guard = Some(Slot::Loaded(value.clone()));
                Ok(value)
            }
            Some(Slot::Failed(message)) => {
                *guard = Some(Slot::Failed(message.clone()));
                Err(sqlmapper_core::error::DriverError::new(message).into())
            }
            Some(Slot::Pending(load)) => match load() {
                Ok(value) => {
                    *guard = Some(Slot::Loaded(value.clone()));
                    Ok(value)
                }
                Err(err) => {
                    let message = err.to_string();
                    *guard = Some(Slot::Failed(message));
                    Err(err)
                }
            },
            None => unreachable!("slot is always restored before releasing the lock"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn resolves_once_and_memoizes() {
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_clone = calls.clone();
        let handle = LazyLoaderHandle::new("comments", move || {
            calls_clone.fetch_add(1, Ordering::SeqCst);
            Ok(Value::Int(7))
        });

        assert!(!handle.is_loaded());
        assert_eq!(handle.resolve().unwrap(), Value::Int(7));
        assert_eq!(handle.resolve().unwrap(), Value::Int(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(handle.is_loaded());
    }
}
