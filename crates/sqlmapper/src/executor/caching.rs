//! `CachingExecutor` (spec.md §4.4): wraps any `Executor` and adds
//! namespace-scoped L2 participation via one `TransactionalCache` per
//! touched namespace, so writes from an uncommitted session stay invisible
//! to other sessions until `commit`.

use std::cell::RefCell;
use std::sync::Arc;

use sqlmapper_core::cache::{Cache, TransactionalCache};
use sqlmapper_core::Result;
use sqlmapper_core::Value;
use sqlmapper_helpers::IndexMap;

use super::{compute_cache_key, rows_from_cached, BatchResult, Executor};
use crate::config::Configuration;
use crate::driver::RowBounds;
use crate::mapped_statement::MappedStatement;
use crate::result_map::ResultMap;
use crate::result_mapper::{NestedQueryRunner, ResultCursor};

pub struct CachingExecutor {
    inner: Box<dyn Executor>,
    config: Arc<Configuration>,
    transactional_caches: RefCell<IndexMap<String, Arc<TransactionalCache>>>,
}

impl CachingExecutor {
    pub fn new(inner: Box<dyn Executor>, config: Arc<Configuration>) -> Self {
        Self {
            inner,
            config,
            transactional_caches: RefCell::new(IndexMap::default()),
        }
    }

    /// Gets or lazily creates this session's transactional staging cache
    /// for `namespace`. Wrapped in `Arc` so the borrow on
    /// `transactional_caches` can be released before the (possibly
    /// recursive, via a nested query) call that follows.
    fn transactional_cache(&self, namespace: &str, delegate: Arc<dyn Cache>) -> Arc<TransactionalCache> {
        let mut caches = self.transactional_caches.borrow_mut();
        caches
            .entry(namespace.to_string())
            .or_insert_with(|| Arc::new(TransactionalCache::new(delegate)))
            .clone()
    }
}

impl Executor for CachingExecutor {
    fn query(
        &self,
        statement: &MappedStatement,
        parameter: &Value,
        row_bounds: RowBounds,
        result_map: &ResultMap,
        runner: &dyn NestedQueryRunner,
    ) -> Result<Vec<Value>> {
        let Some(l2) = self.config.namespace_cache(statement.namespace()) else {
            return self.inner.query(statement, parameter, row_bounds, result_map, runner);
        };
        let txn = self.transactional_cache(statement.namespace(), l2);

        if statement.flush_cache {
            txn.clear();
        }
        if !statement.use_cache {
            return self.inner.query(statement, parameter, row_bounds, result_map, runner);
        }

        let key = compute_cache_key(&self.config, statement, parameter, row_bounds);
        if let Some(cached) = txn.get(&key) {
            return Ok(rows_from_cached(&cached));
        }

        let rows = self.inner.query(statement, parameter, row_bounds, result_map, runner)?;
        txn.put(key, Arc::new(Value::List(rows.clone())));
        Ok(rows)
    }

    fn query_cursor<'e>(
        &'e self,
        statement: &MappedStatement,
        parameter: &Value,
        row_bounds: RowBounds,
        result_map: Arc<ResultMap>,
        runner: &'e dyn NestedQueryRunner,
    ) -> Result<ResultCursor<'e>> {
        self.inner.query_cursor(statement, parameter, row_bounds, result_map, runner)
    }

    fn update(&self, statement: &MappedStatement, parameter: &mut Value) -> Result<u64> {
        if statement.flush_cache {
            if let Some(l2) = self.config.namespace_cache(statement.namespace()) {
                self.transactional_cache(statement.namespace(), l2).clear();
            }
        }
        self.inner.update(statement, parameter)
    }

    fn flush_statements(&self, is_rollback: bool) -> Result<Vec<BatchResult>> {
        self.inner.flush_statements(is_rollback)
    }

    fn commit(&self) -> Result<()> {
        self.inner.commit()?;
        for txn in self.transactional_caches.borrow().values() {
            txn.commit();
        }
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        self.inner.rollback()?;
        for txn in self.transactional_caches.borrow().values() {
            txn.rollback();
        }
        Ok(())
    }

    fn close(&self) {
        self.inner.close();
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}
