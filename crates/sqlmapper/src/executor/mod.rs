//! Executors (spec.md §4.4): `BaseExecutor` supplies L1 caching and
//! commit/rollback protocol generically over a `StatementExecutor`
//! strategy (Simple/Reuse/Batch); `CachingExecutor` wraps any `Executor`
//! with L2 participation. Per spec.md §9 "Inheritance → tagged variants",
//! the Java abstract-subclass hierarchy becomes composition here: the
//! "abstract methods" (`doUpdate`/`doQuery`/`doFlushStatements`) are a
//! small trait, and `BaseExecutor<S>` is generic over it.
//!
//! Every `Executor` method takes `&self`, not `&mut self`: a nested
//! `<association>`/`<collection>` query recurses back into the same
//! executor through `NestedQueryRunner` while the outer `query()` call is
//! still on the stack (spec.md §4.3 step (d)), which an exclusive borrow
//! would rule out. `BaseExecutor` holds its connection and strategy behind
//! `RefCell`, borrowed only for the non-recursive prepare/execute step —
//! row materialization (where the recursion happens) runs with no borrow
//! held at all.

mod batch;
mod caching;
mod reuse;
mod simple;

pub use batch::{BatchExecutor, BatchResult};
pub use caching::CachingExecutor;
pub use reuse::ReuseExecutor;
pub use simple::SimpleExecutor;

use std::cell::{Cell, RefCell};
use std::sync::Arc;

use sqlmapper_core::cache::{Cache, CacheKey, PerpetualCache};
use sqlmapper_core::error::{ExecutorError, TransactionError};
use sqlmapper_core::parameter::ParamMode;
use sqlmapper_core::{MetaObject, Result, Value};

use crate::config::{Configuration, LocalCacheScope};
use crate::driver::{Connection, ResultSet, RowBounds, Statement};
use crate::mapped_statement::MappedStatement;
use crate::result_map::ResultMap;
use crate::result_mapper::{NestedQueryRunner, ResultCursor};

/// The open result of a query, still to be mapped into rows. `Owned` means
/// the caller (`BaseExecutor`) must close both after reading; `Borrowed`
/// means the strategy (e.g. `ReuseExecutor`) keeps the statement open for
/// next time and only the result set needs closing.
pub enum QueryHandle {
    Owned(Box<dyn Statement>, Box<dyn ResultSet>),
    Borrowed(Box<dyn ResultSet>),
}

/// The "abstract methods" a concrete executor strategy must provide.
/// Deliberately stops at "produce an open result set" rather than mapping
/// rows itself — see the module doc for why.
pub trait StatementExecutor: Send {
    fn do_update(
        &mut self,
        connection: &mut dyn Connection,
        config: &Configuration,
        statement: &MappedStatement,
        parameter: &mut Value,
    ) -> Result<u64>;

    fn do_query(
        &mut self,
        connection: &mut dyn Connection,
        config: &Configuration,
        statement: &MappedStatement,
        parameter: &Value,
    ) -> Result<QueryHandle>;

    fn do_flush_statements(&mut self, connection: &mut dyn Connection, is_rollback: bool) -> Result<Vec<BatchResult>>;
}

/// The public surface every executor variant exposes (spec.md §4.4's
/// query/update/flush/commit/rollback protocol).
pub trait Executor: Send {
    fn query(
        &self,
        statement: &MappedStatement,
        parameter: &Value,
        row_bounds: RowBounds,
        result_map: &ResultMap,
        runner: &dyn NestedQueryRunner,
    ) -> Result<Vec<Value>>;

    /// Opens a lazily-pulled cursor over the same query instead of
    /// materializing it (SPEC_FULL.md §3 "cursor-based streaming reads").
    /// Bypasses L1/L2 caching entirely, matching the cache layer's role as a
    /// store of fully-materialized row lists.
    fn query_cursor<'e>(
        &'e self,
        statement: &MappedStatement,
        parameter: &Value,
        row_bounds: RowBounds,
        result_map: Arc<ResultMap>,
        runner: &'e dyn NestedQueryRunner,
    ) -> Result<ResultCursor<'e>>;

    fn update(&self, statement: &MappedStatement, parameter: &mut Value) -> Result<u64>;
    fn flush_statements(&self, is_rollback: bool) -> Result<Vec<BatchResult>>;
    fn commit(&self) -> Result<()>;
    fn rollback(&self) -> Result<()>;
    fn close(&self);
    fn is_closed(&self) -> bool;
}

/// Shared state from spec.md §3 "Executor state": L1 cache (Perpetual),
/// query-stack depth, closed flag. The "OUT-parameter cache" and
/// "deferred-load queue" named there have no work to do under this crate's
/// simplification that nested queries resolve eagerly (see `result_mapper`
/// and DESIGN.md) — `query_stack` still exists because it also gates
/// `localCacheScope=STATEMENT` clearing, which is real behavior.
pub struct BaseExecutor<S: StatementExecutor> {
    connection: RefCell<Box<dyn Connection>>,
    config: Arc<Configuration>,
    local_cache: PerpetualCache,
    query_stack: Cell<u32>,
    closed: Cell<bool>,
    strategy: RefCell<S>,
}

impl<S: StatementExecutor> BaseExecutor<S> {
    pub fn new(connection: Box<dyn Connection>, config: Arc<Configuration>, strategy: S) -> Self {
        Self {
            connection: RefCell::new(connection),
            config,
            local_cache: PerpetualCache::new("__l1__"),
            query_stack: Cell::new(0),
            closed: Cell::new(false),
            strategy: RefCell::new(strategy),
        }
    }
}

impl<S: StatementExecutor> Executor for BaseExecutor<S> {
    fn query(
        &self,
        statement: &MappedStatement,
        parameter: &Value,
        row_bounds: RowBounds,
        result_map: &ResultMap,
        runner: &dyn NestedQueryRunner,
    ) -> Result<Vec<Value>> {
        if self.closed.get() {
            return Err(ExecutorError::Closed.into());
        }
        self.query_stack.set(self.query_stack.get() + 1);
        let outcome = (|| {
            let key = compute_cache_key(&self.config, statement, parameter, row_bounds);
            if let Some(cached) = self.local_cache.get(&key) {
                return Ok(rows_from_cached(&cached));
            }

            let handle = {
                let mut connection = self.connection.borrow_mut();
                let mut strategy = self.strategy.borrow_mut();
                strategy.do_query(connection.as_mut(), &self.config, statement, parameter)?
            };

            let rows = match handle {
                QueryHandle::Owned(mut stmt, mut result_set) => {
                    let rows = crate::result_mapper::map_rows(&self.config, result_map, result_set.as_mut(), row_bounds, runner)?;
                    result_set.close()?;
                    stmt.close()?;
                    rows
                }
                QueryHandle::Borrowed(mut result_set) => {
                    let rows = crate::result_mapper::map_rows(&self.config, result_map, result_set.as_mut(), row_bounds, runner)?;
                    result_set.close()?;
                    rows
                }
            };
            self.local_cache.put(key, Arc::new(Value::List(rows.clone())));
            Ok(rows)
        })();
        self.query_stack.set(self.query_stack.get() - 1);
        if self.query_stack.get() == 0 && self.config.settings.local_cache_scope == LocalCacheScope::Statement {
            self.local_cache.clear();
        }
        outcome
    }

    fn query_cursor<'e>(
        &'e self,
        statement: &MappedStatement,
        parameter: &Value,
        row_bounds: RowBounds,
        result_map: Arc<ResultMap>,
        runner: &'e dyn NestedQueryRunner,
    ) -> Result<ResultCursor<'e>> {
        if self.closed.get() {
            return Err(ExecutorError::Closed.into());
        }
        let handle = {
            let mut connection = self.connection.borrow_mut();
            let mut strategy = self.strategy.borrow_mut();
            strategy.do_query(connection.as_mut(), &self.config, statement, parameter)?
        };
        let (owned_statement, result_set) = match handle {
            QueryHandle::Owned(stmt, result_set) => (Some(stmt), result_set),
            QueryHandle::Borrowed(result_set) => (None, result_set),
        };
        ResultCursor::open(
            self.config.clone(),
            result_map,
            row_bounds,
            statement.result_ordered,
            runner,
            owned_statement,
            result_set,
        )
    }

    fn update(&self, statement: &MappedStatement, parameter: &mut Value) -> Result<u64> {
        if self.closed.get() {
            return Err(ExecutorError::Closed.into());
        }
        self.local_cache.clear();
        let mut connection = self.connection.borrow_mut();
        let mut strategy = self.strategy.borrow_mut();
        strategy.do_update(connection.as_mut(), &self.config, statement, parameter)
    }

    fn flush_statements(&self, is_rollback: bool) -> Result<Vec<BatchResult>> {
        let mut connection = self.connection.borrow_mut();
        let mut strategy = self.strategy.borrow_mut();
        strategy.do_flush_statements(connection.as_mut(), is_rollback)
    }

    fn commit(&self) -> Result<()> {
        if self.closed.get() {
            return Err(TransactionError::CommitClosed.into());
        }
        self.flush_statements(false)?;
        self.connection.borrow_mut().commit()?;
        self.local_cache.clear();
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        if self.closed.get() {
            return Err(TransactionError::RollbackClosed.into());
        }
        self.flush_statements(true)?;
        self.connection.borrow_mut().rollback()?;
        self.local_cache.clear();
        Ok(())
    }

    fn close(&self) {
        if !self.closed.get() {
            let _ = self.connection.borrow_mut().close();
            self.closed.set(true);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

/// Builds the L1/L2 cache key from spec.md §3 "Construction sequence for a
/// query key": statement id, bounds offset/limit, the `?`-form SQL text,
/// each non-OUT parameter's effective (type-handler-converted) value, and
/// the active environment id.
pub fn compute_cache_key(config: &Configuration, statement: &MappedStatement, parameter: &Value, row_bounds: RowBounds) -> CacheKey {
    let mut key = CacheKey::new();
    key.update(statement.id.clone());
    key.update(row_bounds.offset as i64);
    key.update(row_bounds.limit.map_or(-1, |limit| limit as i64));

    let bound_sql = statement.sql_source.get_bound_sql(parameter, config.database_id.as_deref());
    key.update(bound_sql.sql.clone());

    let meta = MetaObject::new(parameter);
    for mapping in &bound_sql.parameter_mappings {
        if mapping.mode == ParamMode::Out {
            continue;
        }
        let value = meta.get(&mapping.property).cloned().unwrap_or(Value::Null);
        let handler = mapping.type_handler.clone().unwrap_or_else(|| config.type_handlers.infer(&value));
        key.update(handler.to_driver(&value));
    }

    if let Some(env_id) = &config.default_environment {
        key.update(env_id.clone());
    }
    key
}

pub fn rows_from_cached(cached: &Arc<Value>) -> Vec<Value> {
    match cached.as_ref() {
        Value::List(items) => items.clone(),
        other => vec![other.clone()],
    }
}
