//! `SqlSession` (spec.md §4.5): the facade an application holds for the
//! life of one unit of work, tying the chosen `Executor` strategy,
//! `Configuration`, and nested-query dispatch together. Like mybatis's own
//! `SqlSession`, a session is not `Sync` across threads — callers open one
//! per request/transaction rather than sharing it.

use std::sync::Arc;

use sqlmapper_core::error::ExecutorError;
use sqlmapper_core::{MetaObject, Result, Value};
use sqlmapper_helpers::IndexMap;

use crate::config::Configuration;
use crate::driver::RowBounds;
use crate::executor::{BatchExecutor, BatchResult, CachingExecutor, Executor, ReuseExecutor, SimpleExecutor};
use crate::mapped_statement::StatementKind;
use crate::result_mapper::{NestedQueryRunner, ResultCursor};

/// Which `StatementExecutor` strategy backs a session (spec.md §4.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutorKind {
    #[default]
    Simple,
    Reuse,
    Batch,
}

pub struct SqlSession {
    executor: Box<dyn Executor>,
    config: Arc<Configuration>,
}

impl SqlSession {
    /// Opens a session against the configuration's default environment,
    /// building the requested executor strategy and layering `CachingExecutor`
    /// on top when `cacheEnabled` is set (spec.md §4.2/§4.4).
    pub fn open(config: Arc<Configuration>, kind: ExecutorKind) -> Result<Self> {
        let data_source = config.default_data_source()?;
        let connection = data_source.get_connection()?;
        let base: Box<dyn Executor> = match kind {
            ExecutorKind::Simple => Box::new(SimpleExecutor::new(connection, config.clone(), Default::default())),
            ExecutorKind::Reuse => Box::new(ReuseExecutor::new(connection, config.clone(), Default::default())),
            ExecutorKind::Batch => Box::new(BatchExecutor::new(connection, config.clone(), Default::default())),
        };
        let executor: Box<dyn Executor> = if config.settings.cache_enabled {
            Box::new(CachingExecutor::new(base, config.clone()))
        } else {
            base
        };
        Ok(Self { executor, config })
    }

    pub fn select_list(&self, statement_id: &str, parameter: Value) -> Result<Vec<Value>> {
        self.select_list_bounded(statement_id, parameter, RowBounds::NO_BOUNDS)
    }

    /// Like `select_list`, but with an explicit `rowBounds` override
    /// (spec.md §4.3 step 1).
    pub fn select_list_bounded(&self, statement_id: &str, parameter: Value, row_bounds: RowBounds) -> Result<Vec<Value>> {
        let statement = self.config.resolve_statement_for_database(statement_id)?;
        let result_map_id = statement.result_map_ids.first().ok_or(ExecutorError::NoMatchingConstructor)?;
        let result_map = self.config.result_map(result_map_id)?;
        let bounds = if row_bounds == RowBounds::NO_BOUNDS { statement.row_bounds } else { row_bounds };
        self.executor.query(&statement, &parameter, bounds, result_map.as_ref(), self)
    }

    pub fn select_one(&self, statement_id: &str, parameter: Value) -> Result<Value> {
        let mut rows = self.select_list(statement_id, parameter)?;
        match rows.len() {
            0 => Ok(Value::Null),
            1 => Ok(rows.remove(0)),
            _ => Err(ExecutorError::TooManyRows.into()),
        }
    }

    /// Builds a `Value::Map` keyed by each row's `key_property`, mirroring
    /// mybatis's `@MapKey` (SPEC_FULL.md §3 supplemented feature).
    pub fn select_map(&self, statement_id: &str, parameter: Value, key_property: &str) -> Result<Value> {
        let rows = self.select_list(statement_id, parameter)?;
        let mut by_key = IndexMap::default();
        for row in rows {
            let key = MetaObject::new(&row).get(key_property).cloned().unwrap_or(Value::Null);
            by_key.insert(key.render(), row);
        }
        Ok(Value::Map(by_key))
    }

    /// Opens a lazily-pulled cursor over a `SELECT`'s rows instead of
    /// materializing the whole result (SPEC_FULL.md §3 "cursor-based
    /// streaming reads"). Bypasses the L1/L2 caches entirely, matching the
    /// cache layer's role as a store of fully-materialized row lists. The
    /// returned cursor borrows this session for nested-query dispatch, so it
    /// cannot outlive it.
    pub fn select_cursor(&self, statement_id: &str, parameter: Value) -> Result<ResultCursor<'_>> {
        let statement = self.config.resolve_statement_for_database(statement_id)?;
        let result_map_id = statement.result_map_ids.first().ok_or(ExecutorError::NoMatchingConstructor)?;
        let result_map = self.config.result_map(result_map_id)?;
        self.executor.query_cursor(&statement, &parameter, statement.row_bounds, result_map, self)
    }

    pub fn insert(&self, statement_id: &str, parameter: &mut Value) -> Result<u64> {
        self.dispatch_write(statement_id, StatementKind::Insert, parameter)
    }

    pub fn update(&self, statement_id: &str, parameter: &mut Value) -> Result<u64> {
        self.dispatch_write(statement_id, StatementKind::Update, parameter)
    }

    pub fn delete(&self, statement_id: &str, parameter: &mut Value) -> Result<u64> {
        self.dispatch_write(statement_id, StatementKind::Delete, parameter)
    }

    fn dispatch_write(&self, statement_id: &str, expected: StatementKind, parameter: &mut Value) -> Result<u64> {
        let statement = self.config.resolve_statement_for_database(statement_id)?;
        debug_assert_eq!(statement.kind, expected, "statement {statement_id:?} is not a {expected:?}");
        self.executor.update(&statement, parameter)
    }

    pub fn flush_statements(&self) -> Result<Vec<BatchResult>> {
        self.executor.flush_statements(false)
    }

    pub fn commit(&self) -> Result<()> {
        self.executor.commit()
    }

    pub fn rollback(&self) -> Result<()> {
        self.executor.rollback()
    }

    pub fn close(&self) {
        self.executor.close();
    }

    pub fn is_closed(&self) -> bool {
        self.executor.is_closed()
    }

    pub fn configuration(&self) -> &Configuration {
        &self.config
    }
}

impl NestedQueryRunner for SqlSession {
    /// Runs a `<association>`/`<collection>` sub-select for one parent row.
    /// Always returns the sub-select's rows as a `Value::List`; the caller in
    /// `result_mapper` collapses to a single row for association mappings.
    fn run_nested_query(&self, statement_id: &str, parameter: Value) -> Result<Value> {
        let statement = self.config.resolve_statement_for_database(statement_id)?;
        let result_map_id = statement.result_map_ids.first().ok_or(ExecutorError::NoMatchingConstructor)?;
        let result_map = self.config.result_map(result_map_id)?;
        let rows = self.executor.query(&statement, &parameter, statement.row_bounds, result_map.as_ref(), self)?;
        Ok(Value::List(rows))
    }
}
