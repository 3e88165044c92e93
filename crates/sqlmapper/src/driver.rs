//! The driver contract this crate consumes (spec.md §6: "Driver contract
//! (consumed)"). The connection pool, transaction manager, and the actual
//! JDBC-style driver are external collaborators; this module only states
//! the shape they must expose.

use sqlmapper_core::parameter::JdbcType;
use sqlmapper_core::{Result, Value};

/// `rowBounds.offset`/`rowBounds.limit` (spec.md §4.3 step 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowBounds {
    pub offset: usize,
    pub limit: Option<usize>,
}

impl RowBounds {
    pub const NO_BOUNDS: RowBounds = RowBounds {
        offset: 0,
        limit: None,
    };
}

impl Default for RowBounds {
    fn default() -> Self {
        Self::NO_BOUNDS
    }
}

/// Whether the driver should report generated keys, and which columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GeneratedKeysMode {
    None,
    ReturnColumns(Vec<String>),
}

/// One column's static metadata, as reported by a `ResultSet`.
#[derive(Debug, Clone)]
pub struct ColumnMeta {
    pub name: String,
    pub label: String,
    pub jdbc_type: JdbcType,
}

/// A forward-only (and, where `absolute` succeeds, randomly positionable)
/// cursor over one result-set (spec.md §6: "ResultSet: next, absolute,
/// wasNull, getObject-by-index/name, metadata ... close").
pub trait ResultSet: Send {
    fn next(&mut self) -> Result<bool>;

    /// Attempts to seek to `row` (0-based) directly; drivers that only
    /// support forward-only cursors return `Ok(false)` and the caller falls
    /// back to sequential skipping (spec.md §4.3 step 1: "using absolute
    /// positioning when driver supports it, else sequential").
    fn absolute(&mut self, row: usize) -> Result<bool>;

    fn was_null(&self) -> bool;
    fn get_by_index(&mut self, index: usize) -> Result<Value>;
    fn get_by_name(&mut self, name: &str) -> Result<Value>;
    fn metadata(&self) -> &[ColumnMeta];
    fn close(&mut self) -> Result<()>;
}

/// A prepared or simple statement (spec.md §6: "Statement/PreparedStatement:
/// setParameter-by-index, execute / executeUpdate / executeQuery /
/// addBatch / executeBatch, getResultSet, getMoreResults, getUpdateCount,
/// getGeneratedKeys, setQueryTimeout, close").
pub trait Statement: Send {
    fn set_parameter(&mut self, index: usize, value: &Value, jdbc_type: Option<&JdbcType>) -> Result<()>;

    /// Returns `true` when the first result is a result-set rather than an
    /// update count (mirrors JDBC `execute()`).
    fn execute(&mut self) -> Result<bool>;
    fn execute_update(&mut self) -> Result<u64>;
    fn execute_query(&mut self) -> Result<Box<dyn ResultSet>>;

    fn add_batch(&mut self) -> Result<()>;
    fn execute_batch(&mut self) -> Result<Vec<i64>>;

    fn result_set(&mut self) -> Result<Option<Box<dyn ResultSet>>>;
    fn more_results(&mut self) -> Result<bool>;
    fn update_count(&mut self) -> Result<i64>;
    fn generated_keys(&mut self) -> Result<Box<dyn ResultSet>>;

    fn set_query_timeout(&mut self, seconds: u32) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}

/// A driver connection (spec.md §6: "Connection exposes: prepare(sql,
/// generated-keys-mode | column-names) / createStatement(resultSetType,
/// CONCUR_READ_ONLY) / createCallable(sql); supports-multiple-result-sets
/// metadata").
pub trait Connection: Send {
    fn prepare(&mut self, sql: &str, generated_keys: GeneratedKeysMode) -> Result<Box<dyn Statement>>;
    fn create_statement(&mut self) -> Result<Box<dyn Statement>>;
    fn create_callable(&mut self, sql: &str) -> Result<Box<dyn Statement>>;
    fn supports_multiple_result_sets(&self) -> bool;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;
    fn close(&mut self) -> Result<()>;
}

/// Supplies connections (the connection pool's external contract). Pooling
/// policy itself is out of scope (spec.md §1 Non-goals).
pub trait DataSource: Send + Sync {
    fn get_connection(&self) -> Result<Box<dyn Connection>>;
}
