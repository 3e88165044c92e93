//! `MappedStatement` (spec.md §3): the compiled, immutable representation
//! of one `<select|insert|update|delete>`.

use std::sync::Arc;

use sqlmapper_core::cache::Cache;
use sqlmapper_core::SqlSource;

use crate::driver::RowBounds;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Select,
    Insert,
    Update,
    Delete,
    Flush,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementStrategy {
    Simple,
    Prepared,
    Callable,
}

/// How the driver reports generated keys back to the caller (spec.md §6
/// `useGeneratedKeys`/`keyProperty`/`keyColumn`).
#[derive(Debug, Clone)]
pub enum KeyGenerator {
    NoOp,
    /// Columns reported by the driver's `getGeneratedKeys()`, written back
    /// to the parallel `keyProperty` dot-paths (composite keys supported by
    /// having more than one entry in each list — SPEC_FULL.md §3).
    Generated {
        key_columns: Vec<String>,
        key_properties: Vec<String>,
    },
}

pub struct MappedStatement {
    pub id: String,
    pub kind: StatementKind,
    pub strategy: StatementStrategy,
    pub sql_source: SqlSource,
    pub result_map_ids: Vec<String>,
    /// Names a result-set id for each entry in `result_map_ids` beyond the
    /// first, for multi-result-set linkage (spec.md §4.3).
    pub result_sets: Vec<Option<String>>,
    pub namespace_cache: Option<Arc<dyn Cache>>,
    pub key_generator: KeyGenerator,
    pub flush_cache: bool,
    pub use_cache: bool,
    pub timeout: Option<u32>,
    pub result_ordered: bool,
    pub row_bounds: RowBounds,
}

impl MappedStatement {
    pub fn namespace(&self) -> &str {
        self.id.split('.').next().unwrap_or(&self.id)
    }
}
