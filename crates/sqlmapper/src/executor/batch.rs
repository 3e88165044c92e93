//! `BatchExecutor` (spec.md §4.4): groups consecutive writes against the
//! same SQL text onto one statement via `addBatch`, flushing them together
//! on `doFlushStatements`. A `SELECT` interleaved mid-batch first flushes
//! the pending writes, then runs as a one-shot statement.

use sqlmapper_core::Result;
use sqlmapper_core::Value;

use super::{BaseExecutor, QueryHandle, StatementExecutor};
use crate::config::Configuration;
use crate::driver::{Connection, Statement};
use crate::mapped_statement::MappedStatement;
use crate::statement_handler;

pub type BatchExecutor = BaseExecutor<BatchStrategy>;

/// One statement's batched-write outcome (spec.md §4.4 "doFlushStatements
/// ... returns a list of BatchResult").
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub sql: String,
    pub update_counts: Vec<i64>,
}

struct PendingBatch {
    sql: String,
    statement: Box<dyn Statement>,
}

#[derive(Default)]
pub struct BatchStrategy {
    pending: Vec<PendingBatch>,
}

impl StatementExecutor for BatchStrategy {
    fn do_update(
        &mut self,
        connection: &mut dyn Connection,
        config: &Configuration,
        statement: &MappedStatement,
        parameter: &mut Value,
    ) -> Result<u64> {
        let bound_sql = statement.sql_source.get_bound_sql(parameter, config.database_id.as_deref());

        let reuse_last = matches!(self.pending.last(), Some(last) if last.sql == bound_sql.sql);
        if !reuse_last {
            let handle = statement_handler::prepare(connection, statement, &bound_sql)?;
            self.pending.push(PendingBatch {
                sql: bound_sql.sql.clone(),
                statement: handle,
            });
        }

        let entry = self.pending.last_mut().expect("just ensured a pending batch exists");
        statement_handler::parameterize(entry.statement.as_mut(), &bound_sql, parameter, &config.type_handlers)?;
        entry.statement.add_batch()?;
        // Generated-key write-back for batched rows isn't observable until
        // the batch is flushed; JDBC drivers don't report per-row keys
        // before `executeBatch`, so no value is written back here.
        Ok(0)
    }

    fn do_query(
        &mut self,
        connection: &mut dyn Connection,
        config: &Configuration,
        statement: &MappedStatement,
        parameter: &Value,
    ) -> Result<QueryHandle> {
        self.do_flush_statements(connection, false)?;

        let bound_sql = statement.sql_source.get_bound_sql(parameter, config.database_id.as_deref());
        let mut handle = statement_handler::prepare(connection, statement, &bound_sql)?;
        statement_handler::parameterize(handle.as_mut(), &bound_sql, parameter, &config.type_handlers)?;
        let result_set = handle.execute_query()?;
        Ok(QueryHandle::Owned(handle, result_set))
    }

    fn do_flush_statements(&mut self, _connection: &mut dyn Connection, is_rollback: bool) -> Result<Vec<BatchResult>> {
        let pending = std::mem::take(&mut self.pending);
        if is_rollback {
            for mut entry in pending {
                entry.statement.close()?;
            }
            return Ok(Vec::new());
        }

        let mut results = Vec::with_capacity(pending.len());
        for mut entry in pending {
            let update_counts = entry.statement.execute_batch()?;
            entry.statement.close()?;
            results.push(BatchResult {
                sql: entry.sql,
                update_counts,
            });
        }
        Ok(results)
    }
}
