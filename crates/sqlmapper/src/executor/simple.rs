//! `SimpleExecutor` (spec.md §4.4): prepares, uses, and closes a fresh
//! statement for every call. No state of its own beyond what `BaseExecutor`
//! already tracks.

use sqlmapper_core::Result;
use sqlmapper_core::Value;

use super::{BaseExecutor, BatchResult, QueryHandle, StatementExecutor};
use crate::config::Configuration;
use crate::driver::Connection;
use crate::mapped_statement::MappedStatement;
use crate::statement_handler;

pub type SimpleExecutor = BaseExecutor<SimpleStrategy>;

#[derive(Default)]
pub struct SimpleStrategy;

impl StatementExecutor for SimpleStrategy {
    fn do_update(
        &mut self,
        connection: &mut dyn Connection,
        config: &Configuration,
        statement: &MappedStatement,
        parameter: &mut Value,
    ) -> Result<u64> {
        let bound_sql = statement.sql_source.get_bound_sql(parameter, config.database_id.as_deref());
        let mut handle = statement_handler::prepare(connection, statement, &bound_sql)?;
        statement_handler::parameterize(handle.as_mut(), &bound_sql, parameter, &config.type_handlers)?;
        let count = handle.execute_update()?;
        statement_handler::write_generated_keys(handle.as_mut(), &statement.key_generator, parameter)?;
        handle.close()?;
        Ok(count)
    }

    fn do_query(
        &mut self,
        connection: &mut dyn Connection,
        config: &Configuration,
        statement: &MappedStatement,
        parameter: &Value,
    ) -> Result<QueryHandle> {
        let bound_sql = statement.sql_source.get_bound_sql(parameter, config.database_id.as_deref());
        let mut handle = statement_handler::prepare(connection, statement, &bound_sql)?;
        statement_handler::parameterize(handle.as_mut(), &bound_sql, parameter, &config.type_handlers)?;
        let result_set = handle.execute_query()?;
        Ok(QueryHandle::Owned(handle, result_set))
    }

    fn do_flush_statements(&mut self, _connection: &mut dyn Connection, _is_rollback: bool) -> Result<Vec<BatchResult>> {
        Ok(Vec::new())
    }
}
