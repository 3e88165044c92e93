//! `ReuseExecutor` (spec.md §4.4): keeps one open statement per distinct
//! `?`-form SQL text for the life of the executor, reusing it across calls
//! with the same text instead of re-preparing.

use sqlmapper_core::Result;
use sqlmapper_core::Value;
use sqlmapper_helpers::IndexMap;

use super::{BaseExecutor, BatchResult, QueryHandle, StatementExecutor};
use crate::config::Configuration;
use crate::driver::{Connection, Statement};
use crate::mapped_statement::MappedStatement;
use crate::statement_handler;

pub type ReuseExecutor = BaseExecutor<ReuseStrategy>;

#[derive(Default)]
pub struct ReuseStrategy {
    statements: IndexMap<String, Box<dyn Statement>>,
}

impl ReuseStrategy {
    fn statement_for(
        &mut self,
        connection: &mut dyn Connection,
        statement: &MappedStatement,
        sql: &str,
    ) -> Result<&mut Box<dyn Statement>> {
        if !self.statements.contains_key(sql) {
            let bound_sql = sqlmapper_core::BoundSql {
                sql: sql.to_string(),
                parameter_mappings: Vec::new(),
            };
            let handle = statement_handler::prepare(connection, statement, &bound_sql)?;
            self.statements.insert(sql.to_string(), handle);
        }
        Ok(self.statements.get_mut(sql).expect("just inserted"))
    }
}

impl StatementExecutor for ReuseStrategy {
    fn do_update(
        &mut self,
        connection: &mut dyn Connection,
        config: &Configuration,
        statement: &MappedStatement,
        parameter: &mut Value,
    ) -> Result<u64> {
        let bound_sql = statement.sql_source.get_bound_sql(parameter, config.database_id.as_deref());
        let handle = self.statement_for(connection, statement, &bound_sql.sql)?;
        statement_handler::parameterize(handle.as_mut(), &bound_sql, parameter, &config.type_handlers)?;
        let count = handle.execute_update()?;
        statement_handler::write_generated_keys(handle.as_mut(), &statement.key_generator, parameter)?;
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
        let handle = self.statement_for(connection, statement, &bound_sql.sql)?;
        statement_handler::parameterize(handle.as_mut(), &bound_sql, parameter, &config.type_handlers)?;
        let result_set = handle.execute_query()?;
        Ok(QueryHandle::Borrowed(result_set))
    }

    fn do_flush_statements(&mut self, _connection: &mut dyn Connection, _is_rollback: bool) -> Result<Vec<BatchResult>> {
        for (_, mut handle) in self.statements.drain(..) {
            handle.close()?;
        }
        Ok(Vec::new())
    }
}
