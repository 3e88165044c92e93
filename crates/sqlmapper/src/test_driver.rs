//! An in-memory fake driver (spec.md §6 driver contract) used by this
//! crate's own tests so `BaseExecutor`/`CachingExecutor`/`result_mapper` can
//! be exercised end to end without a real JDBC-style connection. Not part
//! of the public driver contract — purely test scaffolding, so it lives
//! outside `#[cfg(test)]` only because it's shared across several modules'
//! test code.

use std::collections::HashMap;

use sqlmapper_core::parameter::JdbcType;
use sqlmapper_core::{Result, Value};
use sqlmapper_helpers::IndexMap;

use crate::driver::{ColumnMeta, Connection, DataSource, GeneratedKeysMode, ResultSet, Statement};

/// One canned answer for a SQL string: rows for a `SELECT`, or an affected
/// row count for a write.
#[derive(Clone)]
pub enum FakeResponse {
    Rows(Vec<Value>),
    Update(u64),
}

/// Builds `FakeConnection`s that all share one script of canned responses,
/// keyed by exact bound SQL text.
#[derive(Default, Clone)]
pub struct FakeDataSource {
    script: HashMap<String, FakeResponse>,
    generated_keys: HashMap<String, Vec<Value>>,
}

impl FakeDataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(mut self, sql: impl Into<String>, response: FakeResponse) -> Self {
        self.script.insert(sql.into(), response);
        self
    }

    /// Rows `getGeneratedKeys()` reports back after an `Update` response for
    /// the given SQL.
    pub fn with_generated_keys(mut self, sql: impl Into<String>, keys: Vec<Value>) -> Self {
        self.generated_keys.insert(sql.into(), keys);
        self
    }
}

impl DataSource for FakeDataSource {
    fn get_connection(&self) -> Result<Box<dyn Connection>> {
        Ok(Box::new(FakeConnection {
            script: self.script.clone(),
            generated_keys: self.generated_keys.clone(),
        }))
    }
}

pub struct FakeConnection {
    script: HashMap<String, FakeResponse>,
    generated_keys: HashMap<String, Vec<Value>>,
}

impl Connection for FakeConnection {
    fn prepare(&mut self, sql: &str, _generated_keys: GeneratedKeysMode) -> Result<Box<dyn Statement>> {
        Ok(Box::new(FakeStatement {
            sql: sql.to_string(),
            response: self.script.get(sql).cloned(),
            generated_keys: self.generated_keys.get(sql).cloned().unwrap_or_default(),
            batched: Vec::new(),
        }))
    }

    fn create_statement(&mut self) -> Result<Box<dyn Statement>> {
        self.prepare("", GeneratedKeysMode::None)
    }

    fn create_callable(&mut self, sql: &str) -> Result<Box<dyn Statement>> {
        self.prepare(sql, GeneratedKeysMode::None)
    }

    fn supports_multiple_result_sets(&self) -> bool {
        false
    }

    fn commit(&mut self) -> Result<()> {
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

pub struct FakeStatement {
    sql: String,
    response: Option<FakeResponse>,
    generated_keys: Vec<Value>,
    batched: Vec<u64>,
}

impl FakeStatement {
    pub fn sql(&self) -> &str {
        &self.sql
    }
}

impl Statement for FakeStatement {
    fn set_parameter(&mut self, _index: usize, _value: &Value, _jdbc_type: Option<&JdbcType>) -> Result<()> {
        Ok(())
    }

    fn execute(&mut self) -> Result<bool> {
        Ok(matches!(self.response, Some(FakeResponse::Rows(_))))
    }

    fn execute_update(&mut self) -> Result<u64> {
        match &self.response {
            Some(FakeResponse::Update(count)) => Ok(*count),
            _ => Ok(0),
        }
    }

    fn execute_query(&mut self) -> Result<Box<dyn ResultSet>> {
        let rows = match &self.response {
            Some(FakeResponse::Rows(rows)) => rows.clone(),
            _ => Vec::new(),
        };
        Ok(Box::new(FakeResultSet::new(rows)))
    }

    fn add_batch(&mut self) -> Result<()> {
        let count = match &self.response {
            Some(FakeResponse::Update(count)) => *count,
            _ => 0,
        };
        self.batched.push(count);
        Ok(())
    }

    fn execute_batch(&mut self) -> Result<Vec<i64>> {
        Ok(self.batched.drain(..).map(|count| count as i64).collect())
    }

    fn result_set(&mut self) -> Result<Option<Box<dyn ResultSet>>> {
        Ok(None)
    }

    fn more_results(&mut self) -> Result<bool> {
        Ok(false)
    }

    fn update_count(&mut self) -> Result<i64> {
        match &self.response {
            Some(FakeResponse::Update(count)) => Ok(*count as i64),
            _ => Ok(-1),
        }
    }

    fn generated_keys(&mut self) -> Result<Box<dyn ResultSet>> {
        Ok(Box::new(FakeResultSet::new(self.generated_keys.clone())))
    }

    fn set_query_timeout(&mut self, _seconds: u32) -> Result<()> {
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

pub struct FakeResultSet {
    rows: Vec<Value>,
    columns: Vec<ColumnMeta>,
    cursor: Option<usize>,
    last_value: Option<Value>,
}

impl FakeResultSet {
    pub fn new(rows: Vec<Value>) -> Self {
        let columns = rows
            .first()
            .and_then(|row| match row {
                Value::Map(map) => Some(
                    map.keys()
                        .map(|name| ColumnMeta {
                            name: name.clone(),
                            label: name.clone(),
                            jdbc_type: JdbcType::Varchar,
                        })
                        .collect(),
                ),
                _ => None,
            })
            .unwrap_or_default();
        Self {
            rows,
            columns,
            cursor: None,
            last_value: None,
        }
    }

    fn current_row(&self) -> Option<&IndexMap<String, Value>> {
        match self.rows.get(self.cursor?) {
            Some(Value::Map(map)) => Some(map),
            _ => None,
        }
    }
}

impl ResultSet for FakeResultSet {
    fn next(&mut self) -> Result<bool> {
        let next = self.cursor.map_or(0, |cursor| cursor + 1);
        if next < self.rows.len() {
            self.cursor = Some(next);
            Ok(true)
        } else {
            self.cursor = Some(self.rows.len());
            Ok(false)
        }
    }

    fn absolute(&mut self, row: usize) -> Result<bool> {
        if row < self.rows.len() {
            self.cursor = Some(row);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn was_null(&self) -> bool {
        self.last_value.as_ref().map_or(true, Value::is_null)
    }

    fn get_by_index(&mut self, index: usize) -> Result<Value> {
        let name = self.columns.get(index).map(|column| column.name.clone());
        let value = name.and_then(|name| self.current_row().and_then(|row| row.get(&name)).cloned()).unwrap_or(Value::Null);
        self.last_value = Some(value.clone());
        Ok(value)
    }

    fn get_by_name(&mut self, name: &str) -> Result<Value> {
        let value = self.current_row().and_then(|row| row.get(name)).cloned().unwrap_or(Value::Null);
        self.last_value = Some(value.clone());
        Ok(value)
    }

    fn metadata(&self) -> &[ColumnMeta] {
        &self.columns
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: i64, name: &str) -> Value {
        let mut map = IndexMap::default();
        map.insert("id".to_string(), Value::Int(id));
        map.insert("name".to_string(), Value::from(name));
        Value::Map(map)
    }

    #[test]
    fn query_returns_scripted_rows() {
        let data_source = FakeDataSource::new().on("select 1", FakeResponse::Rows(vec![row(1, "a"), row(2, "b")]));
        let mut connection = data_source.get_connection().unwrap();
        let mut statement = connection.prepare("select 1", GeneratedKeysMode::None).unwrap();
        let mut result_set = statement.execute_query().unwrap();
        assert!(result_set.next().unwrap());
        assert_eq!(result_set.get_by_name("name").unwrap(), Value::from("a"));
        assert!(result_set.next().unwrap());
        assert_eq!(result_set.get_by_index(0).unwrap(), Value::Int(2));
        assert!(!result_set.next().unwrap());
    }

    #[test]
    fn update_returns_scripted_count() {
        let data_source = FakeDataSource::new().on("update t set x = 1", FakeResponse::Update(3));
        let mut connection = data_source.get_connection().unwrap();
        let mut statement = connection.prepare("update t set x = 1", GeneratedKeysMode::None).unwrap();
        assert_eq!(statement.execute_update().unwrap(), 3);
    }
}
