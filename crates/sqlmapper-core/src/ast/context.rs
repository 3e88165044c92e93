//! [`DynamicContext`] (spec.md §3): the accumulator threaded through
//! `SqlNode::apply` during one AST evaluation.

use sqlmapper_helpers::IndexMap;

use crate::value::Value;

pub struct DynamicContext {
    bindings: Value,
    sql: String,
    unique_counter: u32,
}

impl DynamicContext {
    /// Seeds the context with `_parameter` and `_databaseId`, and (per
    /// spec.md §4.1) exposes a simple-typed parameter as `value` as well so
    /// `${value}` works for scalar parameters.
    pub fn new(parameter: Value, database_id: Option<&str>) -> Self {
        let mut bindings = match &parameter {
            Value::Map(map) => map.clone(),
            _ => IndexMap::default(),
        };
        bindings.insert("_parameter".to_string(), parameter.clone());
        bindings.insert(
            "_databaseId".to_string(),
            database_id.map(Value::from).unwrap_or(Value::Null),
        );
        if !matches!(parameter, Value::Map(_)) {
            bindings.insert("value".to_string(), parameter);
        }
        Self {
            bindings: Value::Map(bindings),
            sql: String::new(),
            unique_counter: 0,
        }
    }

    pub fn bindings(&self) -> &Value {
        &self.bindings
    }

    pub fn bind(&mut self, name: &str, value: Value) {
        if let Value::Map(map) = &mut self.bindings {
            map.insert(name.to_string(), value);
        }
    }

    pub fn unbind(&mut self, name: &str) {
        if let Value::Map(map) = &mut self.bindings {
            map.shift_remove(name);
        }
    }

    /// Appends `text` to the SQL buffer, joined by a single space, matching
    /// spec.md §3's "SQL buffer joined by single spaces".
    pub fn append_sql(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if !self.sql.is_empty() {
            self.sql.push(' ');
        }
        self.sql.push_str(text);
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Runs `f` against a private, empty SQL buffer and returns whatever it
    /// produced, leaving this context's own buffer untouched. Used by
    /// `<trim>`/`<where>`/`<set>`/`<foreach>` to post-process a body's
    /// output before splicing it back in.
    pub fn capture(&mut self, f: impl FnOnce(&mut Self)) -> String {
        let saved = std::mem::take(&mut self.sql);
        f(self);
        std::mem::replace(&mut self.sql, saved)
    }

    pub fn into_sql(self) -> String {
        self.sql
    }

    /// Allocates a fresh, monotonically increasing number used to uniquify
    /// `#{item}` placeholders inside `<foreach>` iterations (spec.md §3/§4.1).
    pub fn next_unique_number(&mut self) -> u32 {
        let n = self.unique_counter;
        self.unique_counter += 1;
        n
    }
}
