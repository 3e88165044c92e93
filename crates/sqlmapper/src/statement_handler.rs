//! Prepare/parameterize/execute and generated-key write-back (spec.md §4.4
//! "Statement handlers"). This is plain functions rather than a
//! `SimpleStatementHandler`/`PreparedStatementHandler`/
//! `CallableStatementHandler` trio: the statement *strategy* only changes
//! which `Connection` method builds the `Statement`, so the shared logic
//! below (parameterize, execute, key write-back) is factored once.

use sqlmapper_core::meta_object::{MetaObject, MetaObjectMut};
use sqlmapper_core::parameter::ParamMode;
use sqlmapper_core::{BoundSql, Result, TypeHandlerRegistry, Value};

use crate::driver::{Connection, GeneratedKeysMode, Statement};
use crate::mapped_statement::{KeyGenerator, MappedStatement, StatementStrategy};

pub fn prepare(connection: &mut dyn Connection, statement: &MappedStatement, bound_sql: &BoundSql) -> Result<Box<dyn Statement>> {
    let generated_keys = match &statement.key_generator {
        KeyGenerator::Generated { key_columns, .. } => GeneratedKeysMode::ReturnColumns(key_columns.clone()),
        KeyGenerator::NoOp => GeneratedKeysMode::None,
    };

    let mut handle = match statement.strategy {
        StatementStrategy::Callable => connection.create_callable(&bound_sql.sql)?,
        StatementStrategy::Simple | StatementStrategy::Prepared => connection.prepare(&bound_sql.sql, generated_keys)?,
    };

    if let Some(timeout) = statement.timeout {
        handle.set_query_timeout(timeout)?;
    }
    Ok(handle)
}

/// Binds every non-OUT `ParameterMapping` by resolving its property path
/// against `parameter` via `MetaObject`, converting through the mapping's
/// (or an inferred) type handler.
pub fn parameterize(
    statement: &mut dyn Statement,
    bound_sql: &BoundSql,
    parameter: &Value,
    type_handlers: &TypeHandlerRegistry,
) -> Result<()> {
    let meta = MetaObject::new(parameter);
    for (index, mapping) in bound_sql.parameter_mappings.iter().enumerate() {
        if mapping.mode == ParamMode::Out {
            continue;
        }
        let value = meta.get(&mapping.property).cloned().unwrap_or(Value::Null);
        let handler = mapping.type_handler.clone().unwrap_or_else(|| type_handlers.infer(&value));
        statement.set_parameter(index, &handler.to_driver(&value), mapping.jdbc_type.as_ref())?;
    }
    Ok(())
}

/// Writes driver-reported generated keys back into `parameter` at each
/// `keyProperty` dot-path, in lockstep with the driver's `keyColumn` list
/// (spec.md §6: "generated-keys column values written back into the
/// parameter object at `keyProperty` paths").
pub fn write_generated_keys(statement: &mut dyn Statement, key_generator: &KeyGenerator, parameter: &mut Value) -> Result<()> {
    let KeyGenerator::Generated { key_properties, .. } = key_generator else {
        return Ok(());
    };
    let mut keys = statement.generated_keys()?;
    if keys.next()? {
        let mut meta = MetaObjectMut::new(parameter);
        for (index, property) in key_properties.iter().enumerate() {
            let value = keys.get_by_index(index)?;
            meta.set(property, value);
        }
    }
    keys.close()
}
