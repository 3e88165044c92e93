//! The result-set mapper (spec.md §4.3): row→object materialization,
//! discriminator dispatch, nested result-map dedup, and multi-result-set
//! linkage.

use std::sync::Arc;

use sqlmapper_core::cache::CacheKey;
use sqlmapper_core::error::ResultMapError;
use sqlmapper_core::{Result, Value};
use sqlmapper_helpers::{IndexMap, IndexSet};

use crate::config::{AutoMappingBehavior, Configuration};
use crate::driver::{ColumnMeta, ResultSet, RowBounds, Statement};
use crate::result_map::ResultMap;

/// Runs a nested `<association>`/`<collection>` sub-query (spec.md §4.3
/// step (d): "for nested query mappings, call the executor recursively").
/// Implemented by whatever owns the executor, to avoid this module
/// depending on the executor module directly.
pub trait NestedQueryRunner {
    fn run_nested_query(&self, statement_id: &str, parameter: Value) -> Result<Value>;
}

struct MapperState {
    objects: IndexMap<CacheKey, Value>,
    order: Vec<CacheKey>,
}

/// Drives the per-row loop of spec.md §4.3 against one result-map, honoring
/// `rowBounds`, the discriminator chain, nested result-map dedup, and
/// (non-transparent) nested-query resolution.
///
/// Simplification (recorded in DESIGN.md): every materialized row is a
/// `Value::Map` property bag rather than a constructed host object, so
/// "constructor mapping" and "property mapping" both just populate the map
/// — there is no constructor to invoke. A `lazy` nested-query mapping is
/// still resolved eagerly; `LazyLoaderHandle` exists as a standalone
/// capability (see `crate::lazy`) but isn't wired in here, since `Value`
/// has no slot for an opaque handle.
pub fn map_rows(
    config: &Configuration,
    result_map: &ResultMap,
    result_set: &mut dyn ResultSet,
    row_bounds: RowBounds,
    runner: &dyn NestedQueryRunner,
) -> Result<Vec<Value>> {
    let mut state = MapperState {
        objects: IndexMap::default(),
        order: Vec::new(),
    };

    skip_to_offset(result_set, row_bounds.offset)?;

    let mut emitted = 0usize;
    while result_set.next()? {
        if let Some(limit) = row_bounds.limit {
            if emitted >= limit {
                break;
            }
        }
        let row = extract_row(config, result_set)?;
        let effective_map = resolve_effective_result_map(config, result_map, &row)?;
        apply_result_map(&mut state, config, effective_map, &row, None, runner, true)?;
        emitted += 1;
    }

    Ok(state
        .order
        .iter()
        .map(|key| state.objects.get(key).cloned().unwrap_or(Value::Null))
        .collect())
}

/// Applies `foreign_column`/`column` linkage for a `resultSet`-named
/// mapping, matching spec.md §4.3 "Multi-result-set linkage": each child
/// row's key column is matched against the parent's own column to find
/// which parent gets it set/appended.
pub fn link_result_set(
    parent_rows: &mut [Value],
    parent_column: &str,
    foreign_column: &str,
    property: &str,
    is_collection: bool,
    child_rows: Vec<IndexMap<String, Value>>,
) {
    for parent in parent_rows.iter_mut() {
        let Value::Map(parent_map) = parent else { continue };
        let Some(parent_key_value) = parent_map.get(parent_column).cloned() else {
            continue;
        };
        let matches: Vec<Value> = child_rows
            .iter()
            .filter(|row| row.get(foreign_column) == Some(&parent_key_value))
            .map(|row| Value::Map(row.clone()))
            .collect();
        if matches.is_empty() {
            continue;
        }
        if is_collection {
            parent_map.insert(property.to_string(), Value::List(matches));
        } else if let Some(first) = matches.into_iter().next() {
            parent_map.insert(property.to_string(), first);
        }
    }
}

fn skip_to_offset(result_set: &mut dyn ResultSet, offset: usize) -> Result<()> {
    if offset == 0 {
        return Ok(());
    }
    if result_set.absolute(offset)? {
        return Ok(());
    }
    for _ in 0..offset {
        if !result_set.next()? {
            break;
        }
    }
    Ok(())
}

fn extract_row(config: &Configuration, result_set: &mut dyn ResultSet) -> Result<IndexMap<String, Value>> {
    let columns: Vec<ColumnMeta> = result_set.metadata().to_vec();
    let mut row = IndexMap::default();
    for (index, column) in columns.iter().enumerate() {
        let raw = result_set.get_by_index(index)?;
        let value = if result_set.was_null() {
            Value::Null
        } else {
            let handler = config
                .type_handlers
                .for_jdbc_type(&jdbc_type_name(&column.jdbc_type))
                .unwrap_or_else(|| config.type_handlers.default_handler());
            handler.from_driver(raw)
        };
        row.insert(column.label.clone(), value);
    }
    Ok(row)
}

fn jdbc_type_name(jdbc_type: &sqlmapper_core::parameter::JdbcType) -> String {
    use sqlmapper_core::parameter::JdbcType;
    match jdbc_type {
        JdbcType::Integer => "INTEGER".into(),
        JdbcType::BigInt => "BIGINT".into(),
        JdbcType::Real => "REAL".into(),
        JdbcType::Double => "DOUBLE".into(),
        JdbcType::Varchar => "VARCHAR".into(),
        JdbcType::Boolean => "BOOLEAN".into(),
        JdbcType::Timestamp => "TIMESTAMP".into(),
        JdbcType::Binary => "BINARY".into(),
        JdbcType::Other(name) => name.clone(),
    }
}

/// A lazily-pulled alternative to `map_rows` (SPEC_FULL.md §3
/// "cursor-based streaming reads"): pulls one row from the driver's
/// `ResultSet` at a time instead of materializing the whole statement's
/// rows up front.
///
/// A flat result map (no nested `<association>`/`<collection>`) streams
/// exactly one object per row with no buffering. A result map with nested
/// result maps needs to see every row that belongs to one top-level object
/// before it can hand that object to the caller, so it only supports
/// streaming when the underlying SQL is `resultOrdered` (rows for the same
/// top-level id are contiguous): the cursor then buffers at most one
/// in-progress group at a time, flushing the previous group as soon as the
/// top-level id changes. Without `resultOrdered`, opening a cursor over such
/// a result map is a `ResultMapError::CursorRequiresOrderedResult`.
pub struct ResultCursor<'a> {
    config: Arc<Configuration>,
    result_map: Arc<ResultMap>,
    runner: &'a dyn NestedQueryRunner,
    statement: Option<Box<dyn Statement>>,
    result_set: Box<dyn ResultSet>,
    limit: Option<usize>,
    emitted: usize,
    nested: bool,
    state: MapperState,
    pending_top_key: Option<CacheKey>,
    exhausted: bool,
}

impl<'a> ResultCursor<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn open(
        config: Arc<Configuration>,
        result_map: Arc<ResultMap>,
        row_bounds: RowBounds,
        result_ordered: bool,
        runner: &'a dyn NestedQueryRunner,
        statement: Option<Box<dyn Statement>>,
        mut result_set: Box<dyn ResultSet>,
    ) -> Result<Self> {
        let nested = result_map.has_nested_result_maps();
        if nested && !result_ordered {
            return Err(ResultMapError::CursorRequiresOrderedResult(result_map.id.clone()).into());
        }
        skip_to_offset(result_set.as_mut(), row_bounds.offset)?;
        Ok(Self {
            config,
            result_map,
            runner,
            statement,
            result_set,
            limit: row_bounds.limit,
            emitted: 0,
            nested,
            state: MapperState {
                objects: IndexMap::default(),
                order: Vec::new(),
            },
            pending_top_key: None,
            exhausted: false,
        })
    }

    fn close(&mut self) {
        let _ = self.result_set.close();
        if let Some(statement) = self.statement.as_mut() {
            let _ = statement.close();
        }
    }

    fn finish(&mut self) -> Option<Result<Value>> {
        self.exhausted = true;
        self.close();
        let pending = self.pending_top_key.take()?;
        Some(Ok(self.state.objects.remove(&pending).unwrap_or(Value::Null)))
    }
}

impl<'a> Iterator for ResultCursor<'a> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Result<Value>> {
        if self.exhausted {
            return None;
        }
        if self.limit.is_some_and(|limit| self.emitted >= limit) {
            return self.finish();
        }
        loop {
            match self.result_set.next() {
                Ok(true) => {}
                Ok(false) => return self.finish(),
                Err(err) => {
                    self.exhausted = true;
                    self.close();
                    return Some(Err(err));
                }
            }

            let row = match extract_row(&self.config, self.result_set.as_mut()) {
                Ok(row) => row,
                Err(err) => {
                    self.exhausted = true;
                    self.close();
                    return Some(Err(err));
                }
            };
            let effective_map = match resolve_effective_result_map(&self.config, &self.result_map, &row) {
                Ok(map) => map,
                Err(err) => {
                    self.exhausted = true;
                    self.close();
                    return Some(Err(err));
                }
            };

            if !self.nested {
                let mut scratch = MapperState {
                    objects: IndexMap::default(),
                    order: Vec::new(),
                };
                return match apply_result_map(&mut scratch, &self.config, effective_map, &row, None, self.runner, true) {
                    Ok((key, _)) => {
                        self.emitted += 1;
                        Some(Ok(scratch.objects.remove(&key).unwrap_or(Value::Null)))
                    }
                    Err(err) => {
                        self.exhausted = true;
                        self.close();
                        Some(Err(err))
                    }
                };
            }

            let top_key = compute_row_key(effective_map, &row, None);
            let boundary = self.pending_top_key.as_ref().is_some_and(|previous| *previous != top_key);
            let finished = if boundary {
                let previous = self.pending_top_key.take().expect("boundary implies Some");
                self.state.order.retain(|key| *key != previous);
                self.state.objects.remove(&previous)
            } else {
                None
            };

            if let Err(err) = apply_result_map(&mut self.state, &self.config, effective_map, &row, None, self.runner, true) {
                self.exhausted = true;
                self.close();
                return Some(Err(err));
            }
            self.pending_top_key = Some(top_key);

            if boundary {
                self.emitted += 1;
                return Some(Ok(finished.unwrap_or(Value::Null)));
            }
        }
    }
}

/// Follows `<discriminator>` chains (spec.md §4.3 step (a)), tagging
/// visited ids and breaking on a revisit (spec.md §9 "Cyclic references").
fn resolve_effective_result_map<'c>(
    config: &'c Configuration,
    start: &'c ResultMap,
    row: &IndexMap<String, Value>,
) -> Result<&'c ResultMap> {
    let mut current = start;
    let mut visited: IndexSet<String> = IndexSet::default();
    loop {
        visited.insert(current.id.clone());
        let Some(discriminator) = &current.discriminator else {
            return Ok(current);
        };
        let column_value = row.get(&discriminator.column).cloned().unwrap_or(Value::Null);
        let Some(next_id) = discriminator.cases.get(&column_value.render()) else {
            return Ok(current);
        };
        if visited.contains(next_id) {
            return Ok(current);
        }
        current = config
            .result_maps
            .get(next_id)
            .map(|arc| arc.as_ref())
            .ok_or_else(|| {
                ResultMapError::ExtractionFailed(next_id.clone(), "discriminator case names an unknown result map".into())
            })?;
    }
}

#[allow(clippy::too_many_arguments)]
fn apply_result_map(
    state: &mut MapperState,
    config: &Configuration,
    result_map: &ResultMap,
    row: &IndexMap<String, Value>,
    column_prefix: Option<&str>,
    runner: &dyn NestedQueryRunner,
    is_top_level: bool,
) -> Result<(CacheKey, bool)> {
    let key = compute_row_key(result_map, row, column_prefix);
    let is_new = !state.objects.contains_key(&key);

    if is_new {
        if is_top_level {
            state.order.push(key.clone());
        }

        if result_map.mappings.is_empty() && row.len() == 1 {
            let (_, value) = row.iter().next().expect("row.len() == 1");
            state.objects.insert(key.clone(), value.clone());
            return Ok((key, is_new));
        }

        let mut object = IndexMap::default();
        for mapping in result_map.mappings.iter().filter(|m| !m.is_nested()) {
            let Some(column) = mapping.column.as_deref() else {
                continue;
            };
            let prefixed = prefixed_column(column, column_prefix);
            let raw = row.get(&prefixed).cloned().unwrap_or(Value::Null);
            let handler = mapping
                .type_handler
                .clone()
                .unwrap_or_else(|| config.type_handlers.infer(&raw));
            object.insert(mapping.property.clone(), handler.from_driver(raw));
        }

        if auto_mapping_enabled(config, result_map) {
            let explicit: IndexSet<String> = result_map.mappings.iter().filter_map(|m| m.column.clone()).collect();
            for (column, value) in row.iter() {
                let bare = match column_prefix {
                    Some(prefix) if column.starts_with(prefix) => &column[prefix.len()..],
                    Some(_) => continue,
                    None => column.as_str(),
                };
                if explicit.contains(bare) {
                    continue;
                }
                let property = if config.settings.map_underscore_to_camel_case {
                    to_camel_case(bare)
                } else {
                    bare.to_string()
                };
                object.entry(property).or_insert_with(|| value.clone());
            }
        }

        state.objects.insert(key.clone(), Value::Map(object));
    }

    for mapping in result_map.mappings.iter().filter(|m| m.is_nested() && m.result_set.is_none()) {
        if let Some(nested_id) = &mapping.nested_result_map_id {
            let nested_map = config.result_map(nested_id)?;
            let nested_prefix = combine_prefix(column_prefix, mapping.column_prefix.as_deref());
            if is_absent_join(&mapping.not_null_columns, row, nested_prefix.as_deref()) {
                continue;
            }
            let (child_key, child_is_new) =
                apply_result_map(state, config, &nested_map, row, nested_prefix.as_deref(), runner, false)?;
            let child_value = state.objects.get(&child_key).cloned().unwrap_or(Value::Null);
            attach_nested(state, &key, &mapping.property, child_value, mapping.collection, child_is_new);
        } else if let (true, Some(nested_query_id)) = (is_new, &mapping.nested_query_id) {
            if mapping.lazy {
                log::debug!(
                    "lazy nested query for {} resolved eagerly (no transparent proxy in this host)",
                    mapping.property
                );
            }
            let parameter = nested_query_parameter(mapping, row, column_prefix);
            let value = runner.run_nested_query(nested_query_id, parameter)?;
            // `run_nested_query` always returns the sub-select's rows as a
            // `Value::List`; a `<collection>` mapping keeps the whole list,
            // an `<association>` mapping collapses it to its first row (or
            // null when the sub-select matched nothing).
            let value = if mapping.collection {
                value
            } else {
                match value {
                    Value::List(items) => items.into_iter().next().unwrap_or(Value::Null),
                    other => other,
                }
            };
            if let Some(Value::Map(object)) = state.objects.get_mut(&key) {
                object.insert(mapping.property.clone(), value);
            }
        }
    }

    Ok((key, is_new))
}

fn auto_mapping_enabled(config: &Configuration, result_map: &ResultMap) -> bool {
    let behavior = match result_map.auto_mapping {
        Some(true) => AutoMappingBehavior::Full,
        Some(false) => AutoMappingBehavior::None,
        None => config.settings.auto_mapping_behavior,
    };
    match behavior {
        AutoMappingBehavior::None => false,
        AutoMappingBehavior::Full => true,
        AutoMappingBehavior::Partial => !result_map.has_nested_result_maps(),
    }
}

fn attach_nested(state: &mut MapperState, parent_key: &CacheKey, property: &str, child: Value, is_collection: bool, child_is_new: bool) {
    let Some(Value::Map(parent)) = state.objects.get_mut(parent_key) else {
        return;
    };
    if is_collection {
        match parent.get_mut(property) {
            Some(Value::List(items)) => {
                if child_is_new {
                    items.push(child);
                }
            }
            _ => {
                parent.insert(property.to_string(), Value::List(vec![child]));
            }
        }
    } else {
        parent.insert(property.to_string(), child);
    }
}

fn nested_query_parameter(mapping: &crate::result_map::ResultMapping, row: &IndexMap<String, Value>, column_prefix: Option<&str>) -> Value {
    if !mapping.composites.is_empty() {
        let mut params = IndexMap::default();
        for composite in &mapping.composites {
            let column = prefixed_column(&composite.column, column_prefix);
            params.insert(composite.property.clone(), row.get(&column).cloned().unwrap_or(Value::Null));
        }
        return Value::Map(params);
    }
    match &mapping.column {
        Some(column) => row.get(&prefixed_column(column, column_prefix)).cloned().unwrap_or(Value::Null),
        None => Value::Null,
    }
}

/// A `<collection>`/`<association>` joined from an outer join produces an
/// all-null row for the child side when no match exists; `notNullColumns`
/// tells the mapper to skip creating a child object for that row.
fn is_absent_join(not_null_columns: &[String], row: &IndexMap<String, Value>, column_prefix: Option<&str>) -> bool {
    if not_null_columns.is_empty() {
        return false;
    }
    not_null_columns.iter().all(|column| {
        let prefixed = prefixed_column(column, column_prefix);
        matches!(row.get(&prefixed), None | Some(Value::Null))
    })
}

fn compute_row_key(result_map: &ResultMap, row: &IndexMap<String, Value>, column_prefix: Option<&str>) -> CacheKey {
    let mut key = CacheKey::new();
    key.update(result_map.id.clone());

    let id_mappings: Vec<_> = result_map.id_mappings().collect();
    if !id_mappings.is_empty() {
        for mapping in id_mappings {
            if let Some(column) = &mapping.column {
                let prefixed = prefixed_column(column, column_prefix);
                key.update(prefixed.clone());
                key.update(row.get(&prefixed).cloned().unwrap_or(Value::Null));
            }
        }
        return key;
    }

    let non_nested: Vec<_> = result_map.mappings.iter().filter(|m| !m.is_nested()).collect();
    if !non_nested.is_empty() {
        for mapping in non_nested {
            if let Some(column) = &mapping.column {
                let prefixed = prefixed_column(column, column_prefix);
                key.update(prefixed.clone());
                key.update(row.get(&prefixed).cloned().unwrap_or(Value::Null));
            }
        }
        return key;
    }

    for (column, value) in row.iter() {
        key.update(column.clone());
        key.update(value.clone());
    }
    key
}

fn prefixed_column(column: &str, prefix: Option<&str>) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}{column}"),
        None => column.to_string(),
    }
}

fn combine_prefix(outer: Option<&str>, inner: Option<&str>) -> Option<String> {
    match (outer, inner) {
        (None, None) => None,
        (Some(outer), None) => Some(outer.to_string()),
        (None, Some(inner)) => Some(inner.to_string()),
        (Some(outer), Some(inner)) => Some(format!("{outer}{inner}")),
    }
}

fn to_camel_case(column: &str) -> String {
    let mut result = String::with_capacity(column.len());
    let mut upper_next = false;
    for ch in column.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            result.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            result.push(ch);
        }
    }
    result
}
