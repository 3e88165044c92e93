//! `ResultMap`/`ResultMapping`/`Discriminator` (spec.md §3).

use std::sync::Arc;

use sqlmapper_core::error::ConfigurationError;
use sqlmapper_core::parameter::JdbcType;
use sqlmapper_core::{Result, TypeHandler};
use sqlmapper_helpers::IndexSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MappingRole {
    Id,
    Constructor,
}

/// A composite foreign-key sub-mapping, used when a nested mapping's join
/// key spans more than one column.
#[derive(Debug, Clone)]
pub struct CompositeMapping {
    pub property: String,
    pub column: String,
}

pub struct ResultMapping {
    pub property: String,
    pub column: Option<String>,
    pub jdbc_type: Option<JdbcType>,
    pub type_handler: Option<Arc<dyn TypeHandler>>,
    pub nested_result_map_id: Option<String>,
    pub nested_query_id: Option<String>,
    pub column_prefix: Option<String>,
    pub not_null_columns: Vec<String>,
    pub composites: Vec<CompositeMapping>,
    pub foreign_column: Option<String>,
    /// `resultSet="..."` for multi-result-set linkage (spec.md §4.3).
    pub result_set: Option<String>,
    pub lazy: bool,
    pub roles: IndexSet<MappingRole>,
    /// `<collection>` (one-to-many) vs `<association>` (one-to-one).
    pub collection: bool,
}

impl ResultMapping {
    pub fn simple(property: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            column: Some(column.into()),
            jdbc_type: None,
            type_handler: None,
            nested_result_map_id: None,
            nested_query_id: None,
            column_prefix: None,
            not_null_columns: Vec::new(),
            composites: Vec::new(),
            foreign_column: None,
            result_set: None,
            lazy: false,
            roles: IndexSet::default(),
            collection: false,
        }
    }

    pub fn is_id(&self) -> bool {
        self.roles.contains(&MappingRole::Id)
    }

    pub fn is_constructor_arg(&self) -> bool {
        self.roles.contains(&MappingRole::Constructor)
    }

    pub fn is_nested(&self) -> bool {
        self.nested_result_map_id.is_some() || self.nested_query_id.is_some()
    }
}

/// `<discriminator column=".." javaType="..">` with `<case value=".."
/// resultMap=".."/>` children.
pub struct Discriminator {
    pub column: String,
    pub jdbc_type: Option<JdbcType>,
    pub cases: sqlmapper_helpers::IndexMap<String, String>,
}

pub struct ResultMap {
    pub id: String,
    pub target_type: String,
    pub mappings: Vec<ResultMapping>,
    pub discriminator: Option<Discriminator>,
    pub auto_mapping: Option<bool>,
}

impl ResultMap {
    /// Builds a `ResultMap`, validating the invariants from spec.md §3:
    /// id-mappings are a subset of the mapping list (trivially true here,
    /// since roles are tagged in place), constructor and property mappings
    /// are disjoint, and any nested mapping without a named result-set
    /// implies `has_nested_result_maps()`.
    pub fn new(
        id: impl Into<String>,
        target_type: impl Into<String>,
        mappings: Vec<ResultMapping>,
        discriminator: Option<Discriminator>,
    ) -> Result<Self> {
        for mapping in &mappings {
            if mapping.nested_result_map_id.is_some() && mapping.nested_query_id.is_some() {
                return Err(ConfigurationError::ConflictingNestedMapping {
                    property: mapping.property.clone(),
                }
                .into());
            }
        }
        Ok(Self {
            id: id.into(),
            target_type: target_type.into(),
            mappings,
            discriminator,
            auto_mapping: None,
        })
    }

    pub fn id_mappings(&self) -> impl Iterator<Item = &ResultMapping> {
        self.mappings.iter().filter(|m| m.is_id())
    }

    pub fn constructor_mappings(&self) -> impl Iterator<Item = &ResultMapping> {
        self.mappings.iter().filter(|m| m.is_constructor_arg())
    }

    pub fn property_mappings(&self) -> impl Iterator<Item = &ResultMapping> {
        self.mappings.iter().filter(|m| !m.is_constructor_arg())
    }

    pub fn has_nested_result_maps(&self) -> bool {
        self.mappings
            .iter()
            .any(|m| m.nested_result_map_id.is_some() && m.result_set.is_none())
    }

    pub fn has_nested_queries(&self) -> bool {
        self.mappings.iter().any(|m| m.nested_query_id.is_some())
    }
}
