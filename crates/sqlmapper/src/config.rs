//! `Configuration`/`ConfigurationBuilder` (spec.md §6 "Configuration file
//! (mybatis-config)"). Nothing here parses XML — that parser is an external
//! collaborator (spec.md §1) — but the builder assembles the same tree the
//! parser would have produced.

use std::sync::Arc;

use sqlmapper_core::cache::{build_namespace_cache, Cache, CacheConfig};
use sqlmapper_core::error::ConfigurationError;
use sqlmapper_core::{Result, TypeHandlerRegistry};
use sqlmapper_helpers::{IndexMap, IndexSet};

use crate::driver::DataSource;
use crate::mapped_statement::MappedStatement;
use crate::result_map::ResultMap;

/// `localCacheScope` (spec.md §4.2, called out as a supplemented
/// first-class setting rather than a bare string in SPEC_FULL.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::EnumString, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum LocalCacheScope {
    Session,
    Statement,
}

impl Default for LocalCacheScope {
    fn default() -> Self {
        LocalCacheScope::Session
    }
}

/// spec.md §4.3 step (c).
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::EnumString, strum_macros::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum AutoMappingBehavior {
    None,
    Partial,
    Full,
}

impl Default for AutoMappingBehavior {
    fn default() -> Self {
        AutoMappingBehavior::Partial
    }
}

/// Validated `<settings>` (spec.md §6: "keys validated against known names;
/// unknown key is fatal").
#[derive(Debug, Clone)]
pub struct Settings {
    pub local_cache_scope: LocalCacheScope,
    pub auto_mapping_behavior: AutoMappingBehavior,
    pub map_underscore_to_camel_case: bool,
    pub default_statement_timeout: Option<u32>,
    pub enable_default_value: bool,
    /// Global L2-cache switch; when `false`, namespace caches are never
    /// consulted even if declared (spec.md §4.2 `cacheEnabled`).
    pub cache_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            local_cache_scope: LocalCacheScope::default(),
            auto_mapping_behavior: AutoMappingBehavior::default(),
            map_underscore_to_camel_case: false,
            default_statement_timeout: None,
            enable_default_value: false,
            cache_enabled: true,
        }
    }
}

const KNOWN_SETTINGS: &[&str] = &[
    "localCacheScope",
    "autoMappingBehavior",
    "mapUnderscoreToCamelCase",
    "defaultStatementTimeout",
    "enableDefaultValue",
    "cacheEnabled",
];

/// One `<environment id="...">`: a transaction-manager kind paired with a
/// `DataSource`.
pub struct Environment {
    pub id: String,
    pub transaction_manager: TransactionManagerKind,
    pub data_source: Arc<dyn DataSource>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionManagerKind {
    Jdbc,
    Managed,
}

/// Resolves the active `databaseId` for an environment (spec.md §6
/// `<databaseIdProvider>`).
pub trait DatabaseIdProvider: Send + Sync {
    fn database_id(&self, environment_id: &str) -> Option<String>;
}

/// The fully assembled, immutable configuration tree (spec.md §3
/// "Configuration registry").
pub struct Configuration {
    pub settings: Settings,
    pub properties: IndexMap<String, String>,
    pub environments: IndexMap<String, Environment>,
    pub default_environment: Option<String>,
    pub database_id: Option<String>,
    pub mapped_statements: IndexMap<String, Arc<MappedStatement>>,
    pub result_maps: IndexMap<String, Arc<ResultMap>>,
    pub namespace_caches: IndexMap<String, Arc<dyn Cache>>,
    pub type_handlers: TypeHandlerRegistry,
}

impl Configuration {
    pub fn mapped_statement(&self, id: &str) -> Result<Arc<MappedStatement>> {
        self.mapped_statements
            .get(id)
            .cloned()
            .ok_or_else(|| ConfigurationError::MalformedMapper(format!("no statement registered for id {id:?}")).into())
    }

    pub fn result_map(&self, id: &str) -> Result<Arc<ResultMap>> {
        self.result_maps
            .get(id)
            .cloned()
            .ok_or_else(|| ConfigurationError::MalformedMapper(format!("no result map registered for id {id:?}")).into())
    }

    pub fn namespace_cache(&self, namespace: &str) -> Option<Arc<dyn Cache>> {
        self.namespace_caches.get(namespace).cloned()
    }

    pub fn default_data_source(&self) -> Result<Arc<dyn DataSource>> {
        let env_id = self
            .default_environment
            .as_deref()
            .ok_or_else(|| ConfigurationError::MalformedMapper("no default environment configured".into()))?;
        self.environments
            .get(env_id)
            .map(|env| env.data_source.clone())
            .ok_or_else(|| ConfigurationError::MalformedMapper(format!("unknown environment {env_id:?}")).into())
    }

    /// Resolves the `databaseId`-scoped variant of a statement when one is
    /// registered, falling back to the id-less variant (SPEC_FULL.md §3
    /// "`databaseId`-scoped statement variants").
    pub fn resolve_statement_for_database(&self, base_id: &str) -> Result<Arc<MappedStatement>> {
        if let Some(database_id) = &self.database_id {
            let scoped = format!("{base_id}#{database_id}");
            if let Some(stmt) = self.mapped_statements.get(&scoped) {
                return Ok(stmt.clone());
            }
        }
        self.mapped_statement(base_id)
    }
}

pub struct ConfigurationBuilder {
    settings: Settings,
    properties: IndexMap<String, String>,
    environments: IndexMap<String, Environment>,
    default_environment: Option<String>,
    database_id_provider: Option<Box<dyn DatabaseIdProvider>>,
    database_id: Option<String>,
    mapped_statements: IndexMap<String, Arc<MappedStatement>>,
    result_maps: IndexMap<String, Arc<ResultMap>>,
    cache_configs: IndexMap<String, CacheConfig>,
    cache_refs: IndexMap<String, String>,
    type_handlers: TypeHandlerRegistry,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self {
            settings: Settings::default(),
            properties: IndexMap::default(),
            environments: IndexMap::default(),
            default_environment: None,
            database_id_provider: None,
            database_id: None,
            mapped_statements: IndexMap::default(),
            result_maps: IndexMap::default(),
            cache_configs: IndexMap::default(),
            cache_refs: IndexMap::default(),
            type_handlers: TypeHandlerRegistry::with_defaults(),
        }
    }

    /// Sets one `<settings>` entry by its mybatis-config key name,
    /// rejecting unknown keys (spec.md §6).
    pub fn setting(mut self, key: &str, value: &str) -> Result<Self> {
        if !KNOWN_SETTINGS.contains(&key) {
            return Err(ConfigurationError::UnknownSetting(key.to_string()).into());
        }
        match key {
            "localCacheScope" => {
                self.settings.local_cache_scope = if value.eq_ignore_ascii_case("STATEMENT") {
                    LocalCacheScope::Statement
                } else {
                    LocalCacheScope::Session
                };
            }
            "autoMappingBehavior" => {
                self.settings.auto_mapping_behavior = match value.to_ascii_uppercase().as_str() {
                    "NONE" => AutoMappingBehavior::None,
                    "FULL" => AutoMappingBehavior::Full,
                    _ => AutoMappingBehavior::Partial,
                };
            }
            "mapUnderscoreToCamelCase" => {
                self.settings.map_underscore_to_camel_case = value.eq_ignore_ascii_case("true");
            }
            "defaultStatementTimeout" => {
                self.settings.default_statement_timeout = value.parse().ok();
            }
            "enableDefaultValue" => {
                self.settings.enable_default_value = value.eq_ignore_ascii_case("true");
            }
            "cacheEnabled" => {
                self.settings.cache_enabled = value.eq_ignore_ascii_case("true");
            }
            _ => unreachable!("checked against KNOWN_SETTINGS above"),
        }
        Ok(self)
    }

    pub fn property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Resolves `${key:default}` against the registered properties, honoring
    /// `enableDefaultValue` (spec.md §6).
    pub fn resolve_property(&self, template: &str) -> String {
        sqlmapper_core::token_parser::parse(template, "${", "}", &mut |expr: &str| {
            let (key, default) = match expr.split_once(':') {
                Some((k, d)) if self.settings.enable_default_value => (k, Some(d)),
                Some((k, _)) => (k, None),
                None => (expr, None),
            };
            self.properties
                .get(key)
                .cloned()
                .or_else(|| default.map(str::to_string))
                .unwrap_or_default()
        })
    }

    pub fn environment(mut self, environment: Environment, is_default: bool) -> Self {
        if is_default || self.default_environment.is_none() {
            self.default_environment = Some(environment.id.clone());
        }
        self.environments.insert(environment.id.clone(), environment);
        self
    }

    pub fn database_id_provider(mut self, provider: Box<dyn DatabaseIdProvider>) -> Self {
        self.database_id_provider = Some(provider);
        self
    }

    pub fn register_mapped_statement(mut self, statement: MappedStatement) -> Result<Self> {
        let id = statement.id.clone();
        if self.mapped_statements.contains_key(&id) {
            return Err(ConfigurationError::DuplicateNamespace(id).into());
        }
        self.mapped_statements.insert(id, Arc::new(statement));
        Ok(self)
    }

    pub fn register_result_map(mut self, result_map: ResultMap) -> Self {
        self.result_maps.insert(result_map.id.clone(), Arc::new(result_map));
        self
    }

    pub fn declare_cache(mut self, namespace: impl Into<String>, config: CacheConfig) -> Self {
        self.cache_configs.insert(namespace.into(), config);
        self
    }

    /// `<cache-ref namespace="other"/>`: this namespace shares the other
    /// namespace's L2 cache instance rather than owning one.
    pub fn cache_ref(mut self, namespace: impl Into<String>, refers_to: impl Into<String>) -> Self {
        self.cache_refs.insert(namespace.into(), refers_to.into());
        self
    }

    pub fn type_handlers_mut(&mut self) -> &mut TypeHandlerRegistry {
        &mut self.type_handlers
    }

    /// Assembles the immutable [`Configuration`], resolving every nested
    /// result-map reference (spec.md §7 "Deferred result-map resolution:
    /// ... unresolved items at completion are a ConfigurationError").
    pub fn build(mut self) -> Result<Configuration> {
        if let Some(provider) = &self.database_id_provider {
            if let Some(env_id) = &self.default_environment {
                self.database_id = provider.database_id(env_id);
            }
        }

        let mut namespace_caches: IndexMap<String, Arc<dyn Cache>> = IndexMap::default();
        for (namespace, cache_config) in &self.cache_configs {
            namespace_caches.insert(namespace.clone(), build_namespace_cache(namespace.clone(), cache_config));
        }
        for (namespace, refers_to) in &self.cache_refs {
            let Some(shared) = namespace_caches.get(refers_to).cloned() else {
                return Err(ConfigurationError::UnknownCacheRef(refers_to.clone()).into());
            };
            namespace_caches.insert(namespace.clone(), shared);
        }

        let unresolved = self.resolve_nested_result_maps();
        if !unresolved.is_empty() {
            return Err(ConfigurationError::UnresolvedNestedResultMaps(unresolved).into());
        }

        Ok(Configuration {
            settings: self.settings,
            properties: self.properties,
            environments: self.environments,
            default_environment: self.default_environment,
            database_id: self.database_id,
            mapped_statements: self.mapped_statements,
            result_maps: self.result_maps,
            namespace_caches,
            type_handlers: self.type_handlers,
        })
    }

    /// Every `ResultMapping` naming a `nested_result_map_id` must resolve to
    /// a registered `ResultMap`; returns the ids that never did, after a
    /// retry pass lets forward references resolve in any declaration order.
    fn resolve_nested_result_maps(&self) -> Vec<String> {
        let mut pending: IndexSet<String> = self
            .result_maps
            .values()
            .flat_map(|rm| rm.mappings.iter())
            .filter_map(|m| m.nested_result_map_id.clone())
            .collect();

        pending.retain(|id| !self.result_maps.contains_key(id));
        pending.into_iter().collect()
    }
}

impl Default for ConfigurationBuilder {
    fn default() -> Self {
        Self::new()
    }
}
