//! Type handlers: JDBC ↔ host-type conversion (spec.md §2/§4.1). A
//! `TypeHandler` is consulted both when building a [`crate::CacheKey`] (to
//! get an effective, comparable representation of a bound parameter) and
//! when extracting a column's value during result mapping.

use std::fmt;
use std::sync::Arc;

use sqlmapper_helpers::IndexMap;

use crate::value::Value;

pub trait TypeHandler: Send + Sync {
    fn name(&self) -> &'static str;

    /// Converts a bound parameter value to its driver-ready form. The
    /// default implementation is the identity conversion; handlers only
    /// need to override this when the host representation differs from
    /// what the driver expects (e.g. a host `bool` going out as `0`/`1`).
    fn to_driver(&self, value: &Value) -> Value {
        value.clone()
    }

    /// Converts a value read back from the driver (already boxed as a
    /// [`Value`] by the driver adapter) into the handler's canonical host
    /// representation.
    fn from_driver(&self, value: Value) -> Value {
        value
    }
}

impl fmt::Debug for dyn TypeHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TypeHandler({})", self.name())
    }
}

macro_rules! identity_handler {
    ($name:ident, $label:literal) => {
        #[derive(Debug, Default)]
        pub struct $name;
        impl TypeHandler for $name {
            fn name(&self) -> &'static str {
                $label
            }
        }
    };
}

identity_handler!(IntegerTypeHandler, "integer");
identity_handler!(BigIntTypeHandler, "bigint");
identity_handler!(RealTypeHandler, "real");
identity_handler!(DoubleTypeHandler, "double");
identity_handler!(VarcharTypeHandler, "varchar");
identity_handler!(TimestampTypeHandler, "timestamp");
identity_handler!(BinaryTypeHandler, "binary");

/// `Boolean` has a real conversion: many drivers round-trip booleans as
/// `0`/`1` integers rather than as a native boolean column type.
#[derive(Debug, Default)]
pub struct BooleanTypeHandler;

impl TypeHandler for BooleanTypeHandler {
    fn name(&self) -> &'static str {
        "boolean"
    }

    fn to_driver(&self, value: &Value) -> Value {
        match value.as_bool() {
            Some(b) => Value::Int(b as i64),
            None => value.clone(),
        }
    }

    fn from_driver(&self, value: Value) -> Value {
        match value {
            Value::Int(i) => Value::Bool(i != 0),
            other => other,
        }
    }
}

/// Generic object handler used when no more specific handler applies
/// (spec.md §4.1 SqlSource builder step (d): "fallback to generic object").
#[derive(Debug, Default)]
pub struct ObjectTypeHandler;

impl TypeHandler for ObjectTypeHandler {
    fn name(&self) -> &'static str {
        "object"
    }
}

/// Process-wide (well, `Configuration`-wide) registry of type handlers,
/// keyed by the JDBC-type name used on `#{...,jdbcType=...}` and by a
/// "host type" tag a caller can register handlers under directly.
#[derive(Clone)]
pub struct TypeHandlerRegistry {
    by_jdbc_type: IndexMap<String, Arc<dyn TypeHandler>>,
    by_host_type: IndexMap<String, Arc<dyn TypeHandler>>,
    default: Arc<dyn TypeHandler>,
}

impl TypeHandlerRegistry {
    /// A registry pre-populated with the built-in handlers (spec.md §3
    /// supplemented feature: "Built-in type handler registry").
    pub fn with_defaults() -> Self {
        let mut registry = Self {
            by_jdbc_type: IndexMap::default(),
            by_host_type: IndexMap::default(),
            default: Arc::new(ObjectTypeHandler),
        };
        registry.register_jdbc("INTEGER", Arc::new(IntegerTypeHandler));
        registry.register_jdbc("BIGINT", Arc::new(BigIntTypeHandler));
        registry.register_jdbc("REAL", Arc::new(RealTypeHandler));
        registry.register_jdbc("DOUBLE", Arc::new(DoubleTypeHandler));
        registry.register_jdbc("VARCHAR", Arc::new(VarcharTypeHandler));
        registry.register_jdbc("BOOLEAN", Arc::new(BooleanTypeHandler));
        registry.register_jdbc("TIMESTAMP", Arc::new(TimestampTypeHandler));
        registry.register_jdbc("BINARY", Arc::new(BinaryTypeHandler));
        registry
    }

    pub fn register_jdbc(&mut self, jdbc_type: &str, handler: Arc<dyn TypeHandler>) {
        self.by_jdbc_type
            .insert(jdbc_type.to_ascii_uppercase(), handler);
    }

    pub fn register_host(&mut self, host_type: &str, handler: Arc<dyn TypeHandler>) {
        self.by_host_type.insert(host_type.to_string(), handler);
    }

    pub fn for_jdbc_type(&self, jdbc_type: &str) -> Option<Arc<dyn TypeHandler>> {
        self.by_jdbc_type
            .get(&jdbc_type.to_ascii_uppercase())
            .cloned()
    }

    pub fn for_host_type(&self, host_type: &str) -> Option<Arc<dyn TypeHandler>> {
        self.by_host_type.get(host_type).cloned()
    }

    /// Infers a handler for a runtime [`Value`] when no explicit
    /// `jdbcType`/host type was declared, covering the common primitive
    /// shapes.
    pub fn infer(&self, value: &Value) -> Arc<dyn TypeHandler> {
        match value {
            Value::Int(_) => self.for_jdbc_type("BIGINT").unwrap_or_else(|| self.default.clone()),
            Value::Float(_) => self.for_jdbc_type("DOUBLE").unwrap_or_else(|| self.default.clone()),
            Value::Bool(_) => self.for_jdbc_type("BOOLEAN").unwrap_or_else(|| self.default.clone()),
            Value::Str(_) => self.for_jdbc_type("VARCHAR").unwrap_or_else(|| self.default.clone()),
            Value::Bytes(_) => self.for_jdbc_type("BINARY").unwrap_or_else(|| self.default.clone()),
            _ => self.default.clone(),
        }
    }

    pub fn default_handler(&self) -> Arc<dyn TypeHandler> {
        self.default.clone()
    }
}

impl Default for TypeHandlerRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
