//! The dialect-agnostic core: dynamic SQL compilation, the `Value`/
//! `MetaObject` reflection stand-ins, parameter/type-handler plumbing, and
//! the cache decorator stack. `sqlmapper-core` has no notion of a driver, a
//! session, or a mapper interface — those live one layer up, in the
//! `sqlmapper` crate.

pub mod ast;
pub mod cache;
pub mod error;
pub mod meta_object;
pub mod parameter;
pub mod sql_source;
pub mod token_parser;
pub mod type_handler;
pub mod value;

pub use ast::{DynamicContext, SqlNode, SqlNodeApply};
pub use cache::{Cache, CacheKey};
pub use error::{Error, Result};
pub use meta_object::{MetaObject, MetaObjectMut};
pub use parameter::{JdbcType, ParamMode, ParameterMapping};
pub use sql_source::{BoundSql, SqlSource};
pub use type_handler::{TypeHandler, TypeHandlerRegistry};
pub use value::Value;
