//! `sqlmapper`: configuration, executors, the result-set mapper, and
//! mapper-proxy dispatch built on top of `sqlmapper-core`'s dynamic SQL
//! compiler and cache decorator stack. This crate owns everything that
//! needs a live `Connection`/`DataSource`; `sqlmapper-core` stays
//! driver-agnostic.

pub mod config;
pub mod driver;
pub mod executor;
pub mod interceptor;
pub mod lazy;
pub mod logging;
pub mod mapped_statement;
pub mod mapper_proxy;
pub mod result_map;
pub mod result_mapper;
pub mod session;
pub mod statement_handler;

#[cfg(test)]
pub mod test_driver;

#[cfg(test)]
mod end_to_end_tests;

pub use config::{Configuration, ConfigurationBuilder};
pub use executor::{BatchExecutor, BatchResult, CachingExecutor, Executor, QueryHandle, ReuseExecutor, SimpleExecutor, StatementExecutor};
pub use interceptor::{Interceptor, InterceptorChain, Invocation};
pub use lazy::LazyLoaderHandle;
pub use mapped_statement::{KeyGenerator, MappedStatement, StatementKind, StatementStrategy};
pub use mapper_proxy::{MapperMethod, MethodSignature, ParamNameResolver, ReturnShape, SqlCommand};
pub use result_map::{CompositeMapping, Discriminator, MappingRole, ResultMap, ResultMapping};
pub use result_mapper::{NestedQueryRunner, ResultCursor};
pub use session::{ExecutorKind, SqlSession};

pub use sqlmapper_core::{Error, MetaObject, MetaObjectMut, Result, Value};
