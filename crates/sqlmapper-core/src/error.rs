//! Error taxonomy shared by the whole workspace (spec.md §7).

/// One tagged failure per spec.md §7 error kind, unified so callers only
/// need to match on a single type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("binding error: {0}")]
    Binding(#[from] BindingError),

    #[error("executor error: {0}")]
    Executor(#[from] ExecutorError),

    #[error("result map error: {0}")]
    ResultMap(#[from] ResultMapError),

    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error("malformed mapper definition: {0}")]
    MalformedMapper(String),
    #[error("unknown setting {0:?}")]
    UnknownSetting(String),
    #[error("duplicate namespace {0:?}")]
    DuplicateNamespace(String),
    #[error("cache-ref to unknown namespace {0:?}")]
    UnknownCacheRef(String),
    #[error("could not parse `#{{...}}` placeholder: {0}")]
    PlaceholderParse(String),
    #[error(
        "result mapping for property {property:?} declares both a nested query id and a nested result-map id"
    )]
    ConflictingNestedMapping { property: String },
    #[error("unresolved nested result map(s) after load: {0:?}")]
    UnresolvedNestedResultMaps(Vec<String>),
}

#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    #[error("no statement registered for id {0:?}")]
    StatementNotFound(String),
    #[error("ambiguous parameter type for statement {0:?}")]
    AmbiguousParameterType(String),
    #[error("mapper method {0:?} could not be resolved")]
    MapperMethodUnresolved(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("executor is closed")]
    Closed,
    #[error("duplicate result set {0:?} while linking multi-result-set mapping")]
    DuplicateResultSet(String),
    #[error("auto-mapping could not find a constructor matching the row shape")]
    NoMatchingConstructor,
    #[error("caching of CALLABLE out-parameters is not supported")]
    CallableOutParametersNotCacheable,
    #[error("a select returned more than one row for a scalar-returning method")]
    TooManyRows,
}

#[derive(Debug, thiserror::Error)]
pub enum ResultMapError {
    #[error("no type handler registered for column {column:?} of type {host_type:?}")]
    MissingTypeHandler { column: String, host_type: String },
    #[error("failed to extract value for column {0:?}: {1}")]
    ExtractionFailed(String, String),
    #[error("cursor over result map {0:?} has nested collections/associations and requires resultOrdered=true")]
    CursorRequiresOrderedResult(String),
}

#[derive(Debug, thiserror::Error)]
#[error("driver error: {message}")]
pub struct DriverError {
    pub message: String,
    pub sql_state: Option<String>,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DriverError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            sql_state: None,
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        Self {
            message: message.into(),
            sql_state: None,
            source: Some(source),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("commit on closed executor")]
    CommitClosed,
    #[error("rollback on closed executor")]
    RollbackClosed,
}
