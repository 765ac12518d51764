//! Storage-specific error types wrapping sqlx errors.

use wecare_domain::error::WeCareError;

/// The engine host could not be created or reached.
#[derive(Debug, thiserror::Error)]
pub enum InitializationError {
    /// Called from outside a tokio runtime; there is nothing to host the
    /// engine on.
    #[error("database is only reachable from inside a tokio runtime")]
    NoRuntime,

    /// The connection URL could not be parsed.
    #[error("invalid database url")]
    InvalidUrl(#[source] sqlx::Error),

    /// Opening the engine connection failed.
    #[error("failed to start database engine")]
    EngineStart(#[source] sqlx::Error),

    /// A previous start attempt failed; the engine stays unavailable.
    #[error("database engine unavailable: {0}")]
    Unavailable(String),
}

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// The engine host is gone; no request can be served.
    #[error("database engine is not running")]
    EngineClosed,

    /// The engine host could not be started.
    #[error("database engine unavailable")]
    Initialization(#[from] InitializationError),

    /// A transaction task stopped before reporting its outcome.
    #[error("transaction interrupted: {0}")]
    Interrupted(String),

    /// A stored value does not fit the domain type.
    #[error("cannot decode column `{column}`: {reason}")]
    Decode { column: String, reason: String },
}

impl StorageError {
    pub(crate) fn decode(column: &str, reason: impl Into<String>) -> Self {
        Self::Decode {
            column: column.to_string(),
            reason: reason.into(),
        }
    }
}

/// Schema bootstrap failed.
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    /// The engine could not be reached to run the DDL.
    #[error("database engine unavailable")]
    Initialization(#[from] InitializationError),

    /// A `CREATE TABLE` statement failed.
    #[error("failed to create table `{table}`")]
    Create {
        table: &'static str,
        #[source]
        source: StorageError,
    },

    /// Counting or inserting the default credential failed.
    #[error("failed to seed default credential")]
    Seed(#[source] StorageError),
}

impl From<InitializationError> for WeCareError {
    fn from(err: InitializationError) -> Self {
        Self::Initialization(Box::new(err))
    }
}

impl From<StorageError> for WeCareError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Initialization(inner) => inner.into(),
            other => Self::Persistence(Box::new(other)),
        }
    }
}

impl From<SchemaError> for WeCareError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::Initialization(inner) => inner.into(),
            other => Self::Schema(Box::new(other)),
        }
    }
}
