//! Connection manager: lazily starts the one engine host of a database.

use std::str::FromStr;
use std::sync::OnceLock;

use sqlx::sqlite::SqliteConnectOptions;
use tokio::sync::OnceCell;

use crate::engine::{Connection, EngineHost};
use crate::error::{InitializationError, StorageError};
use crate::value::{QueryResult, Value};

/// Owns the engine host of one database for the whole process.
///
/// Construction does no IO. The host is started by the first
/// [`get_connection`](Self::get_connection) and reused afterwards; if that
/// start fails, the manager stays unavailable.
#[derive(Debug)]
pub struct ConnectionManager {
    options: SqliteConnectOptions,
    connection: OnceCell<Connection>,
    failure: OnceLock<String>,
}

impl ConnectionManager {
    #[must_use]
    pub fn new(options: SqliteConnectOptions) -> Self {
        Self {
            options,
            connection: OnceCell::new(),
            failure: OnceLock::new(),
        }
    }

    /// Manager for a `sqlite:` URL; the database file is created if missing.
    ///
    /// # Errors
    ///
    /// Returns [`InitializationError::InvalidUrl`] if the URL does not parse.
    pub fn from_url(url: &str) -> Result<Self, InitializationError> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(InitializationError::InvalidUrl)?
            .create_if_missing(true);
        Ok(Self::new(options))
    }

    /// The engine handle, starting the host on first use.
    ///
    /// # Errors
    ///
    /// - [`InitializationError::NoRuntime`] outside a tokio runtime;
    /// - [`InitializationError::EngineStart`] if the first start fails;
    /// - [`InitializationError::Unavailable`] on every call after that.
    pub async fn get_connection(&self) -> Result<&Connection, InitializationError> {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(InitializationError::NoRuntime);
        }
        if let Some(reason) = self.failure.get() {
            return Err(InitializationError::Unavailable(reason.clone()));
        }

        self.connection
            .get_or_try_init(|| async {
                EngineHost::spawn(&self.options).await.inspect_err(|err| {
                    let reason = match err {
                        InitializationError::EngineStart(source) => source.to_string(),
                        other => other.to_string(),
                    };
                    tracing::error!(%reason, "database engine failed to start");
                    let _ = self.failure.set(reason);
                })
            })
            .await
    }

    /// Run one statement on the engine.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Initialization`] when the engine cannot be
    /// reached, otherwise whatever the statement raised.
    pub async fn query(&self, sql: &str, params: Vec<Value>) -> Result<QueryResult, StorageError> {
        self.get_connection().await?.query(sql, params).await
    }

    /// Close the engine host, if it was ever started.
    pub async fn shutdown(&self) {
        if let Some(connection) = self.connection.get() {
            connection.close().await;
        }
    }
}
