//! Database setup: connection manager plus schema bootstrap.

use std::sync::Arc;

use crate::connection::ConnectionManager;
use crate::credential_repo::SqliteCredentialRepository;
use crate::error::SchemaError;
use crate::patient_repo::SqlitePatientRepository;
use crate::schema;

/// Configuration for the `SQLite` storage adapter.
pub struct Config {
    /// `SQLite` connection URL (e.g. `sqlite:wecare.db` or `sqlite::memory:`).
    pub database_url: String,
}

impl Config {
    /// Build a [`Database`] from this configuration.
    ///
    /// # Errors
    ///
    /// See [`Database::open`].
    pub async fn build(self) -> Result<Database, SchemaError> {
        Database::open(&self.database_url).await
    }
}

/// A bootstrapped database and the repositories on top of it.
pub struct Database {
    manager: Arc<ConnectionManager>,
}

impl Database {
    /// Start the engine for `database_url` and run the schema bootstrap.
    ///
    /// Repositories are only handed out once the bootstrap succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the URL is invalid, the engine does not
    /// start, or the bootstrap fails.
    pub async fn open(database_url: &str) -> Result<Self, SchemaError> {
        let manager = Arc::new(ConnectionManager::from_url(database_url)?);
        schema::initialize(&manager).await?;
        Ok(Self { manager })
    }

    /// The shared connection manager.
    #[must_use]
    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    #[must_use]
    pub fn patients(&self) -> SqlitePatientRepository {
        SqlitePatientRepository::new(Arc::clone(&self.manager))
    }

    #[must_use]
    pub fn credentials(&self) -> SqliteCredentialRepository {
        SqliteCredentialRepository::new(Arc::clone(&self.manager))
    }

    /// Stop the engine host.
    pub async fn close(&self) {
        self.manager.shutdown().await;
    }
}
