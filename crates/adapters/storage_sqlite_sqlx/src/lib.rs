//! # wecare-adapter-storage-sqlite-sqlx
//!
//! `SQLite` persistence adapter using [sqlx](https://docs.rs/sqlx).
//!
//! ## Responsibilities
//! - Host the single engine connection on its own tokio task ([`engine`])
//! - Start that host lazily, once per database ([`connection`])
//! - Create the schema and seed the default credential ([`schema`])
//! - Implement the repository port traits defined in `wecare-app::ports::storage`
//! - Map between domain types and engine rows
//!
//! ## Dependency rule
//! Depends on `wecare-app` (for port traits) and `wecare-domain` (for domain types).
//! The `app` and `domain` crates must never reference this adapter.

pub mod connection;
pub mod credential_repo;
pub mod database;
pub mod engine;
pub mod error;
pub mod patient_repo;
pub mod schema;
pub mod value;

pub use connection::ConnectionManager;
pub use credential_repo::SqliteCredentialRepository;
pub use database::{Config, Database};
pub use engine::{Connection, EngineHost};
pub use error::{InitializationError, SchemaError, StorageError};
pub use patient_repo::SqlitePatientRepository;
pub use value::{QueryResult, Row, Value};
