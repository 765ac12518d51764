//! Schema bootstrap: idempotent DDL and the default operator credential.

use wecare_domain::credential::Credential;

use crate::connection::ConnectionManager;
use crate::error::SchemaError;
use crate::value::Value;

const CREATE_USERS: &str = "CREATE TABLE IF NOT EXISTS users (
    email TEXT PRIMARY KEY,
    password TEXT NOT NULL
)";

const CREATE_PATIENTS: &str = "CREATE TABLE IF NOT EXISTS patients (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    email TEXT NOT NULL,
    phone TEXT NOT NULL,
    dob DATE NOT NULL,
    gender TEXT,
    address TEXT,
    medical_history TEXT,
    status TEXT NOT NULL,
    registered_date DATE NOT NULL
)";

const COUNT_USERS: &str = "SELECT COUNT(*) AS total FROM users";
const INSERT_USER: &str = "INSERT INTO users (email, password) VALUES (?, ?)";

/// Create missing tables and seed the default credential into an empty
/// `users` table. Safe to run on every start.
///
/// The count and the insert are separate statements; this relies on the
/// manager being the only engine host of the database.
///
/// # Errors
///
/// Returns [`SchemaError`] if the engine is unreachable, a table cannot be
/// created, or seeding fails.
pub async fn initialize(manager: &ConnectionManager) -> Result<(), SchemaError> {
    let connection = manager.get_connection().await?;

    for (table, ddl) in [("users", CREATE_USERS), ("patients", CREATE_PATIENTS)] {
        connection
            .query(ddl, Vec::new())
            .await
            .map_err(|source| SchemaError::Create { table, source })?;
    }

    let counted = connection
        .query(COUNT_USERS, Vec::new())
        .await
        .map_err(SchemaError::Seed)?;
    let total = match counted.first() {
        Some(row) => row.integer("total").map_err(SchemaError::Seed)?,
        None => 0,
    };

    if total == 0 {
        let seed = Credential::seed();
        connection
            .query(
                INSERT_USER,
                vec![Value::from(seed.email.as_str()), Value::from(seed.password)],
            )
            .await
            .map_err(SchemaError::Seed)?;
        tracing::info!(email = %seed.email, "seeded default credential");
    } else {
        tracing::debug!(total, "credentials present, seed skipped");
    }

    tracing::info!("database schema ready");
    Ok(())
}
