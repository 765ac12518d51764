//! `SQLite` implementation of [`CredentialRepository`].

use std::future::Future;
use std::sync::Arc;

use wecare_app::ports::CredentialRepository;
use wecare_domain::credential::Credential;
use wecare_domain::error::WeCareError;

use crate::connection::ConnectionManager;
use crate::value::Value;

const SELECT_BY_EMAIL: &str = "SELECT email, password FROM users WHERE email = ?";

/// `SQLite`-backed credential lookup.
pub struct SqliteCredentialRepository {
    manager: Arc<ConnectionManager>,
}

impl SqliteCredentialRepository {
    #[must_use]
    pub fn new(manager: Arc<ConnectionManager>) -> Self {
        Self { manager }
    }
}

impl CredentialRepository for SqliteCredentialRepository {
    fn find_by_email(
        &self,
        email: &str,
    ) -> impl Future<Output = Result<Option<Credential>, WeCareError>> + Send {
        let params = vec![Value::from(email)];
        async move {
            let result = self.manager.query(SELECT_BY_EMAIL, params).await?;
            let Some(row) = result.first() else {
                return Ok(None);
            };
            Ok(Some(Credential {
                email: row.text("email")?,
                password: row.text("password")?,
            }))
        }
    }
}
