//! Auth service: checks operator credentials.

use crate::ports::CredentialRepository;

/// Application service for operator login checks.
pub struct AuthService<R> {
    repo: R,
}

impl<R: CredentialRepository> AuthService<R> {
    /// Create a new service backed by the given repository.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Whether `email` and `password` match a stored credential.
    ///
    /// A failed lookup is logged and treated as a rejected login.
    pub async fn login(&self, email: &str, password: &str) -> bool {
        match self.repo.find_by_email(email).await {
            Ok(Some(credential)) => credential.accepts(password),
            Ok(None) => false,
            Err(err) => {
                tracing::warn!(error = %err.message(), "credential lookup failed");
                false
            }
        }
    }
}
