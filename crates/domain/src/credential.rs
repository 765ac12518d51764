//! Credential: the operator login stored next to the patient records.

use serde::{Deserialize, Serialize};

/// Email of the credential seeded when the credential set is empty.
pub const DEFAULT_EMAIL: &str = "info@admin.com";

/// Password of the credential seeded when the credential set is empty.
pub const DEFAULT_PASSWORD: &str = "password";

/// A login credential, keyed by email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub email: String,
    pub password: String,
}

impl Credential {
    /// The credential seeded at bootstrap.
    #[must_use]
    pub fn seed() -> Self {
        Self {
            email: DEFAULT_EMAIL.to_string(),
            password: DEFAULT_PASSWORD.to_string(),
        }
    }

    /// Whether `password` matches this credential.
    #[must_use]
    pub fn accepts(&self, password: &str) -> bool {
        self.password == password
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_accept_matching_password_only() {
        let cred = Credential::seed();
        assert!(cred.accepts("password"));
        assert!(!cred.accepts("Password"));
    }
}
