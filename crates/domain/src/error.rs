//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`WeCareError`]
//! via `From`. Foreign errors are carried as boxed sources, never flattened
//! into strings.

use std::error::Error as StdError;

/// Boxed error source crossing a layer boundary.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Top-level error for every use-case in the workspace.
#[derive(Debug, thiserror::Error)]
pub enum WeCareError {
    /// The database engine could not be reached or started. Fatal.
    #[error("initialization error")]
    Initialization(#[source] BoxError),

    /// Schema creation or seeding failed at startup. Fatal.
    #[error("schema error")]
    Schema(#[source] BoxError),

    /// A domain invariant was violated by caller input.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// A lookup by identifier found nothing.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// A command failed inside the engine; its transaction was rolled back.
    #[error("persistence error")]
    Persistence(#[source] BoxError),
}

impl WeCareError {
    /// Render the error together with its whole source chain, suitable for
    /// showing verbatim to the operator.
    ///
    /// A source whose text already ends the message (wrappers that print
    /// their inner error) is not repeated.
    #[must_use]
    pub fn message(&self) -> String {
        let mut message = self.to_string();
        let mut source = self.source();
        while let Some(err) = source {
            let text = err.to_string();
            if !message.ends_with(&text) {
                message.push_str(": ");
                message.push_str(&text);
            }
            source = err.source();
        }
        message
    }
}

/// Domain invariant violations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("name must not be empty")]
    EmptyName,

    #[error("email must not be empty")]
    EmptyEmail,

    #[error("phone must not be empty")]
    EmptyPhone,

    #[error("date of birth is required")]
    MissingDateOfBirth,

    #[error("unknown patient status `{0}`")]
    UnknownStatus(String),
}

/// A record addressed by identifier does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} `{id}` not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}
