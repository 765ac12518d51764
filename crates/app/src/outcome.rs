//! Outcome: a plain value plus an error-message slot, the shape UI state
//! hooks consume.

use wecare_domain::error::WeCareError;

/// Result of a use-case flattened for presentation.
///
/// On failure `value` falls back to `T::default()` (`false`, `None`, an empty
/// list) and `error` holds the message to render verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<T> {
    pub value: T,
    pub error: Option<String>,
}

impl<T> Outcome<T> {
    /// A successful outcome.
    #[must_use]
    pub fn ok(value: T) -> Self {
        Self { value, error: None }
    }

    /// Whether an error message is set.
    #[must_use]
    pub fn is_err(&self) -> bool {
        self.error.is_some()
    }
}

impl<T: Default> Outcome<T> {
    /// A failed outcome carrying the full message of `err`.
    #[must_use]
    pub fn failed(err: &WeCareError) -> Self {
        Self {
            value: T::default(),
            error: Some(err.message()),
        }
    }
}

impl<T: Default> From<Result<T, WeCareError>> for Outcome<T> {
    fn from(result: Result<T, WeCareError>) -> Self {
        match result {
            Ok(value) => Self::ok(value),
            Err(err) => Self::failed(&err),
        }
    }
}
