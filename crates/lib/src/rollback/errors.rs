//! Error types for the rollback engine.

use thiserror::Error;

/// Errors raised by the rollback engine.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RollbackError {
    /// The pattern has no literal text before its placeholder, so every SIS
    /// user id would match.
    #[error("Pattern '{pattern}' has an empty prefix; refusing to clear every SIS user id")]
    EmptyPrefix {
        /// The configured pattern
        pattern: String,
    },
}

impl RollbackError {
    /// Check if rollback refused to start.
    pub fn is_refused(&self) -> bool {
        matches!(self, RollbackError::EmptyPrefix { .. })
    }
}

impl From<RollbackError> for crate::Error {
    fn from(err: RollbackError) -> Self {
        crate::Error::Rollback(err)
    }
}
