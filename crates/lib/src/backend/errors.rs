//! Error types for the storage backends.
//!
//! Validation failures are the storage layer's own constraints rejecting a
//! write. They are recoverable per record; everything else is either a missing
//! record or a fault in the storage engine itself.

use thiserror::Error;

/// Errors that can occur during backend operations.
///
/// # Stability
///
/// - New variants may be added in minor versions (enum is `#[non_exhaustive]`)
/// - Helper methods like `is_*()` provide stable APIs
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BackendError {
    /// A referenced record does not exist.
    #[error("{record} not found: {id}")]
    RecordNotFound {
        /// The record kind, e.g. `user`
        record: &'static str,
        /// The raw id that was looked up
        id: i64,
    },

    /// A write was rejected by the store's constraints.
    #[error("{record} is invalid: {}", .messages.join(", "))]
    Validation {
        /// The record kind being written
        record: &'static str,
        /// One message per violated constraint
        messages: Vec<String>,
    },

    /// A record with this id already exists.
    #[error("Duplicate {record} id: {id}")]
    DuplicateRecord {
        /// The record kind
        record: &'static str,
        /// The conflicting id
        id: i64,
    },

    /// A stored row could not be turned back into a record.
    #[error("Invalid stored row: {reason}")]
    InvalidRow {
        /// What was wrong with it
        reason: String,
    },

    /// Serialization failed.
    #[error("Serialization failed")]
    SerializationFailed {
        /// The underlying serialization error
        #[source]
        source: serde_json::Error,
    },

    /// Deserialization failed.
    #[error("Deserialization failed")]
    DeserializationFailed {
        /// The underlying deserialization error
        #[source]
        source: serde_json::Error,
    },

    /// File I/O error.
    #[error("File I/O error")]
    FileIo {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// SQL engine error.
    #[cfg(any(feature = "sqlite", feature = "postgres"))]
    #[error("SQL error: {reason}")]
    SqlxError {
        /// Context and message
        reason: String,
        /// The underlying sqlx error, when there is one
        #[source]
        source: Option<sqlx::Error>,
    },
}

impl BackendError {
    /// Shorthand for a validation failure with a single message.
    pub fn invalid(record: &'static str, message: impl Into<String>) -> Self {
        BackendError::Validation {
            record,
            messages: vec![message.into()],
        }
    }

    /// Check if this error indicates a record was not found.
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::RecordNotFound { .. })
    }

    /// Check if this error is a constraint rejecting a write.
    pub fn is_validation_error(&self) -> bool {
        matches!(self, BackendError::Validation { .. })
    }

    /// Check if this error is related to I/O operations.
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            BackendError::FileIo { .. }
                | BackendError::SerializationFailed { .. }
                | BackendError::DeserializationFailed { .. }
        )
    }

    /// Validation messages, if this is a validation failure.
    pub fn validation_messages(&self) -> Option<&[String]> {
        match self {
            BackendError::Validation { messages, .. } => Some(messages),
            _ => None,
        }
    }
}

impl From<BackendError> for crate::Error {
    fn from(err: BackendError) -> Self {
        crate::Error::Backend(err)
    }
}

/// Collects constraint violations for one write.
#[derive(Debug)]
pub(crate) struct Violations {
    record: &'static str,
    messages: Vec<String>,
}

impl Violations {
    pub(crate) fn new(record: &'static str) -> Self {
        Self {
            record,
            messages: Vec::new(),
        }
    }

    pub(crate) fn check(&mut self, ok: bool, message: impl FnOnce() -> String) {
        if !ok {
            self.messages.push(message());
        }
    }

    pub(crate) fn into_result(self) -> crate::Result<()> {
        if self.messages.is_empty() {
            Ok(())
        } else {
            Err(BackendError::Validation {
                record: self.record,
                messages: self.messages,
            }
            .into())
        }
    }
}
