//! Error types for the reconciliation engine.

use thiserror::Error;

/// Errors raised while reconciling a single enrollment.
///
/// These never escape a run: the reconciler turns them into a failed
/// outcome for the enrollment being processed.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Secret material for a new pseudonym could not be produced.
    #[error("Secret generation failed: {reason}")]
    SecretGeneration {
        /// What went wrong
        reason: String,
    },
}

impl ReconcileError {
    /// Check if this error came from secret generation.
    pub fn is_secret_error(&self) -> bool {
        matches!(self, ReconcileError::SecretGeneration { .. })
    }
}

impl From<ReconcileError> for crate::Error {
    fn from(err: ReconcileError) -> Self {
        crate::Error::Reconcile(err)
    }
}
