//!
//! enrollsync: backfill login credentials and SIS user ids for course enrollments.
//!
//! For every active enrollment of the configured types, the reconciler makes
//! sure the enrolled user holds an active pseudonym in the course's root
//! account, that the pseudonym carries a SIS user id generated from a pattern,
//! and that the enrollment points at that pseudonym.
//!
//! ## Core Concepts
//!
//! * **Backends (`backend::Backend`)**: The storage contract. An in-memory store
//!   with JSON persistence and a SQL store for SQLite and PostgreSQL.
//! * **Scopes (`scope::ScopeResolver`)**: The working set of a run, counted and
//!   iterated in fixed-size batches.
//! * **Reconciler (`reconcile::Reconciler`)**: The per-enrollment decision
//!   logic. It returns a [`reconcile::Reconciliation`] value; callers fold those
//!   into [`reconcile::RunStats`] and decide how to render them.
//! * **Reports (`report`)**: Read-only figures and samples for analyze and verify.
//! * **Rollback (`rollback`)**: Clears SIS user ids generated by a pattern.

pub mod backend;
pub mod clock;
pub mod config;
pub mod model;
pub mod pattern;
pub mod reconcile;
pub mod report;
pub mod rollback;
pub mod scope;
pub mod secret;

pub use backend::Backend;
pub use config::Config;
pub use pattern::IdPattern;

/// Result type used throughout the enrollsync library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the enrollsync library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured storage errors from the backend module
    #[error(transparent)]
    Backend(backend::BackendError),

    /// Invalid model values, e.g. an unknown enrollment type
    #[error(transparent)]
    Model(model::ModelError),

    /// Invalid SIS user id patterns
    #[error(transparent)]
    Pattern(pattern::PatternError),

    /// Invalid run configuration
    #[error(transparent)]
    Config(config::ConfigError),

    /// Errors raised while reconciling a single enrollment
    #[error(transparent)]
    Reconcile(reconcile::ReconcileError),

    /// Errors raised by the rollback engine
    #[error(transparent)]
    Rollback(rollback::RollbackError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Backend(_) => "backend",
            Error::Model(_) => "model",
            Error::Pattern(_) => "pattern",
            Error::Config(_) => "config",
            Error::Reconcile(_) => "reconcile",
            Error::Rollback(_) => "rollback",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error indicates a record was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error is the store rejecting a write.
    pub fn is_validation_error(&self) -> bool {
        match self {
            Error::Backend(backend_err) => backend_err.is_validation_error(),
            _ => false,
        }
    }

    /// Check if this error is backend-related.
    pub fn is_backend_error(&self) -> bool {
        matches!(self, Error::Backend(_))
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::Backend(backend_err) => backend_err.is_io_error(),
            _ => false,
        }
    }

    /// Check if this error comes from invalid configuration or input values.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::Config(_) | Error::Pattern(_) | Error::Model(_)
        ) || matches!(self, Error::Rollback(rollback_err) if rollback_err.is_refused())
    }

    /// Validation messages, if the store rejected a write.
    pub fn validation_messages(&self) -> Option<&[String]> {
        match self {
            Error::Backend(backend_err) => backend_err.validation_messages(),
            _ => None,
        }
    }
}
