//! Run configuration.
//!
//! A [`Config`] is read once at start and stays fixed for the run. The binary
//! fills it from environment variables; tests build it directly.

use std::time::Duration;

use thiserror::Error;

use crate::Result;
use crate::backend::EnrollmentScope;
use crate::model::EnrollmentType;
use crate::pattern::IdPattern;

/// Batch size used when none is configured.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Seconds rollback waits between announcing and clearing.
pub const DEFAULT_ROLLBACK_DELAY_SECS: u64 = 5;

/// Errors in run configuration.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Batches must hold at least one record.
    #[error("Batch size must be positive")]
    ZeroBatchSize,

    /// The run would have nothing to look at.
    #[error("No enrollment types configured")]
    NoEnrollmentTypes,
}

impl From<ConfigError> for crate::Error {
    fn from(err: ConfigError) -> Self {
        crate::Error::Config(err)
    }
}

/// Settings shared by every mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Template for generated SIS user ids.
    pub pattern: IdPattern,
    /// Records per batch when iterating a scope.
    pub batch_size: usize,
    /// Enrollment types in scope.
    pub enrollment_types: Vec<EnrollmentType>,
    /// Pause before rollback clears anything.
    pub rollback_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            pattern: IdPattern::default(),
            batch_size: DEFAULT_BATCH_SIZE,
            enrollment_types: vec![EnrollmentType::StudentEnrollment],
            rollback_delay: Duration::from_secs(DEFAULT_ROLLBACK_DELAY_SECS),
        }
    }
}

impl Config {
    /// Set the SIS user id pattern.
    pub fn with_pattern(mut self, pattern: IdPattern) -> Self {
        self.pattern = pattern;
        self
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    /// Set the enrollment types in scope.
    pub fn with_enrollment_types(mut self, types: impl Into<Vec<EnrollmentType>>) -> Self {
        self.enrollment_types = types.into();
        self
    }

    /// Set the rollback delay.
    pub fn with_rollback_delay(mut self, delay: Duration) -> Self {
        self.rollback_delay = delay;
        self
    }

    /// Check the settings before a run starts.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize.into());
        }
        if self.enrollment_types.is_empty() {
            return Err(ConfigError::NoEnrollmentTypes.into());
        }
        Ok(())
    }

    /// The working set every mode starts from.
    pub fn scope(&self) -> EnrollmentScope {
        EnrollmentScope::active(self.enrollment_types.clone())
    }
}
