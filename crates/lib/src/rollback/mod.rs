//! Undoing generated SIS user ids.
//!
//! Rollback is two steps so the caller can pause in between: [`plan_rollback`]
//! finds active pseudonyms whose SIS user id starts with the pattern's
//! literal prefix, and [`execute_rollback`] clears those ids batch by batch.
//! Clearing skips validation and carries on past individual failures.
//!
//! Any SIS user id with the prefix matches, including ones that were not
//! generated by the reconciler. Pick a distinctive prefix.

mod errors;

use tracing::{info, warn};

pub use errors::RollbackError;

use crate::Result;
use crate::backend::Backend;
use crate::model::{Pseudonym, PseudonymId};
use crate::pattern::IdPattern;
use crate::reconcile::{MAX_DIAGNOSTIC_LENGTH, MAX_DIAGNOSTICS, truncate};

/// Pseudonyms shown before clearing.
pub const SAMPLE_SIZE: usize = 5;

/// What a rollback would clear.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackPlan {
    pub pattern: String,
    pub prefix: String,
    /// Active pseudonyms whose SIS user id starts with the prefix.
    pub matched: u64,
    /// The first few of them by id.
    pub sample: Vec<Pseudonym>,
}

impl RollbackPlan {
    /// Nothing to clear; callers skip the delay and the execute step.
    pub fn is_empty(&self) -> bool {
        self.matched == 0
    }
}

/// Find what a rollback for `pattern` would clear.
pub async fn plan_rollback(backend: &dyn Backend, pattern: &IdPattern) -> Result<RollbackPlan> {
    let prefix = pattern.prefix();
    if prefix.is_empty() {
        return Err(RollbackError::EmptyPrefix {
            pattern: pattern.to_string(),
        }
        .into());
    }

    let matched = backend.count_pseudonyms_with_sis_prefix(prefix).await?;
    let sample = backend
        .pseudonyms_with_sis_prefix_after(prefix, None, SAMPLE_SIZE)
        .await?;

    info!(prefix, matched, "Planned rollback");
    Ok(RollbackPlan {
        pattern: pattern.to_string(),
        prefix: prefix.to_string(),
        matched,
        sample,
    })
}

/// Totals of a rollback.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RollbackReport {
    pub cleared: u64,
    pub failed: u64,
    failures: Vec<String>,
}

impl RollbackReport {
    fn failure(&mut self, id: PseudonymId, message: &str) {
        self.failed += 1;
        if self.failures.len() < MAX_DIAGNOSTICS {
            let line = format!("Pseudonym {id}: {message}");
            self.failures.push(truncate(&line, MAX_DIAGNOSTIC_LENGTH));
        }
    }

    /// Retained failure messages, oldest first.
    pub fn failures(&self) -> &[String] {
        &self.failures
    }
}

/// Clear the SIS user id of every pseudonym the plan's prefix matches.
///
/// Matches are re-read in batches of `batch_size`, so pseudonyms that gained
/// a matching id after planning are cleared too.
pub async fn execute_rollback(
    backend: &dyn Backend,
    plan: &RollbackPlan,
    batch_size: usize,
) -> Result<RollbackReport> {
    if plan.prefix.is_empty() {
        return Err(RollbackError::EmptyPrefix {
            pattern: plan.pattern.clone(),
        }
        .into());
    }

    let batch_size = batch_size.max(1);
    let mut report = RollbackReport::default();
    let mut after = None;
    loop {
        let batch = backend
            .pseudonyms_with_sis_prefix_after(&plan.prefix, after, batch_size)
            .await?;
        let Some(last) = batch.last() else {
            break;
        };
        after = Some(last.id);

        for pseudonym in &batch {
            match backend.clear_sis_user_id(pseudonym.id).await {
                Ok(()) => report.cleared += 1,
                Err(err) => {
                    warn!(pseudonym = %pseudonym.id, error = %err, "Failed to clear SIS user id");
                    report.failure(pseudonym.id, &err.to_string());
                }
            }
        }

        if batch.len() < batch_size {
            break;
        }
    }

    info!(
        prefix = %plan.prefix,
        cleared = report.cleared,
        failed = report.failed,
        "Rollback finished"
    );
    Ok(report)
}
