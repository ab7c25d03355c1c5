//! Run-level counters.

use super::{LinkOutcome, PseudonymOutcome, Reconciliation};
use crate::model::EnrollmentId;

/// Diagnostics kept per run. Later ones are only counted.
pub const MAX_DIAGNOSTICS: usize = 100;

/// Characters kept per diagnostic message.
pub const MAX_DIAGNOSTIC_LENGTH: usize = 200;

/// Counters for one update pass.
///
/// Each enrollment contributes at most one pseudonym outcome and may also
/// count as linked. A link that was already in place counts nowhere.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    pub processed: u64,
    pub created: u64,
    pub updated: u64,
    pub unchanged: u64,
    pub linked: u64,
    pub skipped: u64,
    pub failed: u64,
    diagnostics: Vec<String>,
    diagnostics_total: u64,
}

impl RunStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one enrollment's result into the counters.
    pub fn record(&mut self, result: &Reconciliation) {
        self.processed += 1;

        match &result.pseudonym {
            PseudonymOutcome::Created => self.created += 1,
            PseudonymOutcome::Updated => self.updated += 1,
            PseudonymOutcome::Unchanged => self.unchanged += 1,
            PseudonymOutcome::Skipped { reason } => {
                self.skipped += 1;
                self.diagnostic(result.enrollment_id, reason);
            }
            PseudonymOutcome::Failed { reason } => {
                self.failed += 1;
                self.diagnostic(result.enrollment_id, reason);
            }
        }

        match &result.link {
            LinkOutcome::Linked => self.linked += 1,
            LinkOutcome::AlreadyLinked | LinkOutcome::NotAttempted => {}
            LinkOutcome::Failed { reason } => {
                self.failed += 1;
                self.diagnostic(result.enrollment_id, reason);
            }
        }
    }

    /// Count a diagnostic, keeping its text while there is room.
    pub fn diagnostic(&mut self, enrollment: EnrollmentId, message: &str) {
        self.diagnostics_total += 1;
        if self.diagnostics.len() < MAX_DIAGNOSTICS {
            let line = format!("Enrollment {enrollment}: {message}");
            self.diagnostics.push(truncate(&line, MAX_DIAGNOSTIC_LENGTH));
        }
    }

    /// Retained diagnostics, oldest first.
    pub fn diagnostics(&self) -> &[String] {
        &self.diagnostics
    }

    /// Every diagnostic raised, retained or not.
    pub fn diagnostics_total(&self) -> u64 {
        self.diagnostics_total
    }

    /// Whether the pass changed anything in the store.
    pub fn has_changes(&self) -> bool {
        self.created + self.updated + self.linked > 0
    }
}

/// Cut a message to at most `max` characters.
pub(crate) fn truncate(message: &str, max: usize) -> String {
    match message.char_indices().nth(max) {
        Some((end, _)) => message[..end].to_string(),
        None => message.to_string(),
    }
}
