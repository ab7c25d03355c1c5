//! Per-enrollment reconciliation.
//!
//! [`Reconciler::reconcile`] takes one in-scope enrollment and makes sure the
//! enrolled user has an active pseudonym in the course's root account, that
//! the pseudonym carries a SIS user id, and that the enrollment points at it.
//! It never returns an error: anything that goes wrong with one enrollment is
//! reported in the returned [`Reconciliation`] so the pass can continue.
//!
//! Existing SIS user ids are never overwritten, and a generated id that is
//! already held by another pseudonym in the same account is never forced.
//! Running the reconciler again over reconciled data changes nothing.

mod errors;
mod stats;
mod update;

use std::sync::Arc;

use tracing::{debug, warn};

pub use errors::ReconcileError;
pub use stats::{MAX_DIAGNOSTIC_LENGTH, MAX_DIAGNOSTICS, RunStats};
pub(crate) use stats::truncate;
pub use update::{UpdateReport, run_update, run_update_with};

use crate::Result;
use crate::backend::Backend;
use crate::clock::{Clock, SystemClock};
use crate::model::{
    AccountId, Enrollment, EnrollmentId, NewPseudonym, Pseudonym, PseudonymId, User,
};
use crate::pattern::IdPattern;
use crate::secret;

/// Domain used for login handles of users without an email address.
pub const FALLBACK_LOGIN_DOMAIN: &str = "generated.local";

/// What happened to the user's pseudonym.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PseudonymOutcome {
    /// A new pseudonym with a generated SIS user id was stored.
    Created,
    /// The existing pseudonym received a generated SIS user id.
    Updated,
    /// The existing pseudonym already had a SIS user id.
    Unchanged,
    /// The generated SIS user id is held by another pseudonym in the account.
    Skipped { reason: String },
    /// The pseudonym could not be created or updated.
    Failed { reason: String },
}

impl PseudonymOutcome {
    /// Whether the enrollment may be linked after this outcome.
    pub fn allows_link(&self) -> bool {
        matches!(
            self,
            PseudonymOutcome::Created | PseudonymOutcome::Updated | PseudonymOutcome::Unchanged
        )
    }
}

/// What happened to the enrollment's link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The enrollment now points at the pseudonym.
    Linked,
    /// The enrollment already pointed at the pseudonym.
    AlreadyLinked,
    /// The pseudonym step did not leave anything to link to.
    NotAttempted,
    /// The link could not be stored.
    Failed { reason: String },
}

/// The result of reconciling one enrollment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub enrollment_id: EnrollmentId,
    /// The pseudonym the enrollment was resolved to, if any.
    pub pseudonym_id: Option<PseudonymId>,
    pub pseudonym: PseudonymOutcome,
    pub link: LinkOutcome,
}

impl Reconciliation {
    fn new(
        enrollment_id: EnrollmentId,
        pseudonym_id: Option<PseudonymId>,
        pseudonym: PseudonymOutcome,
    ) -> Self {
        Self {
            enrollment_id,
            pseudonym_id,
            pseudonym,
            link: LinkOutcome::NotAttempted,
        }
    }

    /// Whether the enrollment was already fully reconciled.
    pub fn is_noop(&self) -> bool {
        self.pseudonym == PseudonymOutcome::Unchanged && self.link == LinkOutcome::AlreadyLinked
    }

    /// Whether either step failed.
    pub fn is_failed(&self) -> bool {
        matches!(self.pseudonym, PseudonymOutcome::Failed { .. })
            || matches!(self.link, LinkOutcome::Failed { .. })
    }
}

/// The login handle for a pseudonym created on a user's behalf.
///
/// The user's email when they have one, otherwise `user-<id>@generated.local`.
pub fn login_handle(user: &User) -> String {
    match user.email.as_deref().map(str::trim) {
        Some(email) if !email.is_empty() => email.to_string(),
        _ => format!("user-{}@{FALLBACK_LOGIN_DOMAIN}", user.id),
    }
}

/// Applies the reconciliation rules to one enrollment at a time.
pub struct Reconciler<'a> {
    backend: &'a dyn Backend,
    pattern: IdPattern,
    clock: Arc<dyn Clock>,
}

impl<'a> Reconciler<'a> {
    pub fn new(backend: &'a dyn Backend, pattern: IdPattern) -> Self {
        Self {
            backend,
            pattern,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use a different time source for creation timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn backend(&self) -> &'a dyn Backend {
        self.backend
    }

    pub fn pattern(&self) -> &IdPattern {
        &self.pattern
    }

    /// Reconcile one enrollment.
    pub async fn reconcile(&self, enrollment: &Enrollment) -> Reconciliation {
        let mut result = match self.ensure_pseudonym(enrollment).await {
            Ok(result) => result,
            Err(err) => {
                warn!(enrollment = %enrollment.id, error = %err, "Failed to reconcile enrollment");
                Reconciliation::new(
                    enrollment.id,
                    None,
                    PseudonymOutcome::Failed {
                        reason: err.to_string(),
                    },
                )
            }
        };

        if let Some(pseudonym_id) = result.pseudonym_id
            && result.pseudonym.allows_link()
        {
            result.link = self.link(enrollment, pseudonym_id).await;
        }

        debug!(
            enrollment = %enrollment.id,
            pseudonym = ?result.pseudonym,
            link = ?result.link,
            "Reconciled enrollment"
        );
        result
    }

    /// Locate, create or complete the user's pseudonym in the course's root account.
    async fn ensure_pseudonym(&self, enrollment: &Enrollment) -> Result<Reconciliation> {
        let user = self.backend.get_user(enrollment.user_id).await?;
        let account = self
            .backend
            .root_account_for_course(enrollment.course_id)
            .await?;

        let mut pseudonyms = self.backend.active_pseudonyms(user.id, account).await?;
        if pseudonyms.len() > 1 {
            debug!(
                user = %user.id,
                account = %account,
                count = pseudonyms.len(),
                "User has several active pseudonyms, using the lowest id"
            );
        }
        pseudonyms.sort_by_key(|p| p.id);

        let result = match pseudonyms.into_iter().next() {
            None => {
                let (id, outcome) = self.create(&user, account).await?;
                Reconciliation::new(enrollment.id, id, outcome)
            }
            Some(pseudonym) if pseudonym.sis_user_id.is_some() => Reconciliation::new(
                enrollment.id,
                Some(pseudonym.id),
                PseudonymOutcome::Unchanged,
            ),
            Some(pseudonym) => {
                let outcome = self.assign(&pseudonym).await?;
                Reconciliation::new(enrollment.id, Some(pseudonym.id), outcome)
            }
        };
        Ok(result)
    }

    async fn create(
        &self,
        user: &User,
        account: AccountId,
    ) -> Result<(Option<PseudonymId>, PseudonymOutcome)> {
        let secret = secret::generate()?;
        let new = NewPseudonym {
            user_id: user.id,
            account_id: account,
            unique_id: login_handle(user),
            sis_user_id: Some(self.pattern.format(user.id)),
            crypted_password: secret.crypted_password,
            password_salt: secret.password_salt,
            created_at: self.clock.now_millis(),
        };

        match self.backend.create_pseudonym(new).await {
            Ok(pseudonym) => {
                debug!(user = %user.id, pseudonym = %pseudonym.id, "Created pseudonym");
                Ok((Some(pseudonym.id), PseudonymOutcome::Created))
            }
            Err(err) => {
                warn!(
                    user = %user.id,
                    account = %account,
                    error = %err,
                    "Failed to create pseudonym"
                );
                Ok((
                    None,
                    PseudonymOutcome::Failed {
                        reason: format!("Failed to create pseudonym for user {}: {err}", user.id),
                    },
                ))
            }
        }
    }

    async fn assign(&self, pseudonym: &Pseudonym) -> Result<PseudonymOutcome> {
        let sis_user_id = self.pattern.format(pseudonym.user_id);

        if self
            .backend
            .sis_user_id_taken(pseudonym.account_id, &sis_user_id, Some(pseudonym.id))
            .await?
        {
            warn!(
                pseudonym = %pseudonym.id,
                account = %pseudonym.account_id,
                sis_user_id = %sis_user_id,
                "SIS user id already in use"
            );
            return Ok(PseudonymOutcome::Skipped {
                reason: format!(
                    "SIS ID {sis_user_id} already in use in account {}, pseudonym {} left unchanged",
                    pseudonym.account_id, pseudonym.id
                ),
            });
        }

        match self
            .backend
            .assign_sis_user_id(pseudonym.id, &sis_user_id)
            .await
        {
            Ok(()) => Ok(PseudonymOutcome::Updated),
            Err(err) => {
                warn!(pseudonym = %pseudonym.id, error = %err, "Failed to assign SIS user id");
                Ok(PseudonymOutcome::Failed {
                    reason: format!(
                        "Failed to assign SIS ID {sis_user_id} to pseudonym {}: {err}",
                        pseudonym.id
                    ),
                })
            }
        }
    }

    async fn link(&self, enrollment: &Enrollment, pseudonym_id: PseudonymId) -> LinkOutcome {
        if enrollment.sis_pseudonym_id == Some(pseudonym_id) {
            return LinkOutcome::AlreadyLinked;
        }

        match self
            .backend
            .link_enrollment(enrollment.id, pseudonym_id)
            .await
        {
            Ok(()) => LinkOutcome::Linked,
            Err(err) => {
                warn!(
                    enrollment = %enrollment.id,
                    pseudonym = %pseudonym_id,
                    error = %err,
                    "Failed to link enrollment"
                );
                LinkOutcome::Failed {
                    reason: format!("Failed to link pseudonym {pseudonym_id}: {err}"),
                }
            }
        }
    }
}
