//! Storage backends for enrollsync.
//!
//! The [`Backend`] trait is the whole storage contract the reconciler relies
//! on: scoped reads of enrollments, lookups of users and pseudonyms, and the
//! handful of writes the reconciler and rollback perform. Implementations live
//! in [`database`]: an in-memory store with JSON persistence and a SQL store
//! for SQLite and PostgreSQL.
//!
//! Scope filtering is expressed as data ([`EnrollmentScope`] plus a list of
//! [`EnrollmentFilter`] predicates) so each backend can evaluate it natively.

use std::any::Any;

use async_trait::async_trait;

use crate::Result;
use crate::model::{
    AccountId, CourseId, Dataset, Enrollment, EnrollmentId, EnrollmentState, EnrollmentType,
    NewPseudonym, Pseudonym, PseudonymId, User, UserId,
};

pub mod database;
pub mod errors;
pub(crate) mod validation;

pub use errors::BackendError;

/// The working set of a run: enrollments of the given types in the given state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollmentScope {
    pub types: Vec<EnrollmentType>,
    pub state: EnrollmentState,
}

impl EnrollmentScope {
    /// Active enrollments of the given types.
    pub fn active(types: impl Into<Vec<EnrollmentType>>) -> Self {
        Self {
            types: types.into(),
            state: EnrollmentState::Active,
        }
    }

    /// Whether an enrollment falls inside the scope, ignoring filters.
    pub fn contains(&self, enrollment: &Enrollment) -> bool {
        enrollment.workflow_state == self.state && self.types.contains(&enrollment.enrollment_type)
    }
}

/// A named predicate over an in-scope enrollment.
///
/// "Pseudonym" always means an active pseudonym of the enrolled user in the
/// root account of the enrollment's course. When there are several, the SIS
/// user id filters look at the lowest-id one, the pseudonym an update would
/// complete. A list of filters is a conjunction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnrollmentFilter {
    /// The user has a pseudonym.
    HasActivePseudonym,
    /// The user has no pseudonym.
    MissingActivePseudonym,
    /// The user's first pseudonym carries a SIS user id.
    HasSisUserId,
    /// The user has no pseudonym, or the first one has no SIS user id.
    MissingSisUserId,
    /// The enrollment references a pseudonym.
    Linked,
    /// The enrollment references no pseudonym.
    Unlinked,
}

/// Storage contract used by every mode.
///
/// Reads return owned records. Batched reads use keyset pagination: pass the
/// last id of the previous batch as `after` and stop on a short batch. Writes
/// either succeed or return [`BackendError::Validation`] with one message per
/// violated constraint; other errors mean the store itself failed.
#[async_trait]
pub trait Backend: Send + Sync + Any {
    /// Counts in-scope enrollments matching every filter.
    async fn count_enrollments(
        &self,
        scope: &EnrollmentScope,
        filters: &[EnrollmentFilter],
    ) -> Result<u64>;

    /// Counts distinct users among in-scope enrollments matching every filter.
    async fn count_distinct_users(
        &self,
        scope: &EnrollmentScope,
        filters: &[EnrollmentFilter],
    ) -> Result<u64>;

    /// Returns up to `limit` in-scope enrollments matching every filter with
    /// an id greater than `after`, ordered by id.
    async fn enrollments_after(
        &self,
        scope: &EnrollmentScope,
        filters: &[EnrollmentFilter],
        after: Option<EnrollmentId>,
        limit: usize,
    ) -> Result<Vec<Enrollment>>;

    /// Retrieves a user.
    async fn get_user(&self, id: UserId) -> Result<User>;

    /// Retrieves a pseudonym regardless of its state.
    async fn get_pseudonym(&self, id: PseudonymId) -> Result<Pseudonym>;

    /// Resolves the root account of a course.
    async fn root_account_for_course(&self, id: CourseId) -> Result<AccountId>;

    /// Active pseudonyms of a user in an account, ordered by id.
    async fn active_pseudonyms(&self, user: UserId, account: AccountId) -> Result<Vec<Pseudonym>>;

    /// Whether any pseudonym in the account other than `excluding` holds this SIS user id.
    async fn sis_user_id_taken(
        &self,
        account: AccountId,
        sis_user_id: &str,
        excluding: Option<PseudonymId>,
    ) -> Result<bool>;

    /// Validates and stores a new pseudonym, assigning its id.
    async fn create_pseudonym(&self, pseudonym: NewPseudonym) -> Result<Pseudonym>;

    /// Validates and sets the SIS user id of a pseudonym.
    async fn assign_sis_user_id(&self, id: PseudonymId, sis_user_id: &str) -> Result<()>;

    /// Clears the SIS user id of a pseudonym without validation.
    async fn clear_sis_user_id(&self, id: PseudonymId) -> Result<()>;

    /// Points an enrollment at a pseudonym.
    async fn link_enrollment(&self, id: EnrollmentId, pseudonym: PseudonymId) -> Result<()>;

    /// Counts active pseudonyms whose SIS user id starts with `prefix`.
    async fn count_pseudonyms_with_sis_prefix(&self, prefix: &str) -> Result<u64>;

    /// Returns up to `limit` active pseudonyms whose SIS user id starts with
    /// `prefix` and whose id is greater than `after`, ordered by id.
    async fn pseudonyms_with_sis_prefix_after(
        &self,
        prefix: &str,
        after: Option<PseudonymId>,
        limit: usize,
    ) -> Result<Vec<Pseudonym>>;

    /// Loads every record of a dataset. Ids must not already exist.
    async fn import(&self, dataset: Dataset) -> Result<()>;

    /// Returns every stored record.
    async fn export(&self) -> Result<Dataset>;

    /// Returns a reference to the backend as `Any` for downcasting.
    fn as_any(&self) -> &dyn Any;
}
