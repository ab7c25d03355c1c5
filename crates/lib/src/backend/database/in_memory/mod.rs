//! In-memory database backend implementation
//!
//! This module provides an in-memory implementation of the Backend trait,
//! suitable for testing, development, or small datasets loaded from a JSON
//! snapshot and written back after a run.

mod persistence;
mod query;
mod storage;

use std::any::Any;
use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::Result;
use crate::backend::errors::BackendError;
use crate::backend::{Backend, EnrollmentFilter, EnrollmentScope};
use crate::model::{
    Account, AccountId, Course, CourseId, Dataset, Enrollment, EnrollmentId, NewPseudonym,
    Pseudonym, PseudonymId, User, UserId,
};

/// All records, keyed and ordered by id.
#[derive(Debug, Default)]
pub(crate) struct Tables {
    pub(crate) accounts: BTreeMap<AccountId, Account>,
    pub(crate) courses: BTreeMap<CourseId, Course>,
    pub(crate) users: BTreeMap<UserId, User>,
    pub(crate) enrollments: BTreeMap<EnrollmentId, Enrollment>,
    pub(crate) pseudonyms: BTreeMap<PseudonymId, Pseudonym>,
}

/// A simple in-memory backend using ordered maps for storage.
///
/// Ordered maps give id-ordered iteration for free, which is what keyset
/// pagination needs. State can be saved to and loaded from a JSON file
/// holding a [`Dataset`].
#[derive(Debug, Default)]
pub struct InMemory {
    pub(crate) tables: RwLock<Tables>,
}

impl InMemory {
    /// Creates a new, empty `InMemory` backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend holding the records of a dataset.
    pub async fn from_dataset(dataset: Dataset) -> Result<Self> {
        let backend = Self::new();
        backend.import(dataset).await?;
        Ok(backend)
    }

    /// Saves every record to a JSON file.
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        persistence::save_to_file(self, path).await
    }

    /// Loads records from a JSON file.
    ///
    /// If the file does not exist, a new, empty backend is returned.
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        persistence::load_from_file(path).await
    }
}

#[async_trait]
impl Backend for InMemory {
    async fn count_enrollments(
        &self,
        scope: &EnrollmentScope,
        filters: &[EnrollmentFilter],
    ) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(query::scoped(&tables, scope, filters).count() as u64)
    }

    async fn count_distinct_users(
        &self,
        scope: &EnrollmentScope,
        filters: &[EnrollmentFilter],
    ) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(query::distinct_users(&tables, scope, filters).len() as u64)
    }

    async fn enrollments_after(
        &self,
        scope: &EnrollmentScope,
        filters: &[EnrollmentFilter],
        after: Option<EnrollmentId>,
        limit: usize,
    ) -> Result<Vec<Enrollment>> {
        let tables = self.tables.read().await;
        Ok(query::scoped(&tables, scope, filters)
            .filter(|e| after.is_none_or(|after| e.id > after))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_user(&self, id: UserId) -> Result<User> {
        let tables = self.tables.read().await;
        tables.users.get(&id).cloned().ok_or_else(|| {
            BackendError::RecordNotFound {
                record: "user",
                id: id.get(),
            }
            .into()
        })
    }

    async fn get_pseudonym(&self, id: PseudonymId) -> Result<Pseudonym> {
        let tables = self.tables.read().await;
        tables.pseudonyms.get(&id).cloned().ok_or_else(|| {
            BackendError::RecordNotFound {
                record: "pseudonym",
                id: id.get(),
            }
            .into()
        })
    }

    async fn root_account_for_course(&self, id: CourseId) -> Result<AccountId> {
        let tables = self.tables.read().await;
        query::root_account(&tables, id).ok_or_else(|| {
            BackendError::RecordNotFound {
                record: "course",
                id: id.get(),
            }
            .into()
        })
    }

    async fn active_pseudonyms(&self, user: UserId, account: AccountId) -> Result<Vec<Pseudonym>> {
        let tables = self.tables.read().await;
        Ok(query::active_pseudonyms(&tables, user, account)
            .cloned()
            .collect())
    }

    async fn sis_user_id_taken(
        &self,
        account: AccountId,
        sis_user_id: &str,
        excluding: Option<PseudonymId>,
    ) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(query::sis_user_id_taken(
            &tables,
            account,
            sis_user_id,
            excluding,
        ))
    }

    async fn create_pseudonym(&self, pseudonym: NewPseudonym) -> Result<Pseudonym> {
        let mut tables = self.tables.write().await;
        storage::create_pseudonym(&mut tables, pseudonym)
    }

    async fn assign_sis_user_id(&self, id: PseudonymId, sis_user_id: &str) -> Result<()> {
        let mut tables = self.tables.write().await;
        storage::assign_sis_user_id(&mut tables, id, sis_user_id)
    }

    async fn clear_sis_user_id(&self, id: PseudonymId) -> Result<()> {
        let mut tables = self.tables.write().await;
        storage::clear_sis_user_id(&mut tables, id)
    }

    async fn link_enrollment(&self, id: EnrollmentId, pseudonym: PseudonymId) -> Result<()> {
        let mut tables = self.tables.write().await;
        storage::link_enrollment(&mut tables, id, pseudonym)
    }

    async fn count_pseudonyms_with_sis_prefix(&self, prefix: &str) -> Result<u64> {
        let tables = self.tables.read().await;
        Ok(query::with_sis_prefix(&tables, prefix).count() as u64)
    }

    async fn pseudonyms_with_sis_prefix_after(
        &self,
        prefix: &str,
        after: Option<PseudonymId>,
        limit: usize,
    ) -> Result<Vec<Pseudonym>> {
        let tables = self.tables.read().await;
        Ok(query::with_sis_prefix(&tables, prefix)
            .filter(|p| after.is_none_or(|after| p.id > after))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn import(&self, dataset: Dataset) -> Result<()> {
        let mut tables = self.tables.write().await;
        storage::import(&mut tables, dataset)
    }

    async fn export(&self) -> Result<Dataset> {
        let tables = self.tables.read().await;
        Ok(storage::export(&tables))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
