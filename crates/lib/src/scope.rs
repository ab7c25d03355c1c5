//! Working-set resolution.
//!
//! A [`ScopeResolver`] wraps a backend, an [`EnrollmentScope`] and a list of
//! filters. It holds no state between calls, so every mode builds its own and
//! the same resolver can be counted, sampled and iterated independently.

use crate::Result;
use crate::backend::{Backend, EnrollmentFilter, EnrollmentScope};
use crate::model::{Enrollment, EnrollmentId};

/// Counts and iterates in-scope enrollments.
#[derive(Clone)]
pub struct ScopeResolver<'a> {
    backend: &'a dyn Backend,
    scope: EnrollmentScope,
    filters: Vec<EnrollmentFilter>,
    batch_size: usize,
}

impl<'a> ScopeResolver<'a> {
    pub fn new(backend: &'a dyn Backend, scope: EnrollmentScope, batch_size: usize) -> Self {
        Self {
            backend,
            scope,
            filters: Vec::new(),
            batch_size: batch_size.max(1),
        }
    }

    /// Narrow the scope by another predicate.
    pub fn filter(mut self, filter: EnrollmentFilter) -> Self {
        if !self.filters.contains(&filter) {
            self.filters.push(filter);
        }
        self
    }

    pub fn backend(&self) -> &'a dyn Backend {
        self.backend
    }

    pub fn scope(&self) -> &EnrollmentScope {
        &self.scope
    }

    pub fn filters(&self) -> &[EnrollmentFilter] {
        &self.filters
    }

    /// Number of matching enrollments.
    pub async fn count(&self) -> Result<u64> {
        self.backend
            .count_enrollments(&self.scope, &self.filters)
            .await
    }

    /// Number of distinct users among matching enrollments.
    pub async fn count_users(&self) -> Result<u64> {
        self.backend
            .count_distinct_users(&self.scope, &self.filters)
            .await
    }

    /// The first `limit` matching enrollments by id.
    pub async fn sample(&self, limit: usize) -> Result<Vec<Enrollment>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.backend
            .enrollments_after(&self.scope, &self.filters, None, limit)
            .await
    }

    /// A cursor over matching enrollments in batches of the configured size.
    pub fn batches(&self) -> EnrollmentBatches<'a> {
        EnrollmentBatches {
            backend: self.backend,
            scope: self.scope.clone(),
            filters: self.filters.clone(),
            batch_size: self.batch_size,
            after: None,
            done: false,
        }
    }
}

/// Keyset cursor over a scope.
///
/// Each batch resumes after the last id of the previous one, so records
/// written while iterating never shift later batches.
pub struct EnrollmentBatches<'a> {
    backend: &'a dyn Backend,
    scope: EnrollmentScope,
    filters: Vec<EnrollmentFilter>,
    batch_size: usize,
    after: Option<EnrollmentId>,
    done: bool,
}

impl EnrollmentBatches<'_> {
    /// The next non-empty batch, or `None` once the scope is exhausted.
    pub async fn next_batch(&mut self) -> Result<Option<Vec<Enrollment>>> {
        if self.done {
            return Ok(None);
        }

        let batch = self
            .backend
            .enrollments_after(&self.scope, &self.filters, self.after, self.batch_size)
            .await?;

        if batch.len() < self.batch_size {
            self.done = true;
        }
        match batch.last() {
            Some(last) => {
                self.after = Some(last.id);
                Ok(Some(batch))
            }
            None => {
                self.done = true;
                Ok(None)
            }
        }
    }
}
