//! Read-only figures for the analyze and verify modes.
//!
//! Both modes build the same [`ScopeReport`] from the same filters, so a
//! report taken before an update pass can be compared directly with one
//! taken after it. Nothing here writes to the store.

use tracing::info;

use crate::Result;
use crate::backend::{Backend, EnrollmentFilter};
use crate::config::Config;
use crate::model::{Enrollment, EnrollmentId, PseudonymId, UserId};
use crate::scope::ScopeResolver;

/// Rows shown per sample.
pub const SAMPLE_SIZE: usize = 5;

/// `part` as a percentage of `whole`. An empty whole is 0%.
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

/// Aggregate figures over the enrollments in scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeReport {
    pub total_enrollments: u64,
    pub distinct_users: u64,
    /// Users holding an active pseudonym in the root account of an enrollment.
    pub users_with_pseudonym: u64,
    /// Users whose pseudonym carries a SIS user id.
    pub users_with_sis_user_id: u64,
    pub linked_enrollments: u64,
    /// Users an update pass would create a pseudonym for.
    pub users_missing_pseudonym: u64,
    /// Users an update pass would assign a SIS user id to.
    pub users_missing_sis_user_id: u64,
}

impl ScopeReport {
    /// Count everything for the resolver's scope.
    pub async fn collect(resolver: &ScopeResolver<'_>) -> Result<Self> {
        Ok(Self {
            total_enrollments: resolver.count().await?,
            distinct_users: resolver.count_users().await?,
            users_with_pseudonym: count_users(resolver, &[EnrollmentFilter::HasActivePseudonym])
                .await?,
            users_with_sis_user_id: count_users(resolver, &[EnrollmentFilter::HasSisUserId])
                .await?,
            linked_enrollments: resolver
                .clone()
                .filter(EnrollmentFilter::Linked)
                .count()
                .await?,
            users_missing_pseudonym: count_users(
                resolver,
                &[EnrollmentFilter::MissingActivePseudonym],
            )
            .await?,
            users_missing_sis_user_id: count_users(
                resolver,
                &[
                    EnrollmentFilter::HasActivePseudonym,
                    EnrollmentFilter::MissingSisUserId,
                ],
            )
            .await?,
        })
    }

    pub fn pseudonym_coverage(&self) -> f64 {
        percentage(self.users_with_pseudonym, self.distinct_users)
    }

    pub fn sis_user_id_coverage(&self) -> f64 {
        percentage(self.users_with_sis_user_id, self.distinct_users)
    }

    pub fn link_coverage(&self) -> f64 {
        percentage(self.linked_enrollments, self.total_enrollments)
    }

    pub fn unlinked_enrollments(&self) -> u64 {
        self.total_enrollments.saturating_sub(self.linked_enrollments)
    }

    pub fn users_without_sis_user_id(&self) -> u64 {
        self.distinct_users
            .saturating_sub(self.users_with_sis_user_id)
    }
}

async fn count_users(resolver: &ScopeResolver<'_>, filters: &[EnrollmentFilter]) -> Result<u64> {
    filters
        .iter()
        .fold(resolver.clone(), |narrowed, filter| narrowed.filter(*filter))
        .count_users()
        .await
}

/// One sampled enrollment with the records it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleRow {
    pub enrollment_id: EnrollmentId,
    pub user_id: UserId,
    /// `None` when the user record is missing.
    pub name: Option<String>,
    /// Login handle of the user's active pseudonym.
    pub login: Option<String>,
    pub sis_user_id: Option<String>,
    pub linked_pseudonym: Option<PseudonymId>,
}

impl SampleRow {
    async fn resolve(backend: &dyn Backend, enrollment: &Enrollment) -> Result<Self> {
        let name = match backend.get_user(enrollment.user_id).await {
            Ok(user) => Some(user.name),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err),
        };

        let pseudonym = match backend.root_account_for_course(enrollment.course_id).await {
            Ok(account) => backend
                .active_pseudonyms(enrollment.user_id, account)
                .await?
                .into_iter()
                .min_by_key(|p| p.id),
            Err(err) if err.is_not_found() => None,
            Err(err) => return Err(err),
        };

        Ok(Self {
            enrollment_id: enrollment.id,
            user_id: enrollment.user_id,
            name,
            login: pseudonym.as_ref().map(|p| p.unique_id.clone()),
            sis_user_id: pseudonym.and_then(|p| p.sis_user_id),
            linked_pseudonym: enrollment.sis_pseudonym_id,
        })
    }
}

/// Resolve the first `limit` enrollments of a scope into rows.
pub async fn sample_rows(resolver: &ScopeResolver<'_>, limit: usize) -> Result<Vec<SampleRow>> {
    let mut rows = Vec::new();
    for enrollment in resolver.sample(limit).await? {
        rows.push(SampleRow::resolve(resolver.backend(), &enrollment).await?);
    }
    Ok(rows)
}

/// What an update pass would find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Analysis {
    pub report: ScopeReport,
    /// Enrollments whose user has no pseudonym yet.
    pub missing_pseudonym: Vec<SampleRow>,
    /// Enrollments whose user's pseudonym lacks a SIS user id.
    pub missing_sis_user_id: Vec<SampleRow>,
}

/// Figures and samples before an update pass.
pub async fn analyze(backend: &dyn Backend, config: &Config) -> Result<Analysis> {
    config.validate()?;
    let resolver = ScopeResolver::new(backend, config.scope(), config.batch_size);

    let report = ScopeReport::collect(&resolver).await?;
    let missing_pseudonym = sample_rows(
        &resolver.clone().filter(EnrollmentFilter::MissingActivePseudonym),
        SAMPLE_SIZE,
    )
    .await?;
    let missing_sis_user_id = sample_rows(
        &resolver
            .clone()
            .filter(EnrollmentFilter::HasActivePseudonym)
            .filter(EnrollmentFilter::MissingSisUserId),
        SAMPLE_SIZE,
    )
    .await?;

    info!(
        total = report.total_enrollments,
        users = report.distinct_users,
        missing_pseudonym = report.users_missing_pseudonym,
        missing_sis_user_id = report.users_missing_sis_user_id,
        "Analysis finished"
    );
    Ok(Analysis {
        report,
        missing_pseudonym,
        missing_sis_user_id,
    })
}

/// Whether an update pass left anything to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyVerdict {
    /// Every enrollment is linked and every user has a SIS user id.
    Complete,
    /// Gaps remain, typically collisions or failed records.
    Incomplete {
        unlinked_enrollments: u64,
        users_without_sis_user_id: u64,
    },
}

/// Figures and samples after an update pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    pub report: ScopeReport,
    /// Enrollments that are linked and whose user has a SIS user id.
    pub reconciled: Vec<SampleRow>,
    /// Enrollments still without a link.
    pub unlinked: Vec<SampleRow>,
}

impl Verification {
    pub fn verdict(&self) -> VerifyVerdict {
        let unlinked_enrollments = self.report.unlinked_enrollments();
        let users_without_sis_user_id = self.report.users_without_sis_user_id();
        if unlinked_enrollments == 0 && users_without_sis_user_id == 0 {
            VerifyVerdict::Complete
        } else {
            VerifyVerdict::Incomplete {
                unlinked_enrollments,
                users_without_sis_user_id,
            }
        }
    }
}

/// Check the results of an update pass with the same figures as [`analyze`].
pub async fn verify(backend: &dyn Backend, config: &Config) -> Result<Verification> {
    config.validate()?;
    let resolver = ScopeResolver::new(backend, config.scope(), config.batch_size);

    let report = ScopeReport::collect(&resolver).await?;
    let reconciled = sample_rows(
        &resolver
            .clone()
            .filter(EnrollmentFilter::Linked)
            .filter(EnrollmentFilter::HasSisUserId),
        SAMPLE_SIZE,
    )
    .await?;
    let unlinked = sample_rows(
        &resolver.clone().filter(EnrollmentFilter::Unlinked),
        SAMPLE_SIZE,
    )
    .await?;

    let verification = Verification {
        report,
        reconciled,
        unlinked,
    };
    info!(verdict = ?verification.verdict(), "Verification finished");
    Ok(verification)
}
