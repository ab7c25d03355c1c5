//! Read-side predicates for the in-memory backend.
//!
//! Each [`EnrollmentFilter`] becomes a closure over the tables; a filter list
//! is evaluated as a conjunction.

use std::collections::BTreeSet;

use super::Tables;
use crate::backend::{EnrollmentFilter, EnrollmentScope};
use crate::model::{AccountId, CourseId, Enrollment, Pseudonym, PseudonymId, UserId};

pub(crate) fn root_account(tables: &Tables, course: CourseId) -> Option<AccountId> {
    tables.courses.get(&course).map(|c| c.root_account_id)
}

/// Active pseudonyms of a user in an account, in id order.
pub(crate) fn active_pseudonyms(
    tables: &Tables,
    user: UserId,
    account: AccountId,
) -> impl Iterator<Item = &Pseudonym> {
    tables
        .pseudonyms
        .values()
        .filter(move |p| p.user_id == user && p.account_id == account && p.is_active())
}

pub(crate) fn sis_user_id_taken(
    tables: &Tables,
    account: AccountId,
    sis_user_id: &str,
    excluding: Option<PseudonymId>,
) -> bool {
    tables.pseudonyms.values().any(|p| {
        p.account_id == account
            && Some(p.id) != excluding
            && p.sis_user_id.as_deref() == Some(sis_user_id)
    })
}

/// Active pseudonyms whose SIS user id starts with `prefix`, in id order.
pub(crate) fn with_sis_prefix<'a>(
    tables: &'a Tables,
    prefix: &'a str,
) -> impl Iterator<Item = &'a Pseudonym> {
    tables.pseudonyms.values().filter(move |p| {
        p.is_active()
            && p
                .sis_user_id
                .as_deref()
                .is_some_and(|sis| sis.starts_with(prefix))
    })
}

/// In-scope enrollments matching every filter, in id order.
pub(crate) fn scoped<'a>(
    tables: &'a Tables,
    scope: &'a EnrollmentScope,
    filters: &'a [EnrollmentFilter],
) -> impl Iterator<Item = &'a Enrollment> {
    tables
        .enrollments
        .values()
        .filter(move |e| scope.contains(e) && filters.iter().all(|f| matches(tables, e, *f)))
}

pub(crate) fn distinct_users(
    tables: &Tables,
    scope: &EnrollmentScope,
    filters: &[EnrollmentFilter],
) -> BTreeSet<UserId> {
    scoped(tables, scope, filters).map(|e| e.user_id).collect()
}

fn matches(tables: &Tables, enrollment: &Enrollment, filter: EnrollmentFilter) -> bool {
    match filter {
        EnrollmentFilter::HasActivePseudonym => first_pseudonym(tables, enrollment).is_some(),
        EnrollmentFilter::MissingActivePseudonym => first_pseudonym(tables, enrollment).is_none(),
        EnrollmentFilter::HasSisUserId => has_sis_user_id(tables, enrollment),
        EnrollmentFilter::MissingSisUserId => !has_sis_user_id(tables, enrollment),
        EnrollmentFilter::Linked => enrollment.sis_pseudonym_id.is_some(),
        EnrollmentFilter::Unlinked => enrollment.sis_pseudonym_id.is_none(),
    }
}

/// The lowest-id active pseudonym of the enrolled user in the course's root
/// account. An unknown course has no root account, so there is none.
fn first_pseudonym<'a>(tables: &'a Tables, enrollment: &Enrollment) -> Option<&'a Pseudonym> {
    root_account(tables, enrollment.course_id)
        .and_then(|account| active_pseudonyms(tables, enrollment.user_id, account).next())
}

fn has_sis_user_id(tables: &Tables, enrollment: &Enrollment) -> bool {
    first_pseudonym(tables, enrollment).is_some_and(|p| p.sis_user_id.is_some())
}
