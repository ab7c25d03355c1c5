use enrollsync::{
    backend::{EnrollmentFilter, EnrollmentScope},
    model::{AccountId, EnrollmentState, EnrollmentType, PseudonymState, UserId},
};

use crate::helpers::*;

fn students() -> EnrollmentScope {
    EnrollmentScope::active(vec![EnrollmentType::StudentEnrollment])
}

async fn ids(
    backend: &dyn enrollsync::Backend,
    filters: &[EnrollmentFilter],
) -> Vec<i64> {
    backend
        .enrollments_after(&students(), filters, None, 100)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.id.get())
        .collect()
}

/// Ada has nothing, Grace a bare login, Edsger a complete linked login,
/// Barbara a login in the other account only.
async fn scoped_backend() -> Box<dyn enrollsync::Backend> {
    let mut dataset = Fixture::new()
        .user(1, "Ada")
        .user(2, "Grace")
        .user(3, "Edsger")
        .user(4, "Barbara")
        .pseudonym(50, 2, ACCOUNT, None)
        .pseudonym(51, 3, ACCOUNT, Some("LEGACY-3"))
        .pseudonym(52, 4, OTHER_ACCOUNT, Some("LEGACY-4"))
        .pseudonym_in_state(53, 1, ACCOUNT, Some("OLD-1"), PseudonymState::Deleted)
        .student(100, 1, COURSE)
        .student(101, 2, COURSE)
        .student(102, 3, COURSE)
        .student(103, 4, COURSE)
        .enrollment(
            104,
            3,
            COURSE,
            EnrollmentType::StudentEnrollment,
            EnrollmentState::Deleted,
        )
        .dataset();
    dataset.enrollments[2].sis_pseudonym_id = Some(51.into());
    seeded_backend(dataset).await
}

#[tokio::test]
async fn test_filters_follow_root_account() {
    let backend = scoped_backend().await;
    let backend = backend.as_ref();

    assert_eq!(ids(backend, &[]).await, vec![100, 101, 102, 103]);
    assert_eq!(
        ids(backend, &[EnrollmentFilter::HasActivePseudonym]).await,
        vec![101, 102]
    );
    assert_eq!(
        ids(backend, &[EnrollmentFilter::MissingActivePseudonym]).await,
        vec![100, 103]
    );
    assert_eq!(ids(backend, &[EnrollmentFilter::HasSisUserId]).await, vec![102]);
    assert_eq!(
        ids(backend, &[EnrollmentFilter::MissingSisUserId]).await,
        vec![100, 101, 103]
    );
    assert_eq!(ids(backend, &[EnrollmentFilter::Linked]).await, vec![102]);
    assert_eq!(
        ids(
            backend,
            &[
                EnrollmentFilter::HasActivePseudonym,
                EnrollmentFilter::Unlinked
            ]
        )
        .await,
        vec![101]
    );

    assert_eq!(backend.count_enrollments(&students(), &[]).await.unwrap(), 4);
    assert_eq!(
        backend
            .count_distinct_users(&students(), &[EnrollmentFilter::MissingActivePseudonym])
            .await
            .unwrap(),
        2
    );
}

#[tokio::test]
async fn test_sis_user_id_filters_use_lowest_active_pseudonym() {
    // Grace: first active login bare, a later one complete.
    // Edsger: a deleted bare login before the complete active one.
    let backend = Fixture::new()
        .user(2, "Grace")
        .user(3, "Edsger")
        .pseudonym(40, 2, ACCOUNT, None)
        .pseudonym(41, 2, ACCOUNT, Some("LEGACY-2"))
        .pseudonym_in_state(42, 3, ACCOUNT, None, PseudonymState::Deleted)
        .pseudonym(43, 3, ACCOUNT, Some("LEGACY-3"))
        .student(101, 2, COURSE)
        .student(102, 3, COURSE)
        .backend()
        .await;
    let backend = backend.as_ref();

    assert_eq!(ids(backend, &[EnrollmentFilter::HasSisUserId]).await, vec![102]);
    assert_eq!(
        ids(backend, &[EnrollmentFilter::MissingSisUserId]).await,
        vec![101]
    );
    assert_eq!(
        backend
            .count_distinct_users(&students(), &[EnrollmentFilter::HasSisUserId])
            .await
            .unwrap(),
        1
    );
}

#[tokio::test]
async fn test_keyset_pages_resume_after_id() {
    let backend = scoped_backend().await;

    let first = backend
        .enrollments_after(&students(), &[], None, 3)
        .await
        .unwrap();
    assert_eq!(first.len(), 3);
    let rest = backend
        .enrollments_after(&students(), &[], Some(first[2].id), 3)
        .await
        .unwrap();
    assert_eq!(rest.len(), 1);
    assert_eq!(rest[0].id.get(), 103);
}

#[tokio::test]
async fn test_active_pseudonyms_skip_deleted() {
    let backend = scoped_backend().await;
    assert!(
        backend
            .active_pseudonyms(UserId::new(1), AccountId::new(ACCOUNT))
            .await
            .unwrap()
            .is_empty()
    );
    assert_eq!(
        backend
            .root_account_for_course(COURSE.into())
            .await
            .unwrap(),
        AccountId::new(ACCOUNT)
    );
}

#[tokio::test]
async fn test_sis_prefix_matches_active_pseudonyms_only() {
    let backend = scoped_backend().await;

    assert_eq!(backend.count_pseudonyms_with_sis_prefix("LEGACY-").await.unwrap(), 2);
    assert_eq!(backend.count_pseudonyms_with_sis_prefix("OLD-").await.unwrap(), 0);
    assert_eq!(backend.count_pseudonyms_with_sis_prefix("legacy-").await.unwrap(), 0);

    let page = backend
        .pseudonyms_with_sis_prefix_after("LEGACY-", Some(51.into()), 10)
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].id.get(), 52);
}
