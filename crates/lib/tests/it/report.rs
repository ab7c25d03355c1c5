//! Analyze and verify figures before and after an update pass.

use enrollsync::{
    Config,
    model::{EnrollmentState, EnrollmentType, PseudonymId, UserId},
    reconcile::run_update,
    report::{ScopeReport, VerifyVerdict, analyze, verify},
};

use crate::helpers::*;

/// Ada has no login, Grace has one without a SIS user id, Edsger is done,
/// and Barbara's generated id is already held by Alan, who is not enrolled.
fn mixed_fixture() -> Fixture {
    Fixture::new()
        .user(1, "Ada")
        .user(2, "Grace")
        .user(3, "Edsger")
        .user(4, "Barbara")
        .user(5, "Alan")
        .pseudonym(50, 2, ACCOUNT, None)
        .pseudonym(51, 3, ACCOUNT, Some("LEGACY-3"))
        .pseudonym(52, 4, ACCOUNT, None)
        .pseudonym(53, 5, ACCOUNT, Some("Canvas-00004"))
        .student(100, 1, COURSE)
        .student(101, 2, COURSE)
        .student(102, 3, COURSE)
        .student(103, 4, COURSE)
        .student(104, 1, COURSE)
        .enrollment(
            105,
            5,
            COURSE,
            EnrollmentType::TeacherEnrollment,
            EnrollmentState::Active,
        )
}

#[tokio::test]
async fn test_analyze_counts_and_samples() {
    let backend = mixed_fixture().backend().await;
    let before = backend.export().await.unwrap();

    let analysis = analyze(backend.as_ref(), &Config::default()).await.unwrap();
    assert_eq!(
        analysis.report,
        ScopeReport {
            total_enrollments: 5,
            distinct_users: 4,
            users_with_pseudonym: 3,
            users_with_sis_user_id: 1,
            linked_enrollments: 0,
            users_missing_pseudonym: 1,
            users_missing_sis_user_id: 2,
        }
    );
    assert_eq!(analysis.report.pseudonym_coverage(), 75.0);

    let missing: Vec<i64> = analysis
        .missing_pseudonym
        .iter()
        .map(|row| row.enrollment_id.get())
        .collect();
    assert_eq!(missing, vec![100, 104]);
    assert!(analysis.missing_pseudonym[0].login.is_none());

    let grace = &analysis.missing_sis_user_id[0];
    assert_eq!(grace.enrollment_id.get(), 101);
    assert_eq!(grace.user_id, UserId::new(2));
    assert_eq!(grace.name.as_deref(), Some("Grace"));
    assert_eq!(grace.login.as_deref(), Some("login-50"));
    assert_eq!(grace.sis_user_id, None);
    assert_eq!(analysis.missing_sis_user_id.len(), 2);

    // Analysis never writes
    assert_eq!(backend.export().await.unwrap(), before);
}

#[tokio::test]
async fn test_verify_after_update_reports_remaining_gaps() {
    let backend = mixed_fixture().backend().await;
    let config = Config::default();
    run_update(backend.as_ref(), &config, |_| {}).await.unwrap();

    let verification = verify(backend.as_ref(), &config).await.unwrap();
    assert_eq!(
        verification.report,
        ScopeReport {
            total_enrollments: 5,
            distinct_users: 4,
            users_with_pseudonym: 4,
            users_with_sis_user_id: 3,
            linked_enrollments: 4,
            users_missing_pseudonym: 0,
            users_missing_sis_user_id: 1,
        }
    );
    assert_eq!(
        verification.verdict(),
        VerifyVerdict::Incomplete {
            unlinked_enrollments: 1,
            users_without_sis_user_id: 1,
        }
    );

    let reconciled: Vec<i64> = verification
        .reconciled
        .iter()
        .map(|row| row.enrollment_id.get())
        .collect();
    assert_eq!(reconciled, vec![100, 101, 102, 104]);
    assert_eq!(
        verification.reconciled[2].linked_pseudonym,
        Some(PseudonymId::new(51))
    );
    assert_eq!(verification.unlinked.len(), 1);
    assert_eq!(verification.unlinked[0].enrollment_id.get(), 103);
}

#[tokio::test]
async fn test_verify_and_analyze_agree() {
    let backend = mixed_fixture().backend().await;
    let config = Config::default();

    let analysis = analyze(backend.as_ref(), &config).await.unwrap();
    let verification = verify(backend.as_ref(), &config).await.unwrap();
    assert_eq!(analysis.report, verification.report);
    assert!(verification.reconciled.is_empty());
    assert_eq!(verification.unlinked.len(), 5);
}

#[tokio::test]
async fn test_clean_scope_verifies_complete() {
    let backend = Fixture::new()
        .user(1, "Ada")
        .user(2, "Grace")
        .pseudonym(50, 2, ACCOUNT, Some("LEGACY-2"))
        .student(100, 1, COURSE)
        .student(101, 2, COURSE)
        .backend()
        .await;
    let config = Config::default();
    run_update(backend.as_ref(), &config, |_| {}).await.unwrap();

    let verification = verify(backend.as_ref(), &config).await.unwrap();
    assert_eq!(verification.verdict(), VerifyVerdict::Complete);
    assert_eq!(verification.report.link_coverage(), 100.0);
    assert!(verification.unlinked.is_empty());
}

/// Grace's first login has no SIS user id while a later one does. The
/// figures follow the login an update would complete.
#[tokio::test]
async fn test_sis_user_id_figures_follow_first_login() {
    let backend = Fixture::new()
        .user(2, "Grace")
        .pseudonym(40, 2, ACCOUNT, None)
        .pseudonym(41, 2, ACCOUNT, Some("LEGACY-2"))
        .student(101, 2, COURSE)
        .backend()
        .await;
    let config = Config::default();

    let analysis = analyze(backend.as_ref(), &config).await.unwrap();
    assert_eq!(analysis.report.users_with_sis_user_id, 0);
    assert_eq!(analysis.report.users_missing_sis_user_id, 1);
    assert_eq!(analysis.missing_sis_user_id.len(), 1);
    assert_eq!(analysis.missing_sis_user_id[0].login.as_deref(), Some("login-40"));

    let update = run_update(backend.as_ref(), &config, |_| {}).await.unwrap();
    assert_eq!(update.stats.updated, 1);
    assert_eq!(sis_user_id(backend.as_ref(), 40).await.as_deref(), Some("Canvas-00002"));

    let verification = verify(backend.as_ref(), &config).await.unwrap();
    assert_eq!(verification.report.users_with_sis_user_id, 1);
    assert_eq!(verification.verdict(), VerifyVerdict::Complete);
}

#[tokio::test]
async fn test_empty_scope() {
    let backend = Fixture::new().backend().await;
    let analysis = analyze(backend.as_ref(), &Config::default()).await.unwrap();
    assert_eq!(analysis.report, ScopeReport::default());
    assert_eq!(analysis.report.sis_user_id_coverage(), 0.0);
    assert!(analysis.missing_pseudonym.is_empty());

    let verification = verify(backend.as_ref(), &Config::default()).await.unwrap();
    assert_eq!(verification.verdict(), VerifyVerdict::Complete);
}
