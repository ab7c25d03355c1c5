//! Clearing generated SIS user ids after an update pass.

use enrollsync::{
    Config, IdPattern,
    reconcile::run_update,
    rollback::{execute_rollback, plan_rollback},
};

use crate::helpers::*;

#[tokio::test]
async fn test_rollback_clears_generated_ids_only() {
    let backend = Fixture::new()
        .user(1, "Ada")
        .user(2, "Grace")
        .user(3, "Edsger")
        .pseudonym(50, 2, ACCOUNT, None)
        .pseudonym(51, 3, ACCOUNT, Some("LEGACY-3"))
        .student(100, 1, COURSE)
        .student(101, 2, COURSE)
        .student(102, 3, COURSE)
        .backend()
        .await;
    let config = Config::default().with_pattern(IdPattern::parse("SIS-%06d").unwrap());
    run_update(backend.as_ref(), &config, |_| {}).await.unwrap();

    let plan = plan_rollback(backend.as_ref(), &config.pattern)
        .await
        .unwrap();
    assert_eq!(plan.prefix, "SIS-");
    assert_eq!(plan.matched, 2);
    let sample: Vec<&str> = plan
        .sample
        .iter()
        .filter_map(|p| p.sis_user_id.as_deref())
        .collect();
    assert_eq!(sample, vec!["SIS-000002", "SIS-000001"]);

    let report = execute_rollback(backend.as_ref(), &plan, 1).await.unwrap();
    assert_eq!(report.cleared, 2);
    assert_eq!(report.failed, 0);
    assert!(report.failures().is_empty());

    assert_eq!(sis_user_id(backend.as_ref(), 50).await, None);
    assert_eq!(
        sis_user_id(backend.as_ref(), 51).await.as_deref(),
        Some("LEGACY-3")
    );
    let created = pseudonyms_of(backend.as_ref(), 1, ACCOUNT).await;
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].sis_user_id, None);

    // Links and pseudonyms stay; only the ids go
    assert!(enrollment(backend.as_ref(), 100).await.sis_pseudonym_id.is_some());
    let again = plan_rollback(backend.as_ref(), &config.pattern)
        .await
        .unwrap();
    assert!(again.is_empty());
}

#[tokio::test]
async fn test_update_after_rollback_restores_ids() {
    let backend = Fixture::new()
        .user(1, "Ada")
        .student(100, 1, COURSE)
        .backend()
        .await;
    let config = Config::default();
    run_update(backend.as_ref(), &config, |_| {}).await.unwrap();

    let plan = plan_rollback(backend.as_ref(), &config.pattern)
        .await
        .unwrap();
    execute_rollback(backend.as_ref(), &plan, config.batch_size)
        .await
        .unwrap();

    let report = run_update(backend.as_ref(), &config, |_| {}).await.unwrap();
    assert_eq!(report.stats.updated, 1);
    assert_eq!(report.stats.created, 0);
    assert_eq!(report.stats.linked, 0);
    let pseudonyms = pseudonyms_of(backend.as_ref(), 1, ACCOUNT).await;
    assert_eq!(pseudonyms[0].sis_user_id.as_deref(), Some("Canvas-00001"));
}

#[tokio::test]
async fn test_rollback_with_other_prefix_leaves_ids() {
    let backend = Fixture::new()
        .user(1, "Ada")
        .student(100, 1, COURSE)
        .backend()
        .await;
    run_update(backend.as_ref(), &Config::default(), |_| {})
        .await
        .unwrap();

    let plan = plan_rollback(backend.as_ref(), &IdPattern::parse("SIS-%06d").unwrap())
        .await
        .unwrap();
    assert!(plan.is_empty());
    let report = execute_rollback(backend.as_ref(), &plan, 10).await.unwrap();
    assert_eq!(report.cleared, 0);
    assert_eq!(
        pseudonyms_of(backend.as_ref(), 1, ACCOUNT).await[0]
            .sis_user_id
            .as_deref(),
        Some("Canvas-00001")
    );
}

#[tokio::test]
async fn test_empty_prefix_is_refused() {
    let backend = Fixture::new().backend().await;
    let err = plan_rollback(backend.as_ref(), &IdPattern::parse("%d").unwrap())
        .await
        .unwrap_err();
    assert!(err.is_config_error());
}
