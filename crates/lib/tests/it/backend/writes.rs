use enrollsync::model::{AccountId, NewPseudonym, PseudonymId, UserId};

use crate::helpers::*;

fn new_pseudonym(user: i64, unique_id: &str, sis_user_id: Option<&str>) -> NewPseudonym {
    NewPseudonym {
        user_id: UserId::new(user),
        account_id: AccountId::new(ACCOUNT),
        unique_id: unique_id.to_string(),
        sis_user_id: sis_user_id.map(str::to_string),
        crypted_password: "hash".to_string(),
        password_salt: "salt".to_string(),
        created_at: 0,
    }
}

#[tokio::test]
async fn test_create_pseudonym_assigns_next_id() {
    let backend = Fixture::new()
        .user(1, "Ada")
        .user(2, "Grace")
        .pseudonym(50, 2, ACCOUNT, None)
        .backend()
        .await;

    let created = backend
        .create_pseudonym(new_pseudonym(1, "ada@example.edu", Some("Canvas-00001")))
        .await
        .unwrap();
    assert_eq!(created.id, PseudonymId::new(51));
    assert!(created.is_active());
    assert_eq!(backend.get_pseudonym(created.id).await.unwrap(), created);
}

#[tokio::test]
async fn test_duplicate_login_is_a_validation_error() {
    let backend = Fixture::new()
        .user(1, "Ada")
        .user(2, "Grace")
        .pseudonym(50, 2, ACCOUNT, None)
        .backend()
        .await;

    let err = backend
        .create_pseudonym(new_pseudonym(1, " LOGIN-50 ", None))
        .await
        .unwrap_err();
    assert!(err.is_validation_error());
    let messages = err.validation_messages().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("has already been taken"));
}

#[tokio::test]
async fn test_duplicate_login_ignores_non_ascii_case() {
    let backend = Fixture::new().user(1, "Ada").user(2, "Grace").backend().await;

    backend
        .create_pseudonym(new_pseudonym(2, "ÉLÈVE@example.edu", None))
        .await
        .unwrap();
    let err = backend
        .create_pseudonym(new_pseudonym(1, "élève@example.edu", None))
        .await
        .unwrap_err();
    assert!(err.is_validation_error());
    assert!(err.validation_messages().unwrap()[0].contains("has already been taken"));
}

#[tokio::test]
async fn test_every_violation_is_reported() {
    let backend = Fixture::new()
        .user(1, "Ada")
        .user(2, "Grace")
        .pseudonym(50, 2, ACCOUNT, Some("Canvas-00001"))
        .backend()
        .await;

    let mut pseudonym = new_pseudonym(1, "", Some("Canvas-00001"));
    pseudonym.crypted_password.clear();
    let err = backend.create_pseudonym(pseudonym).await.unwrap_err();
    assert!(err.is_validation_error());
    assert_eq!(err.validation_messages().unwrap().len(), 3);
}

#[tokio::test]
async fn test_assign_taken_sis_user_id_fails() {
    let backend = Fixture::new()
        .user(1, "Ada")
        .user(2, "Grace")
        .pseudonym(50, 1, ACCOUNT, None)
        .pseudonym(51, 2, ACCOUNT, Some("Canvas-00001"))
        .backend()
        .await;

    assert!(
        backend
            .sis_user_id_taken(AccountId::new(ACCOUNT), "Canvas-00001", Some(PseudonymId::new(50)))
            .await
            .unwrap()
    );
    assert!(
        !backend
            .sis_user_id_taken(AccountId::new(ACCOUNT), "Canvas-00001", Some(PseudonymId::new(51)))
            .await
            .unwrap()
    );

    let err = backend
        .assign_sis_user_id(PseudonymId::new(50), "Canvas-00001")
        .await
        .unwrap_err();
    assert!(err.is_validation_error());
    assert_eq!(sis_user_id(backend.as_ref(), 50).await, None);

    backend
        .assign_sis_user_id(PseudonymId::new(50), "Canvas-00002")
        .await
        .unwrap();
    assert_eq!(
        sis_user_id(backend.as_ref(), 50).await.as_deref(),
        Some("Canvas-00002")
    );
}

#[tokio::test]
async fn test_missing_records_are_not_found() {
    let backend = Fixture::new().student(100, 1, COURSE).backend().await;

    assert!(backend.get_user(UserId::new(1)).await.unwrap_err().is_not_found());
    assert!(
        backend
            .get_pseudonym(PseudonymId::new(9))
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert!(
        backend
            .clear_sis_user_id(PseudonymId::new(9))
            .await
            .unwrap_err()
            .is_not_found()
    );
    assert!(
        backend
            .root_account_for_course(999.into())
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn test_import_refuses_duplicate_ids() {
    let backend = Fixture::new().user(1, "Ada").backend().await;
    let before = backend.export().await.unwrap();

    let err = backend
        .import(Fixture::new().user(2, "Grace").dataset())
        .await
        .unwrap_err();
    assert!(err.is_backend_error());
    assert_eq!(backend.export().await.unwrap(), before);
}

#[tokio::test]
async fn test_link_enrollment() {
    let backend = Fixture::new()
        .user(1, "Ada")
        .pseudonym(50, 1, ACCOUNT, None)
        .student(100, 1, COURSE)
        .backend()
        .await;

    backend
        .link_enrollment(100.into(), PseudonymId::new(50))
        .await
        .unwrap();
    assert_eq!(
        enrollment(backend.as_ref(), 100).await.sis_pseudonym_id,
        Some(PseudonymId::new(50))
    );
    assert!(
        backend
            .link_enrollment(101.into(), PseudonymId::new(50))
            .await
            .unwrap_err()
            .is_not_found()
    );
}
