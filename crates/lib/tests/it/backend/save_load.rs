use std::fs;

use tempfile::TempDir;

use enrollsync::{
    Backend, Config,
    backend::database::InMemory,
    reconcile::run_update,
};

use crate::helpers::*;

#[tokio::test]
async fn test_in_memory_state_survives_save_and_load() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("enrollsync.json");

    let backend = InMemory::from_dataset(
        Fixture::new()
            .user(1, "Ada")
            .user(2, "Grace")
            .pseudonym(50, 2, ACCOUNT, None)
            .student(100, 1, COURSE)
            .student(101, 2, COURSE)
            .dataset(),
    )
    .await
    .unwrap();
    run_update(&backend, &Config::default(), |_| {})
        .await
        .unwrap();
    backend.save_to_file(&file_path).await.unwrap();
    assert!(file_path.exists());

    let loaded = InMemory::load_from_file(&file_path).await.unwrap();
    assert_eq!(loaded.export().await.unwrap(), backend.export().await.unwrap());

    // A reloaded store is already reconciled
    let report = run_update(&loaded, &Config::default(), |_| {})
        .await
        .unwrap();
    assert!(!report.stats.has_changes());
}

#[tokio::test]
async fn test_load_non_existent_file() {
    let temp_dir = TempDir::new().unwrap();
    let backend = InMemory::load_from_file(temp_dir.path().join("absent.json"))
        .await
        .unwrap();
    assert!(backend.export().await.unwrap().enrollments.is_empty());
}

#[tokio::test]
async fn test_load_invalid_file() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("broken.json");
    fs::write(&file_path, "{ not json").unwrap();

    let err = InMemory::load_from_file(&file_path).await.unwrap_err();
    assert!(err.is_backend_error());
}

#[tokio::test]
async fn test_hand_written_dataset_loads() {
    let temp_dir = TempDir::new().unwrap();
    let file_path = temp_dir.path().join("enrollsync.json");
    fs::write(
        &file_path,
        r#"{
            "accounts": [{"id": 1, "name": "Root"}],
            "courses": [{"id": 10, "root_account_id": 1}],
            "users": [{"id": 1, "name": "Ada", "email": "ada@example.edu"}],
            "enrollments": [
                {"id": 100, "user_id": 1, "course_id": 10, "type": "StudentEnrollment", "workflow_state": "active"}
            ]
        }"#,
    )
    .unwrap();

    let backend = InMemory::load_from_file(&file_path).await.unwrap();
    let report = run_update(&backend, &Config::default(), |_| {})
        .await
        .unwrap();
    assert_eq!(report.stats.created, 1);
    assert_eq!(report.stats.linked, 1);
}
