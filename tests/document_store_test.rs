//! Integration tests for the JSON document store and its backup manager,
//! running against temporary directories.

use std::sync::Arc;

use serde_json::json;

use titi_data::store::{DocumentRecord, DocumentStore, StoreError};

// ─── helpers ───────────────────────────────────────────────────────────────

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn store(dir: &tempfile::TempDir) -> DocumentStore {
    DocumentStore::new(dir.path().join("data"), dir.path().join("backups"))
}

fn record(id: &str, note: &str) -> DocumentRecord {
    DocumentRecord::new(id).with_field("note", json!(note))
}

// ─── basic CRUD ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_list_unknown_collection_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let records = store.list("never-written").await.unwrap();
    assert!(records.is_empty());
}

#[tokio::test]
async fn test_create_get_list_roundtrip() {
    init_logs();
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);

    store.create("orders", record("o1", "first")).await.unwrap();
    store.create("orders", record("o2", "second")).await.unwrap();

    let all = store.list("orders").await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, "o1");
    assert_eq!(all[1].id, "o2");

    let one = store.get("orders", "o2").await.unwrap();
    assert_eq!(one.fields.get("note"), Some(&json!("second")));
}

#[tokio::test]
async fn test_get_missing_record() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let err = store.get("orders", "ghost").await.unwrap_err();
    assert!(matches!(
        err,
        StoreError::RecordNotFound { ref id, .. } if id == "ghost"
    ));
}

#[tokio::test]
async fn test_create_duplicate_id_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);

    store.create("orders", record("o1", "first")).await.unwrap();
    let err = store
        .create("orders", record("o1", "again"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::DuplicateId { ref id, .. } if id == "o1"));

    // The collection is unchanged.
    let all = store.list("orders").await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].fields.get("note"), Some(&json!("first")));
}

#[tokio::test]
async fn test_update_replaces_matching_record() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);

    store.create("orders", record("o1", "before")).await.unwrap();
    store
        .update("orders", "o1", record("o1", "after"))
        .await
        .unwrap();

    let one = store.get("orders", "o1").await.unwrap();
    assert_eq!(one.fields.get("note"), Some(&json!("after")));
}

#[tokio::test]
async fn test_update_id_mismatch_and_missing() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    store.create("orders", record("o1", "x")).await.unwrap();

    let err = store
        .update("orders", "o1", record("o2", "renamed"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::IdMismatch { .. }));

    let err = store
        .update("orders", "o9", record("o9", "new"))
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::RecordNotFound { .. }));
}

#[tokio::test]
async fn test_delete_removes_record() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);

    store.create("orders", record("o1", "x")).await.unwrap();
    store.delete("orders", "o1").await.unwrap();
    assert!(store.list("orders").await.unwrap().is_empty());

    let err = store.delete("orders", "o1").await.unwrap_err();
    assert!(matches!(err, StoreError::RecordNotFound { .. }));
}

// ─── backup & restore ──────────────────────────────────────────────────────

#[tokio::test]
async fn test_backup_restore_roundtrip_discards_later_update() {
    init_logs();
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);

    store.create("orders", record("o1", "original")).await.unwrap();
    store.backup("orders").await.unwrap();
    store
        .update("orders", "o1", record("o1", "changed"))
        .await
        .unwrap();

    store.restore("orders").await.unwrap();

    let one = store.get("orders", "o1").await.unwrap();
    assert_eq!(one.fields.get("note"), Some(&json!("original")));
}

#[tokio::test]
async fn test_backup_of_missing_collection_fails() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    let err = store.backup("orders").await.unwrap_err();
    assert!(matches!(err, StoreError::CollectionNotFound { .. }));
}

#[tokio::test]
async fn test_restore_without_backup_fails() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);
    store.create("orders", record("o1", "x")).await.unwrap();
    let err = store.restore("orders").await.unwrap_err();
    assert!(matches!(err, StoreError::NoBackup { .. }));
}

#[tokio::test]
async fn test_import_replaces_and_backs_up_existing_content() {
    init_logs();
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);

    store.create("orders", record("o1", "kept-in-backup")).await.unwrap();

    let imported = vec![record("n1", "imported"), record("n2", "imported")];
    let count = store.import_all("orders", imported).await.unwrap();
    assert_eq!(count, 2);

    let all = store.list("orders").await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].id, "n1");

    // The pre-import content is the latest backup.
    store.restore("orders").await.unwrap();
    let all = store.list("orders").await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].id, "o1");
    assert_eq!(all[0].fields.get("note"), Some(&json!("kept-in-backup")));
}

#[tokio::test]
async fn test_import_into_fresh_collection_takes_no_backup() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);

    let count = store
        .import_all("orders", vec![record("n1", "imported")])
        .await
        .unwrap();
    assert_eq!(count, 1);

    let err = store.restore("orders").await.unwrap_err();
    assert!(matches!(err, StoreError::NoBackup { .. }));
}

#[tokio::test]
async fn test_import_empty_clears_collection() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);

    store.create("orders", record("o1", "x")).await.unwrap();
    let count = store.import_all("orders", Vec::new()).await.unwrap();
    assert_eq!(count, 0);
    assert!(store.list("orders").await.unwrap().is_empty());
}

// ─── concurrency ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_concurrent_creates_do_not_lose_records() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(store(&dir));

    let mut handles = Vec::new();
    for i in 0..20 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            store
                .create("orders", record(&format!("o{}", i), "concurrent"))
                .await
                .unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let all = store.list("orders").await.unwrap();
    assert_eq!(all.len(), 20);
}

#[tokio::test]
async fn test_collections_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let store = store(&dir);

    store.create("orders", record("shared-id", "order")).await.unwrap();
    store
        .create("suppliers", record("shared-id", "supplier"))
        .await
        .unwrap();

    assert_eq!(store.list("orders").await.unwrap().len(), 1);
    assert_eq!(store.list("suppliers").await.unwrap().len(), 1);
    let supplier = store.get("suppliers", "shared-id").await.unwrap();
    assert_eq!(supplier.fields.get("note"), Some(&json!("supplier")));
}
