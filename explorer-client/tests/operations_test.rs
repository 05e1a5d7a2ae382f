use axum::extract::Path as UrlPath;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use explorer_client::models::TransferProgress;
use explorer_client::operations::{
    Listing, RenameOutcome, StorageOperations, UploadOutcome, DOWNLOAD_URL_TTL,
    EMPTY_LISTING_NOTICE, LISTING_FAILED_NOTICE, MAX_UPLOAD_BYTES,
};
use explorer_client::storage::{InMemoryObjectStore, StoreCall, StoreOp};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

fn operations(store: &Arc<InMemoryObjectStore>, dir: &TempDir) -> StorageOperations {
    StorageOperations::new(store.clone(), dir.path().join("downloads"))
}

#[tokio::test]
async fn empty_bucket_lists_empty_state() {
    let store = Arc::new(InMemoryObjectStore::default());
    let dir = tempfile::tempdir().unwrap();

    let listing = operations(&store, &dir).list().await;

    assert_eq!(listing, Listing::Empty);
    assert_eq!(listing.notice(), Some(EMPTY_LISTING_NOTICE));
}

#[tokio::test]
async fn list_failure_renders_inline_error() {
    let store = Arc::new(InMemoryObjectStore::default());
    store.fail(StoreOp::List);
    let dir = tempfile::tempdir().unwrap();

    let listing = operations(&store, &dir).list().await;

    assert!(matches!(listing, Listing::Error(_)));
    assert_eq!(listing.notice(), Some(LISTING_FAILED_NOTICE));
}

#[tokio::test]
async fn oversized_file_is_rejected_without_storage_calls() {
    let store = Arc::new(InMemoryObjectStore::default());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("huge.iso");
    let file = std::fs::File::create(&path).unwrap();
    file.set_len(MAX_UPLOAD_BYTES + 1).unwrap();

    let report = operations(&store, &dir)
        .upload_batch(&[path], "ada@example.com", |_| {})
        .await;

    assert_eq!(
        report.outcomes,
        vec![UploadOutcome::Rejected {
            name: "huge.iso".to_string(),
            notice: "File \"huge.iso\" exceeds 100MB limit".to_string(),
        }]
    );
    // Only the refresh after the batch reaches the store.
    assert_eq!(store.calls(), vec![StoreCall::List]);
}

#[tokio::test]
async fn file_at_the_limit_is_accepted() {
    let store = Arc::new(InMemoryObjectStore::default());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("exact.bin");
    std::fs::File::create(&path)
        .unwrap()
        .set_len(MAX_UPLOAD_BYTES)
        .unwrap();

    let report = operations(&store, &dir)
        .upload_batch(&[path], "ada@example.com", |_| {})
        .await;

    assert!(matches!(report.outcomes[0], UploadOutcome::Uploaded { .. }));
}

#[tokio::test]
async fn ten_megabyte_report_uploads_with_progress_and_metadata() {
    let store = Arc::new(InMemoryObjectStore::default());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.pdf");
    std::fs::write(&path, vec![7u8; 10 * 1024 * 1024]).unwrap();

    let seen: Arc<Mutex<Vec<TransferProgress>>> = Arc::default();
    let sink = seen.clone();
    let report = operations(&store, &dir)
        .upload_batch(&[path], "ada@example.com", move |p| {
            sink.lock().unwrap().push(p)
        })
        .await;

    assert_eq!(
        report.outcomes,
        vec![UploadOutcome::Uploaded {
            name: "report.pdf".to_string()
        }]
    );

    let percents: Vec<u8> = seen.lock().unwrap().iter().map(|p| p.percent()).collect();
    assert_eq!(percents, vec![50, 100]);

    let items = report.listing.items();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].key, "report.pdf");
    assert_eq!(items[0].display_size(), "10.00 MB");

    let stored = store.object("report.pdf").unwrap();
    assert_eq!(stored.content_type, "application/pdf");
    assert_eq!(stored.metadata["uploaded-by"], "ada@example.com");
    assert!(chrono::DateTime::parse_from_rfc3339(&stored.metadata["upload-time"]).is_ok());
}

#[tokio::test]
async fn batch_failures_are_per_file_and_list_refreshes_once() {
    let store = Arc::new(InMemoryObjectStore::default());
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("notes.txt");
    std::fs::write(&good, "hello").unwrap();
    let missing = dir.path().join("missing.txt");

    let report = operations(&store, &dir)
        .upload_batch(&[good, missing], "ada", |_| {})
        .await;

    assert!(matches!(&report.outcomes[0], UploadOutcome::Uploaded { name } if name == "notes.txt"));
    assert!(matches!(&report.outcomes[1], UploadOutcome::Failed { name, .. } if name == "missing.txt"));
    let lists = store
        .calls()
        .into_iter()
        .filter(|c| *c == StoreCall::List)
        .count();
    assert_eq!(lists, 1);
    assert_eq!(store.object("notes.txt").unwrap().content_type, "text/plain");
}

#[tokio::test]
async fn rename_to_blank_or_same_name_makes_no_calls() {
    let store = Arc::new(InMemoryObjectStore::default());
    store.insert("a.txt", "a");
    let dir = tempfile::tempdir().unwrap();
    let ops = operations(&store, &dir);

    for new_name in ["", "   ", "a.txt", " a.txt "] {
        let report = ops.rename("a.txt", new_name).await;
        assert_eq!(report.outcome, RenameOutcome::Unchanged);
        assert!(report.listing.is_none());
    }
    assert!(store.calls().is_empty());
}

#[tokio::test]
async fn rename_copies_then_deletes_then_refreshes() {
    let store = Arc::new(InMemoryObjectStore::default());
    store.insert("a.txt", "a");
    let dir = tempfile::tempdir().unwrap();

    let report = operations(&store, &dir).rename("a.txt", " b.txt").await;

    assert_eq!(
        report.outcome,
        RenameOutcome::Renamed {
            from: "a.txt".to_string(),
            to: "b.txt".to_string()
        }
    );
    assert_eq!(
        store.calls(),
        vec![
            StoreCall::Copy {
                from: "a.txt".to_string(),
                to: "b.txt".to_string()
            },
            StoreCall::Delete {
                key: "a.txt".to_string()
            },
            StoreCall::List,
        ]
    );
    assert_eq!(store.keys(), vec!["b.txt".to_string()]);
    assert_eq!(report.listing.unwrap().items()[0].key, "b.txt");
}

#[tokio::test]
async fn failed_delete_leaves_both_keys() {
    let store = Arc::new(InMemoryObjectStore::default());
    store.insert("a.txt", "a");
    store.fail(StoreOp::Delete);
    let dir = tempfile::tempdir().unwrap();

    let report = operations(&store, &dir).rename("a.txt", "b.txt").await;

    assert!(matches!(report.outcome, RenameOutcome::PartiallyApplied { .. }));
    assert_eq!(store.keys(), vec!["a.txt".to_string(), "b.txt".to_string()]);
    assert_eq!(report.listing.unwrap().items().len(), 2);
}

#[tokio::test]
async fn failed_copy_aborts_rename_and_still_refreshes() {
    let store = Arc::new(InMemoryObjectStore::default());
    store.insert("a.txt", "a");
    store.fail(StoreOp::Copy);
    let dir = tempfile::tempdir().unwrap();

    let report = operations(&store, &dir).rename("a.txt", "b.txt").await;

    assert!(matches!(report.outcome, RenameOutcome::Failed { .. }));
    assert!(!store
        .calls()
        .iter()
        .any(|c| matches!(c, StoreCall::Delete { .. })));
    assert_eq!(store.keys(), vec!["a.txt".to_string()]);
    assert!(report.listing.is_some());
}

async fn spawn_object_server() -> String {
    let app = Router::new().route(
        "/:key",
        get(|UrlPath(key): UrlPath<String>| async move {
            if key == "report.pdf" {
                (StatusCode::OK, "pdf-bytes")
            } else {
                (StatusCode::FORBIDDEN, "")
            }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn download_uses_five_minute_url_and_saves_file() {
    let store = Arc::new(InMemoryObjectStore::new(spawn_object_server().await));
    store.insert("report.pdf", "pdf-bytes");
    let dir = tempfile::tempdir().unwrap();

    let saved = operations(&store, &dir).download("report.pdf").await.unwrap();

    assert_eq!(DOWNLOAD_URL_TTL, Duration::from_secs(300));
    assert_eq!(
        store.calls(),
        vec![StoreCall::Presign {
            key: "report.pdf".to_string(),
            expires_in: Duration::from_secs(300)
        }]
    );
    assert_eq!(saved, dir.path().join("downloads").join("report.pdf"));
    assert_eq!(std::fs::read_to_string(saved).unwrap(), "pdf-bytes");
}

#[tokio::test]
async fn expired_or_denied_url_is_a_download_error() {
    let store = Arc::new(InMemoryObjectStore::new(spawn_object_server().await));
    let dir = tempfile::tempdir().unwrap();

    assert!(operations(&store, &dir).download("secret.bin").await.is_err());
    assert!(!dir.path().join("downloads").join("secret.bin").exists());
}

#[tokio::test]
async fn folder_marker_keys_are_not_downloaded() {
    let store = Arc::new(InMemoryObjectStore::default());
    store.insert("reports/", "");
    let dir = tempfile::tempdir().unwrap();

    let err = operations(&store, &dir).download("reports/").await.unwrap_err();

    assert!(err.to_string().contains("reports/ is a folder"));
    assert!(store.calls().is_empty());
    assert!(!dir.path().join("downloads").exists());
}
