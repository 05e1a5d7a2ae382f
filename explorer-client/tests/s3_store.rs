mod common;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;
use common::credentials;
use explorer_client::models::TransferProgress;
use explorer_client::storage::{ObjectStore, PutBody, PutRequest, S3ObjectStore, PART_SIZE};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

const BUCKET: &str = "data-bucket";
const UPLOAD_ID: &str = "upload-1";

#[derive(Debug, Clone)]
struct Recorded {
    method: Method,
    key: String,
    query: HashMap<String, String>,
    headers: HeaderMap,
    body: Bytes,
}

impl Recorded {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    fn is_part(&self) -> bool {
        self.method == Method::PUT && self.query.contains_key("partNumber")
    }
}

#[derive(Default)]
struct S3Double {
    requests: Mutex<Vec<Recorded>>,
    failing_part: Option<String>,
}

impl S3Double {
    fn requests(&self) -> Vec<Recorded> {
        self.requests.lock().unwrap().clone()
    }
}

fn xml(body: String) -> Response {
    (
        StatusCode::OK,
        [("content-type", "application/xml")],
        format!(r#"<?xml version="1.0" encoding="UTF-8"?>{}"#, body),
    )
        .into_response()
}

fn list_page(key: &str, size: u64, next: Option<&str>) -> Response {
    let truncated = match next {
        Some(token) => format!(
            "<IsTruncated>true</IsTruncated><NextContinuationToken>{}</NextContinuationToken>",
            token
        ),
        None => "<IsTruncated>false</IsTruncated>".to_string(),
    };
    xml(format!(
        r#"<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><Name>{BUCKET}</Name><Prefix></Prefix><KeyCount>1</KeyCount><MaxKeys>1000</MaxKeys>{truncated}<Contents><Key>{key}</Key><LastModified>2024-05-01T12:00:00.000Z</LastModified><ETag>"e"</ETag><Size>{size}</Size><StorageClass>STANDARD</StorageClass></Contents></ListBucketResult>"#
    ))
}

fn etag(tag: &str) -> Response {
    (StatusCode::OK, [("etag", format!("\"{}\"", tag))]).into_response()
}

async fn handle(
    State(double): State<Arc<S3Double>>,
    method: Method,
    uri: Uri,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().trim_start_matches('/');
    let raw_key = path
        .strip_prefix(BUCKET)
        .unwrap_or(path)
        .trim_start_matches('/');
    let key = urlencoding::decode(raw_key).unwrap().into_owned();

    let request = Recorded {
        method: method.clone(),
        key: key.clone(),
        query: query.clone(),
        headers: headers.clone(),
        body,
    };
    double.requests.lock().unwrap().push(request);

    match method.as_str() {
        "GET" if key.is_empty() => match query.get("continuation-token") {
            None => list_page("a.txt", 10, Some("page-2")),
            Some(_) => list_page("q1/b.pdf", 2048, None),
        },
        "POST" if query.contains_key("uploads") => xml(format!(
            "<InitiateMultipartUploadResult><Bucket>{BUCKET}</Bucket><Key>{key}</Key><UploadId>{UPLOAD_ID}</UploadId></InitiateMultipartUploadResult>"
        )),
        "POST" if query.contains_key("uploadId") => xml(format!(
            "<CompleteMultipartUploadResult><Location>http://localhost/{BUCKET}/{key}</Location><Bucket>{BUCKET}</Bucket><Key>{key}</Key><ETag>\"done\"</ETag></CompleteMultipartUploadResult>"
        )),
        "PUT" if query.contains_key("partNumber") => {
            let part = query.get("partNumber").cloned().unwrap_or_default();
            if double.failing_part.as_deref() == Some(part.as_str()) {
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    [("content-type", "application/xml")],
                    "<Error><Code>InternalError</Code><Message>part rejected</Message></Error>",
                )
                    .into_response();
            }
            etag(&format!("etag-{}", part))
        }
        "PUT" if headers.contains_key("x-amz-copy-source") => xml(
            r#"<CopyObjectResult><LastModified>2024-05-01T12:00:00.000Z</LastModified><ETag>"copied"</ETag></CopyObjectResult>"#
                .to_string(),
        ),
        "PUT" => etag("single"),
        "DELETE" => StatusCode::NO_CONTENT.into_response(),
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn spawn_s3(failing_part: Option<&str>) -> (Arc<S3Double>, S3ObjectStore) {
    let double = Arc::new(S3Double {
        requests: Mutex::new(Vec::new()),
        failing_part: failing_part.map(str::to_string),
    });
    let app = Router::new()
        .fallback(handle)
        .layer(DefaultBodyLimit::disable())
        .with_state(double.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let endpoint = format!("http://{}", addr);
    let store = S3ObjectStore::with_credentials(
        &credentials(),
        "us-east-1",
        BUCKET,
        Some(endpoint.as_str()),
    );
    (double, store)
}

fn file_request(path: &Path, key: &str, len: u64) -> PutRequest {
    std::fs::File::create(path).unwrap().set_len(len).unwrap();
    PutRequest {
        key: key.to_string(),
        body: PutBody::File {
            path: path.to_path_buf(),
            len,
        },
        content_type: "application/pdf".to_string(),
        metadata: HashMap::from([("uploaded-by".to_string(), "ada@example.com".to_string())]),
    }
}

#[tokio::test]
async fn list_follows_continuation_tokens() {
    let (double, store) = spawn_s3(None).await;

    let items = store.list().await.unwrap();

    let keys: Vec<&str> = items.iter().map(|i| i.key.as_str()).collect();
    assert_eq!(keys, vec!["a.txt", "q1/b.pdf"]);
    assert_eq!(items[1].size, 2048);
    assert!(items[0].last_modified.is_some());

    let requests = double.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[1].query.get("continuation-token").map(String::as_str),
        Some("page-2")
    );
}

#[tokio::test]
async fn small_file_is_a_single_encrypted_put() {
    let (double, store) = spawn_s3(None).await;
    let dir = tempfile::tempdir().unwrap();
    let request = file_request(&dir.path().join("report.pdf"), "report.pdf", 1024);
    let seen = Mutex::new(Vec::new());

    store
        .put(request, &|p: TransferProgress| seen.lock().unwrap().push(p.percent()))
        .await
        .unwrap();

    let requests = double.requests();
    assert_eq!(requests.len(), 1);
    let put = &requests[0];
    assert_eq!(put.method, Method::PUT);
    assert_eq!(put.key, "report.pdf");
    assert_eq!(put.header("x-amz-server-side-encryption"), Some("AES256"));
    assert_eq!(put.header("x-amz-meta-uploaded-by"), Some("ada@example.com"));
    assert_eq!(put.header("content-type"), Some("application/pdf"));
    assert_eq!(seen.into_inner().unwrap(), vec![100]);
}

#[tokio::test]
async fn large_file_uploads_in_numbered_parts() {
    let (double, store) = spawn_s3(None).await;
    let dir = tempfile::tempdir().unwrap();
    let request = file_request(&dir.path().join("big.bin"), "big.bin", PART_SIZE + 1);
    let seen = Mutex::new(Vec::new());

    store
        .put(request, &|p: TransferProgress| seen.lock().unwrap().push(p.transferred))
        .await
        .unwrap();

    let requests = double.requests();
    let create = &requests[0];
    assert!(create.query.contains_key("uploads"));
    assert_eq!(create.header("x-amz-server-side-encryption"), Some("AES256"));
    assert_eq!(create.header("x-amz-meta-uploaded-by"), Some("ada@example.com"));

    let parts: Vec<&str> = requests
        .iter()
        .filter(|r| r.is_part())
        .map(|r| r.query["partNumber"].as_str())
        .collect();
    assert_eq!(parts, vec!["1", "2"]);
    assert!(requests
        .iter()
        .filter(|r| r.is_part())
        .all(|r| r.query.get("uploadId").map(String::as_str) == Some(UPLOAD_ID)));

    let complete = requests.last().unwrap();
    assert_eq!(complete.method, Method::POST);
    let manifest = String::from_utf8_lossy(&complete.body);
    assert!(manifest.contains("<PartNumber>1</PartNumber>"));
    assert!(manifest.contains("<PartNumber>2</PartNumber>"));
    assert!(manifest.contains("etag-2"));

    assert_eq!(seen.into_inner().unwrap(), vec![PART_SIZE, PART_SIZE + 1]);
}

#[tokio::test]
async fn failed_part_aborts_the_upload() {
    let (double, store) = spawn_s3(Some("2")).await;
    let dir = tempfile::tempdir().unwrap();
    let request = file_request(&dir.path().join("big.bin"), "big.bin", PART_SIZE + 1);

    let result = store.put(request, &|_: TransferProgress| {}).await;

    assert!(result.is_err());
    let requests = double.requests();
    let abort = requests.last().unwrap();
    assert_eq!(abort.method, Method::DELETE);
    assert_eq!(abort.key, "big.bin");
    assert_eq!(abort.query.get("uploadId").map(String::as_str), Some(UPLOAD_ID));
    assert!(!requests
        .iter()
        .any(|r| r.method == Method::POST && r.query.contains_key("uploadId")));
}

#[tokio::test]
async fn copy_keeps_metadata_and_encryption() {
    let (double, store) = spawn_s3(None).await;

    store.copy("q1/my report.pdf", "q1/final.pdf").await.unwrap();

    let requests = double.requests();
    let copy = &requests[0];
    assert_eq!(copy.method, Method::PUT);
    assert_eq!(copy.key, "q1/final.pdf");
    assert_eq!(
        copy.header("x-amz-copy-source"),
        Some("data-bucket/q1/my%20report.pdf")
    );
    assert_eq!(copy.header("x-amz-metadata-directive"), Some("COPY"));
    assert_eq!(copy.header("x-amz-server-side-encryption"), Some("AES256"));
}

#[tokio::test]
async fn delete_removes_the_key() {
    let (double, store) = spawn_s3(None).await;

    store.delete("old.txt").await.unwrap();

    let requests = double.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, Method::DELETE);
    assert_eq!(requests[0].key, "old.txt");
    assert!(!requests[0].query.contains_key("uploadId"));
}
