use super::{ObjectItem, ObjectStore, ProgressSink, PutRequest};
use crate::models::TransferProgress;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use explorer_core::error::AppError;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Store operations, for failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    List,
    Put,
    Presign,
    Copy,
    Delete,
}

/// A call made against an [`InMemoryObjectStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    List,
    Put { key: String },
    Presign { key: String, expires_in: Duration },
    Copy { from: String, to: String },
    Delete { key: String },
}

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
    pub metadata: HashMap<String, String>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Default)]
struct State {
    objects: BTreeMap<String, StoredObject>,
    calls: Vec<StoreCall>,
    failing: HashSet<StoreOp>,
}

/// Object store kept in process memory. Records every call and can be told
/// to fail selected operations.
pub struct InMemoryObjectStore {
    state: Mutex<State>,
    presign_base: String,
}

impl Default for InMemoryObjectStore {
    fn default() -> Self {
        Self::new("memory://bucket")
    }
}

impl InMemoryObjectStore {
    /// `presign_base` prefixes the URLs handed out by `presign_get`.
    pub fn new(presign_base: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(State::default()),
            presign_base: presign_base.into().trim_end_matches('/').to_string(),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn insert(&self, key: impl Into<String>, body: impl Into<Bytes>) {
        self.state().objects.insert(
            key.into(),
            StoredObject {
                body: body.into(),
                content_type: "application/octet-stream".to_string(),
                metadata: HashMap::new(),
                last_modified: Utc::now(),
            },
        );
    }

    pub fn object(&self, key: &str) -> Option<StoredObject> {
        self.state().objects.get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.state().objects.keys().cloned().collect()
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.state().calls.clone()
    }

    pub fn fail(&self, op: StoreOp) {
        self.state().failing.insert(op);
    }

    fn record(&self, op: StoreOp, call: StoreCall) -> Result<(), AppError> {
        let mut state = self.state();
        state.calls.push(call);
        if state.failing.contains(&op) {
            return Err(AppError::storage(format!("{:?} failed", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn list(&self) -> Result<Vec<ObjectItem>, AppError> {
        self.record(StoreOp::List, StoreCall::List)?;

        Ok(self
            .state()
            .objects
            .iter()
            .map(|(key, object)| ObjectItem {
                key: key.clone(),
                size: object.body.len() as u64,
                last_modified: Some(object.last_modified),
            })
            .collect())
    }

    async fn put(&self, request: PutRequest, progress: ProgressSink<'_>) -> Result<(), AppError> {
        self.record(
            StoreOp::Put,
            StoreCall::Put {
                key: request.key.clone(),
            },
        )?;

        let body = request.body.read_all().await?;
        let total = request.len();
        match request.parts() {
            Some(parts) => {
                for range in parts {
                    progress(TransferProgress::new(&request.key, range.end, total));
                }
            }
            None => progress(TransferProgress::new(&request.key, total, total)),
        }

        self.state().objects.insert(
            request.key,
            StoredObject {
                body,
                content_type: request.content_type,
                metadata: request.metadata,
                last_modified: Utc::now(),
            },
        );
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, AppError> {
        self.record(
            StoreOp::Presign,
            StoreCall::Presign {
                key: key.to_string(),
                expires_in,
            },
        )?;

        Ok(format!(
            "{}/{}?X-Amz-Expires={}",
            self.presign_base,
            urlencoding::encode(key),
            expires_in.as_secs()
        ))
    }

    async fn copy(&self, from: &str, to: &str) -> Result<(), AppError> {
        self.record(
            StoreOp::Copy,
            StoreCall::Copy {
                from: from.to_string(),
                to: to.to_string(),
            },
        )?;

        let mut state = self.state();
        let mut object = state
            .objects
            .get(from)
            .cloned()
            .ok_or_else(|| AppError::storage(format!("NoSuchKey: {}", from)))?;
        object.last_modified = Utc::now();
        state.objects.insert(to.to_string(), object);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.record(
            StoreOp::Delete,
            StoreCall::Delete {
                key: key.to_string(),
            },
        )?;

        self.state().objects.remove(key);
        Ok(())
    }
}
