use crate::models::TransferProgress;
use crate::storage::{ObjectItem, ObjectStore, PutBody, PutRequest};
use explorer_core::error::AppError;
use futures::future::join_all;
use reqwest::Client;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Largest file accepted for upload.
pub const MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;
/// Lifetime of pre-signed download URLs.
pub const DOWNLOAD_URL_TTL: Duration = Duration::from_secs(300);

pub const EMPTY_LISTING_NOTICE: &str = "No files uploaded yet";
pub const LISTING_FAILED_NOTICE: &str = "Failed to load files";

pub const UPLOADED_BY_METADATA: &str = "uploaded-by";
pub const UPLOAD_TIME_METADATA: &str = "upload-time";

/// What the file list shows after a refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Listing {
    Empty,
    Items(Vec<ObjectItem>),
    Error(String),
}

impl Listing {
    pub fn items(&self) -> &[ObjectItem] {
        match self {
            Listing::Items(items) => items,
            _ => &[],
        }
    }

    /// Inline message shown in place of the list, if any.
    pub fn notice(&self) -> Option<&'static str> {
        match self {
            Listing::Items(_) => None,
            Listing::Empty => Some(EMPTY_LISTING_NOTICE),
            Listing::Error(_) => Some(LISTING_FAILED_NOTICE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Uploaded { name: String },
    /// Refused locally, nothing was sent.
    Rejected { name: String, notice: String },
    Failed { name: String, error: String },
}

impl UploadOutcome {
    pub fn name(&self) -> &str {
        match self {
            UploadOutcome::Uploaded { name }
            | UploadOutcome::Rejected { name, .. }
            | UploadOutcome::Failed { name, .. } => name,
        }
    }
}

#[derive(Debug)]
pub struct BatchReport {
    pub outcomes: Vec<UploadOutcome>,
    pub listing: Listing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameOutcome {
    /// Blank or identical name; nothing was called.
    Unchanged,
    Renamed { from: String, to: String },
    /// The copy failed, the original is untouched.
    Failed { error: String },
    /// The copy exists but the original could not be removed, so both keys
    /// are now present.
    PartiallyApplied { from: String, to: String, error: String },
}

#[derive(Debug)]
pub struct RenameReport {
    pub outcome: RenameOutcome,
    /// `None` only for [`RenameOutcome::Unchanged`].
    pub listing: Option<Listing>,
}

/// List, upload, download and rename against the data bucket.
pub struct StorageOperations {
    store: Arc<dyn ObjectStore>,
    http: Client,
    download_dir: PathBuf,
}

impl StorageOperations {
    pub fn new(store: Arc<dyn ObjectStore>, download_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            http: Client::new(),
            download_dir: download_dir.into(),
        }
    }

    pub async fn list(&self) -> Listing {
        match self.store.list().await {
            Ok(items) if items.is_empty() => Listing::Empty,
            Ok(items) => Listing::Items(items),
            Err(e) => {
                tracing::error!("List files error: {}", e);
                Listing::Error(e.to_string())
            }
        }
    }

    /// Upload every file concurrently, then refresh the list once.
    #[tracing::instrument(skip_all, fields(files = files.len()))]
    pub async fn upload_batch<F>(
        &self,
        files: &[PathBuf],
        uploaded_by: &str,
        progress: F,
    ) -> BatchReport
    where
        F: Fn(TransferProgress) + Send + Sync,
    {
        let uploads = files
            .iter()
            .map(|path| self.upload_file(path, uploaded_by, &progress));
        let outcomes = join_all(uploads).await;

        BatchReport {
            outcomes,
            listing: self.list().await,
        }
    }

    async fn upload_file(
        &self,
        path: &Path,
        uploaded_by: &str,
        progress: &(dyn Fn(TransferProgress) + Send + Sync),
    ) -> UploadOutcome {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let size = match tokio::fs::metadata(path).await {
            Ok(meta) => meta.len(),
            Err(e) => {
                return UploadOutcome::Failed {
                    name,
                    error: e.to_string(),
                }
            }
        };
        if size > MAX_UPLOAD_BYTES {
            tracing::warn!(file = %name, size, "Rejected oversized upload");
            return UploadOutcome::Rejected {
                notice: format!("File \"{}\" exceeds 100MB limit", name),
                name,
            };
        }

        let request = PutRequest {
            key: name.clone(),
            content_type: mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
            metadata: HashMap::from([
                (UPLOADED_BY_METADATA.to_string(), uploaded_by.to_string()),
                (UPLOAD_TIME_METADATA.to_string(), chrono::Utc::now().to_rfc3339()),
            ]),
            body: PutBody::File {
                path: path.to_path_buf(),
                len: size,
            },
        };

        match self.store.put(request, progress).await {
            Ok(()) => {
                tracing::info!(file = %name, size, "Uploaded file");
                UploadOutcome::Uploaded { name }
            }
            Err(e) => {
                tracing::error!(file = %name, "Upload error: {}", e);
                UploadOutcome::Failed {
                    name,
                    error: e.to_string(),
                }
            }
        }
    }

    /// Fetch `key` through a pre-signed URL into the download directory.
    #[tracing::instrument(skip(self))]
    pub async fn download(&self, key: &str) -> Result<PathBuf, AppError> {
        // Folder markers have no file name to save under.
        if key.is_empty() || key.ends_with('/') {
            return Err(AppError::storage(format!("{} is a folder, not a file", key)));
        }

        let url = self.store.presign_get(key, DOWNLOAD_URL_TTL).await?;

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::storage(format!(
                "download of {} returned {}",
                key, status
            )));
        }
        let body = response.bytes().await?;

        let file_name = key.rsplit('/').next().unwrap_or(key);
        tokio::fs::create_dir_all(&self.download_dir).await?;
        let target = self.download_dir.join(file_name);
        tokio::fs::write(&target, &body).await?;

        tracing::info!(key, path = %target.display(), bytes = body.len(), "Downloaded file");
        Ok(target)
    }

    /// Copy to the new key, then delete the old one. Not atomic.
    #[tracing::instrument(skip(self))]
    pub async fn rename(&self, old_key: &str, new_key: &str) -> RenameReport {
        let new_key = new_key.trim();
        if new_key.is_empty() || new_key == old_key {
            return RenameReport {
                outcome: RenameOutcome::Unchanged,
                listing: None,
            };
        }

        let outcome = match self.store.copy(old_key, new_key).await {
            Err(e) => {
                tracing::error!("Rename error: {}", e);
                RenameOutcome::Failed {
                    error: e.to_string(),
                }
            }
            Ok(()) => match self.store.delete(old_key).await {
                Ok(()) => RenameOutcome::Renamed {
                    from: old_key.to_string(),
                    to: new_key.to_string(),
                },
                Err(e) => {
                    tracing::warn!(
                        from = old_key,
                        to = new_key,
                        "Copied but failed to delete original: {}",
                        e
                    );
                    RenameOutcome::PartiallyApplied {
                        from: old_key.to_string(),
                        to: new_key.to_string(),
                        error: e.to_string(),
                    }
                }
            },
        };

        RenameReport {
            outcome,
            listing: Some(self.list().await),
        }
    }
}
