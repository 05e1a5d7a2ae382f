pub mod memory;
pub mod s3;

use crate::models::TransferProgress;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use explorer_core::error::AppError;
use std::collections::HashMap;
use std::ops::Range;
use std::path::PathBuf;
use std::time::Duration;

pub use memory::{InMemoryObjectStore, StoreCall, StoreOp, StoredObject};
pub use s3::S3ObjectStore;

/// Uploads above this size go through multipart upload in parts of this size.
pub const PART_SIZE: u64 = 5 * 1024 * 1024;

/// One entry of the data bucket listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectItem {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<DateTime<Utc>>,
}

impl ObjectItem {
    pub fn display_size(&self) -> String {
        format_file_size(self.size)
    }
}

/// Human readable size: whole bytes below 1 KiB, otherwise base 1024 with
/// two decimals. GB is the largest unit.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 3] = ["KB", "MB", "GB"];

    if bytes < 1024 {
        return format!("{} Bytes", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}

/// Where the bytes of an upload come from.
#[derive(Debug, Clone)]
pub enum PutBody {
    Bytes(Bytes),
    /// Read from disk one part at a time.
    File { path: PathBuf, len: u64 },
}

impl PutBody {
    pub fn len(&self) -> u64 {
        match self {
            PutBody::Bytes(bytes) => bytes.len() as u64,
            PutBody::File { len, .. } => *len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The whole body in memory.
    pub async fn read_all(&self) -> Result<Bytes, AppError> {
        match self {
            PutBody::Bytes(bytes) => Ok(bytes.clone()),
            PutBody::File { path, .. } => Ok(Bytes::from(tokio::fs::read(path).await?)),
        }
    }
}

/// An object to store, encrypted at rest with the bucket-managed key.
#[derive(Debug, Clone)]
pub struct PutRequest {
    pub key: String,
    pub body: PutBody,
    pub content_type: String,
    pub metadata: HashMap<String, String>,
}

impl PutRequest {
    pub fn len(&self) -> u64 {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Byte ranges of the parts, or `None` when a single put suffices.
    pub fn parts(&self) -> Option<Vec<Range<u64>>> {
        let len = self.len();
        if len <= PART_SIZE {
            return None;
        }
        Some(
            (0..len)
                .step_by(PART_SIZE as usize)
                .map(|start| start..(start + PART_SIZE).min(len))
                .collect(),
        )
    }
}

pub type ProgressSink<'a> = &'a (dyn Fn(TransferProgress) + Send + Sync);

/// Operations the explorer needs from the data bucket.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Every object in the bucket, following continuation tokens.
    async fn list(&self) -> Result<Vec<ObjectItem>, AppError>;

    /// Store an object, reporting bytes sent as each part completes.
    async fn put(&self, request: PutRequest, progress: ProgressSink<'_>) -> Result<(), AppError>;

    /// Time-limited GET URL for `key`.
    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, AppError>;

    /// Server-side copy keeping metadata, re-encrypted with the bucket key.
    async fn copy(&self, from: &str, to: &str) -> Result<(), AppError>;

    async fn delete(&self, key: &str) -> Result<(), AppError>;
}
