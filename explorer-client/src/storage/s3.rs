use super::{ObjectItem, ObjectStore, ProgressSink, PutBody, PutRequest};
use crate::models::TransferProgress;
use crate::services::TemporaryCredentials;
use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::{ByteStream, Length};
use aws_sdk_s3::types::{
    CompletedMultipartUpload, CompletedPart, MetadataDirective, ServerSideEncryption,
};
use aws_sdk_s3::Client as S3Client;
use chrono::DateTime;
use explorer_core::error::AppError;
use secrecy::ExposeSecret;
use std::ops::Range;
use std::time::Duration;

/// The data bucket accessed with the federated role's credentials.
pub struct S3ObjectStore {
    client: S3Client,
    bucket: String,
}

impl S3ObjectStore {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    /// Client signed with the exchanged credentials. An endpoint override
    /// switches to path-style addressing for S3-compatible servers.
    pub fn with_credentials(
        credentials: &TemporaryCredentials,
        region: &str,
        bucket: impl Into<String>,
        endpoint: Option<&str>,
    ) -> Self {
        let provider = Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.expose_secret().clone(),
            Some(credentials.session_token.expose_secret().clone()),
            credentials.expiration.map(std::time::SystemTime::from),
            "cognito-identity",
        );

        let mut builder = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .credentials_provider(provider);
        if let Some(endpoint) = endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Self::new(S3Client::from_conf(builder.build()), bucket)
    }

    /// `CopySource` value: bucket and URL-encoded key, slashes kept.
    fn copy_source(&self, key: &str) -> String {
        let encoded: Vec<String> = key
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/{}", self.bucket, encoded.join("/"))
    }

    /// Stream `range` of the body, or all of it. File bodies are read from
    /// disk as the request is sent.
    async fn byte_stream(
        body: &PutBody,
        range: Option<Range<u64>>,
    ) -> Result<ByteStream, AppError> {
        let stream = match (body, range) {
            (PutBody::Bytes(bytes), None) => ByteStream::from(bytes.clone()),
            (PutBody::Bytes(bytes), Some(range)) => {
                ByteStream::from(bytes.slice(range.start as usize..range.end as usize))
            }
            (PutBody::File { path, .. }, None) => ByteStream::from_path(path).await.map_err(|e| {
                AppError::Storage(anyhow::anyhow!("read {}: {}", path.display(), e))
            })?,
            (PutBody::File { path, .. }, Some(range)) => ByteStream::read_from()
                .path(path)
                .offset(range.start)
                .length(Length::Exact(range.end - range.start))
                .build()
                .await
                .map_err(|e| AppError::Storage(anyhow::anyhow!("read {}: {}", path.display(), e)))?,
        };
        Ok(stream)
    }

    async fn put_single(&self, request: PutRequest) -> Result<(), AppError> {
        let mut put = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&request.key)
            .content_type(&request.content_type)
            .server_side_encryption(ServerSideEncryption::Aes256);
        for (name, value) in &request.metadata {
            put = put.metadata(name, value);
        }

        put.body(Self::byte_stream(&request.body, None).await?)
            .send()
            .await
            .map_err(|e| AppError::Storage(anyhow::anyhow!("S3 upload failed: {}", e)))?;
        Ok(())
    }

    async fn put_multipart(
        &self,
        request: &PutRequest,
        upload_id: &str,
        progress: ProgressSink<'_>,
    ) -> Result<(), AppError> {
        let total = request.len();
        let mut completed = Vec::new();
        let mut sent = 0u64;

        for (index, range) in request.parts().unwrap_or_default().into_iter().enumerate() {
            let part_number = (index + 1) as i32;
            let chunk_len = range.end - range.start;
            let chunk = Self::byte_stream(&request.body, Some(range)).await?;

            let part = self
                .client
                .upload_part()
                .bucket(&self.bucket)
                .key(&request.key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(chunk)
                .send()
                .await
                .map_err(|e| {
                    AppError::Storage(anyhow::anyhow!("S3 upload of part {} failed: {}", part_number, e))
                })?;

            completed.push(
                CompletedPart::builder()
                    .set_e_tag(part.e_tag().map(str::to_string))
                    .part_number(part_number)
                    .build(),
            );
            sent += chunk_len;
            progress(TransferProgress::new(&request.key, sent, total));
        }

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(&request.key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(completed))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| AppError::Storage(anyhow::anyhow!("S3 upload completion failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn list(&self) -> Result<Vec<ObjectItem>, AppError> {
        let mut items = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| AppError::Storage(anyhow::anyhow!("S3 list failed: {}", e)))?;

            for object in page.contents() {
                let Some(key) = object.key() else { continue };
                items.push(ObjectItem {
                    key: key.to_string(),
                    size: object.size().unwrap_or_default().max(0) as u64,
                    last_modified: object
                        .last_modified()
                        .and_then(|at| DateTime::from_timestamp(at.secs(), at.subsec_nanos())),
                });
            }

            match page.next_continuation_token() {
                Some(token) if page.is_truncated().unwrap_or(false) => {
                    continuation_token = Some(token.to_string());
                }
                _ => break,
            }
        }

        Ok(items)
    }

    #[tracing::instrument(skip_all, fields(key = %request.key, size = request.len()))]
    async fn put(&self, request: PutRequest, progress: ProgressSink<'_>) -> Result<(), AppError> {
        let total = request.len();

        if request.parts().is_none() {
            let key = request.key.clone();
            self.put_single(request).await?;
            progress(TransferProgress::new(key, total, total));
            return Ok(());
        }

        let mut create = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(&request.key)
            .content_type(&request.content_type)
            .server_side_encryption(ServerSideEncryption::Aes256);
        for (name, value) in &request.metadata {
            create = create.metadata(name, value);
        }
        let created = create
            .send()
            .await
            .map_err(|e| AppError::Storage(anyhow::anyhow!("S3 upload start failed: {}", e)))?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| AppError::storage("S3 returned no upload id"))?
            .to_string();

        if let Err(e) = self.put_multipart(&request, &upload_id, progress).await {
            let aborted = self
                .client
                .abort_multipart_upload()
                .bucket(&self.bucket)
                .key(&request.key)
                .upload_id(&upload_id)
                .send()
                .await;
            if let Err(abort_err) = aborted {
                tracing::warn!(upload_id = %upload_id, "Failed to abort multipart upload: {}", abort_err);
            }
            return Err(e);
        }

        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String, AppError> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| AppError::Storage(anyhow::anyhow!("invalid URL lifetime: {}", e)))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| AppError::Storage(anyhow::anyhow!("S3 presign failed: {}", e)))?;

        Ok(request.uri().to_string())
    }

    async fn copy(&self, from: &str, to: &str) -> Result<(), AppError> {
        self.client
            .copy_object()
            .bucket(&self.bucket)
            .copy_source(self.copy_source(from))
            .key(to)
            .server_side_encryption(ServerSideEncryption::Aes256)
            .metadata_directive(MetadataDirective::Copy)
            .send()
            .await
            .map_err(|e| AppError::Storage(anyhow::anyhow!("S3 copy failed: {}", e)))?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| AppError::Storage(anyhow::anyhow!("S3 delete failed: {}", e)))?;
        Ok(())
    }
}
