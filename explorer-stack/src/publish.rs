use crate::stack::INDEX_DOCUMENT;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client as S3Client;
use explorer_core::error::AppError;

/// Writes to and empties the public web bucket after the stack exists.
pub struct WebsitePublisher {
    client: S3Client,
    bucket: String,
}

impl WebsitePublisher {
    pub fn new(client: S3Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub async fn from_env(region: &str, bucket: impl Into<String>) -> Self {
        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(region.to_string()))
            .load()
            .await;
        Self::new(S3Client::new(&config), bucket)
    }

    pub async fn publish_index(&self, html: String) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(INDEX_DOCUMENT)
            .content_type("text/html")
            .body(ByteStream::from(html.into_bytes()))
            .send()
            .await
            .map_err(|e| AppError::Provisioning(anyhow::anyhow!("publish {}: {}", INDEX_DOCUMENT, e)))?;

        tracing::info!(bucket = %self.bucket, key = INDEX_DOCUMENT, "Published setup page");
        Ok(())
    }

    /// Delete every object so the bucket can be removed on teardown.
    /// Returns the number of objects deleted.
    pub async fn purge(&self) -> Result<usize, AppError> {
        let mut deleted = 0;
        let mut continuation_token: Option<String> = None;

        loop {
            let page = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .set_continuation_token(continuation_token.take())
                .send()
                .await
                .map_err(|e| AppError::Provisioning(anyhow::anyhow!("list {}: {}", self.bucket, e)))?;

            for object in page.contents() {
                let Some(key) = object.key() else { continue };
                self.client
                    .delete_object()
                    .bucket(&self.bucket)
                    .key(key)
                    .send()
                    .await
                    .map_err(|e| AppError::Provisioning(anyhow::anyhow!("delete {}: {}", key, e)))?;
                deleted += 1;
            }

            match page.next_continuation_token() {
                Some(token) if page.is_truncated().unwrap_or(false) => {
                    continuation_token = Some(token.to_string());
                }
                _ => break,
            }
        }

        tracing::info!(bucket = %self.bucket, deleted, "Purged web bucket");
        Ok(deleted)
    }
}
