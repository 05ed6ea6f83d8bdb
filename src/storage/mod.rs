use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;

/// Read access to object storage
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the full body of an object
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;
}

/// Amazon S3 backed object store
pub struct S3ObjectStore {
    client: S3Client,
}

impl S3ObjectStore {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        tracing::debug!("Fetching s3://{}/{}", bucket, key);

        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .context("Failed to get object from S3")?;

        let body = response
            .body
            .collect()
            .await
            .context("Failed to read S3 object body")?;

        Ok(body.into_bytes().to_vec())
    }
}
