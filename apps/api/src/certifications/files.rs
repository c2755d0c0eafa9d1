use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum FileStoreError {
    #[error("S3 upload failed: {0}")]
    Upload(String),

    #[error("S3 delete failed: {0}")]
    Delete(String),
}

/// Object storage for uploaded certificate files.
#[async_trait]
pub trait FileStore: Send + Sync {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), FileStoreError>;

    async fn delete(&self, key: &str) -> Result<(), FileStoreError>;
}

/// `certificates/<user_id>/<uuid>.<ext>`
pub fn certificate_key(user_id: Uuid, extension: &str) -> String {
    format!("certificates/{user_id}/{}.{extension}", Uuid::new_v4())
}

pub struct S3FileStore {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl S3FileStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: String) -> Self {
        Self { client, bucket }
    }
}

#[async_trait]
impl FileStore for S3FileStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> Result<(), FileStoreError> {
        let size = body.len();
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(body))
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| FileStoreError::Upload(e.to_string()))?;

        info!("Uploaded {size} bytes to s3://{}/{key}", self.bucket);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), FileStoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| FileStoreError::Delete(e.to_string()))?;

        info!("Deleted s3://{}/{key}", self.bucket);
        Ok(())
    }
}
