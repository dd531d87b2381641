use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use tracing::info;
use uuid::Uuid;

use crate::config::UploadArchiveConfig;
use crate::errors::AppError;

/// Keeps a copy of every raw CSV upload in an S3-compatible bucket.
#[derive(Clone)]
pub struct UploadArchive {
    client: aws_sdk_s3::Client,
    bucket: String,
}

impl UploadArchive {
    pub async fn from_config(config: &UploadArchiveConfig) -> Self {
        let credentials = Credentials::new(
            &config.aws_access_key_id,
            &config.aws_secret_access_key,
            None,
            None,
            "nubble-static",
        );

        let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(credentials)
            .endpoint_url(&config.endpoint)
            .load()
            .await;

        Self {
            client: aws_sdk_s3::Client::new(&s3_config),
            bucket: config.bucket.clone(),
        }
    }

    /// Stores the upload under `<user_id>/connections_<unix_millis>.csv` and returns the key.
    pub async fn store_upload(&self, user_id: Uuid, body: Bytes) -> Result<String, AppError> {
        let key = upload_key(user_id, chrono::Utc::now().timestamp_millis());
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(body))
            .content_type("text/csv")
            .send()
            .await
            .map_err(|e| AppError::S3(format!("upload archive failed: {e}")))?;

        info!("Archived upload to s3://{}/{}", self.bucket, key);
        Ok(key)
    }
}

fn upload_key(user_id: Uuid, unix_millis: i64) -> String {
    format!("{user_id}/connections_{unix_millis}.csv")
}
