//! S3/R2 storage service for photo uploads.

use async_trait::async_trait;
use aws_sdk_s3::{
    config::{Credentials, Region},
    primitives::ByteStream,
    Client, Config,
};
use thiserror::Error;
use uuid::Uuid;

use crate::config::StorageConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("S3 error: {0}")]
    S3(String),
    #[error("Upload timed out after {0}s")]
    Timeout(u64),
}

/// Blob store for uploaded photos.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    /// Store one photo and return its public URL.
    async fn upload_photo(
        &self,
        user_id: &str,
        filename: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<String, StorageError>;
}

/// S3/R2 storage service for photo blobs.
pub struct StorageService {
    client: Client,
    bucket: String,
    public_base: String,
    timeout: std::time::Duration,
}

impl StorageService {
    /// Build the S3 client from configuration.
    ///
    /// Use region "auto" and a custom endpoint for Cloudflare R2.
    pub fn new(config: &StorageConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,  // session token
            None,  // expiry
            "env", // provider name
        );

        let mut config_builder = Config::builder()
            .region(Region::new(config.region.clone()))
            .credentials_provider(credentials)
            .behavior_version_latest();

        // Set custom endpoint for R2 or other S3-compatible services
        if let Some(endpoint_url) = &config.endpoint {
            config_builder = config_builder
                .endpoint_url(endpoint_url)
                .force_path_style(true);
        }

        let client = Client::from_conf(config_builder.build());

        Self {
            client,
            bucket: config.bucket.clone(),
            public_base: public_base(config),
            timeout: config.timeout,
        }
    }

    /// Public URL of an object key
    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }

    /// Generate the S3 key for a user's photo.
    ///
    /// Format: `{user_id}/{uuid}-{sanitized filename}`
    pub fn make_key(user_id: &str, filename: &str) -> String {
        format!(
            "{}/{}-{}",
            sanitize(user_id),
            Uuid::new_v4(),
            sanitize(filename)
        )
    }
}

#[async_trait]
impl PhotoStore for StorageService {
    async fn upload_photo(
        &self,
        user_id: &str,
        filename: &str,
        content: &[u8],
        content_type: &str,
    ) -> Result<String, StorageError> {
        let key = Self::make_key(user_id, filename);
        let body = ByteStream::from(content.to_vec());

        let request = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .content_type(content_type)
            .body(body)
            .send();

        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| StorageError::Timeout(self.timeout.as_secs()))?
            .map_err(|e| StorageError::S3(e.to_string()))?;

        tracing::info!("Uploaded photo to S3: {}", key);
        Ok(self.public_url(&key))
    }
}

fn public_base(config: &StorageConfig) -> String {
    let base = match (&config.public_url, &config.endpoint) {
        (Some(public), _) => public.clone(),
        (None, Some(endpoint)) => format!("{}/{}", endpoint.trim_end_matches('/'), config.bucket),
        (None, None) => format!(
            "https://{}.s3.{}.amazonaws.com",
            config.bucket, config.region
        ),
    };
    base.trim_end_matches('/').to_string()
}

/// Keep key segments to a conservative character set.
fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_start_matches('.');
    if trimmed.is_empty() {
        "photo.jpg".to_string()
    } else {
        trimmed.to_string()
    }
}
