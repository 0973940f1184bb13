//! Download service
//!
//! Hands out short-lived presigned GET URLs for vote log files so admins
//! can download them straight from object storage.

use async_trait::async_trait;
use chrono::{Duration, Utc};

use super::error::{AppError, ServiceResult};
use super::storage::DynObjectStorage;
use super::dto::PresignedUrlResponse;

#[async_trait]
pub trait DownloadService: Send + Sync {
    async fn create_presigned_url(&self, filename: &str) -> ServiceResult<PresignedUrlResponse>;
}

pub struct DownloadServiceImpl {
    storage: DynObjectStorage,
    log_prefix: String,
    expires_in: u64,
}

impl DownloadServiceImpl {
    pub fn new(storage: DynObjectStorage, log_prefix: impl Into<String>, expires_in: u64) -> Self {
        Self {
            storage,
            log_prefix: log_prefix.into().trim_end_matches('/').to_string(),
            expires_in,
        }
    }
}

/// A log filename is a single path segment
fn check_filename(filename: &str) -> Result<&str, AppError> {
    let filename = filename.trim();
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
    {
        return Err(AppError::bad_request(
            "Invalid filename",
            "Filename must be a single file name without path separators",
        ));
    }
    Ok(filename)
}

#[async_trait]
impl DownloadService for DownloadServiceImpl {
    async fn create_presigned_url(&self, filename: &str) -> ServiceResult<PresignedUrlResponse> {
        let filename = check_filename(filename)?;
        let key = format!("{}/{}", self.log_prefix, filename);

        let url = self.storage.presign_get(&key, self.expires_in).await?;
        tracing::info!(key = %key, "Issued download URL");

        Ok(PresignedUrlResponse {
            url,
            key,
            expires_in: self.expires_in,
            expires_at: Utc::now() + Duration::seconds(self.expires_in as i64),
        })
    }
}
