//! Upload service
//!
//! Candidate photos go straight from the browser to object storage with
//! a presigned PUT URL. The returned key is what the candidate record
//! later stores as `photo_key`.

use async_trait::async_trait;

use super::error::{AppError, ServiceResult};
use super::storage::DynObjectStorage;
use super::dto::UploadUrlResponse;

#[async_trait]
pub trait UploadService: Send + Sync {
    async fn create_upload_url(&self, filename: &str) -> ServiceResult<UploadUrlResponse>;
}

pub struct UploadServiceImpl {
    storage: DynObjectStorage,
    candidate_prefix: String,
    expires_in: u64,
}

impl UploadServiceImpl {
    pub fn new(
        storage: DynObjectStorage,
        candidate_prefix: impl Into<String>,
        expires_in: u64,
    ) -> Self {
        Self {
            storage,
            candidate_prefix: candidate_prefix.into().trim_end_matches('/').to_string(),
            expires_in,
        }
    }
}

/// Upload names may be nested (`2026/photo.png`) but must stay under the prefix
fn check_upload_name(filename: &str) -> Result<&str, AppError> {
    let filename = filename.trim();
    let valid = !filename.is_empty()
        && !filename.contains('\\')
        && filename
            .split('/')
            .all(|segment| !segment.is_empty() && segment != "." && segment != "..");
    if !valid {
        return Err(AppError::bad_request(
            "Invalid filename",
            "Filename must be a relative path without '.' or '..' segments",
        ));
    }
    Ok(filename)
}

#[async_trait]
impl UploadService for UploadServiceImpl {
    async fn create_upload_url(&self, filename: &str) -> ServiceResult<UploadUrlResponse> {
        let file_name = check_upload_name(filename)?;
        let key = format!("{}/{}", self.candidate_prefix, file_name);

        let url = self.storage.presign_put(&key, self.expires_in).await?;
        tracing::info!(key = %key, "Issued upload URL");

        Ok(UploadUrlResponse {
            url,
            key,
            file_name: file_name.to_string(),
        })
    }
}
