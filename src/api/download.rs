//! Download API endpoints
//!
//! - GET /api/download/logs/vote?filename=<name> - Presigned GET URL for a vote log (admin)

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use std::sync::Arc;

use crate::api::middleware::{ApiError, ServiceResultExt};
use crate::api::responses::{PresignedUrlResponse, WebResponse};
use crate::api::upload::FilenameQuery;
use crate::services::DownloadService;

/// GET /api/download/logs/vote
pub async fn download_vote_log(
    State(service): State<Arc<dyn DownloadService>>,
    query: Result<Query<FilenameQuery>, QueryRejection>,
) -> Result<Json<WebResponse<PresignedUrlResponse>>, ApiError> {
    let filename = FilenameQuery::required(query)?;
    let presigned = service
        .create_presigned_url(&filename)
        .await
        .or_api("failed to get download presigned URL")?;
    Ok(Json(WebResponse::new("Success download log file", presigned)))
}
