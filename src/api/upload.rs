//! Upload API endpoints
//!
//! - GET /api/upload/candidates/presigned-url?filename=<name> - Presigned PUT URL for a candidate photo (admin)

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, ServiceResultExt};
use crate::api::responses::{UploadUrlResponse, WebResponse};

#[derive(Debug, Deserialize)]
pub struct FilenameQuery {
    pub filename: Option<String>,
}

impl FilenameQuery {
    /// The `filename` parameter, present and non-empty. Its value is passed on untouched.
    pub fn required(query: Result<Query<Self>, QueryRejection>) -> Result<String, ApiError> {
        query
            .ok()
            .and_then(|Query(q)| q.filename)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ApiError::invalid_query("Query parameter 'filename' is required"))
    }
}

/// GET /api/upload/candidates/presigned-url
pub async fn candidate_upload_url(
    State(state): State<AppState>,
    query: Result<Query<FilenameQuery>, QueryRejection>,
) -> Result<Json<WebResponse<UploadUrlResponse>>, ApiError> {
    let filename = FilenameQuery::required(query)?;
    let upload = state
        .upload_service
        .create_upload_url(&filename)
        .await
        .or_api("failed to get upload presigned URL")?;
    Ok(Json(WebResponse::new("Success get upload URL", upload)))
}
