//! Candidate API endpoints
//!
//! Reads need any session, writes need an admin.

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::api::middleware::{ApiError, AppState, PathParam, ServiceResultExt, ValidJson};
use crate::api::responses::{CandidateResponse, WebResponse};
use crate::models::{CreateCandidateInput, UpdateCandidateInput};

#[derive(Debug, Deserialize)]
pub struct ListCandidatesQuery {
    pub period: Option<i32>,
}

/// GET /api/candidates
pub async fn list_candidates(
    State(state): State<AppState>,
    query: Result<Query<ListCandidatesQuery>, QueryRejection>,
) -> Result<Json<WebResponse<Vec<CandidateResponse>>>, ApiError> {
    let Query(query) = query
        .map_err(|_| ApiError::invalid_query("Query parameter 'period' must be an integer"))?;
    let candidates = state
        .candidate_service
        .list(query.period)
        .await
        .or_api("failed to list candidates")?;
    Ok(Json(WebResponse::new("Success get candidates", candidates)))
}

/// GET /api/candidates/{id}
pub async fn get_candidate(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<WebResponse<CandidateResponse>>, ApiError> {
    let candidate = state
        .candidate_service
        .get(id)
        .await
        .or_api("failed to get candidate")?;
    Ok(Json(WebResponse::new("Success get candidate", candidate)))
}

/// POST /api/candidates
pub async fn create_candidate(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<CreateCandidateInput>,
) -> Result<(StatusCode, Json<WebResponse<CandidateResponse>>), ApiError> {
    let candidate = state
        .candidate_service
        .create(body)
        .await
        .or_api("failed to create candidate")?;
    Ok((StatusCode::CREATED, Json(WebResponse::new("Candidate created", candidate))))
}

/// PATCH /api/candidates/{id}
pub async fn update_candidate(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
    ValidJson(body): ValidJson<UpdateCandidateInput>,
) -> Result<Json<WebResponse<CandidateResponse>>, ApiError> {
    let candidate = state
        .candidate_service
        .update(id, body)
        .await
        .or_api("failed to update candidate")?;
    Ok(Json(WebResponse::new("Candidate updated", candidate)))
}

/// DELETE /api/candidates/{id}
pub async fn delete_candidate(
    State(state): State<AppState>,
    PathParam(id): PathParam<i64>,
) -> Result<Json<WebResponse<()>>, ApiError> {
    state
        .candidate_service
        .delete(id)
        .await
        .or_api("failed to delete candidate")?;
    Ok(Json(WebResponse::new("Candidate deleted", ())))
}
