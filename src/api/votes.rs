//! Vote API endpoints
//!
//! - GET /api/votes - Tallies of every candidate (admin)
//! - POST /api/votes - Cast the logged-in student's ballot
//! - GET /api/votes/{candidate_id} - One candidate's tally
//! - GET /api/votes/{candidate_id}/records - Ballots for a candidate (admin)

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::api::middleware::{
    ApiError, AppState, AuthenticatedSession, PathParam, ServiceResultExt, ValidJson,
};
use crate::api::responses::{CastVoteRequest, VoteResponse, VoteTallyResponse, WebResponse};

/// GET /api/votes
pub async fn list_tallies(
    State(state): State<AppState>,
) -> Result<Json<WebResponse<Vec<VoteTallyResponse>>>, ApiError> {
    let tallies = state
        .vote_service
        .get_all_tallies()
        .await
        .or_api("failed to get vote tallies")?;
    Ok(Json(WebResponse::new("Success get vote tallies", tallies)))
}

/// POST /api/votes
pub async fn cast_vote(
    State(state): State<AppState>,
    AuthenticatedSession(session): AuthenticatedSession,
    ValidJson(body): ValidJson<CastVoteRequest>,
) -> Result<(StatusCode, Json<WebResponse<VoteResponse>>), ApiError> {
    let vote = state
        .vote_service
        .cast_vote(session.user_id, body.candidate_id)
        .await
        .or_api("failed to cast vote")?;
    Ok((StatusCode::CREATED, Json(WebResponse::new("Vote recorded", vote))))
}

/// GET /api/votes/{candidate_id}
pub async fn get_tally(
    State(state): State<AppState>,
    PathParam(candidate_id): PathParam<i64>,
) -> Result<Json<WebResponse<VoteTallyResponse>>, ApiError> {
    let tally = state
        .vote_service
        .get_total_votes(candidate_id)
        .await
        .or_api("failed to get total votes")?;
    Ok(Json(WebResponse::new("Success get total votes", tally)))
}

/// GET /api/votes/{candidate_id}/records
pub async fn list_records(
    State(state): State<AppState>,
    PathParam(candidate_id): PathParam<i64>,
) -> Result<Json<WebResponse<Vec<VoteResponse>>>, ApiError> {
    let votes = state
        .vote_service
        .get_votes_by_candidate(candidate_id)
        .await
        .or_api("failed to get vote records")?;
    Ok(Json(WebResponse::new("Success get vote records", votes)))
}
