//! User API endpoints
//!
//! - GET /api/users/current - The logged-in user
//! - GET /api/user/vote-status - Whether the logged-in student may vote and has voted

use axum::{extract::State, Json};

use crate::api::middleware::{ApiError, AppState, AuthenticatedSession, ServiceResultExt};
use crate::api::responses::{LoginResponse, VoteStatusResponse, WebResponse};

/// GET /api/users/current
pub async fn current_user(
    State(state): State<AppState>,
    AuthenticatedSession(session): AuthenticatedSession,
) -> Result<Json<WebResponse<LoginResponse>>, ApiError> {
    let user = state
        .auth_service
        .current_user(session.user_id)
        .await
        .or_api("failed to get current user")?;
    Ok(Json(WebResponse::new("Success get current user", user)))
}

/// GET /api/user/vote-status
pub async fn vote_status(
    State(state): State<AppState>,
    AuthenticatedSession(session): AuthenticatedSession,
) -> Result<Json<WebResponse<VoteStatusResponse>>, ApiError> {
    let status = state
        .vote_service
        .get_vote_status(session.user_id)
        .await
        .or_api("failed to get vote status")?;
    Ok(Json(WebResponse::new("Success get vote status", status)))
}
