//! Voting access API endpoints (admin)

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};

use crate::api::middleware::{ApiError, AppState, PathParam, ServiceResultExt, ValidJson};
use crate::api::responses::{
    CreateVotingAccessRequest, ProvisionResponse, UpdateVotingAccessRequest,
    VotingAccessResponse, WebResponse,
};

/// POST /api/voting-access
pub async fn create_access(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<CreateVotingAccessRequest>,
) -> Result<(StatusCode, Json<WebResponse<VotingAccessResponse>>), ApiError> {
    let access = state
        .voting_access_service
        .create(body.user_id, body.can_vote)
        .await
        .or_api("failed to create voting access")?;
    Ok((StatusCode::CREATED, Json(WebResponse::new("Voting access created", access))))
}

/// POST /api/voting-access/provision
pub async fn provision_all(
    State(state): State<AppState>,
) -> Result<Json<WebResponse<ProvisionResponse>>, ApiError> {
    let created = state
        .voting_access_service
        .provision_all()
        .await
        .or_api("failed to provision voting access")?;
    Ok(Json(WebResponse::new(
        "Voting access provisioned",
        ProvisionResponse { created },
    )))
}

/// GET /api/voting-access/{user_id}
pub async fn get_access(
    State(state): State<AppState>,
    PathParam(user_id): PathParam<i64>,
) -> Result<Json<WebResponse<VotingAccessResponse>>, ApiError> {
    let access = state
        .voting_access_service
        .get_by_user_id(user_id)
        .await
        .or_api("failed to get voting access")?;
    Ok(Json(WebResponse::new("Success get voting access", access)))
}

/// PATCH /api/voting-access/{user_id}
pub async fn update_access(
    State(state): State<AppState>,
    PathParam(user_id): PathParam<i64>,
    ValidJson(body): ValidJson<UpdateVotingAccessRequest>,
) -> Result<Json<WebResponse<VotingAccessResponse>>, ApiError> {
    let access = state
        .voting_access_service
        .update(user_id, body.can_vote)
        .await
        .or_api("failed to update voting access")?;
    Ok(Json(WebResponse::new("Voting access updated", access)))
}

/// DELETE /api/voting-access/{user_id}
pub async fn delete_access(
    State(state): State<AppState>,
    PathParam(user_id): PathParam<i64>,
) -> Result<Json<WebResponse<()>>, ApiError> {
    state
        .voting_access_service
        .delete_by_user_id(user_id)
        .await
        .or_api("failed to delete voting access")?;
    Ok(Json(WebResponse::new("Voting access deleted", ())))
}
