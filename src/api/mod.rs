//! API layer - HTTP handlers and routing
//!
//! All endpoints live under `/api`:
//! - Auth: login and logout
//! - Users: current user and vote status
//! - Votes: casting ballots and tallies
//! - Candidates
//! - Voting access (admin)
//! - Object storage presigned URLs (admin)
//! - Live tallies over WebSocket (admin)

pub mod auth;
pub mod candidates;
pub mod download;
pub mod middleware;
pub mod responses;
pub mod upload;
pub mod users;
pub mod voting_access;
pub mod votes;
pub mod ws;

use anyhow::Context;
use axum::{
    extract::State,
    http::{header, HeaderValue, Method, StatusCode},
    middleware as axum_middleware,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedSession};

/// Build the `/api` router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Admin routes
    let admin_routes = Router::new()
        .route("/votes", get(votes::list_tallies))
        .route("/votes/{candidate_id}/records", get(votes::list_records))
        .route("/candidates", post(candidates::create_candidate))
        .route(
            "/candidates/{id}",
            axum::routing::patch(candidates::update_candidate)
                .delete(candidates::delete_candidate),
        )
        .route("/upload/candidates/presigned-url", get(upload::candidate_upload_url))
        .route("/download/logs/vote", get(download::download_vote_log))
        .route("/voting-access", post(voting_access::create_access))
        .route("/voting-access/provision", post(voting_access::provision_all))
        .route(
            "/voting-access/{user_id}",
            get(voting_access::get_access)
                .patch(voting_access::update_access)
                .delete(voting_access::delete_access),
        )
        .route("/ws/votes", get(ws::live_votes))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_admin,
        ));

    // Student routes
    let voter_routes = Router::new()
        .route("/votes", post(votes::cast_vote))
        .route("/user/vote-status", get(users::vote_status))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_voter,
        ));

    // Any logged-in user
    let session_routes = Router::new()
        .route("/auth/logout", post(auth::logout))
        .route("/users/current", get(users::current_user))
        .route("/votes/{candidate_id}", get(votes::get_tally))
        .route("/candidates", get(candidates::list_candidates))
        .route("/candidates/{id}", get(candidates::get_candidate))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_session,
        ));

    // Public routes
    Router::new()
        .route("/auth/login", post(auth::login))
        .route("/health", get(health))
        .merge(admin_routes)
        .merge(voter_routes)
        .merge(session_routes)
}

/// GET /api/health
async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.pool.ping().await.map_err(|e| {
        tracing::error!(error = %format!("{:#}", e), "Health check failed");
        ApiError::new(
            StatusCode::SERVICE_UNAVAILABLE,
            "Service Unavailable",
            "Database is unreachable",
        )
    })?;
    Ok(Json(json!({"message": "OK", "data": {"status": "ok"}})))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> anyhow::Result<Router> {
    // The frontend authenticates with the session cookie, so credentials are allowed
    let origin = cors_origin
        .parse::<HeaderValue>()
        .with_context(|| format!("Invalid CORS origin: {}", cors_origin))?;
    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
        .allow_credentials(true);

    Ok(Router::new()
        .nest("/api", build_api_router(state.clone()))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state))
}
