//! API middleware
//!
//! Contains:
//! - Shared application state
//! - The wire error type
//! - Body and path extractors that reject with the error envelope
//! - Session validation (any role, student only, admin only)

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRef, FromRequest, FromRequestParts, Path, Request, State,
    },
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::api::responses::{SessionResponse, WebFailedResponse};
use crate::config::SessionConfig;
use crate::db::DynDatabasePool;
use crate::services::{
    AuthService, CandidateService, DownloadService, ServiceError, ServiceResult, UploadService,
    VoteService, VotingAccessService,
};

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub pool: DynDatabasePool,
    pub auth_service: Arc<dyn AuthService>,
    pub vote_service: Arc<dyn VoteService>,
    pub voting_access_service: Arc<dyn VotingAccessService>,
    pub candidate_service: Arc<dyn CandidateService>,
    pub download_service: Arc<dyn DownloadService>,
    pub upload_service: Arc<dyn UploadService>,
    pub session: Arc<SessionConfig>,
}

impl FromRef<AppState> for Arc<dyn DownloadService> {
    fn from_ref(state: &AppState) -> Self {
        state.download_service.clone()
    }
}

/// Session validated by one of the session middlewares
#[derive(Debug, Clone)]
pub struct AuthenticatedSession(pub SessionResponse);

impl<S> FromRequestParts<S> for AuthenticatedSession
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedSession>()
            .cloned()
            .ok_or_else(|| {
                ApiError::new(
                    StatusCode::UNAUTHORIZED,
                    "Unauthorized",
                    "Session is missing or has expired",
                )
            })
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Error response: `{"error": {"message": .., "details": ..}}`
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: WebFailedResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            status,
            error: WebFailedResponse {
                message: message.into(),
                details: details.into(),
            },
        }
    }

    pub fn invalid_query(details: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "Invalid request query parameters",
            details,
        )
    }

    pub fn invalid_body(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected request body");
        let details = match rejection {
            JsonRejection::JsonDataError(_) => "Request body has missing or mistyped fields",
            JsonRejection::JsonSyntaxError(_) => "Request body is not valid JSON",
            JsonRejection::MissingJsonContentType(_) => {
                "Expected request with `Content-Type: application/json`"
            }
            _ => "Request body could not be read",
        };
        Self::new(StatusCode::BAD_REQUEST, "Invalid request body", details)
    }

    pub fn invalid_path(rejection: PathRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected path parameter");
        Self::new(
            StatusCode::BAD_REQUEST,
            "Invalid path parameter",
            "Path parameter is missing or malformed",
        )
    }

    pub fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error",
            "Internal Server Error. Please try again later.",
        )
    }

    /// Map a service failure to the wire. Application errors pass through,
    /// anything else becomes an opaque 500.
    pub fn from_service(err: ServiceError, context: &str) -> Self {
        match err {
            ServiceError::App(e) => {
                tracing::warn!(status = e.status.as_u16(), details = %e.details, "{}: {}", context, e.message);
                Self::new(e.status, e.message, e.details)
            }
            ServiceError::Internal(e) => {
                tracing::error!(context, error = %format!("{:#}", e), "unexpected error");
                Self::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self)).into_response()
    }
}

/// Attach a log context to a service result
pub trait ServiceResultExt<T> {
    fn or_api(self, context: &str) -> Result<T, ApiError>;
}

impl<T> ServiceResultExt<T> for ServiceResult<T> {
    fn or_api(self, context: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::from_service(e, context))
    }
}

// ============================================================================
// Extractors
// ============================================================================

/// `Json<T>` whose rejection is an `ApiError`
#[derive(Debug)]
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        Json::<T>::from_request(request, state)
            .await
            .map(|Json(value)| Self(value))
            .map_err(ApiError::invalid_body)
    }
}

/// `Path<T>` whose rejection is an `ApiError`
#[derive(Debug)]
pub struct PathParam<T>(pub T);

impl<S, T> FromRequestParts<S> for PathParam<T>
where
    Path<T>: FromRequestParts<S, Rejection = PathRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        Path::<T>::from_request_parts(parts, state)
            .await
            .map(|Path(value)| Self(value))
            .map_err(ApiError::invalid_path)
    }
}

// ============================================================================
// Sessions
// ============================================================================

/// Session id from the `Authorization: Bearer` header, else the session cookie
pub fn extract_session_token(request: &Request, cookie_name: &str) -> Option<String> {
    if let Some(auth_header) = request.headers().get(header::AUTHORIZATION) {
        if let Ok(auth_str) = auth_header.to_str() {
            if let Some(token) = auth_str.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
        }
    }

    let prefix = format!("{}=", cookie_name);
    request
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .find_map(|cookie| cookie.trim().strip_prefix(prefix.as_str()))
        .filter(|token| !token.is_empty())
        .map(String::from)
}

#[derive(Debug, Clone, Copy)]
enum Audience {
    Any,
    Voter,
    Admin,
}

async fn authenticate(
    state: AppState,
    mut request: Request,
    next: Next,
    audience: Audience,
) -> Result<Response, ApiError> {
    let token = extract_session_token(&request, &state.session.cookie_name).ok_or_else(|| {
        ApiError::new(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "Missing session",
        )
    })?;

    let auth = &state.auth_service;
    let session = match audience {
        Audience::Any => auth.validate_session(&token).await,
        Audience::Voter => auth.user_validate_session(&token).await,
        Audience::Admin => auth.admin_validate_session(&token).await,
    }
    .or_api("failed to validate session")?;

    request.extensions_mut().insert(AuthenticatedSession(session));
    Ok(next.run(request).await)
}

/// Any logged-in user
pub async fn require_session(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authenticate(state, request, next, Audience::Any).await
}

/// Students only
pub async fn require_voter(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authenticate(state, request, next, Audience::Voter).await
}

/// Admins only
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    authenticate(state, request, next, Audience::Admin).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::AppError;
    use axum::{body::Body, http::Request};

    fn create_request_with_auth(token: &str) -> Request<Body> {
        Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    }

    fn create_request_with_cookie(cookie: &str) -> Request<Body> {
        Request::builder()
            .uri("/test")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    #[test]
    fn test_extract_session_token_from_bearer() {
        let request = create_request_with_auth("test-token-123");
        assert_eq!(
            extract_session_token(&request, "session_id"),
            Some("test-token-123".to_string())
        );
    }

    #[test]
    fn test_extract_session_token_from_cookie() {
        let request = create_request_with_cookie("theme=dark; session_id=test-token-456");
        assert_eq!(
            extract_session_token(&request, "session_id"),
            Some("test-token-456".to_string())
        );
    }

    #[test]
    fn test_extract_session_token_bearer_priority() {
        let request = Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, "Bearer bearer-token")
            .header(header::COOKIE, "session_id=cookie-token")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            extract_session_token(&request, "session_id"),
            Some("bearer-token".to_string())
        );
    }

    #[test]
    fn test_extract_session_token_none() {
        let request = Request::builder().uri("/test").body(Body::empty()).unwrap();
        assert!(extract_session_token(&request, "session_id").is_none());

        let request = create_request_with_cookie("other_session_id=x; session_id=");
        assert!(extract_session_token(&request, "session_id").is_none());
    }

    #[test]
    fn test_extract_session_token_invalid_bearer() {
        let request = Request::builder()
            .uri("/test")
            .header(header::AUTHORIZATION, "Basic invalid")
            .body(Body::empty())
            .unwrap();
        assert!(extract_session_token(&request, "session_id").is_none());
    }

    #[test]
    fn test_app_error_passes_through() {
        let err = ApiError::from_service(AppError::forbidden("Admins only").into(), "test");
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.error.message, "Forbidden");
        assert_eq!(err.error.details, "Admins only");
    }

    #[test]
    fn test_internal_error_is_opaque() {
        let internal = anyhow::anyhow!("connection refused").context("Failed to query votes");
        let err = ApiError::from_service(ServiceError::Internal(internal), "test");
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);

        let body = serde_json::to_string(&err).unwrap();
        assert_eq!(
            body,
            r#"{"error":{"message":"Internal Server Error","details":"Internal Server Error. Please try again later."}}"#
        );
    }
}
