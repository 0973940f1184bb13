//! Authentication API endpoints
//!
//! - POST /api/auth/login - Student login when `nim` is given, admin login otherwise
//! - POST /api/auth/logout - Delete the session and clear the cookie

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
    Json,
};

use crate::api::middleware::{
    ApiError, AppState, AuthenticatedSession, ServiceResultExt, ValidJson,
};
use crate::api::responses::{LoginRequest, LoginResponse, WebResponse};
use crate::config::SessionConfig;

/// `Set-Cookie` value carrying the session id
pub fn session_cookie(config: &SessionConfig, value: &str, max_age: i64) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite={}; Max-Age={}",
        config.cookie_name, value, config.same_site, max_age
    );
    if config.secure {
        cookie.push_str("; Secure");
    }
    cookie
}

fn cookie_header(cookie: &str) -> Result<HeaderMap, ApiError> {
    let value = HeaderValue::from_str(cookie).map_err(|e| {
        tracing::error!(error = %e, "Session cookie is not a valid header value");
        ApiError::internal()
    })?;
    let mut headers = HeaderMap::new();
    headers.insert(header::SET_COOKIE, value);
    Ok(headers)
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let max_age = state.session.max_age_secs;
    let is_student = body.nim.as_deref().is_some_and(|n| !n.trim().is_empty());

    let (user, session_id) = if is_student {
        state.auth_service.login_user(max_age, body).await
    } else {
        state.auth_service.login_admin(max_age, body).await
    }
    .or_api("failed to log in")?;

    let headers = cookie_header(&session_cookie(&state.session, &session_id, max_age))?;
    Ok((headers, Json(WebResponse::<LoginResponse>::new("Login success", user))))
}

/// POST /api/auth/logout
pub async fn logout(
    State(state): State<AppState>,
    AuthenticatedSession(session): AuthenticatedSession,
) -> Result<impl IntoResponse, ApiError> {
    state
        .auth_service
        .logout(&session.session_id)
        .await
        .or_api("failed to log out")?;

    let headers = cookie_header(&session_cookie(&state.session, "", 0))?;
    Ok((headers, Json(WebResponse::new("Logout success", ()))))
}
