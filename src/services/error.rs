//! Service error types
//!
//! Services fail in one of two ways: a typed application error whose
//! status, message and details are safe to show the client, or an
//! internal error that is logged and replaced by a generic 500.

use axum::http::StatusCode;

/// An error the client is allowed to see verbatim
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}: {details}")]
pub struct AppError {
    pub status: StatusCode,
    pub message: String,
    pub details: String,
}

impl AppError {
    pub fn new(status: StatusCode, message: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            details: details.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, details)
    }

    pub fn invalid_credentials() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "Invalid credentials",
            "NIM or password is incorrect",
        )
    }

    pub fn unauthorized() -> Self {
        Self::new(
            StatusCode::UNAUTHORIZED,
            "Unauthorized",
            "Session is missing or has expired",
        )
    }

    pub fn forbidden(details: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "Forbidden", details)
    }

    pub fn not_found(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message, details)
    }

    pub fn conflict(message: impl Into<String>, details: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message, details)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    App(#[from] AppError),

    #[error("Internal error: {0:#}")]
    Internal(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_app_error_constructors() {
        let err = AppError::unauthorized();
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.message, "Unauthorized");

        let err = AppError::forbidden("Admins only");
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert_eq!(err.to_string(), "Forbidden: Admins only");
    }

    #[test]
    fn test_question_mark_conversions() {
        fn app() -> ServiceResult<()> {
            let checked: Result<(), AppError> = Err(AppError::conflict("Already voted", "x"));
            checked?;
            Ok(())
        }
        fn internal() -> ServiceResult<()> {
            Err(std::io::Error::other("disk")).context("Failed to write")?;
            Ok(())
        }

        assert!(matches!(app(), Err(ServiceError::App(e)) if e.status == StatusCode::CONFLICT));
        match internal() {
            Err(ServiceError::Internal(e)) => assert!(format!("{:#}", e).contains("disk")),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
