//! Auth service
//!
//! Students log in with NIM and password, admins with password alone.
//! A successful login stores a server-side session whose id becomes the
//! cookie value; every authenticated request validates it again.

use async_trait::async_trait;
use std::sync::Arc;

use super::error::{AppError, ServiceResult};
use super::dto::{to_login_response, LoginRequest, LoginResponse, SessionResponse};
use crate::crypto::verify_password;
use crate::db::repositories::{AuthRepository, UserRepository};
use crate::db::{DbTransaction, DynDatabasePool};
use crate::models::{Session, User, UserRole};

#[async_trait]
pub trait AuthService: Send + Sync {
    /// Log a student in. Returns the user and the new session id.
    async fn login_user(
        &self,
        max_age: i64,
        request: LoginRequest,
    ) -> ServiceResult<(LoginResponse, String)>;

    /// Log an admin in by password. When a NIM is supplied only that
    /// admin is tried, otherwise the first admin whose password matches.
    async fn login_admin(
        &self,
        max_age: i64,
        request: LoginRequest,
    ) -> ServiceResult<(LoginResponse, String)>;

    /// Delete the session. Unknown ids are ignored.
    async fn logout(&self, session_id: &str) -> ServiceResult<()>;

    /// Validate a session belonging to any role
    async fn validate_session(&self, session_id: &str) -> ServiceResult<SessionResponse>;

    async fn user_validate_session(&self, session_id: &str) -> ServiceResult<SessionResponse>;

    async fn admin_validate_session(&self, session_id: &str) -> ServiceResult<SessionResponse>;

    async fn current_user(&self, user_id: i64) -> ServiceResult<LoginResponse>;
}

pub struct AuthServiceImpl {
    pool: DynDatabasePool,
    auth_repo: Arc<dyn AuthRepository>,
    user_repo: Arc<dyn UserRepository>,
}

impl AuthServiceImpl {
    pub fn new(
        pool: DynDatabasePool,
        auth_repo: Arc<dyn AuthRepository>,
        user_repo: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            pool,
            auth_repo,
            user_repo,
        }
    }

    async fn start_session(
        &self,
        mut tx: DbTransaction,
        user: &User,
        max_age: i64,
    ) -> ServiceResult<(LoginResponse, String)> {
        let session = self
            .auth_repo
            .create(&mut tx, &Session::new(user.id, max_age))
            .await?;
        tx.commit().await?;

        tracing::info!(user_id = user.id, role = %user.role, "User logged in");
        Ok((to_login_response(user), session.id))
    }

    async fn validate(
        &self,
        session_id: &str,
        role: Option<UserRole>,
    ) -> ServiceResult<SessionResponse> {
        let mut tx = self.pool.begin().await?;

        let session = self
            .auth_repo
            .get_session_by_id(&mut tx, session_id)
            .await?
            .filter(|s| !s.is_expired())
            .ok_or_else(AppError::unauthorized)?;

        let user = self
            .user_repo
            .get_by_id(&mut tx, session.user_id)
            .await?
            .ok_or_else(AppError::unauthorized)?;
        tx.commit().await?;

        if let Some(required) = role {
            if user.role != required {
                let details = format!("This resource requires the {} role", required);
                return Err(AppError::forbidden(details).into());
            }
        }

        Ok(SessionResponse {
            session_id: session.id,
            user_id: user.id,
            role: user.role,
            expires_at: session.expires_at,
        })
    }
}

#[async_trait]
impl AuthService for AuthServiceImpl {
    async fn login_user(
        &self,
        max_age: i64,
        request: LoginRequest,
    ) -> ServiceResult<(LoginResponse, String)> {
        let nim = request
            .nim
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or_else(AppError::invalid_credentials)?;

        let mut tx = self.pool.begin().await?;
        let user = self
            .user_repo
            .get_by_nim(&mut tx, nim)
            .await?
            .ok_or_else(AppError::invalid_credentials)?;

        if !verify_password(&request.password, &user.password_hash)? {
            tracing::warn!(user_id = user.id, "Failed student login");
            return Err(AppError::invalid_credentials().into());
        }
        if user.role != UserRole::Student {
            return Err(AppError::forbidden("Admins must use the admin login").into());
        }

        self.start_session(tx, &user, max_age).await
    }

    async fn login_admin(
        &self,
        max_age: i64,
        request: LoginRequest,
    ) -> ServiceResult<(LoginResponse, String)> {
        let nim = request.nim.as_deref().map(str::trim).filter(|n| !n.is_empty());

        let mut tx = self.pool.begin().await?;
        let admins = self.user_repo.list_by_role(&mut tx, UserRole::Admin).await?;

        let mut matched = None;
        for admin in admins {
            if nim.is_some_and(|nim| nim != admin.nim) {
                continue;
            }
            if verify_password(&request.password, &admin.password_hash)? {
                matched = Some(admin);
                break;
            }
        }

        let Some(admin) = matched else {
            tracing::warn!("Failed admin login");
            return Err(AppError::invalid_credentials().into());
        };

        self.start_session(tx, &admin, max_age).await
    }

    async fn logout(&self, session_id: &str) -> ServiceResult<()> {
        let mut tx = self.pool.begin().await?;
        self.auth_repo.delete(&mut tx, session_id).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn validate_session(&self, session_id: &str) -> ServiceResult<SessionResponse> {
        self.validate(session_id, None).await
    }

    async fn user_validate_session(&self, session_id: &str) -> ServiceResult<SessionResponse> {
        self.validate(session_id, Some(UserRole::Student)).await
    }

    async fn admin_validate_session(&self, session_id: &str) -> ServiceResult<SessionResponse> {
        self.validate(session_id, Some(UserRole::Admin)).await
    }

    async fn current_user(&self, user_id: i64) -> ServiceResult<LoginResponse> {
        let mut tx = self.pool.begin().await?;
        let user = self
            .user_repo
            .get_by_id(&mut tx, user_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found("User not found", format!("No user with id {}", user_id))
            })?;
        tx.commit().await?;
        Ok(to_login_response(&user))
    }
}

/// Remove expired sessions, returning how many were deleted
pub async fn purge_expired_sessions(
    pool: &DynDatabasePool,
    auth_repo: &Arc<dyn AuthRepository>,
) -> anyhow::Result<u64> {
    let mut tx = pool.begin().await?;
    let removed = auth_repo.delete_expired(&mut tx).await?;
    tx.commit().await?;
    if removed > 0 {
        tracing::debug!(removed, "Purged expired sessions");
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxAuthRepository, SqlxUserRepository};
    use crate::db::testing::{insert_user, setup_pool};
    use crate::services::ServiceError;
    use axum::http::StatusCode;

    async fn setup() -> (DynDatabasePool, AuthServiceImpl) {
        let pool = setup_pool().await;
        let service = AuthServiceImpl::new(
            pool.clone(),
            SqlxAuthRepository::boxed(),
            SqlxUserRepository::boxed(),
        );
        (pool, service)
    }

    fn login(nim: Option<&str>, password: &str) -> LoginRequest {
        LoginRequest {
            nim: nim.map(String::from),
            password: password.to_string(),
        }
    }

    fn status_of<T: std::fmt::Debug>(result: ServiceResult<T>) -> StatusCode {
        match result {
            Err(ServiceError::App(e)) => e.status,
            other => panic!("expected app error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_student_login_and_validate() {
        let (pool, service) = setup().await;
        insert_user(&pool, "2207411001", UserRole::Student, "rahasia").await;

        let (user, session_id) = service
            .login_user(3600, login(Some(" 2207411001 "), "rahasia"))
            .await
            .expect("Login should succeed");
        assert_eq!(user.nim, "2207411001");
        assert_eq!(session_id.len(), 32);

        let session = service.user_validate_session(&session_id).await.unwrap();
        assert_eq!(session.user_id, user.id);
        assert_eq!(session.role, UserRole::Student);

        assert_eq!(
            status_of(service.admin_validate_session(&session_id).await),
            StatusCode::FORBIDDEN
        );
        assert!(service.validate_session(&session_id).await.is_ok());
    }

    #[tokio::test]
    async fn test_student_login_rejects_bad_credentials() {
        let (pool, service) = setup().await;
        insert_user(&pool, "2207411001", UserRole::Student, "rahasia").await;

        for request in [
            login(Some("2207411001"), "salah"),
            login(Some("9999"), "rahasia"),
            login(None, "rahasia"),
            login(Some("   "), "rahasia"),
        ] {
            let err = service.login_user(3600, request).await;
            assert_eq!(status_of(err), StatusCode::UNAUTHORIZED);
        }
    }

    #[tokio::test]
    async fn test_admin_cannot_use_student_login() {
        let (pool, service) = setup().await;
        insert_user(&pool, "admin01", UserRole::Admin, "admin-pw").await;

        let err = service.login_user(3600, login(Some("admin01"), "admin-pw")).await;
        assert_eq!(status_of(err), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_login_by_password() {
        let (pool, service) = setup().await;
        insert_user(&pool, "admin01", UserRole::Admin, "first").await;
        insert_user(&pool, "admin02", UserRole::Admin, "second").await;
        insert_user(&pool, "2207411001", UserRole::Student, "second").await;

        let (admin, session_id) = service.login_admin(3600, login(None, "second")).await.unwrap();
        assert_eq!(admin.nim, "admin02");
        let session = service.admin_validate_session(&session_id).await.unwrap();
        assert_eq!(session.role, UserRole::Admin);

        let err = service.login_admin(3600, login(Some("admin01"), "second")).await;
        assert_eq!(status_of(err), StatusCode::UNAUTHORIZED);

        let err = service.login_admin(3600, login(None, "nope")).await;
        assert_eq!(status_of(err), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_expired_or_unknown_session_is_unauthorized() {
        let (pool, service) = setup().await;
        insert_user(&pool, "2207411001", UserRole::Student, "rahasia").await;

        let (_, session_id) = service
            .login_user(-1, login(Some("2207411001"), "rahasia"))
            .await
            .unwrap();
        assert_eq!(
            status_of(service.user_validate_session(&session_id).await),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_of(service.user_validate_session("missing").await),
            StatusCode::UNAUTHORIZED
        );

        let auth_repo = SqlxAuthRepository::boxed();
        assert_eq!(purge_expired_sessions(&pool, &auth_repo).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_logout_deletes_session() {
        let (pool, service) = setup().await;
        insert_user(&pool, "2207411001", UserRole::Student, "rahasia").await;

        let (_, session_id) = service
            .login_user(3600, login(Some("2207411001"), "rahasia"))
            .await
            .unwrap();
        service.logout(&session_id).await.unwrap();
        assert_eq!(
            status_of(service.user_validate_session(&session_id).await),
            StatusCode::UNAUTHORIZED
        );

        service.logout("never-existed").await.expect("Logout is idempotent");
    }

    #[tokio::test]
    async fn test_current_user() {
        let (pool, service) = setup().await;
        let user = insert_user(&pool, "2207411001", UserRole::Student, "rahasia").await;

        let current = service.current_user(user.id).await.unwrap();
        assert_eq!(current.full_name, user.full_name);
        assert_eq!(status_of(service.current_user(404).await), StatusCode::NOT_FOUND);
    }
}
