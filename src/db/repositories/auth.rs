//! Auth repository
//!
//! Session rows: created at login, read on every authenticated request,
//! deleted at logout. Expired rows are swept by a periodic task.

use crate::db::DbTransaction;
use crate::models::Session;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, Row, SqliteConnection};
use std::sync::Arc;

/// Auth repository trait
#[async_trait]
pub trait AuthRepository: Send + Sync {
    async fn create(&self, tx: &mut DbTransaction, session: &Session) -> Result<Session>;

    async fn get_session_by_id(
        &self,
        tx: &mut DbTransaction,
        session_id: &str,
    ) -> Result<Option<Session>>;

    async fn delete(&self, tx: &mut DbTransaction, session_id: &str) -> Result<()>;

    /// Delete expired sessions, returning how many were removed
    async fn delete_expired(&self, tx: &mut DbTransaction) -> Result<u64>;
}

/// SQLx-based auth repository
#[derive(Debug, Default)]
pub struct SqlxAuthRepository;

impl SqlxAuthRepository {
    pub fn new() -> Self {
        Self
    }

    pub fn boxed() -> Arc<dyn AuthRepository> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl AuthRepository for SqlxAuthRepository {
    async fn create(&self, tx: &mut DbTransaction, session: &Session) -> Result<Session> {
        match tx {
            DbTransaction::Sqlite(tx) => create_session_sqlite(tx, session).await,
            DbTransaction::Postgres(tx) => create_session_postgres(tx, session).await,
        }
    }

    async fn get_session_by_id(
        &self,
        tx: &mut DbTransaction,
        session_id: &str,
    ) -> Result<Option<Session>> {
        match tx {
            DbTransaction::Sqlite(tx) => get_session_by_id_sqlite(tx, session_id).await,
            DbTransaction::Postgres(tx) => get_session_by_id_postgres(tx, session_id).await,
        }
    }

    async fn delete(&self, tx: &mut DbTransaction, session_id: &str) -> Result<()> {
        match tx {
            DbTransaction::Sqlite(tx) => delete_session_sqlite(tx, session_id).await,
            DbTransaction::Postgres(tx) => delete_session_postgres(tx, session_id).await,
        }
    }

    async fn delete_expired(&self, tx: &mut DbTransaction) -> Result<u64> {
        match tx {
            DbTransaction::Sqlite(tx) => delete_expired_sqlite(tx).await,
            DbTransaction::Postgres(tx) => delete_expired_postgres(tx).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_session_sqlite(conn: &mut SqliteConnection, session: &Session) -> Result<Session> {
    sqlx::query(
        r#"
        INSERT INTO sessions (id, user_id, expires_at, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&session.id)
    .bind(session.user_id)
    .bind(session.expires_at)
    .bind(session.created_at)
    .execute(conn)
    .await
    .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_by_id_sqlite(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> Result<Option<Session>> {
    let row = sqlx::query("SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = ?")
        .bind(session_id)
        .fetch_optional(conn)
        .await
        .context("Failed to get session by ID")?;

    Ok(row.map(|row| Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }))
}

async fn delete_session_sqlite(conn: &mut SqliteConnection, session_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(session_id)
        .execute(conn)
        .await
        .context("Failed to delete session")?;
    Ok(())
}

async fn delete_expired_sqlite(conn: &mut SqliteConnection) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
        .bind(Utc::now())
        .execute(conn)
        .await
        .context("Failed to delete expired sessions")?;
    Ok(result.rows_affected())
}

// ============================================================================
// PostgreSQL implementations
// ============================================================================

async fn create_session_postgres(conn: &mut PgConnection, session: &Session) -> Result<Session> {
    sqlx::query(
        r#"
        INSERT INTO sessions (id, user_id, expires_at, created_at)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(&session.id)
    .bind(session.user_id)
    .bind(session.expires_at)
    .bind(session.created_at)
    .execute(conn)
    .await
    .context("Failed to create session")?;

    Ok(session.clone())
}

async fn get_session_by_id_postgres(
    conn: &mut PgConnection,
    session_id: &str,
) -> Result<Option<Session>> {
    let row = sqlx::query("SELECT id, user_id, expires_at, created_at FROM sessions WHERE id = $1")
        .bind(session_id)
        .fetch_optional(conn)
        .await
        .context("Failed to get session by ID")?;

    Ok(row.map(|row| Session {
        id: row.get("id"),
        user_id: row.get("user_id"),
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    }))
}

async fn delete_session_postgres(conn: &mut PgConnection, session_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM sessions WHERE id = $1")
        .bind(session_id)
        .execute(conn)
        .await
        .context("Failed to delete session")?;
    Ok(())
}

async fn delete_expired_postgres(conn: &mut PgConnection) -> Result<u64> {
    let result = sqlx::query("DELETE FROM sessions WHERE expires_at < NOW()")
        .execute(conn)
        .await
        .context("Failed to delete expired sessions")?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{insert_user, setup_pool};
    use crate::models::UserRole;
    use chrono::Duration;

    #[tokio::test]
    async fn test_create_and_get_session() {
        let pool = setup_pool().await;
        let user = insert_user(&pool, "2207411001", UserRole::Student, "pw").await;
        let repo = SqlxAuthRepository::new();

        let mut tx = pool.begin().await.unwrap();
        let session = Session::new(user.id, 3600);
        let created = repo.create(&mut tx, &session).await.unwrap();
        assert_eq!(created.id, session.id);

        let found = repo
            .get_session_by_id(&mut tx, &session.id)
            .await
            .unwrap()
            .expect("Session not found");
        assert_eq!(found.user_id, user.id);
        tx.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_get_session_not_found() {
        let pool = setup_pool().await;
        let repo = SqlxAuthRepository::new();

        let mut tx = pool.begin().await.unwrap();
        let found = repo.get_session_by_id(&mut tx, "missing").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_delete_session() {
        let pool = setup_pool().await;
        let user = insert_user(&pool, "2207411001", UserRole::Student, "pw").await;
        let repo = SqlxAuthRepository::new();

        let mut tx = pool.begin().await.unwrap();
        let session = repo.create(&mut tx, &Session::new(user.id, 3600)).await.unwrap();
        repo.delete(&mut tx, &session.id).await.unwrap();
        assert!(repo.get_session_by_id(&mut tx, &session.id).await.unwrap().is_none());

        // deleting twice is not an error
        repo.delete(&mut tx, &session.id).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_expired_sessions() {
        let pool = setup_pool().await;
        let user = insert_user(&pool, "2207411001", UserRole::Student, "pw").await;
        let repo = SqlxAuthRepository::new();

        let mut tx = pool.begin().await.unwrap();
        let mut expired = Session::new(user.id, 3600);
        expired.expires_at = Utc::now() - Duration::minutes(5);
        let valid = Session::new(user.id, 3600);
        repo.create(&mut tx, &expired).await.unwrap();
        repo.create(&mut tx, &valid).await.unwrap();

        assert_eq!(repo.delete_expired(&mut tx).await.unwrap(), 1);
        assert!(repo.get_session_by_id(&mut tx, &expired.id).await.unwrap().is_none());
        assert!(repo.get_session_by_id(&mut tx, &valid.id).await.unwrap().is_some());
    }
}
