//! User repository
//!
//! Users are imported from the student registry; the service only reads
//! them. `create` exists for seeding and tests.

use crate::db::DbTransaction;
use crate::models::{User, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgConnection, Row, SqliteConnection};
use std::str::FromStr;
use std::sync::Arc;

/// User repository trait
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, tx: &mut DbTransaction, user: &User) -> Result<User>;

    async fn get_by_id(&self, tx: &mut DbTransaction, id: i64) -> Result<Option<User>>;

    async fn get_by_nim(&self, tx: &mut DbTransaction, nim: &str) -> Result<Option<User>>;

    /// All users holding `role`, oldest first
    async fn list_by_role(&self, tx: &mut DbTransaction, role: UserRole) -> Result<Vec<User>>;
}

/// SQLx-based user repository
#[derive(Debug, Default)]
pub struct SqlxUserRepository;

impl SqlxUserRepository {
    pub fn new() -> Self {
        Self
    }

    pub fn boxed() -> Arc<dyn UserRepository> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    async fn create(&self, tx: &mut DbTransaction, user: &User) -> Result<User> {
        match tx {
            DbTransaction::Sqlite(tx) => create_user_sqlite(tx, user).await,
            DbTransaction::Postgres(tx) => create_user_postgres(tx, user).await,
        }
    }

    async fn get_by_id(&self, tx: &mut DbTransaction, id: i64) -> Result<Option<User>> {
        match tx {
            DbTransaction::Sqlite(tx) => get_user_by_id_sqlite(tx, id).await,
            DbTransaction::Postgres(tx) => get_user_by_id_postgres(tx, id).await,
        }
    }

    async fn get_by_nim(&self, tx: &mut DbTransaction, nim: &str) -> Result<Option<User>> {
        match tx {
            DbTransaction::Sqlite(tx) => get_user_by_nim_sqlite(tx, nim).await,
            DbTransaction::Postgres(tx) => get_user_by_nim_postgres(tx, nim).await,
        }
    }

    async fn list_by_role(&self, tx: &mut DbTransaction, role: UserRole) -> Result<Vec<User>> {
        match tx {
            DbTransaction::Sqlite(tx) => list_users_by_role_sqlite(tx, role).await,
            DbTransaction::Postgres(tx) => list_users_by_role_postgres(tx, role).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_user_sqlite(conn: &mut SqliteConnection, user: &User) -> Result<User> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (nim, full_name, study_program, role, phone_number, password_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&user.nim)
    .bind(&user.full_name)
    .bind(&user.study_program)
    .bind(user.role.to_string())
    .bind(&user.phone_number)
    .bind(&user.password_hash)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(conn)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id: result.last_insert_rowid(),
        ..user.clone()
    })
}

async fn get_user_by_id_sqlite(conn: &mut SqliteConnection, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, nim, full_name, study_program, role, phone_number, password_hash, created_at, updated_at
        FROM users WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await
    .context("Failed to get user by ID")?;

    row.map(|r| row_to_user_sqlite(&r)).transpose()
}

async fn get_user_by_nim_sqlite(conn: &mut SqliteConnection, nim: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, nim, full_name, study_program, role, phone_number, password_hash, created_at, updated_at
        FROM users WHERE nim = ?
        "#,
    )
    .bind(nim)
    .fetch_optional(conn)
    .await
    .context("Failed to get user by NIM")?;

    row.map(|r| row_to_user_sqlite(&r)).transpose()
}

async fn list_users_by_role_sqlite(
    conn: &mut SqliteConnection,
    role: UserRole,
) -> Result<Vec<User>> {
    let rows = sqlx::query(
        r#"
        SELECT id, nim, full_name, study_program, role, phone_number, password_hash, created_at, updated_at
        FROM users WHERE role = ? ORDER BY id
        "#,
    )
    .bind(role.to_string())
    .fetch_all(conn)
    .await
    .context("Failed to list users by role")?;

    rows.iter().map(row_to_user_sqlite).collect()
}

fn row_to_user_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = UserRole::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    Ok(User {
        id: row.get("id"),
        nim: row.get("nim"),
        full_name: row.get("full_name"),
        study_program: row.get("study_program"),
        role,
        phone_number: row.get("phone_number"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

// ============================================================================
// PostgreSQL implementations
// ============================================================================

async fn create_user_postgres(conn: &mut PgConnection, user: &User) -> Result<User> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO users (nim, full_name, study_program, role, phone_number, password_hash, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id
        "#,
    )
    .bind(&user.nim)
    .bind(&user.full_name)
    .bind(&user.study_program)
    .bind(user.role.to_string())
    .bind(&user.phone_number)
    .bind(&user.password_hash)
    .bind(user.created_at)
    .bind(user.updated_at)
    .fetch_one(conn)
    .await
    .context("Failed to create user")?;

    Ok(User {
        id,
        ..user.clone()
    })
}

async fn get_user_by_id_postgres(conn: &mut PgConnection, id: i64) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, nim, full_name, study_program, role, phone_number, password_hash, created_at, updated_at
        FROM users WHERE id = $1
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await
    .context("Failed to get user by ID")?;

    row.map(|r| row_to_user_postgres(&r)).transpose()
}

async fn get_user_by_nim_postgres(conn: &mut PgConnection, nim: &str) -> Result<Option<User>> {
    let row = sqlx::query(
        r#"
        SELECT id, nim, full_name, study_program, role, phone_number, password_hash, created_at, updated_at
        FROM users WHERE nim = $1
        "#,
    )
    .bind(nim)
    .fetch_optional(conn)
    .await
    .context("Failed to get user by NIM")?;

    row.map(|r| row_to_user_postgres(&r)).transpose()
}

async fn list_users_by_role_postgres(conn: &mut PgConnection, role: UserRole) -> Result<Vec<User>> {
    let rows = sqlx::query(
        r#"
        SELECT id, nim, full_name, study_program, role, phone_number, password_hash, created_at, updated_at
        FROM users WHERE role = $1 ORDER BY id
        "#,
    )
    .bind(role.to_string())
    .fetch_all(conn)
    .await
    .context("Failed to list users by role")?;

    rows.iter().map(row_to_user_postgres).collect()
}

fn row_to_user_postgres(row: &sqlx::postgres::PgRow) -> Result<User> {
    let role_str: String = row.get("role");
    let role = UserRole::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    Ok(User {
        id: row.get("id"),
        nim: row.get("nim"),
        full_name: row.get("full_name"),
        study_program: row.get("study_program"),
        role,
        phone_number: row.get("phone_number"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::setup_pool;

    #[tokio::test]
    async fn test_create_and_get_user() {
        let pool = setup_pool().await;
        let repo = SqlxUserRepository::new();

        let mut tx = pool.begin().await.unwrap();
        let mut user = User::new("2207411001", "Budi Santoso", "Teknik Informatika", UserRole::Student, "hash");
        user.phone_number = "081234567890".into();
        let created = repo.create(&mut tx, &user).await.expect("Failed to create user");
        assert!(created.id > 0);

        let by_id = repo.get_by_id(&mut tx, created.id).await.unwrap().expect("User not found");
        assert_eq!(by_id.nim, "2207411001");
        assert_eq!(by_id.role, UserRole::Student);
        assert_eq!(by_id.phone_number, "081234567890");

        let by_nim = repo.get_by_nim(&mut tx, "2207411001").await.unwrap().expect("User not found");
        assert_eq!(by_nim.id, created.id);
        assert_eq!(by_nim.full_name, "Budi Santoso");
    }

    #[tokio::test]
    async fn test_get_user_not_found() {
        let pool = setup_pool().await;
        let repo = SqlxUserRepository::new();

        let mut tx = pool.begin().await.unwrap();
        assert!(repo.get_by_id(&mut tx, 999).await.unwrap().is_none());
        assert!(repo.get_by_nim(&mut tx, "0000").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_nim_rejected() {
        let pool = setup_pool().await;
        let repo = SqlxUserRepository::new();

        let mut tx = pool.begin().await.unwrap();
        let user = User::new("2207411001", "A", "TI", UserRole::Student, "hash");
        repo.create(&mut tx, &user).await.unwrap();
        assert!(repo.create(&mut tx, &user).await.is_err());
    }

    #[tokio::test]
    async fn test_list_by_role() {
        let pool = setup_pool().await;
        let repo = SqlxUserRepository::new();

        let mut tx = pool.begin().await.unwrap();
        for (nim, role) in [
            ("1", UserRole::Student),
            ("2", UserRole::Admin),
            ("3", UserRole::Student),
        ] {
            repo.create(&mut tx, &User::new(nim, "N", "P", role, "hash"))
                .await
                .unwrap();
        }

        let students = repo.list_by_role(&mut tx, UserRole::Student).await.unwrap();
        let nims: Vec<_> = students.iter().map(|u| u.nim.as_str()).collect();
        assert_eq!(nims, vec!["1", "3"]);

        let admins = repo.list_by_role(&mut tx, UserRole::Admin).await.unwrap();
        assert_eq!(admins.len(), 1);
        assert!(admins[0].is_admin());
    }
}
