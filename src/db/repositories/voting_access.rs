//! Voting access repository
//!
//! One row per provisioned voter and period. `can_vote` gates eligibility
//! in that period, `has_voted` is flipped in the same transaction that
//! stores the ballot. Every lookup is scoped to a period, so a row left
//! over from an earlier election never grants or blocks a vote.

use crate::db::DbTransaction;
use crate::models::VotingAccess;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, Postgres, QueryBuilder, Row, Sqlite, SqliteConnection};
use std::sync::Arc;

/// Rows per INSERT in `create_bulk`, well below the SQLite bind limit
const BULK_CHUNK_SIZE: usize = 500;

/// Voting access repository trait
#[async_trait]
pub trait VotingAccessRepository: Send + Sync {
    async fn create(&self, tx: &mut DbTransaction, access: &VotingAccess) -> Result<VotingAccess>;

    /// Persist `can_vote` and `has_voted` of the access's (user, period) row
    async fn update(&self, tx: &mut DbTransaction, access: &VotingAccess) -> Result<VotingAccess>;

    async fn get_by_user_id(
        &self,
        tx: &mut DbTransaction,
        user_id: i64,
        period: i32,
    ) -> Result<Option<VotingAccess>>;

    /// Whether the user's row for `period` is marked voted
    async fn is_user_ever_voted(
        &self,
        tx: &mut DbTransaction,
        user_id: i64,
        period: i32,
    ) -> Result<bool>;

    /// Returns false when the user had no access row for `period`
    async fn delete_by_user_id(
        &self,
        tx: &mut DbTransaction,
        user_id: i64,
        period: i32,
    ) -> Result<bool>;

    /// Insert many rows, skipping users that already have one in the same period.
    /// Returns the number of rows actually inserted.
    async fn create_bulk(&self, tx: &mut DbTransaction, accesses: &[VotingAccess]) -> Result<u64>;
}

/// SQLx-based voting access repository
#[derive(Debug, Default)]
pub struct SqlxVotingAccessRepository;

impl SqlxVotingAccessRepository {
    pub fn new() -> Self {
        Self
    }

    pub fn boxed() -> Arc<dyn VotingAccessRepository> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl VotingAccessRepository for SqlxVotingAccessRepository {
    async fn create(&self, tx: &mut DbTransaction, access: &VotingAccess) -> Result<VotingAccess> {
        match tx {
            DbTransaction::Sqlite(tx) => create_access_sqlite(tx, access).await,
            DbTransaction::Postgres(tx) => create_access_postgres(tx, access).await,
        }
    }

    async fn update(&self, tx: &mut DbTransaction, access: &VotingAccess) -> Result<VotingAccess> {
        match tx {
            DbTransaction::Sqlite(tx) => update_access_sqlite(tx, access).await,
            DbTransaction::Postgres(tx) => update_access_postgres(tx, access).await,
        }
    }

    async fn get_by_user_id(
        &self,
        tx: &mut DbTransaction,
        user_id: i64,
        period: i32,
    ) -> Result<Option<VotingAccess>> {
        match tx {
            DbTransaction::Sqlite(tx) => get_access_sqlite(tx, user_id, period).await,
            DbTransaction::Postgres(tx) => get_access_postgres(tx, user_id, period).await,
        }
    }

    async fn is_user_ever_voted(
        &self,
        tx: &mut DbTransaction,
        user_id: i64,
        period: i32,
    ) -> Result<bool> {
        let count = match tx {
            DbTransaction::Sqlite(tx) => count_voted_sqlite(tx, user_id, period).await?,
            DbTransaction::Postgres(tx) => count_voted_postgres(tx, user_id, period).await?,
        };
        Ok(count > 0)
    }

    async fn delete_by_user_id(
        &self,
        tx: &mut DbTransaction,
        user_id: i64,
        period: i32,
    ) -> Result<bool> {
        match tx {
            DbTransaction::Sqlite(tx) => delete_access_sqlite(tx, user_id, period).await,
            DbTransaction::Postgres(tx) => delete_access_postgres(tx, user_id, period).await,
        }
    }

    async fn create_bulk(&self, tx: &mut DbTransaction, accesses: &[VotingAccess]) -> Result<u64> {
        if accesses.is_empty() {
            return Ok(0);
        }
        match tx {
            DbTransaction::Sqlite(tx) => create_bulk_sqlite(tx, accesses).await,
            DbTransaction::Postgres(tx) => create_bulk_postgres(tx, accesses).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_access_sqlite(
    conn: &mut SqliteConnection,
    access: &VotingAccess,
) -> Result<VotingAccess> {
    let result = sqlx::query(
        r#"
        INSERT INTO voting_access (user_id, period, can_vote, has_voted, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(access.user_id)
    .bind(access.period)
    .bind(access.can_vote)
    .bind(access.has_voted)
    .bind(access.created_at)
    .bind(access.updated_at)
    .execute(conn)
    .await
    .context("Failed to create voting access")?;

    Ok(VotingAccess {
        id: result.last_insert_rowid(),
        ..access.clone()
    })
}

async fn update_access_sqlite(
    conn: &mut SqliteConnection,
    access: &VotingAccess,
) -> Result<VotingAccess> {
    let now = Utc::now();
    sqlx::query(
        r#"
        UPDATE voting_access
        SET can_vote = ?, has_voted = ?, updated_at = ?
        WHERE user_id = ? AND period = ?
        "#,
    )
    .bind(access.can_vote)
    .bind(access.has_voted)
    .bind(now)
    .bind(access.user_id)
    .bind(access.period)
    .execute(conn)
    .await
    .context("Failed to update voting access")?;

    Ok(VotingAccess {
        updated_at: now,
        ..access.clone()
    })
}

async fn get_access_sqlite(
    conn: &mut SqliteConnection,
    user_id: i64,
    period: i32,
) -> Result<Option<VotingAccess>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, period, can_vote, has_voted, created_at, updated_at
        FROM voting_access WHERE user_id = ? AND period = ?
        "#,
    )
    .bind(user_id)
    .bind(period)
    .fetch_optional(conn)
    .await
    .context("Failed to get voting access")?;

    Ok(row.map(|row| VotingAccess {
        id: row.get("id"),
        user_id: row.get("user_id"),
        period: row.get("period"),
        can_vote: row.get("can_vote"),
        has_voted: row.get("has_voted"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }))
}

async fn count_voted_sqlite(conn: &mut SqliteConnection, user_id: i64, period: i32) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM voting_access WHERE user_id = ? AND period = ? AND has_voted = 1",
    )
    .bind(user_id)
    .bind(period)
    .fetch_one(conn)
    .await
    .context("Failed to check voting status")?;
    Ok(count)
}

async fn delete_access_sqlite(
    conn: &mut SqliteConnection,
    user_id: i64,
    period: i32,
) -> Result<bool> {
    let result = sqlx::query("DELETE FROM voting_access WHERE user_id = ? AND period = ?")
        .bind(user_id)
        .bind(period)
        .execute(conn)
        .await
        .context("Failed to delete voting access")?;
    Ok(result.rows_affected() > 0)
}

async fn create_bulk_sqlite(conn: &mut SqliteConnection, accesses: &[VotingAccess]) -> Result<u64> {
    let mut inserted = 0;
    for chunk in accesses.chunks(BULK_CHUNK_SIZE) {
        let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
            "INSERT INTO voting_access (user_id, period, can_vote, has_voted, created_at, updated_at) ",
        );
        builder.push_values(chunk, |mut row, access| {
            row.push_bind(access.user_id)
                .push_bind(access.period)
                .push_bind(access.can_vote)
                .push_bind(access.has_voted)
                .push_bind(access.created_at)
                .push_bind(access.updated_at);
        });
        builder.push(" ON CONFLICT (user_id, period) DO NOTHING");

        let result = builder
            .build()
            .execute(&mut *conn)
            .await
            .context("Failed to bulk create voting access")?;
        inserted += result.rows_affected();
    }
    Ok(inserted)
}

// ============================================================================
// PostgreSQL implementations
// ============================================================================

async fn create_access_postgres(
    conn: &mut PgConnection,
    access: &VotingAccess,
) -> Result<VotingAccess> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO voting_access (user_id, period, can_vote, has_voted, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(access.user_id)
    .bind(access.period)
    .bind(access.can_vote)
    .bind(access.has_voted)
    .bind(access.created_at)
    .bind(access.updated_at)
    .fetch_one(conn)
    .await
    .context("Failed to create voting access")?;

    Ok(VotingAccess {
        id,
        ..access.clone()
    })
}

async fn update_access_postgres(
    conn: &mut PgConnection,
    access: &VotingAccess,
) -> Result<VotingAccess> {
    let now = Utc::now();
    sqlx::query(
        r#"
        UPDATE voting_access
        SET can_vote = $1, has_voted = $2, updated_at = $3
        WHERE user_id = $4 AND period = $5
        "#,
    )
    .bind(access.can_vote)
    .bind(access.has_voted)
    .bind(now)
    .bind(access.user_id)
    .bind(access.period)
    .execute(conn)
    .await
    .context("Failed to update voting access")?;

    Ok(VotingAccess {
        updated_at: now,
        ..access.clone()
    })
}

async fn get_access_postgres(
    conn: &mut PgConnection,
    user_id: i64,
    period: i32,
) -> Result<Option<VotingAccess>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, period, can_vote, has_voted, created_at, updated_at
        FROM voting_access WHERE user_id = $1 AND period = $2
        "#,
    )
    .bind(user_id)
    .bind(period)
    .fetch_optional(conn)
    .await
    .context("Failed to get voting access")?;

    Ok(row.map(|row| VotingAccess {
        id: row.get("id"),
        user_id: row.get("user_id"),
        period: row.get("period"),
        can_vote: row.get("can_vote"),
        has_voted: row.get("has_voted"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }))
}

async fn count_voted_postgres(conn: &mut PgConnection, user_id: i64, period: i32) -> Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM voting_access WHERE user_id = $1 AND period = $2 AND has_voted = TRUE",
    )
    .bind(user_id)
    .bind(period)
    .fetch_one(conn)
    .await
    .context("Failed to check voting status")?;
    Ok(count)
}

async fn delete_access_postgres(conn: &mut PgConnection, user_id: i64, period: i32) -> Result<bool> {
    let result = sqlx::query("DELETE FROM voting_access WHERE user_id = $1 AND period = $2")
        .bind(user_id)
        .bind(period)
        .execute(conn)
        .await
        .context("Failed to delete voting access")?;
    Ok(result.rows_affected() > 0)
}

async fn create_bulk_postgres(conn: &mut PgConnection, accesses: &[VotingAccess]) -> Result<u64> {
    let mut inserted = 0;
    for chunk in accesses.chunks(BULK_CHUNK_SIZE) {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO voting_access (user_id, period, can_vote, has_voted, created_at, updated_at) ",
        );
        builder.push_values(chunk, |mut row, access| {
            row.push_bind(access.user_id)
                .push_bind(access.period)
                .push_bind(access.can_vote)
                .push_bind(access.has_voted)
                .push_bind(access.created_at)
                .push_bind(access.updated_at);
        });
        builder.push(" ON CONFLICT (user_id, period) DO NOTHING");

        let result = builder
            .build()
            .execute(&mut *conn)
            .await
            .context("Failed to bulk create voting access")?;
        inserted += result.rows_affected();
    }
    Ok(inserted)
}
