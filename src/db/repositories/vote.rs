//! Vote repository
//!
//! Ballots are append-only. A voter is only known by the keyed hash of
//! their NIM, so every lookup here goes through `hashed_nim`.

use crate::crypto::NimHasher;
use crate::db::DbTransaction;
use crate::models::Vote;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{PgConnection, Row, SqliteConnection};
use std::sync::Arc;

/// Vote repository trait
#[async_trait]
pub trait VoteRepository: Send + Sync {
    /// Ballots cast for a candidate, in insertion order
    async fn get_by_candidate_id(&self, tx: &mut DbTransaction, candidate_id: i64)
        -> Result<Vec<Vote>>;

    async fn is_user_voted_in_period(
        &self,
        tx: &mut DbTransaction,
        hashed_nim: &str,
        period: i32,
    ) -> Result<bool>;

    /// Insert a ballot. Returns `None` when a ballot for the same
    /// `(hashed_nim, period)` already exists.
    async fn save_vote_record(&self, tx: &mut DbTransaction, vote: &Vote) -> Result<Option<Vote>>;

    async fn get_total_votes_by_candidate_id(
        &self,
        tx: &mut DbTransaction,
        candidate_id: i64,
    ) -> Result<i64>;

    /// Whether the user has a ballot in any period
    async fn is_user_ever_voted(&self, tx: &mut DbTransaction, user_id: i64) -> Result<bool>;
}

/// SQLx-based vote repository
pub struct SqlxVoteRepository {
    hasher: NimHasher,
}

impl SqlxVoteRepository {
    pub fn new(hasher: NimHasher) -> Self {
        Self { hasher }
    }

    pub fn boxed(hasher: NimHasher) -> Arc<dyn VoteRepository> {
        Arc::new(Self::new(hasher))
    }
}

#[async_trait]
impl VoteRepository for SqlxVoteRepository {
    async fn get_by_candidate_id(
        &self,
        tx: &mut DbTransaction,
        candidate_id: i64,
    ) -> Result<Vec<Vote>> {
        match tx {
            DbTransaction::Sqlite(tx) => get_votes_by_candidate_sqlite(tx, candidate_id).await,
            DbTransaction::Postgres(tx) => get_votes_by_candidate_postgres(tx, candidate_id).await,
        }
    }

    async fn is_user_voted_in_period(
        &self,
        tx: &mut DbTransaction,
        hashed_nim: &str,
        period: i32,
    ) -> Result<bool> {
        let count = match tx {
            DbTransaction::Sqlite(tx) => count_votes_sqlite(tx, hashed_nim, Some(period)).await?,
            DbTransaction::Postgres(tx) => {
                count_votes_postgres(tx, hashed_nim, Some(period)).await?
            }
        };
        Ok(count > 0)
    }

    async fn save_vote_record(&self, tx: &mut DbTransaction, vote: &Vote) -> Result<Option<Vote>> {
        match tx {
            DbTransaction::Sqlite(tx) => save_vote_sqlite(tx, vote).await,
            DbTransaction::Postgres(tx) => save_vote_postgres(tx, vote).await,
        }
    }

    async fn get_total_votes_by_candidate_id(
        &self,
        tx: &mut DbTransaction,
        candidate_id: i64,
    ) -> Result<i64> {
        match tx {
            DbTransaction::Sqlite(tx) => total_votes_sqlite(tx, candidate_id).await,
            DbTransaction::Postgres(tx) => total_votes_postgres(tx, candidate_id).await,
        }
    }

    async fn is_user_ever_voted(&self, tx: &mut DbTransaction, user_id: i64) -> Result<bool> {
        let nim = match tx {
            DbTransaction::Sqlite(tx) => user_nim_sqlite(tx, user_id).await?,
            DbTransaction::Postgres(tx) => user_nim_postgres(tx, user_id).await?,
        };
        let Some(nim) = nim else {
            return Ok(false);
        };

        let hashed_nim = self.hasher.hash(&nim)?;
        let count = match tx {
            DbTransaction::Sqlite(tx) => count_votes_sqlite(tx, &hashed_nim, None).await?,
            DbTransaction::Postgres(tx) => count_votes_postgres(tx, &hashed_nim, None).await?,
        };
        Ok(count > 0)
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

async fn get_votes_by_candidate_sqlite(
    conn: &mut SqliteConnection,
    candidate_id: i64,
) -> Result<Vec<Vote>> {
    let rows = sqlx::query(
        "SELECT id, candidate_id, hashed_nim, period, created_at FROM votes WHERE candidate_id = ? ORDER BY id",
    )
    .bind(candidate_id)
    .fetch_all(conn)
    .await
    .context("Failed to get votes by candidate")?;

    Ok(rows
        .iter()
        .map(|row| Vote {
            id: row.get("id"),
            candidate_id: row.get("candidate_id"),
            hashed_nim: row.get("hashed_nim"),
            period: row.get("period"),
            created_at: row.get("created_at"),
        })
        .collect())
}

async fn count_votes_sqlite(
    conn: &mut SqliteConnection,
    hashed_nim: &str,
    period: Option<i32>,
) -> Result<i64> {
    let count: i64 = match period {
        Some(period) => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM votes WHERE hashed_nim = ? AND period = ?")
                .bind(hashed_nim)
                .bind(period)
                .fetch_one(conn)
                .await
        }
        None => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM votes WHERE hashed_nim = ?")
                .bind(hashed_nim)
                .fetch_one(conn)
                .await
        }
    }
    .context("Failed to check existing vote")?;
    Ok(count)
}

async fn save_vote_sqlite(conn: &mut SqliteConnection, vote: &Vote) -> Result<Option<Vote>> {
    let result = sqlx::query(
        r#"
        INSERT INTO votes (candidate_id, hashed_nim, period, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT (hashed_nim, period) DO NOTHING
        "#,
    )
    .bind(vote.candidate_id)
    .bind(&vote.hashed_nim)
    .bind(vote.period)
    .bind(vote.created_at)
    .execute(conn)
    .await
    .context("Failed to save vote")?;

    if result.rows_affected() == 0 {
        return Ok(None);
    }
    Ok(Some(Vote {
        id: result.last_insert_rowid(),
        ..vote.clone()
    }))
}

async fn total_votes_sqlite(conn: &mut SqliteConnection, candidate_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE candidate_id = ?")
        .bind(candidate_id)
        .fetch_one(conn)
        .await
        .context("Failed to count votes")?;
    Ok(count)
}

async fn user_nim_sqlite(conn: &mut SqliteConnection, user_id: i64) -> Result<Option<String>> {
    let nim: Option<String> = sqlx::query_scalar("SELECT nim FROM users WHERE id = ?")
        .bind(user_id)
        .fetch_optional(conn)
        .await
        .context("Failed to get user NIM")?;
    Ok(nim)
}

// ============================================================================
// PostgreSQL implementations
// ============================================================================

async fn get_votes_by_candidate_postgres(
    conn: &mut PgConnection,
    candidate_id: i64,
) -> Result<Vec<Vote>> {
    let rows = sqlx::query(
        "SELECT id, candidate_id, hashed_nim, period, created_at FROM votes WHERE candidate_id = $1 ORDER BY id",
    )
    .bind(candidate_id)
    .fetch_all(conn)
    .await
    .context("Failed to get votes by candidate")?;

    Ok(rows
        .iter()
        .map(|row| Vote {
            id: row.get("id"),
            candidate_id: row.get("candidate_id"),
            hashed_nim: row.get("hashed_nim"),
            period: row.get("period"),
            created_at: row.get("created_at"),
        })
        .collect())
}

async fn count_votes_postgres(
    conn: &mut PgConnection,
    hashed_nim: &str,
    period: Option<i32>,
) -> Result<i64> {
    let count: i64 = match period {
        Some(period) => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM votes WHERE hashed_nim = $1 AND period = $2")
                .bind(hashed_nim)
                .bind(period)
                .fetch_one(conn)
                .await
        }
        None => {
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM votes WHERE hashed_nim = $1")
                .bind(hashed_nim)
                .fetch_one(conn)
                .await
        }
    }
    .context("Failed to check existing vote")?;
    Ok(count)
}

async fn save_vote_postgres(conn: &mut PgConnection, vote: &Vote) -> Result<Option<Vote>> {
    let id: Option<i64> = sqlx::query_scalar(
        r#"
        INSERT INTO votes (candidate_id, hashed_nim, period, created_at)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (hashed_nim, period) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(vote.candidate_id)
    .bind(&vote.hashed_nim)
    .bind(vote.period)
    .bind(vote.created_at)
    .fetch_optional(conn)
    .await
    .context("Failed to save vote")?;

    Ok(id.map(|id| Vote {
        id,
        ..vote.clone()
    }))
}

async fn total_votes_postgres(conn: &mut PgConnection, candidate_id: i64) -> Result<i64> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM votes WHERE candidate_id = $1")
        .bind(candidate_id)
        .fetch_one(conn)
        .await
        .context("Failed to count votes")?;
    Ok(count)
}

async fn user_nim_postgres(conn: &mut PgConnection, user_id: i64) -> Result<Option<String>> {
    let nim: Option<String> = sqlx::query_scalar("SELECT nim FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_optional(conn)
        .await
        .context("Failed to get user NIM")?;
    Ok(nim)
}
