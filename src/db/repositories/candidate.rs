//! Candidate repository

use crate::db::DbTransaction;
use crate::models::Candidate;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgConnection, Row, SqliteConnection};
use std::sync::Arc;

/// Candidate repository trait
#[async_trait]
pub trait CandidateRepository: Send + Sync {
    /// Candidates of one period ordered by ballot number
    async fn list_by_period(&self, tx: &mut DbTransaction, period: i32) -> Result<Vec<Candidate>>;

    async fn get_by_id(&self, tx: &mut DbTransaction, id: i64) -> Result<Option<Candidate>>;

    async fn create(&self, tx: &mut DbTransaction, candidate: &Candidate) -> Result<Candidate>;

    async fn update(&self, tx: &mut DbTransaction, candidate: &Candidate) -> Result<Candidate>;

    /// Returns false when no row matched
    async fn delete(&self, tx: &mut DbTransaction, id: i64) -> Result<bool>;
}

/// SQLx-based candidate repository
#[derive(Debug, Default)]
pub struct SqlxCandidateRepository;

impl SqlxCandidateRepository {
    pub fn new() -> Self {
        Self
    }

    pub fn boxed() -> Arc<dyn CandidateRepository> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl CandidateRepository for SqlxCandidateRepository {
    async fn list_by_period(&self, tx: &mut DbTransaction, period: i32) -> Result<Vec<Candidate>> {
        match tx {
            DbTransaction::Sqlite(tx) => list_candidates_sqlite(tx, period).await,
            DbTransaction::Postgres(tx) => list_candidates_postgres(tx, period).await,
        }
    }

    async fn get_by_id(&self, tx: &mut DbTransaction, id: i64) -> Result<Option<Candidate>> {
        match tx {
            DbTransaction::Sqlite(tx) => get_candidate_sqlite(tx, id).await,
            DbTransaction::Postgres(tx) => get_candidate_postgres(tx, id).await,
        }
    }

    async fn create(&self, tx: &mut DbTransaction, candidate: &Candidate) -> Result<Candidate> {
        match tx {
            DbTransaction::Sqlite(tx) => create_candidate_sqlite(tx, candidate).await,
            DbTransaction::Postgres(tx) => create_candidate_postgres(tx, candidate).await,
        }
    }

    async fn update(&self, tx: &mut DbTransaction, candidate: &Candidate) -> Result<Candidate> {
        match tx {
            DbTransaction::Sqlite(tx) => update_candidate_sqlite(tx, candidate).await,
            DbTransaction::Postgres(tx) => update_candidate_postgres(tx, candidate).await,
        }
    }

    async fn delete(&self, tx: &mut DbTransaction, id: i64) -> Result<bool> {
        match tx {
            DbTransaction::Sqlite(tx) => delete_candidate_sqlite(tx, id).await,
            DbTransaction::Postgres(tx) => delete_candidate_postgres(tx, id).await,
        }
    }
}

// ============================================================================
// SQLite implementations
// ============================================================================

const SELECT_CANDIDATE_SQLITE: &str = r#"
    SELECT id, number, president, vice, president_nim, vice_nim,
           president_study_program, vice_study_program, vision, mission,
           photo_key, period, created_at, updated_at
    FROM candidates
"#;

async fn list_candidates_sqlite(conn: &mut SqliteConnection, period: i32) -> Result<Vec<Candidate>> {
    let sql = format!("{} WHERE period = ? ORDER BY number", SELECT_CANDIDATE_SQLITE);
    let rows = sqlx::query(&sql)
        .bind(period)
        .fetch_all(conn)
        .await
        .context("Failed to list candidates")?;

    Ok(rows.iter().map(row_to_candidate_sqlite).collect())
}

async fn get_candidate_sqlite(conn: &mut SqliteConnection, id: i64) -> Result<Option<Candidate>> {
    let sql = format!("{} WHERE id = ?", SELECT_CANDIDATE_SQLITE);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await
        .context("Failed to get candidate by ID")?;

    Ok(row.as_ref().map(row_to_candidate_sqlite))
}

async fn create_candidate_sqlite(
    conn: &mut SqliteConnection,
    candidate: &Candidate,
) -> Result<Candidate> {
    let result = sqlx::query(
        r#"
        INSERT INTO candidates (number, president, vice, president_nim, vice_nim,
            president_study_program, vice_study_program, vision, mission,
            photo_key, period, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(candidate.number)
    .bind(&candidate.president)
    .bind(&candidate.vice)
    .bind(&candidate.president_nim)
    .bind(&candidate.vice_nim)
    .bind(&candidate.president_study_program)
    .bind(&candidate.vice_study_program)
    .bind(&candidate.vision)
    .bind(&candidate.mission)
    .bind(&candidate.photo_key)
    .bind(candidate.period)
    .bind(candidate.created_at)
    .bind(candidate.updated_at)
    .execute(conn)
    .await
    .context("Failed to create candidate")?;

    Ok(Candidate {
        id: result.last_insert_rowid(),
        ..candidate.clone()
    })
}

async fn update_candidate_sqlite(
    conn: &mut SqliteConnection,
    candidate: &Candidate,
) -> Result<Candidate> {
    let now = Utc::now();
    sqlx::query(
        r#"
        UPDATE candidates
        SET number = ?, president = ?, vice = ?, president_nim = ?, vice_nim = ?,
            president_study_program = ?, vice_study_program = ?, vision = ?,
            mission = ?, photo_key = ?, updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(candidate.number)
    .bind(&candidate.president)
    .bind(&candidate.vice)
    .bind(&candidate.president_nim)
    .bind(&candidate.vice_nim)
    .bind(&candidate.president_study_program)
    .bind(&candidate.vice_study_program)
    .bind(&candidate.vision)
    .bind(&candidate.mission)
    .bind(&candidate.photo_key)
    .bind(now)
    .bind(candidate.id)
    .execute(conn)
    .await
    .context("Failed to update candidate")?;

    Ok(Candidate {
        updated_at: now,
        ..candidate.clone()
    })
}

async fn delete_candidate_sqlite(conn: &mut SqliteConnection, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM candidates WHERE id = ?")
        .bind(id)
        .execute(conn)
        .await
        .context("Failed to delete candidate")?;
    Ok(result.rows_affected() > 0)
}

fn row_to_candidate_sqlite(row: &sqlx::sqlite::SqliteRow) -> Candidate {
    Candidate {
        id: row.get("id"),
        number: row.get("number"),
        president: row.get("president"),
        vice: row.get("vice"),
        president_nim: row.get("president_nim"),
        vice_nim: row.get("vice_nim"),
        president_study_program: row.get("president_study_program"),
        vice_study_program: row.get("vice_study_program"),
        vision: row.get("vision"),
        mission: row.get("mission"),
        photo_key: row.get("photo_key"),
        period: row.get("period"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// ============================================================================
// PostgreSQL implementations
// ============================================================================

const SELECT_CANDIDATE_POSTGRES: &str = r#"
    SELECT id, number, president, vice, president_nim, vice_nim,
           president_study_program, vice_study_program, vision, mission,
           photo_key, period, created_at, updated_at
    FROM candidates
"#;

async fn list_candidates_postgres(conn: &mut PgConnection, period: i32) -> Result<Vec<Candidate>> {
    let sql = format!("{} WHERE period = $1 ORDER BY number", SELECT_CANDIDATE_POSTGRES);
    let rows = sqlx::query(&sql)
        .bind(period)
        .fetch_all(conn)
        .await
        .context("Failed to list candidates")?;

    Ok(rows.iter().map(row_to_candidate_postgres).collect())
}

async fn get_candidate_postgres(conn: &mut PgConnection, id: i64) -> Result<Option<Candidate>> {
    let sql = format!("{} WHERE id = $1", SELECT_CANDIDATE_POSTGRES);
    let row = sqlx::query(&sql)
        .bind(id)
        .fetch_optional(conn)
        .await
        .context("Failed to get candidate by ID")?;

    Ok(row.as_ref().map(row_to_candidate_postgres))
}

async fn create_candidate_postgres(
    conn: &mut PgConnection,
    candidate: &Candidate,
) -> Result<Candidate> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO candidates (number, president, vice, president_nim, vice_nim,
            president_study_program, vice_study_program, vision, mission,
            photo_key, period, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING id
        "#,
    )
    .bind(candidate.number)
    .bind(&candidate.president)
    .bind(&candidate.vice)
    .bind(&candidate.president_nim)
    .bind(&candidate.vice_nim)
    .bind(&candidate.president_study_program)
    .bind(&candidate.vice_study_program)
    .bind(&candidate.vision)
    .bind(&candidate.mission)
    .bind(&candidate.photo_key)
    .bind(candidate.period)
    .bind(candidate.created_at)
    .bind(candidate.updated_at)
    .fetch_one(conn)
    .await
    .context("Failed to create candidate")?;

    Ok(Candidate {
        id,
        ..candidate.clone()
    })
}

async fn update_candidate_postgres(
    conn: &mut PgConnection,
    candidate: &Candidate,
) -> Result<Candidate> {
    let now = Utc::now();
    sqlx::query(
        r#"
        UPDATE candidates
        SET number = $1, president = $2, vice = $3, president_nim = $4, vice_nim = $5,
            president_study_program = $6, vice_study_program = $7, vision = $8,
            mission = $9, photo_key = $10, updated_at = $11
        WHERE id = $12
        "#,
    )
    .bind(candidate.number)
    .bind(&candidate.president)
    .bind(&candidate.vice)
    .bind(&candidate.president_nim)
    .bind(&candidate.vice_nim)
    .bind(&candidate.president_study_program)
    .bind(&candidate.vice_study_program)
    .bind(&candidate.vision)
    .bind(&candidate.mission)
    .bind(&candidate.photo_key)
    .bind(now)
    .bind(candidate.id)
    .execute(conn)
    .await
    .context("Failed to update candidate")?;

    Ok(Candidate {
        updated_at: now,
        ..candidate.clone()
    })
}

async fn delete_candidate_postgres(conn: &mut PgConnection, id: i64) -> Result<bool> {
    let result = sqlx::query("DELETE FROM candidates WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await
        .context("Failed to delete candidate")?;
    Ok(result.rows_affected() > 0)
}

fn row_to_candidate_postgres(row: &sqlx::postgres::PgRow) -> Candidate {
    Candidate {
        id: row.get("id"),
        number: row.get("number"),
        president: row.get("president"),
        vice: row.get("vice"),
        president_nim: row.get("president_nim"),
        vice_nim: row.get("vice_nim"),
        president_study_program: row.get("president_study_program"),
        vice_study_program: row.get("vice_study_program"),
        vision: row.get("vision"),
        mission: row.get("mission"),
        photo_key: row.get("photo_key"),
        period: row.get("period"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}
