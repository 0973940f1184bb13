//! Database layer
//!
//! Supports two backends selected by configuration:
//! - SQLite (local runs and the test suite)
//! - PostgreSQL (production)
//!
//! Services open a [`DbTransaction`] through [`DatabasePool::begin`] and hand
//! it to every repository call they make; repositories never open their own.
//!
//! ```ignore
//! let pool = create_pool(&config.database).await?;
//! migrations::run_migrations(&pool).await?;
//!
//! let mut tx = pool.begin().await?;
//! let session = auth_repo.get_session_by_id(&mut tx, token).await?;
//! tx.commit().await?;
//! ```

pub mod migrations;
pub mod pool;
pub mod repositories;

#[cfg(test)]
pub(crate) mod testing;

pub use pool::{
    create_pool, create_test_pool, DatabasePool, DbTransaction, DynDatabasePool,
    PostgresDatabase, SqliteDatabase,
};
