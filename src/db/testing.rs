//! Fixtures shared by the repository, service and handler tests

use super::migrations::run_migrations;
use super::repositories::{
    CandidateRepository, SqlxCandidateRepository, SqlxUserRepository, UserRepository,
};
use super::{create_test_pool, DynDatabasePool};
use crate::crypto::{hash_password, NimHasher};
use crate::models::{Candidate, User, UserRole};
use chrono::Utc;

pub const TEST_NIM_SECRET: &str = "test-secret";

/// Fresh in-memory database with the schema applied
pub async fn setup_pool() -> DynDatabasePool {
    let pool = create_test_pool().await.expect("Failed to create test pool");
    run_migrations(&pool).await.expect("Failed to run migrations");
    pool
}

pub fn test_hasher() -> NimHasher {
    NimHasher::new(TEST_NIM_SECRET)
}

/// Insert a committed user. The password is hashed with argon2.
pub async fn insert_user(pool: &DynDatabasePool, nim: &str, role: UserRole, password: &str) -> User {
    let hash = hash_password(password).expect("Failed to hash password");
    let user = User::new(nim, format!("User {}", nim), "Teknik Informatika", role, hash);

    let mut tx = pool.begin().await.expect("Failed to begin transaction");
    let user = SqlxUserRepository::new()
        .create(&mut tx, &user)
        .await
        .expect("Failed to create user");
    tx.commit().await.expect("Failed to commit");
    user
}

pub fn candidate_fixture(number: i32, period: i32) -> Candidate {
    let now = Utc::now();
    Candidate {
        id: 0,
        number,
        president: format!("President {}", number),
        vice: format!("Vice {}", number),
        president_nim: format!("22074110{:02}", number * 2 - 1),
        vice_nim: format!("22074110{:02}", number * 2),
        president_study_program: "Teknik Informatika".into(),
        vice_study_program: "Teknik Elektro".into(),
        vision: "Kampus inklusif".into(),
        mission: "Transparansi anggaran".into(),
        photo_key: None,
        period,
        created_at: now,
        updated_at: now,
    }
}

/// Insert a committed candidate
pub async fn insert_candidate(pool: &DynDatabasePool, number: i32, period: i32) -> Candidate {
    let mut tx = pool.begin().await.expect("Failed to begin transaction");
    let candidate = SqlxCandidateRepository::new()
        .create(&mut tx, &candidate_fixture(number, period))
        .await
        .expect("Failed to create candidate");
    tx.commit().await.expect("Failed to commit");
    candidate
}
