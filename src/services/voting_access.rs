//! Voting access service
//!
//! Admin management of who may vote in the active period. Every
//! operation reads and writes the row of the active period only; rows of
//! earlier elections stay as history.

use async_trait::async_trait;
use std::sync::Arc;

use super::error::{AppError, ServiceResult};
use super::dto::{to_voting_access_response, VotingAccessResponse};
use crate::crypto::NimHasher;
use crate::db::repositories::{UserRepository, VoteRepository, VotingAccessRepository};
use crate::db::{DbTransaction, DynDatabasePool};
use crate::models::{User, UserRole, VotingAccess};

#[async_trait]
pub trait VotingAccessService: Send + Sync {
    async fn create(&self, user_id: i64, can_vote: bool) -> ServiceResult<VotingAccessResponse>;

    async fn update(&self, user_id: i64, can_vote: bool) -> ServiceResult<VotingAccessResponse>;

    async fn get_by_user_id(&self, user_id: i64) -> ServiceResult<VotingAccessResponse>;

    async fn delete_by_user_id(&self, user_id: i64) -> ServiceResult<()>;

    /// Grant access to every student without a row in the active period.
    /// Returns how many were created.
    async fn provision_all(&self) -> ServiceResult<u64>;
}

pub struct VotingAccessServiceImpl {
    pool: DynDatabasePool,
    access_repo: Arc<dyn VotingAccessRepository>,
    vote_repo: Arc<dyn VoteRepository>,
    user_repo: Arc<dyn UserRepository>,
    hasher: NimHasher,
    period: i32,
}

impl VotingAccessServiceImpl {
    pub fn new(
        pool: DynDatabasePool,
        access_repo: Arc<dyn VotingAccessRepository>,
        vote_repo: Arc<dyn VoteRepository>,
        user_repo: Arc<dyn UserRepository>,
        hasher: NimHasher,
        period: i32,
    ) -> Self {
        Self {
            pool,
            access_repo,
            vote_repo,
            user_repo,
            hasher,
            period,
        }
    }

    async fn require_student(&self, tx: &mut DbTransaction, user_id: i64) -> ServiceResult<User> {
        let user = self
            .user_repo
            .get_by_id(tx, user_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found("User not found", format!("No user with id {}", user_id))
            })?;
        if user.role != UserRole::Student {
            return Err(AppError::bad_request(
                "Invalid user",
                "Voting access can only be granted to students",
            )
            .into());
        }
        Ok(user)
    }

    async fn require_access(
        &self,
        tx: &mut DbTransaction,
        user_id: i64,
    ) -> ServiceResult<VotingAccess> {
        Ok(self
            .access_repo
            .get_by_user_id(tx, user_id, self.period)
            .await?
            .ok_or_else(|| access_not_found(user_id))?)
    }
}

fn access_not_found(user_id: i64) -> AppError {
    AppError::not_found(
        "Voting access not found",
        format!("User {} has no voting access", user_id),
    )
}

#[async_trait]
impl VotingAccessService for VotingAccessServiceImpl {
    async fn create(&self, user_id: i64, can_vote: bool) -> ServiceResult<VotingAccessResponse> {
        let mut tx = self.pool.begin().await?;
        let user = self.require_student(&mut tx, user_id).await?;

        if self
            .access_repo
            .get_by_user_id(&mut tx, user_id, self.period)
            .await?
            .is_some()
        {
            return Err(AppError::conflict(
                "Voting access already exists",
                format!("User {} already has voting access", user_id),
            )
            .into());
        }

        let mut access = VotingAccess::new(user_id, self.period);
        access.can_vote = can_vote;
        // A ballot may predate the row, e.g. after a delete and re-grant
        access.has_voted = self
            .vote_repo
            .is_user_voted_in_period(&mut tx, &self.hasher.hash(&user.nim)?, self.period)
            .await?;

        let access = self.access_repo.create(&mut tx, &access).await?;
        tx.commit().await?;

        tracing::info!(user_id, can_vote, "Granted voting access");
        Ok(to_voting_access_response(access))
    }

    async fn update(&self, user_id: i64, can_vote: bool) -> ServiceResult<VotingAccessResponse> {
        let mut tx = self.pool.begin().await?;
        let mut access = self.require_access(&mut tx, user_id).await?;

        access.can_vote = can_vote;
        let access = self.access_repo.update(&mut tx, &access).await?;
        tx.commit().await?;

        tracing::info!(user_id, can_vote, "Updated voting access");
        Ok(to_voting_access_response(access))
    }

    async fn get_by_user_id(&self, user_id: i64) -> ServiceResult<VotingAccessResponse> {
        let mut tx = self.pool.begin().await?;
        let access = self.require_access(&mut tx, user_id).await?;
        tx.commit().await?;
        Ok(to_voting_access_response(access))
    }

    async fn delete_by_user_id(&self, user_id: i64) -> ServiceResult<()> {
        let mut tx = self.pool.begin().await?;
        self.require_access(&mut tx, user_id).await?;

        let user = self
            .user_repo
            .get_by_id(&mut tx, user_id)
            .await?
            .ok_or_else(|| access_not_found(user_id))?;
        let hashed_nim = self.hasher.hash(&user.nim)?;

        if self
            .access_repo
            .is_user_ever_voted(&mut tx, user_id, self.period)
            .await?
            || self
                .vote_repo
                .is_user_voted_in_period(&mut tx, &hashed_nim, self.period)
                .await?
        {
            return Err(AppError::conflict(
                "Voter has already voted",
                "Access of a user who has voted cannot be removed",
            )
            .into());
        }

        if !self
            .access_repo
            .delete_by_user_id(&mut tx, user_id, self.period)
            .await?
        {
            return Err(access_not_found(user_id).into());
        }
        tx.commit().await?;

        tracing::info!(user_id, "Removed voting access");
        Ok(())
    }

    async fn provision_all(&self) -> ServiceResult<u64> {
        let mut tx = self.pool.begin().await?;
        let students = self.user_repo.list_by_role(&mut tx, UserRole::Student).await?;

        let accesses: Vec<VotingAccess> = students
            .iter()
            .map(|s| VotingAccess::new(s.id, self.period))
            .collect();
        let created = self.access_repo.create_bulk(&mut tx, &accesses).await?;
        tx.commit().await?;

        tracing::info!(created, period = self.period, "Provisioned voting access");
        Ok(created)
    }
}
