//! Candidate service

use async_trait::async_trait;
use std::sync::Arc;

use super::error::{AppError, ServiceResult};
use super::storage::DynObjectStorage;
use super::dto::{to_candidate_response, CandidateResponse};
use crate::db::repositories::{CandidateRepository, VoteRepository};
use crate::db::{DbTransaction, DynDatabasePool};
use crate::models::{Candidate, CreateCandidateInput, UpdateCandidateInput};

#[async_trait]
pub trait CandidateService: Send + Sync {
    /// Candidates of `period` (the active one when `None`), by ballot number
    async fn list(&self, period: Option<i32>) -> ServiceResult<Vec<CandidateResponse>>;

    async fn get(&self, id: i64) -> ServiceResult<CandidateResponse>;

    async fn create(&self, input: CreateCandidateInput) -> ServiceResult<CandidateResponse>;

    async fn update(&self, id: i64, input: UpdateCandidateInput)
        -> ServiceResult<CandidateResponse>;

    /// Only candidates without votes can be deleted
    async fn delete(&self, id: i64) -> ServiceResult<()>;
}

pub struct CandidateServiceImpl {
    pool: DynDatabasePool,
    candidate_repo: Arc<dyn CandidateRepository>,
    vote_repo: Arc<dyn VoteRepository>,
    storage: DynObjectStorage,
    period: i32,
    photo_expires_in: u64,
}

impl CandidateServiceImpl {
    pub fn new(
        pool: DynDatabasePool,
        candidate_repo: Arc<dyn CandidateRepository>,
        vote_repo: Arc<dyn VoteRepository>,
        storage: DynObjectStorage,
        period: i32,
        photo_expires_in: u64,
    ) -> Self {
        Self {
            pool,
            candidate_repo,
            vote_repo,
            storage,
            period,
            photo_expires_in,
        }
    }

    async fn to_response(&self, candidate: Candidate) -> ServiceResult<CandidateResponse> {
        let photo_url = match candidate.photo_key.as_deref() {
            Some(key) => Some(self.storage.presign_get(key, self.photo_expires_in).await?),
            None => None,
        };
        Ok(to_candidate_response(candidate, photo_url))
    }

    async fn require_candidate(&self, tx: &mut DbTransaction, id: i64) -> ServiceResult<Candidate> {
        Ok(self
            .candidate_repo
            .get_by_id(tx, id)
            .await?
            .ok_or_else(|| {
                AppError::not_found("Candidate not found", format!("No candidate with id {}", id))
            })?)
    }

    /// Ballot numbers are unique within a period
    async fn check_number_free(
        &self,
        tx: &mut DbTransaction,
        candidate: &Candidate,
    ) -> ServiceResult<()> {
        let taken = self
            .candidate_repo
            .list_by_period(tx, candidate.period)
            .await?
            .into_iter()
            .any(|c| c.number == candidate.number && c.id != candidate.id);
        if taken {
            return Err(AppError::conflict(
                "Candidate number already used",
                format!(
                    "Number {} is already taken in period {}",
                    candidate.number, candidate.period
                ),
            )
            .into());
        }
        Ok(())
    }
}

fn validate(candidate: &Candidate) -> Result<(), AppError> {
    if candidate.number < 1 {
        return Err(AppError::bad_request(
            "Invalid candidate",
            "Candidate number must be positive",
        ));
    }
    if candidate.president.trim().is_empty() || candidate.vice.trim().is_empty() {
        return Err(AppError::bad_request(
            "Invalid candidate",
            "President and vice names are required",
        ));
    }
    Ok(())
}

#[async_trait]
impl CandidateService for CandidateServiceImpl {
    async fn list(&self, period: Option<i32>) -> ServiceResult<Vec<CandidateResponse>> {
        let mut tx = self.pool.begin().await?;
        let candidates = self
            .candidate_repo
            .list_by_period(&mut tx, period.unwrap_or(self.period))
            .await?;
        tx.commit().await?;

        let mut responses = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            responses.push(self.to_response(candidate).await?);
        }
        Ok(responses)
    }

    async fn get(&self, id: i64) -> ServiceResult<CandidateResponse> {
        let mut tx = self.pool.begin().await?;
        let candidate = self.require_candidate(&mut tx, id).await?;
        tx.commit().await?;
        self.to_response(candidate).await
    }

    async fn create(&self, input: CreateCandidateInput) -> ServiceResult<CandidateResponse> {
        let period = input.period.unwrap_or(self.period);
        let candidate = Candidate::from_input(input, period);
        validate(&candidate)?;

        let mut tx = self.pool.begin().await?;
        self.check_number_free(&mut tx, &candidate).await?;
        let candidate = self.candidate_repo.create(&mut tx, &candidate).await?;
        tx.commit().await?;

        tracing::info!(candidate_id = candidate.id, number = candidate.number, "Created candidate");
        self.to_response(candidate).await
    }

    async fn update(
        &self,
        id: i64,
        input: UpdateCandidateInput,
    ) -> ServiceResult<CandidateResponse> {
        let mut tx = self.pool.begin().await?;
        let mut candidate = self.require_candidate(&mut tx, id).await?;
        candidate.apply(input);
        validate(&candidate)?;
        self.check_number_free(&mut tx, &candidate).await?;

        let candidate = self.candidate_repo.update(&mut tx, &candidate).await?;
        tx.commit().await?;

        tracing::info!(candidate_id = id, "Updated candidate");
        self.to_response(candidate).await
    }

    async fn delete(&self, id: i64) -> ServiceResult<()> {
        let mut tx = self.pool.begin().await?;
        self.require_candidate(&mut tx, id).await?;

        if self.vote_repo.get_total_votes_by_candidate_id(&mut tx, id).await? > 0 {
            return Err(AppError::conflict(
                "Candidate has votes",
                "A candidate who already received votes cannot be deleted",
            )
            .into());
        }

        self.candidate_repo.delete(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(candidate_id = id, "Deleted candidate");
        Ok(())
    }
}
