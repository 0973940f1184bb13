//! Vote service
//!
//! Casting a ballot is one transaction: check access, check the candidate
//! belongs to the active period, check the voter has not voted, store the
//! ballot and flip `has_voted`. Only after commit is the vote log written
//! and the new tally broadcast to live dashboards.

use async_trait::async_trait;
use axum::http::StatusCode;
use std::sync::Arc;
use tokio::sync::broadcast;

use super::error::{AppError, ServiceResult};
use super::vote_log::VoteLog;
use super::dto::{
    to_vote_response, to_votes_response, VoteResponse, VoteStatusResponse, VoteTallyResponse,
};
use crate::crypto::NimHasher;
use crate::db::repositories::{
    CandidateRepository, UserRepository, VoteRepository, VotingAccessRepository,
};
use crate::db::{DbTransaction, DynDatabasePool};
use crate::models::Vote;

/// Capacity of the live tally channel; slow subscribers skip ahead
const TALLY_CHANNEL_CAPACITY: usize = 256;

#[async_trait]
pub trait VoteService: Send + Sync {
    async fn cast_vote(&self, user_id: i64, candidate_id: i64) -> ServiceResult<VoteResponse>;

    async fn get_total_votes(&self, candidate_id: i64) -> ServiceResult<VoteTallyResponse>;

    /// Tallies of every candidate in the active period, zero included
    async fn get_all_tallies(&self) -> ServiceResult<Vec<VoteTallyResponse>>;

    async fn get_votes_by_candidate(&self, candidate_id: i64) -> ServiceResult<Vec<VoteResponse>>;

    async fn get_vote_status(&self, user_id: i64) -> ServiceResult<VoteStatusResponse>;

    /// Receive the candidate's new tally after every accepted ballot
    fn subscribe(&self) -> broadcast::Receiver<VoteTallyResponse>;
}

pub struct VoteServiceImpl {
    pool: DynDatabasePool,
    vote_repo: Arc<dyn VoteRepository>,
    access_repo: Arc<dyn VotingAccessRepository>,
    candidate_repo: Arc<dyn CandidateRepository>,
    user_repo: Arc<dyn UserRepository>,
    hasher: NimHasher,
    period: i32,
    vote_log: Arc<VoteLog>,
    tallies: broadcast::Sender<VoteTallyResponse>,
}

impl VoteServiceImpl {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        pool: DynDatabasePool,
        vote_repo: Arc<dyn VoteRepository>,
        access_repo: Arc<dyn VotingAccessRepository>,
        candidate_repo: Arc<dyn CandidateRepository>,
        user_repo: Arc<dyn UserRepository>,
        hasher: NimHasher,
        period: i32,
        vote_log: Arc<VoteLog>,
    ) -> Self {
        let (tallies, _) = broadcast::channel(TALLY_CHANNEL_CAPACITY);
        Self {
            pool,
            vote_repo,
            access_repo,
            candidate_repo,
            user_repo,
            hasher,
            period,
            vote_log,
            tallies,
        }
    }

    fn already_voted() -> AppError {
        AppError::conflict("Already voted", "You have already voted in this period")
    }

    async fn require_candidate(&self, tx: &mut DbTransaction, candidate_id: i64) -> ServiceResult<()> {
        self.candidate_repo
            .get_by_id(tx, candidate_id)
            .await?
            .filter(|c| c.period == self.period)
            .ok_or_else(|| {
                AppError::not_found(
                    "Candidate not found",
                    format!("No candidate with id {} in period {}", candidate_id, self.period),
                )
            })?;
        Ok(())
    }
}

#[async_trait]
impl VoteService for VoteServiceImpl {
    async fn cast_vote(&self, user_id: i64, candidate_id: i64) -> ServiceResult<VoteResponse> {
        let mut tx = self.pool.begin().await?;

        let mut access = self
            .access_repo
            .get_by_user_id(&mut tx, user_id, self.period)
            .await?
            .filter(|a| a.can_vote)
            .ok_or_else(|| {
                AppError::new(
                    StatusCode::FORBIDDEN,
                    "Voting access denied",
                    "You are not allowed to vote in this period",
                )
            })?;

        let user = self
            .user_repo
            .get_by_id(&mut tx, user_id)
            .await?
            .ok_or_else(AppError::unauthorized)?;

        self.require_candidate(&mut tx, candidate_id).await?;

        let hashed_nim = self.hasher.hash(&user.nim)?;
        if access.has_voted
            || self
                .vote_repo
                .is_user_voted_in_period(&mut tx, &hashed_nim, self.period)
                .await?
        {
            return Err(Self::already_voted().into());
        }

        let vote = self
            .vote_repo
            .save_vote_record(&mut tx, &Vote::new(candidate_id, hashed_nim, self.period))
            .await?
            .ok_or_else(Self::already_voted)?;

        access.has_voted = true;
        self.access_repo.update(&mut tx, &access).await?;

        let total_votes = self
            .vote_repo
            .get_total_votes_by_candidate_id(&mut tx, candidate_id)
            .await?;
        tx.commit().await?;

        tracing::info!(user_id, "Vote cast");

        if let Err(e) = self.vote_log.append(self.period, &user).await {
            tracing::error!(user_id, error = %format!("{:#}", e), "Failed to write vote log");
        }
        // No subscribers is fine
        let _ = self.tallies.send(VoteTallyResponse {
            candidate_id,
            total_votes,
        });

        Ok(to_vote_response(vote))
    }

    async fn get_total_votes(&self, candidate_id: i64) -> ServiceResult<VoteTallyResponse> {
        let mut tx = self.pool.begin().await?;
        self.require_candidate(&mut tx, candidate_id).await?;
        let total_votes = self
            .vote_repo
            .get_total_votes_by_candidate_id(&mut tx, candidate_id)
            .await?;
        tx.commit().await?;

        Ok(VoteTallyResponse {
            candidate_id,
            total_votes,
        })
    }

    async fn get_all_tallies(&self) -> ServiceResult<Vec<VoteTallyResponse>> {
        let mut tx = self.pool.begin().await?;
        let candidates = self.candidate_repo.list_by_period(&mut tx, self.period).await?;

        let mut tallies = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let total_votes = self
                .vote_repo
                .get_total_votes_by_candidate_id(&mut tx, candidate.id)
                .await?;
            tallies.push(VoteTallyResponse {
                candidate_id: candidate.id,
                total_votes,
            });
        }
        tx.commit().await?;
        Ok(tallies)
    }

    async fn get_votes_by_candidate(&self, candidate_id: i64) -> ServiceResult<Vec<VoteResponse>> {
        let mut tx = self.pool.begin().await?;
        self.require_candidate(&mut tx, candidate_id).await?;
        let votes = self.vote_repo.get_by_candidate_id(&mut tx, candidate_id).await?;
        tx.commit().await?;
        Ok(to_votes_response(votes))
    }

    async fn get_vote_status(&self, user_id: i64) -> ServiceResult<VoteStatusResponse> {
        let mut tx = self.pool.begin().await?;
        let access = self
            .access_repo
            .get_by_user_id(&mut tx, user_id, self.period)
            .await?;

        let status = match access {
            Some(access) => VoteStatusResponse {
                can_vote: access.may_vote(),
                has_voted: access.has_voted,
            },
            None => {
                // Not provisioned, but a ballot may exist from before the row was removed
                let user = self
                    .user_repo
                    .get_by_id(&mut tx, user_id)
                    .await?
                    .ok_or_else(AppError::unauthorized)?;
                let hashed_nim = self.hasher.hash(&user.nim)?;
                VoteStatusResponse {
                    can_vote: false,
                    has_voted: self
                        .vote_repo
                        .is_user_voted_in_period(&mut tx, &hashed_nim, self.period)
                        .await?,
                }
            }
        };
        tx.commit().await?;
        Ok(status)
    }

    fn subscribe(&self) -> broadcast::Receiver<VoteTallyResponse> {
        self.tallies.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxCandidateRepository, SqlxUserRepository, SqlxVoteRepository,
        SqlxVotingAccessRepository,
    };
    use crate::db::testing::{insert_candidate, insert_user, setup_pool, test_hasher};
    use crate::models::{User, UserRole, VotingAccess};
    use crate::services::ServiceError;

    const PERIOD: i32 = 2026;

    struct Fixture {
        pool: DynDatabasePool,
        service: VoteServiceImpl,
        _log_dir: tempfile::TempDir,
        log: Arc<VoteLog>,
    }

    async fn setup() -> Fixture {
        let pool = setup_pool().await;
        let log_dir = tempfile::tempdir().unwrap();
        let log = Arc::new(VoteLog::new(log_dir.path()));
        let service = VoteServiceImpl::new(
            pool.clone(),
            SqlxVoteRepository::boxed(test_hasher()),
            SqlxVotingAccessRepository::boxed(),
            SqlxCandidateRepository::boxed(),
            SqlxUserRepository::boxed(),
            test_hasher(),
            PERIOD,
            log.clone(),
        );
        Fixture {
            pool,
            service,
            _log_dir: log_dir,
            log,
        }
    }

    async fn voter(pool: &DynDatabasePool, nim: &str, can_vote: bool) -> User {
        let user = insert_user(pool, nim, UserRole::Student, "pw").await;
        let mut access = VotingAccess::new(user.id, PERIOD);
        access.can_vote = can_vote;

        let mut tx = pool.begin().await.unwrap();
        SqlxVotingAccessRepository::new().create(&mut tx, &access).await.unwrap();
        tx.commit().await.unwrap();
        user
    }

    fn status_of<T: std::fmt::Debug>(result: ServiceResult<T>) -> (StatusCode, String) {
        match result {
            Err(ServiceError::App(e)) => (e.status, e.message),
            other => panic!("expected app error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cast_vote_records_ballot_log_and_tally() {
        let f = setup().await;
        let candidate = insert_candidate(&f.pool, 1, PERIOD).await;
        let user = voter(&f.pool, "2207411001", true).await;
        let mut live = f.service.subscribe();

        let vote = f.service.cast_vote(user.id, candidate.id).await.expect("Vote should succeed");
        assert_eq!(vote.candidate_id, candidate.id);
        assert_eq!(vote.hashed_nim, test_hasher().hash(&user.nim).unwrap());

        let tally = live.recv().await.unwrap();
        assert_eq!(tally, VoteTallyResponse { candidate_id: candidate.id, total_votes: 1 });

        let status = f.service.get_vote_status(user.id).await.unwrap();
        assert_eq!(status, VoteStatusResponse { can_vote: false, has_voted: true });

        let log = std::fs::read_to_string(f.log.path_for(PERIOD)).unwrap();
        assert!(log.contains(&format!("with NIM {} from", user.nim)));
        assert!(!log.contains(&candidate.president));
    }

    #[tokio::test]
    async fn test_second_vote_conflicts() {
        let f = setup().await;
        let first = insert_candidate(&f.pool, 1, PERIOD).await;
        let second = insert_candidate(&f.pool, 2, PERIOD).await;
        let user = voter(&f.pool, "2207411001", true).await;

        f.service.cast_vote(user.id, first.id).await.unwrap();
        let (status, message) = status_of(f.service.cast_vote(user.id, second.id).await);
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(message, "Already voted");

        assert_eq!(f.service.get_total_votes(first.id).await.unwrap().total_votes, 1);
        assert_eq!(f.service.get_total_votes(second.id).await.unwrap().total_votes, 0);
    }

    #[tokio::test]
    async fn test_existing_ballot_blocks_even_if_flag_was_reset() {
        let f = setup().await;
        let candidate = insert_candidate(&f.pool, 1, PERIOD).await;
        let user = voter(&f.pool, "2207411001", true).await;

        let mut tx = f.pool.begin().await.unwrap();
        let hashed = test_hasher().hash(&user.nim).unwrap();
        SqlxVoteRepository::new(test_hasher())
            .save_vote_record(&mut tx, &Vote::new(candidate.id, hashed, PERIOD))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let (status, _) = status_of(f.service.cast_vote(user.id, candidate.id).await);
        assert_eq!(status, StatusCode::CONFLICT);
    }

    /// Reports "not voted" like a concurrent request that read before the
    /// other ballot committed
    struct StaleVoteRepository(SqlxVoteRepository);

    #[async_trait]
    impl VoteRepository for StaleVoteRepository {
        async fn get_by_candidate_id(
            &self,
            tx: &mut DbTransaction,
            candidate_id: i64,
        ) -> anyhow::Result<Vec<Vote>> {
            self.0.get_by_candidate_id(tx, candidate_id).await
        }

        async fn is_user_voted_in_period(
            &self,
            _tx: &mut DbTransaction,
            _hashed_nim: &str,
            _period: i32,
        ) -> anyhow::Result<bool> {
            Ok(false)
        }

        async fn save_vote_record(
            &self,
            tx: &mut DbTransaction,
            vote: &Vote,
        ) -> anyhow::Result<Option<Vote>> {
            self.0.save_vote_record(tx, vote).await
        }

        async fn get_total_votes_by_candidate_id(
            &self,
            tx: &mut DbTransaction,
            candidate_id: i64,
        ) -> anyhow::Result<i64> {
            self.0.get_total_votes_by_candidate_id(tx, candidate_id).await
        }

        async fn is_user_ever_voted(
            &self,
            tx: &mut DbTransaction,
            user_id: i64,
        ) -> anyhow::Result<bool> {
            self.0.is_user_ever_voted(tx, user_id).await
        }
    }

    #[tokio::test]
    async fn test_unique_ballot_conflict_rolls_back() {
        let f = setup().await;
        let candidate = insert_candidate(&f.pool, 1, PERIOD).await;
        let user = voter(&f.pool, "2207411001", true).await;

        // The other ballot is already committed, the access flag not yet
        let mut tx = f.pool.begin().await.unwrap();
        let hashed = test_hasher().hash(&user.nim).unwrap();
        SqlxVoteRepository::new(test_hasher())
            .save_vote_record(&mut tx, &Vote::new(candidate.id, hashed, PERIOD))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let service = VoteServiceImpl::new(
            f.pool.clone(),
            Arc::new(StaleVoteRepository(SqlxVoteRepository::new(test_hasher()))),
            SqlxVotingAccessRepository::boxed(),
            SqlxCandidateRepository::boxed(),
            SqlxUserRepository::boxed(),
            test_hasher(),
            PERIOD,
            f.log.clone(),
        );
        let mut live = service.subscribe();

        let (status, message) = status_of(service.cast_vote(user.id, candidate.id).await);
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(message, "Already voted");

        let mut tx = f.pool.begin().await.unwrap();
        let access = SqlxVotingAccessRepository::new()
            .get_by_user_id(&mut tx, user.id, PERIOD)
            .await
            .unwrap()
            .unwrap();
        assert!(!access.has_voted);
        tx.commit().await.unwrap();

        assert_eq!(f.service.get_total_votes(candidate.id).await.unwrap().total_votes, 1);
        assert!(live.try_recv().is_err());
        assert!(!f.log.path_for(PERIOD).exists());
    }

    #[tokio::test]
    async fn test_vote_requires_access() {
        let f = setup().await;
        let candidate = insert_candidate(&f.pool, 1, PERIOD).await;
        let unprovisioned = insert_user(&f.pool, "2207411001", UserRole::Student, "pw").await;
        let revoked = voter(&f.pool, "2207411002", false).await;

        for user_id in [unprovisioned.id, revoked.id] {
            let (status, message) = status_of(f.service.cast_vote(user_id, candidate.id).await);
            assert_eq!(status, StatusCode::FORBIDDEN);
            assert_eq!(message, "Voting access denied");
        }
        assert_eq!(f.service.get_total_votes(candidate.id).await.unwrap().total_votes, 0);
    }

    #[tokio::test]
    async fn test_vote_for_unknown_or_past_candidate() {
        let f = setup().await;
        let past = insert_candidate(&f.pool, 1, PERIOD - 1).await;
        let user = voter(&f.pool, "2207411001", true).await;

        for candidate_id in [past.id, 999] {
            let (status, _) = status_of(f.service.cast_vote(user.id, candidate_id).await);
            assert_eq!(status, StatusCode::NOT_FOUND);
        }

        // Rejected attempts leave the voter eligible
        let status = f.service.get_vote_status(user.id).await.unwrap();
        assert!(status.can_vote);
        assert!(!status.has_voted);
    }

    #[tokio::test]
    async fn test_all_tallies_and_records() {
        let f = setup().await;
        let first = insert_candidate(&f.pool, 1, PERIOD).await;
        let second = insert_candidate(&f.pool, 2, PERIOD).await;
        insert_candidate(&f.pool, 1, PERIOD - 1).await;

        for nim in ["1", "2", "3"] {
            let user = voter(&f.pool, nim, true).await;
            f.service.cast_vote(user.id, first.id).await.unwrap();
        }

        let tallies = f.service.get_all_tallies().await.unwrap();
        assert_eq!(
            tallies,
            vec![
                VoteTallyResponse { candidate_id: first.id, total_votes: 3 },
                VoteTallyResponse { candidate_id: second.id, total_votes: 0 },
            ]
        );

        let records = f.service.get_votes_by_candidate(first.id).await.unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn test_vote_status_without_access() {
        let f = setup().await;
        let user = insert_user(&f.pool, "2207411001", UserRole::Student, "pw").await;

        let status = f.service.get_vote_status(user.id).await.unwrap();
        assert_eq!(status, VoteStatusResponse { can_vote: false, has_voted: false });
    }
}
