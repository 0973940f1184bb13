//! Database repositories
//!
//! One repository per table. Every method takes the caller's
//! [`DbTransaction`](crate::db::DbTransaction); repositories never open
//! or commit transactions themselves.

pub mod auth;
pub mod candidate;
pub mod user;
pub mod vote;
pub mod voting_access;

pub use auth::{AuthRepository, SqlxAuthRepository};
pub use candidate::{CandidateRepository, SqlxCandidateRepository};
pub use user::{SqlxUserRepository, UserRepository};
pub use vote::{SqlxVoteRepository, VoteRepository};
pub use voting_access::{SqlxVotingAccessRepository, VotingAccessRepository};
