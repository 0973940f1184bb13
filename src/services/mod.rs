//! Services layer - Business logic
//!
//! Each service is a trait with one `*Impl` backed by the repositories.
//! Services open the transaction, enforce the election rules and map
//! failures to [`ServiceError`].

pub mod auth;
pub mod candidate;
pub mod download;
pub mod dto;
pub mod error;
pub mod storage;
pub mod upload;
pub mod vote;
pub mod vote_log;
pub mod voting_access;

pub use auth::{purge_expired_sessions, AuthService, AuthServiceImpl};
pub use candidate::{CandidateService, CandidateServiceImpl};
pub use download::{DownloadService, DownloadServiceImpl};
pub use error::{AppError, ServiceError, ServiceResult};
pub use storage::{DynObjectStorage, ObjectStorage, S3Storage};
pub use upload::{UploadService, UploadServiceImpl};
pub use vote::{VoteService, VoteServiceImpl};
pub use vote_log::{spawn_sync_task, VoteLog};
pub use voting_access::{VotingAccessService, VotingAccessServiceImpl};
