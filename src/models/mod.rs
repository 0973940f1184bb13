//! Data models
//!
//! Database entities (User, Session, Candidate, Vote, VotingAccess) and the
//! input types used to create or change them.

mod candidate;
mod session;
mod user;
mod vote;
mod voting_access;

pub use candidate::{Candidate, CreateCandidateInput, UpdateCandidateInput};
pub use session::Session;
pub use user::{User, UserRole};
pub use vote::Vote;
pub use voting_access::VotingAccess;
