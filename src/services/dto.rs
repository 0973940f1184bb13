//! Service results and inputs
//!
//! What the services hand back to callers. The `to_*` helpers map domain
//! structs field by field and never reorder.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Candidate, User, UserRole, Vote, VotingAccess};

// ============================================================================
// Auth
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub nim: Option<String>,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoginResponse {
    pub id: i64,
    pub nim: String,
    pub full_name: String,
    pub study_program: String,
    pub role: UserRole,
    pub phone_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub user_id: i64,
    pub role: UserRole,
    pub expires_at: DateTime<Utc>,
}

pub fn to_login_response(user: &User) -> LoginResponse {
    LoginResponse {
        id: user.id,
        nim: user.nim.clone(),
        full_name: user.full_name.clone(),
        study_program: user.study_program.clone(),
        role: user.role,
        phone_number: user.phone_number.clone(),
        created_at: user.created_at,
        updated_at: user.updated_at,
    }
}

// ============================================================================
// Votes
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteResponse {
    pub id: i64,
    pub candidate_id: i64,
    pub hashed_nim: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTallyResponse {
    pub candidate_id: i64,
    pub total_votes: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteStatusResponse {
    pub can_vote: bool,
    pub has_voted: bool,
}

pub fn to_vote_response(vote: Vote) -> VoteResponse {
    VoteResponse {
        id: vote.id,
        candidate_id: vote.candidate_id,
        hashed_nim: vote.hashed_nim,
        created_at: vote.created_at,
    }
}

pub fn to_votes_response(votes: Vec<Vote>) -> Vec<VoteResponse> {
    votes.into_iter().map(to_vote_response).collect()
}

// ============================================================================
// Voting access
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingAccessResponse {
    pub id: i64,
    pub user_id: i64,
    pub period: i32,
    pub can_vote: bool,
    pub has_voted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn to_voting_access_response(access: VotingAccess) -> VotingAccessResponse {
    VotingAccessResponse {
        id: access.id,
        user_id: access.user_id,
        period: access.period,
        can_vote: access.can_vote,
        has_voted: access.has_voted,
        created_at: access.created_at,
        updated_at: access.updated_at,
    }
}

// ============================================================================
// Candidates
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateResponse {
    pub id: i64,
    pub number: i32,
    pub president: String,
    pub vice: String,
    pub president_nim: String,
    pub vice_nim: String,
    pub president_study_program: String,
    pub vice_study_program: String,
    pub vision: String,
    pub mission: String,
    pub photo_key: Option<String>,
    pub photo_url: Option<String>,
    pub period: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn to_candidate_response(candidate: Candidate, photo_url: Option<String>) -> CandidateResponse {
    CandidateResponse {
        id: candidate.id,
        number: candidate.number,
        president: candidate.president,
        vice: candidate.vice,
        president_nim: candidate.president_nim,
        vice_nim: candidate.vice_nim,
        president_study_program: candidate.president_study_program,
        vice_study_program: candidate.vice_study_program,
        vision: candidate.vision,
        mission: candidate.mission,
        photo_key: candidate.photo_key,
        photo_url,
        period: candidate.period,
        created_at: candidate.created_at,
        updated_at: candidate.updated_at,
    }
}

// ============================================================================
// Object storage
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresignedUrlResponse {
    pub url: String,
    pub key: String,
    /// Seconds the URL stays valid
    pub expires_in: u64,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadUrlResponse {
    pub url: String,
    pub key: String,
    pub file_name: String,
}
