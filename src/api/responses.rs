//! Wire types
//!
//! Every success body is `{"message": .., "data": ..}` and every failure
//! body is `{"error": {"message": .., "details": ..}}`. Request bodies that
//! only the handlers read live here too.

use serde::{Deserialize, Serialize};

pub use crate::services::dto::{
    CandidateResponse, LoginRequest, LoginResponse, PresignedUrlResponse, SessionResponse,
    UploadUrlResponse, VoteResponse, VoteStatusResponse, VoteTallyResponse, VotingAccessResponse,
};

// ============================================================================
// Envelopes
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct WebResponse<T> {
    pub message: String,
    pub data: T,
}

impl<T> WebResponse<T> {
    pub fn new(message: impl Into<String>, data: T) -> Self {
        Self {
            message: message.into(),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebFailedResponse {
    pub message: String,
    pub details: String,
}

// ============================================================================
// Votes
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CastVoteRequest {
    pub candidate_id: i64,
}

// ============================================================================
// Voting access
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateVotingAccessRequest {
    pub user_id: i64,
    #[serde(default = "default_can_vote")]
    pub can_vote: bool,
}

fn default_can_vote() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateVotingAccessRequest {
    pub can_vote: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionResponse {
    pub created: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_shape() {
        let body = serde_json::to_value(WebResponse::new(
            "ok",
            VoteTallyResponse {
                candidate_id: 1,
                total_votes: 3,
            },
        ))
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"message": "ok", "data": {"candidate_id": 1, "total_votes": 3}})
        );
    }

    #[test]
    fn test_failed_envelope_shape() {
        let body = serde_json::to_value(WebFailedResponse {
            message: "Forbidden".into(),
            details: "Admins only".into(),
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"message": "Forbidden", "details": "Admins only"})
        );
    }

    #[test]
    fn test_create_access_defaults_to_eligible() {
        let request: CreateVotingAccessRequest =
            serde_json::from_str(r#"{"user_id": 7}"#).unwrap();
        assert_eq!(request.user_id, 7);
        assert!(request.can_vote);
    }
}
