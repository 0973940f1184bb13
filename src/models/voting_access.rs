//! Voting access model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Per-user eligibility record for one election period.
///
/// A voter moves from not provisioned (no record) to eligible
/// (`can_vote`) to voted (`has_voted`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingAccess {
    pub id: i64,
    pub user_id: i64,
    pub period: i32,
    pub can_vote: bool,
    pub has_voted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VotingAccess {
    /// Fresh, eligible record that has not voted yet
    pub fn new(user_id: i64, period: i32) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            user_id,
            period,
            can_vote: true,
            has_voted: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether a ballot may be cast right now
    pub fn may_vote(&self) -> bool {
        self.can_vote && !self.has_voted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voter_state_transitions() {
        let mut access = VotingAccess::new(7, 2026);
        assert!(access.may_vote());

        access.has_voted = true;
        assert!(!access.may_vote());

        let mut revoked = VotingAccess::new(8, 2026);
        revoked.can_vote = false;
        assert!(!revoked.may_vote());
    }
}
