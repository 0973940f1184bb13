//! Vote model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One recorded ballot.
///
/// The voter is only identified by `hashed_nim`, so a ballot cannot be
/// traced back to a student without the hashing key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: i64,
    pub candidate_id: i64,
    pub hashed_nim: String,
    pub period: i32,
    pub created_at: DateTime<Utc>,
}

impl Vote {
    pub fn new(candidate_id: i64, hashed_nim: impl Into<String>, period: i32) -> Self {
        Self {
            id: 0,
            candidate_id,
            hashed_nim: hashed_nim.into(),
            period,
            created_at: Utc::now(),
        }
    }
}
