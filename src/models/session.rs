//! Session model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-side login session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (the cookie value)
    pub id: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// New session for `user_id` that lives `max_age_secs` seconds
    pub fn new(user_id: i64, max_age_secs: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().simple().to_string(),
            user_id,
            expires_at: now + Duration::seconds(max_age_secs),
            created_at: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_expiration_check() {
        let valid = Session::new(1, 3600);
        assert!(!valid.is_expired());
        assert_eq!(valid.id.len(), 32);

        let mut expired = Session::new(1, 3600);
        expired.expires_at = Utc::now() - Duration::seconds(1);
        assert!(expired.is_expired());
    }

    #[test]
    fn test_session_ids_are_unique() {
        assert_ne!(Session::new(1, 60).id, Session::new(1, 60).id);
    }
}
