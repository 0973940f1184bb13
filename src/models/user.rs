//! User model
//!
//! Users are provisioned outside this service (imported from the student
//! registry); request paths only read them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A student voter or an election administrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    /// Student ID number
    pub nim: String,
    pub full_name: String,
    pub study_program: String,
    pub role: UserRole,
    pub phone_number: String,
    /// Password hash (argon2)
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a user that has not been stored yet.
    ///
    /// The password must already be hashed, see `crate::crypto::hash_password`.
    pub fn new(
        nim: impl Into<String>,
        full_name: impl Into<String>,
        study_program: impl Into<String>,
        role: UserRole,
        password_hash: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            nim: nim.into(),
            full_name: full_name.into(),
            study_program: study_program.into(),
            role,
            phone_number: String::new(),
            password_hash: password_hash.into(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}

/// Role of a user. Only students cast ballots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    #[default]
    Student,
    Admin,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Student => write!(f, "student"),
            UserRole::Admin => write!(f, "admin"),
        }
    }
}

impl FromStr for UserRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "student" | "voter" => Ok(UserRole::Student),
            "admin" => Ok(UserRole::Admin),
            _ => Err(anyhow::anyhow!("Invalid user role: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_new() {
        let user = User::new("2207411001", "Ayu Lestari", "Teknik Informatika", UserRole::Student, "hash");

        assert_eq!(user.id, 0);
        assert_eq!(user.nim, "2207411001");
        assert_eq!(user.role, UserRole::Student);
        assert!(!user.is_admin());
    }

    #[test]
    fn test_password_hash_not_serialized() {
        let user = User::new("1", "Admin", "-", UserRole::Admin, "secret-hash");
        let json = serde_json::to_value(&user).unwrap();

        assert!(json.get("password_hash").is_none());
        assert_eq!(json["role"], "admin");
    }

    #[test]
    fn test_user_role_from_str() {
        assert_eq!(UserRole::from_str("student").unwrap(), UserRole::Student);
        assert_eq!(UserRole::from_str("VOTER").unwrap(), UserRole::Student);
        assert_eq!(UserRole::from_str("Admin").unwrap(), UserRole::Admin);
        assert!(UserRole::from_str("editor").is_err());
    }

    #[test]
    fn test_user_role_display_roundtrip() {
        for role in [UserRole::Student, UserRole::Admin] {
            assert_eq!(UserRole::from_str(&role.to_string()).unwrap(), role);
        }
    }
}
