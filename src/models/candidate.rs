//! Candidate model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A president/vice pair running in one period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    pub id: i64,
    /// Ballot number
    pub number: i32,
    pub president: String,
    pub vice: String,
    pub president_nim: String,
    pub vice_nim: String,
    pub president_study_program: String,
    pub vice_study_program: String,
    pub vision: String,
    pub mission: String,
    /// Object storage key of the campaign photo
    pub photo_key: Option<String>,
    pub period: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields accepted when creating a candidate
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCandidateInput {
    pub number: i32,
    pub president: String,
    pub vice: String,
    pub president_nim: String,
    pub vice_nim: String,
    pub president_study_program: String,
    pub vice_study_program: String,
    #[serde(default)]
    pub vision: String,
    #[serde(default)]
    pub mission: String,
    #[serde(default)]
    pub photo_key: Option<String>,
    /// Defaults to the active period
    #[serde(default)]
    pub period: Option<i32>,
}

/// Partial update; absent fields stay unchanged
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCandidateInput {
    pub number: Option<i32>,
    pub president: Option<String>,
    pub vice: Option<String>,
    pub president_nim: Option<String>,
    pub vice_nim: Option<String>,
    pub president_study_program: Option<String>,
    pub vice_study_program: Option<String>,
    pub vision: Option<String>,
    pub mission: Option<String>,
    pub photo_key: Option<String>,
}

impl Candidate {
    pub fn from_input(input: CreateCandidateInput, period: i32) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            number: input.number,
            president: input.president,
            vice: input.vice,
            president_nim: input.president_nim,
            vice_nim: input.vice_nim,
            president_study_program: input.president_study_program,
            vice_study_program: input.vice_study_program,
            vision: input.vision,
            mission: input.mission,
            photo_key: input.photo_key.filter(|k| !k.trim().is_empty()),
            period,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update in place
    pub fn apply(&mut self, input: UpdateCandidateInput) {
        if let Some(number) = input.number {
            self.number = number;
        }
        if let Some(president) = input.president {
            self.president = president;
        }
        if let Some(vice) = input.vice {
            self.vice = vice;
        }
        if let Some(nim) = input.president_nim {
            self.president_nim = nim;
        }
        if let Some(nim) = input.vice_nim {
            self.vice_nim = nim;
        }
        if let Some(program) = input.president_study_program {
            self.president_study_program = program;
        }
        if let Some(program) = input.vice_study_program {
            self.vice_study_program = program;
        }
        if let Some(vision) = input.vision {
            self.vision = vision;
        }
        if let Some(mission) = input.mission {
            self.mission = mission;
        }
        if let Some(key) = input.photo_key {
            // an empty string clears the photo
            self.photo_key = Some(key).filter(|k| !k.trim().is_empty());
        }
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> CreateCandidateInput {
        CreateCandidateInput {
            number: 1,
            president: "Budi".into(),
            vice: "Sari".into(),
            president_nim: "2207411001".into(),
            vice_nim: "2207411002".into(),
            president_study_program: "Teknik Informatika".into(),
            vice_study_program: "Teknik Multimedia".into(),
            vision: "Maju".into(),
            mission: "Bersama".into(),
            photo_key: Some("  ".into()),
            period: None,
        }
    }

    #[test]
    fn test_from_input_drops_blank_photo_key() {
        let candidate = Candidate::from_input(input(), 2026);
        assert_eq!(candidate.period, 2026);
        assert!(candidate.photo_key.is_none());
    }

    #[test]
    fn test_apply_partial_update() {
        let mut candidate = Candidate::from_input(input(), 2026);
        candidate.apply(UpdateCandidateInput {
            vision: Some("Baru".into()),
            photo_key: Some("candidates/2026/1.png".into()),
            ..Default::default()
        });

        assert_eq!(candidate.vision, "Baru");
        assert_eq!(candidate.mission, "Bersama");
        assert_eq!(candidate.photo_key.as_deref(), Some("candidates/2026/1.png"));

        candidate.apply(UpdateCandidateInput {
            photo_key: Some(String::new()),
            ..Default::default()
        });
        assert!(candidate.photo_key.is_none());
    }
}
