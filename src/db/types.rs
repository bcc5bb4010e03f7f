use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "difficultylevel", rename_all = "lowercase")]
pub(crate) enum DifficultyLevel {
    Easy,
    Medium,
    Hard,
}

impl DifficultyLevel {
    pub(crate) const ALL: [DifficultyLevel; 3] =
        [DifficultyLevel::Easy, DifficultyLevel::Medium, DifficultyLevel::Hard];

    /// Share of an auto-sampled test, in percent, drawn from this tier.
    pub(crate) fn quota_percent(self) -> usize {
        match self {
            DifficultyLevel::Easy => 50,
            DifficultyLevel::Medium => 30,
            DifficultyLevel::Hard => 20,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            DifficultyLevel::Easy => "easy",
            DifficultyLevel::Medium => "medium",
            DifficultyLevel::Hard => "hard",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Role {
    Professor,
    Student,
}

impl Role {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Role::Professor => "professor",
            Role::Student => "student",
        }
    }
}
