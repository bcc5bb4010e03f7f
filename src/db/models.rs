use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::types::DifficultyLevel;

/// Question-bank record, canonical answer included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub(crate) struct Question {
    pub(crate) id: Uuid,
    pub(crate) subject_id: Uuid,
    pub(crate) module: String,
    pub(crate) prompt: String,
    pub(crate) options: Json<Vec<String>>,
    pub(crate) level: DifficultyLevel,
    pub(crate) value: i32,
    pub(crate) answer: Json<Vec<String>>,
}

impl Question {
    pub(crate) fn snapshot(&self, keep_answer: bool) -> QuestionSnapshot {
        QuestionSnapshot {
            id: self.id,
            module: self.module.clone(),
            prompt: self.prompt.clone(),
            options: self.options.0.clone(),
            level: self.level,
            value: self.value,
            answer: keep_answer.then(|| self.answer.0.clone()),
        }
    }
}

/// Frozen copy of a question embedded in a test at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct QuestionSnapshot {
    pub(crate) id: Uuid,
    pub(crate) module: String,
    pub(crate) prompt: String,
    pub(crate) options: Vec<String>,
    pub(crate) level: DifficultyLevel,
    pub(crate) value: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) answer: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub(crate) struct Test {
    pub(crate) id: Uuid,
    pub(crate) title: Option<String>,
    pub(crate) professor_id: Uuid,
    pub(crate) subject_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) start_time: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) end_time: OffsetDateTime,
    pub(crate) questions: Json<Vec<QuestionSnapshot>>,
    pub(crate) pass_key: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) created_at: OffsetDateTime,
}

impl Test {
    /// Inclusive on both ends.
    pub(crate) fn is_open_at(&self, now: OffsetDateTime) -> bool {
        self.start_time <= now && now <= self.end_time
    }
}

/// Test joined with its subject and owning professor. Missing joins stay empty.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct TestDetail {
    #[sqlx(flatten)]
    pub(crate) test: Test,
    pub(crate) subject_code: Option<String>,
    pub(crate) subject_name: Option<String>,
    pub(crate) professor_name: Option<String>,
    pub(crate) professor_email: Option<String>,
}

/// One graded line of an answer sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct GradedEntry {
    pub(crate) question_id: Uuid,
    pub(crate) answer: Vec<String>,
    pub(crate) correct_answer: Vec<String>,
    pub(crate) value: i32,
    pub(crate) correct: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub(crate) struct Answer {
    pub(crate) id: Uuid,
    pub(crate) student_id: Uuid,
    pub(crate) test_id: Uuid,
    pub(crate) questions: Json<Vec<GradedEntry>>,
    pub(crate) max_marks: i32,
    pub(crate) score: i32,
    #[serde(with = "time::serde::rfc3339")]
    pub(crate) created_at: OffsetDateTime,
}

/// Answer joined with its test, subject and professor for review screens.
#[derive(Debug, Clone, FromRow)]
pub(crate) struct AnswerReview {
    #[sqlx(flatten)]
    pub(crate) answer: Answer,
    pub(crate) test_title: Option<String>,
    pub(crate) start_time: OffsetDateTime,
    pub(crate) end_time: OffsetDateTime,
    pub(crate) subject_code: Option<String>,
    pub(crate) subject_name: Option<String>,
    pub(crate) professor_name: Option<String>,
    pub(crate) professor_email: Option<String>,
}
