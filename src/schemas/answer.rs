use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{ProfessorInfo, SubjectInfo};
use crate::core::time::format_offset;
use crate::db::models::{Answer, AnswerReview, GradedEntry};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub(crate) struct SubmittedAnswer {
    #[serde(alias = "questionId")]
    #[validate(length(min = 1, message = "question_id must not be empty"))]
    pub(crate) question_id: String,
    pub(crate) answer: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub(crate) struct FinishTestRequest {
    #[validate(length(min = 1, message = "questions must not be empty"), nested)]
    pub(crate) questions: Vec<SubmittedAnswer>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct AnswerFilter {
    #[serde(default, alias = "testId")]
    pub(crate) test_id: Option<String>,
    #[serde(default)]
    pub(crate) date: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub(crate) struct AnswerResult {
    pub(crate) max_marks: i32,
    pub(crate) score: i32,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AnswerResponse {
    pub(crate) id: Uuid,
    pub(crate) student_id: Uuid,
    pub(crate) test_id: Uuid,
    pub(crate) questions: Vec<GradedEntry>,
    pub(crate) result: AnswerResult,
    pub(crate) created_at: String,
}

impl From<Answer> for AnswerResponse {
    fn from(answer: Answer) -> Self {
        Self {
            id: answer.id,
            student_id: answer.student_id,
            test_id: answer.test_id,
            questions: answer.questions.0,
            result: AnswerResult { max_marks: answer.max_marks, score: answer.score },
            created_at: format_offset(answer.created_at),
        }
    }
}

/// Answer joined to its test, without the pass key or the test's question list.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct AnswerSummary {
    pub(crate) id: Uuid,
    pub(crate) test_id: Uuid,
    pub(crate) test_title: Option<String>,
    pub(crate) start_time: String,
    pub(crate) end_time: String,
    pub(crate) subject: Option<SubjectInfo>,
    pub(crate) professor: Option<ProfessorInfo>,
    pub(crate) result: AnswerResult,
    pub(crate) submitted_at: String,
}

impl From<AnswerReview> for AnswerSummary {
    fn from(review: AnswerReview) -> Self {
        AnswerDetailResponse::from(review).summary
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AnswerDetailResponse {
    #[serde(flatten)]
    pub(crate) summary: AnswerSummary,
    pub(crate) questions: Vec<GradedEntry>,
}

impl From<AnswerReview> for AnswerDetailResponse {
    fn from(review: AnswerReview) -> Self {
        let answer = review.answer;
        Self {
            summary: AnswerSummary {
                id: answer.id,
                test_id: answer.test_id,
                test_title: review.test_title,
                start_time: format_offset(review.start_time),
                end_time: format_offset(review.end_time),
                subject: SubjectInfo::from_parts(review.subject_code, review.subject_name),
                professor: ProfessorInfo::from_parts(review.professor_name, review.professor_email),
                result: AnswerResult { max_marks: answer.max_marks, score: answer.score },
                submitted_at: format_offset(answer.created_at),
            },
            questions: answer.questions.0,
        }
    }
}
