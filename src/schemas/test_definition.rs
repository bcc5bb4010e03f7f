use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use super::{deserialize_instant, ProfessorInfo, SubjectInfo};
use crate::core::time::format_offset;
use crate::db::models::{QuestionSnapshot, Test, TestDetail};

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct ManualTestCreate {
    #[validate(length(min = 1, max = 200, message = "title must be 1 to 200 characters"))]
    pub(crate) title: String,
    #[serde(alias = "startTime", deserialize_with = "deserialize_instant")]
    pub(crate) start_time: OffsetDateTime,
    #[serde(alias = "endTime", deserialize_with = "deserialize_instant")]
    pub(crate) end_time: OffsetDateTime,
    #[serde(alias = "questionIds")]
    #[validate(length(min = 1, message = "question_ids must not be empty"))]
    pub(crate) question_ids: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AutoTestCreate {
    #[serde(alias = "startTime", deserialize_with = "deserialize_instant")]
    pub(crate) start_time: OffsetDateTime,
    #[serde(alias = "endTime", deserialize_with = "deserialize_instant")]
    pub(crate) end_time: OffsetDateTime,
    #[validate(length(min = 1, message = "modules must not be empty"))]
    pub(crate) modules: Vec<String>,
    #[serde(alias = "numberOfQuestions")]
    #[validate(range(min = 1, max = 500, message = "number_of_questions must be 1 to 500"))]
    pub(crate) number_of_questions: usize,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct TestListQuery {
    #[serde(default)]
    pub(crate) date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StartTestRequest {
    #[serde(alias = "passKey")]
    pub(crate) pass_key: i32,
}

/// Full test record, pass key included. Only ever shown to professors.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct TestResponse {
    pub(crate) id: Uuid,
    pub(crate) title: Option<String>,
    pub(crate) professor_id: Uuid,
    pub(crate) subject_id: Uuid,
    pub(crate) start_time: String,
    pub(crate) end_time: String,
    pub(crate) questions: Vec<QuestionSnapshot>,
    pub(crate) pass_key: i32,
    pub(crate) created_at: String,
}

impl From<Test> for TestResponse {
    fn from(test: Test) -> Self {
        Self {
            id: test.id,
            title: test.title,
            professor_id: test.professor_id,
            subject_id: test.subject_id,
            start_time: format_offset(test.start_time),
            end_time: format_offset(test.end_time),
            questions: test.questions.0,
            pass_key: test.pass_key,
            created_at: format_offset(test.created_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TestDetailResponse {
    #[serde(flatten)]
    pub(crate) test: TestResponse,
    pub(crate) subject: Option<SubjectInfo>,
    pub(crate) professor: Option<ProfessorInfo>,
}

impl From<TestDetail> for TestDetailResponse {
    fn from(detail: TestDetail) -> Self {
        Self {
            subject: SubjectInfo::from_parts(detail.subject_code, detail.subject_name),
            professor: ProfessorInfo::from_parts(detail.professor_name, detail.professor_email),
            test: TestResponse::from(detail.test),
        }
    }
}

/// Listing entry. Question content is never listed.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct TestSummary {
    pub(crate) id: Uuid,
    pub(crate) title: Option<String>,
    pub(crate) subject: Option<SubjectInfo>,
    pub(crate) professor: Option<ProfessorInfo>,
    pub(crate) start_time: String,
    pub(crate) end_time: String,
    pub(crate) question_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) pass_key: Option<i32>,
}

impl TestSummary {
    pub(crate) fn from_detail(detail: TestDetail, reveal_pass_key: bool) -> Self {
        let test = detail.test;
        Self {
            id: test.id,
            title: test.title,
            subject: SubjectInfo::from_parts(detail.subject_code, detail.subject_name),
            professor: ProfessorInfo::from_parts(detail.professor_name, detail.professor_email),
            start_time: format_offset(test.start_time),
            end_time: format_offset(test.end_time),
            question_count: test.questions.0.len(),
            pass_key: reveal_pass_key.then_some(test.pass_key),
        }
    }
}

/// What an admitted student sees: no pass key, no canonical answers.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct PublicTest {
    pub(crate) id: Uuid,
    pub(crate) title: Option<String>,
    pub(crate) subject_id: Uuid,
    pub(crate) start_time: String,
    pub(crate) end_time: String,
    pub(crate) questions: Vec<QuestionSnapshot>,
}

impl From<&Test> for PublicTest {
    fn from(test: &Test) -> Self {
        Self {
            id: test.id,
            title: test.title.clone(),
            subject_id: test.subject_id,
            start_time: format_offset(test.start_time),
            end_time: format_offset(test.end_time),
            questions: test
                .questions
                .0
                .iter()
                .cloned()
                .map(|snapshot| QuestionSnapshot { answer: None, ..snapshot })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct AdmissionResponse {
    pub(crate) token: String,
    pub(crate) test: PublicTest,
}
