use time::OffsetDateTime;

use super::{parse_id, ExamEngine, Principal};
use crate::core::time::{day_window, parse_day};
use crate::db::types::Role;
use crate::schemas::answer::{AnswerDetailResponse, AnswerFilter, AnswerSummary};
use crate::schemas::test_definition::{TestDetailResponse, TestSummary};
use crate::services::errors::ExamError;
use crate::services::stores::{AnswerQuery, TestQuery};

fn date_window(date: Option<&str>) -> Result<Option<(OffsetDateTime, OffsetDateTime)>, ExamError> {
    match date.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(None),
        Some(raw) => parse_day(raw)
            .map(|day| Some(day_window(day)))
            .ok_or_else(|| ExamError::Validation(format!("date {raw} must be formatted as YYYY-MM-DD"))),
    }
}

impl ExamEngine {
    /// Full record for the owning professor, joined with subject and professor identity.
    pub(crate) async fn test_detail(
        &self,
        principal: &Principal,
        test_id: &str,
    ) -> Result<TestDetailResponse, ExamError> {
        principal.ensure_role(Role::Professor)?;
        let id = parse_id(test_id, "test")?;

        let detail = self
            .tests
            .find_test_detail(id)
            .await
            .map_err(|e| ExamError::upstream(e, "Failed to load test"))?
            .ok_or_else(|| ExamError::NotFound(format!("No test found for {test_id}")))?;

        if detail.test.professor_id != principal.id {
            return Err(ExamError::access_denied("Test belongs to another professor"));
        }

        Ok(detail.into())
    }

    /// Professors list their own tests with pass keys; students list every test without them.
    pub(crate) async fn list_tests(
        &self,
        principal: &Principal,
        date: Option<&str>,
    ) -> Result<Vec<TestSummary>, ExamError> {
        let window = date_window(date)?;
        let (professor_id, reveal_pass_key) = match principal.role {
            Role::Professor => (Some(principal.id), true),
            Role::Student => (None, false),
        };

        let rows = self
            .tests
            .list_tests(&TestQuery { professor_id, window })
            .await
            .map_err(|e| ExamError::upstream(e, "Failed to list tests"))?;
        if rows.is_empty() {
            return Err(ExamError::NotFound("No tests found".to_string()));
        }

        Ok(rows.into_iter().map(|row| TestSummary::from_detail(row, reveal_pass_key)).collect())
    }

    pub(crate) async fn list_answers(
        &self,
        principal: &Principal,
        filter: AnswerFilter,
    ) -> Result<Vec<AnswerSummary>, ExamError> {
        principal.require_student()?;
        let window = date_window(filter.date.as_deref())?;
        let test_id = match filter.test_id.as_deref().map(str::trim).filter(|raw| !raw.is_empty()) {
            Some(raw) => Some(
                parse_id(raw, "answers")
                    .map_err(|_| ExamError::NotFound("No answers found".to_string()))?,
            ),
            None => None,
        };

        let rows = self
            .answers
            .list_answers(principal.id, &AnswerQuery { test_id, window })
            .await
            .map_err(|e| ExamError::upstream(e, "Failed to list answers"))?;
        if rows.is_empty() {
            return Err(ExamError::NotFound("No answers found".to_string()));
        }

        Ok(rows.into_iter().map(AnswerSummary::from).collect())
    }

    pub(crate) async fn answer_detail(
        &self,
        principal: &Principal,
        answer_id: &str,
    ) -> Result<AnswerDetailResponse, ExamError> {
        principal.require_student()?;
        let id = parse_id(answer_id, "answer")?;

        self.answers
            .find_answer(principal.id, id)
            .await
            .map_err(|e| ExamError::upstream(e, "Failed to load answer"))?
            .map(AnswerDetailResponse::from)
            .ok_or_else(|| ExamError::NotFound(format!("No answer found for {answer_id}")))
    }
}
