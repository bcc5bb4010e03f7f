use std::collections::HashMap;

use rand::Rng;
use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use super::{ExamEngine, Principal};
use crate::db::models::{Question, QuestionSnapshot, Test};
use crate::schemas::test_definition::{AutoTestCreate, ManualTestCreate};
use crate::services::errors::ExamError;
use crate::services::sampling::{parse_candidates, select_by_tier};

const PASS_KEY_MIN: i32 = 100_000;
const PASS_KEY_MAX: i32 = 999_999;

pub(crate) fn generate_pass_key() -> i32 {
    rand::thread_rng().gen_range(PASS_KEY_MIN..=PASS_KEY_MAX)
}

fn ensure_window(start: OffsetDateTime, end: OffsetDateTime) -> Result<(), ExamError> {
    if start < end {
        Ok(())
    } else {
        Err(ExamError::Validation("end_time must be after start_time".to_string()))
    }
}

fn insufficient(outcome: &'static str, detail: &str) -> ExamError {
    metrics::counter!("question_sampling_total", "outcome" => outcome).increment(1);
    ExamError::InsufficientQuestions(detail.to_string())
}

impl ExamEngine {
    pub(crate) async fn create_manual_test(
        &self,
        principal: &Principal,
        request: ManualTestCreate,
        now: OffsetDateTime,
    ) -> Result<Test, ExamError> {
        let subject_id = principal.require_professor()?;
        request.validate().map_err(|e| ExamError::Validation(e.to_string()))?;
        let title = request.title.trim();
        if title.is_empty() {
            return Err(ExamError::Validation("title must not be blank".to_string()));
        }
        ensure_window(request.start_time, request.end_time)?;

        let ids = request
            .question_ids
            .iter()
            .map(|raw| Uuid::parse_str(raw.trim()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| ExamError::InvalidQuestionSet("Invalid questions".to_string()))?;

        let found = self
            .questions
            .find_questions(&ids)
            .await
            .map_err(|e| ExamError::upstream(e, "Failed to resolve questions"))?;
        if found.len() != ids.len() {
            return Err(ExamError::InvalidQuestionSet(format!(
                "Invalid questions: {} of {} could be resolved",
                found.len(),
                ids.len()
            )));
        }

        let by_id: HashMap<Uuid, &Question> =
            found.iter().map(|question| (question.id, question)).collect();
        let snapshots = ids
            .iter()
            .map(|id| by_id.get(id).map(|question| question.snapshot(false)))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ExamError::InvalidQuestionSet("Invalid questions".to_string()))?;

        let test = self
            .persist_test(
                principal,
                subject_id,
                Some(title.to_string()),
                (request.start_time, request.end_time),
                snapshots,
                now,
            )
            .await?;

        tracing::info!(
            test_id = %test.id,
            professor_id = %principal.id,
            questions = test.questions.0.len(),
            "Manual test created"
        );
        Ok(test)
    }

    pub(crate) async fn create_auto_test(
        &self,
        principal: &Principal,
        request: AutoTestCreate,
        now: OffsetDateTime,
    ) -> Result<Test, ExamError> {
        let subject_id = principal.require_professor()?;
        request.validate().map_err(|e| ExamError::Validation(e.to_string()))?;
        ensure_window(request.start_time, request.end_time)?;

        let wait = self.session().sampling_timeout();
        let reply = match tokio::time::timeout(
            wait,
            self.sampling.request(subject_id, &request.modules),
        )
        .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(err)) => {
                tracing::warn!(subject_id = %subject_id, error = %err, "Question sampling failed");
                return Err(insufficient("error", "Cannot create test, question bank unavailable"));
            }
            Err(_) => {
                tracing::warn!(
                    subject_id = %subject_id,
                    timeout_seconds = wait.as_secs(),
                    "Question sampling timed out"
                );
                return Err(insufficient("timeout", "Cannot create test, question bank timed out"));
            }
        };

        let Some(candidates) = parse_candidates(reply) else {
            return Err(insufficient("malformed", "Cannot create test, unexpected sampling reply"));
        };

        let selected = {
            let mut rng = rand::thread_rng();
            select_by_tier(candidates, request.number_of_questions, &mut rng)
        };
        let selected = match selected {
            Ok(selected) => selected,
            Err(shortfall) => return Err(insufficient("shortfall", &shortfall.to_string())),
        };
        metrics::counter!("question_sampling_total", "outcome" => "ok").increment(1);

        let snapshots = selected.iter().map(|question| question.snapshot(true)).collect();
        let test = self
            .persist_test(
                principal,
                subject_id,
                None,
                (request.start_time, request.end_time),
                snapshots,
                now,
            )
            .await?;

        tracing::info!(
            test_id = %test.id,
            professor_id = %principal.id,
            requested = request.number_of_questions,
            questions = test.questions.0.len(),
            "Auto-sampled test created"
        );
        Ok(test)
    }

    async fn persist_test(
        &self,
        principal: &Principal,
        subject_id: Uuid,
        title: Option<String>,
        (start_time, end_time): (OffsetDateTime, OffsetDateTime),
        questions: Vec<QuestionSnapshot>,
        now: OffsetDateTime,
    ) -> Result<Test, ExamError> {
        let test = Test {
            id: Uuid::new_v4(),
            title,
            professor_id: principal.id,
            subject_id,
            start_time,
            end_time,
            questions: Json(questions),
            pass_key: generate_pass_key(),
            created_at: now,
        };

        self.tests.insert_test(&test).await.map_err(|e| ExamError::upstream(e, "Failed to create test"))
    }
}
