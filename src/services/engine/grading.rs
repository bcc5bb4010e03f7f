use std::collections::{HashMap, HashSet};

use sqlx::types::Json;
use time::OffsetDateTime;
use uuid::Uuid;
use validator::Validate;

use super::{ExamEngine, SessionGrant};
use crate::db::models::{Answer, GradedEntry, Question, Test};
use crate::schemas::answer::FinishTestRequest;
use crate::services::cache::{
    question_key, read_projection, session_token_key, write_projection, CacheError,
};
use crate::services::errors::ExamError;
use crate::services::stores::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GradeSheet {
    pub(crate) entries: Vec<GradedEntry>,
    pub(crate) max_marks: i32,
    pub(crate) score: i32,
}

/// Scores each response against its canonical answer. A response counts only
/// when it matches element for element, in order and case.
pub(crate) fn grade(submitted: &[(Uuid, Vec<String>)], canonical: &HashMap<Uuid, Question>) -> GradeSheet {
    let mut sheet = GradeSheet { entries: Vec::with_capacity(submitted.len()), max_marks: 0, score: 0 };

    for (question_id, response) in submitted {
        let Some(question) = canonical.get(question_id) else {
            continue;
        };
        let correct = *response == question.answer.0;
        if correct {
            sheet.score += question.value;
        }
        sheet.max_marks += question.value;
        sheet.entries.push(GradedEntry {
            question_id: *question_id,
            answer: response.clone(),
            correct_answer: question.answer.0.clone(),
            value: question.value,
            correct,
        });
    }

    sheet
}

fn parse_submission(request: FinishTestRequest) -> Result<Vec<(Uuid, Vec<String>)>, ExamError> {
    request.validate().map_err(|e| ExamError::Validation(e.to_string()))?;

    let mut seen = HashSet::with_capacity(request.questions.len());
    let mut submitted = Vec::with_capacity(request.questions.len());
    for entry in request.questions {
        let question_id = Uuid::parse_str(entry.question_id.trim()).map_err(|_| {
            ExamError::Validation(format!("question_id {} is not a valid id", entry.question_id))
        })?;
        if !seen.insert(question_id) {
            return Err(ExamError::Validation(format!(
                "question {question_id} is answered more than once"
            )));
        }
        submitted.push((question_id, entry.answer));
    }

    Ok(submitted)
}

/// Lays the submitted responses over the test's frozen question list. Entries for
/// questions outside the test are rejected; test questions left out are graded as
/// unanswered so `max_marks` always covers the whole test.
fn align_with_test(
    test: &Test,
    submitted: Vec<(Uuid, Vec<String>)>,
) -> Result<Vec<(Uuid, Vec<String>)>, ExamError> {
    let mut responses: HashMap<Uuid, Vec<String>> = submitted.into_iter().collect();
    let foreign = responses.keys().find(|id| !test.questions.0.iter().any(|q| q.id == **id));
    if let Some(foreign) = foreign {
        return Err(ExamError::Validation(format!(
            "question {foreign} is not part of test {}",
            test.id
        )));
    }

    Ok(test
        .questions
        .0
        .iter()
        .map(|snapshot| (snapshot.id, responses.remove(&snapshot.id).unwrap_or_default()))
        .collect())
}

fn counted(outcome: &'static str, err: ExamError) -> ExamError {
    metrics::counter!("test_submissions_total", "outcome" => outcome).increment(1);
    err
}

impl ExamEngine {
    pub(crate) async fn finish_test(
        &self,
        grant: &SessionGrant,
        request: FinishTestRequest,
        now: OffsetDateTime,
    ) -> Result<Answer, ExamError> {
        let submitted = parse_submission(request).map_err(|e| counted("invalid", e))?;

        let attempted = self
            .answers
            .has_attempt(grant.student_id, grant.test_id)
            .await
            .map_err(|e| ExamError::upstream(e, "Failed to check previous attempts"))?;
        if attempted {
            return Err(counted("already_attempted", ExamError::AlreadyAttempted));
        }

        let test = self.load_test(grant.test_id).await?;
        let sheet_entries =
            align_with_test(&test, submitted).map_err(|e| counted("invalid", e))?;

        let mut canonical = HashMap::with_capacity(sheet_entries.len());
        for (question_id, _) in &sheet_entries {
            let question = self.resolve_question(*question_id).await.map_err(|e| match e {
                ExamError::QuestionNotFound(_) => counted("question_not_found", e),
                other => other,
            })?;
            canonical.insert(*question_id, question);
        }

        let sheet = grade(&sheet_entries, &canonical);
        let answer = Answer {
            id: Uuid::new_v4(),
            student_id: grant.student_id,
            test_id: grant.test_id,
            questions: Json(sheet.entries),
            max_marks: sheet.max_marks,
            score: sheet.score,
            created_at: now,
        };

        let stored = match self.answers.insert_answer(&answer).await {
            Ok(stored) => stored,
            Err(StoreError::Conflict(_)) => {
                self.evict_session(grant).await;
                return Err(counted("already_attempted", ExamError::AlreadyAttempted));
            }
            Err(err) => return Err(ExamError::upstream(err, "Failed to store answer")),
        };
        self.evict_session(grant).await;

        metrics::counter!("test_submissions_total", "outcome" => "graded").increment(1);
        tracing::info!(
            answer_id = %stored.id,
            test_id = %grant.test_id,
            student_id = %grant.student_id,
            score = stored.score,
            max_marks = stored.max_marks,
            "Answer sheet graded"
        );
        Ok(stored)
    }

    async fn evict_session(&self, grant: &SessionGrant) {
        let key = session_token_key(grant.test_id, grant.student_id);
        match self.cache.delete(&key).await {
            Ok(()) | Err(CacheError::Unavailable) => {}
            Err(err) => tracing::warn!(key, error = %err, "Failed to evict answer session"),
        }
    }

    /// Canonical answer lookup: question projection first, then the question source.
    async fn resolve_question(&self, question_id: Uuid) -> Result<Question, ExamError> {
        let key = question_key(question_id);
        if let Some(question) = read_projection::<Question>(self.cache.as_ref(), &key).await {
            return Ok(question);
        }

        let question = self
            .questions
            .find_question(question_id)
            .await
            .map_err(|e| ExamError::upstream(e, "Failed to load question"))?
            .ok_or(ExamError::QuestionNotFound(question_id))?;

        write_projection(self.cache.as_ref(), &key, &question, self.session().question_cache_ttl())
            .await;
        Ok(question)
    }
}
