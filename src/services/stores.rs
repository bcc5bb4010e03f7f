//! Persistence seams used by the exam engine.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::models::{Answer, AnswerReview, Question, Test, TestDetail};

#[derive(Debug, Error)]
pub(crate) enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("conflicting row: {0}")]
    Conflict(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Default)]
pub(crate) struct TestQuery {
    pub(crate) professor_id: Option<Uuid>,
    /// Open interval on `start_time`.
    pub(crate) window: Option<(OffsetDateTime, OffsetDateTime)>,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct AnswerQuery {
    pub(crate) test_id: Option<Uuid>,
    /// Open interval on the submission time.
    pub(crate) window: Option<(OffsetDateTime, OffsetDateTime)>,
}

#[async_trait]
pub(crate) trait TestStore: Send + Sync {
    async fn insert_test(&self, test: &Test) -> Result<Test, StoreError>;

    async fn find_test(&self, id: Uuid) -> Result<Option<Test>, StoreError>;

    async fn find_test_detail(&self, id: Uuid) -> Result<Option<TestDetail>, StoreError>;

    async fn list_tests(&self, query: &TestQuery) -> Result<Vec<TestDetail>, StoreError>;
}

#[async_trait]
pub(crate) trait AnswerStore: Send + Sync {
    async fn has_attempt(&self, student_id: Uuid, test_id: Uuid) -> Result<bool, StoreError>;

    /// Must reject a second answer for the same (student, test) with `StoreError::Conflict`.
    async fn insert_answer(&self, answer: &Answer) -> Result<Answer, StoreError>;

    async fn list_answers(
        &self,
        student_id: Uuid,
        query: &AnswerQuery,
    ) -> Result<Vec<AnswerReview>, StoreError>;

    async fn find_answer(
        &self,
        student_id: Uuid,
        answer_id: Uuid,
    ) -> Result<Option<AnswerReview>, StoreError>;
}

/// Authoritative question records, owned by the question bank.
#[async_trait]
pub(crate) trait QuestionSource: Send + Sync {
    async fn find_question(&self, id: Uuid) -> Result<Option<Question>, StoreError>;

    async fn find_questions(&self, ids: &[Uuid]) -> Result<Vec<Question>, StoreError>;
}
