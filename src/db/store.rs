use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::{Answer, AnswerReview, Question, Test, TestDetail};
use crate::repositories;
use crate::services::stores::{
    AnswerQuery, AnswerStore, QuestionSource, StoreError, TestQuery, TestStore,
};

/// Postgres-backed implementation of every engine store.
#[derive(Clone)]
pub(crate) struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub(crate) fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn classify(err: sqlx::Error) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            StoreError::Conflict(db_err.constraint().unwrap_or("unique").to_string())
        }
        _ => StoreError::Database(err),
    }
}

#[async_trait]
impl TestStore for PgStore {
    async fn insert_test(&self, test: &Test) -> Result<Test, StoreError> {
        repositories::test_definitions::create(
            &self.pool,
            repositories::test_definitions::CreateTest {
                id: test.id,
                title: test.title.as_deref(),
                professor_id: test.professor_id,
                subject_id: test.subject_id,
                start_time: test.start_time,
                end_time: test.end_time,
                questions: &test.questions.0,
                pass_key: test.pass_key,
                created_at: test.created_at,
            },
        )
        .await
        .map_err(classify)
    }

    async fn find_test(&self, id: Uuid) -> Result<Option<Test>, StoreError> {
        Ok(repositories::test_definitions::find_by_id(&self.pool, id).await?)
    }

    async fn find_test_detail(&self, id: Uuid) -> Result<Option<TestDetail>, StoreError> {
        Ok(repositories::test_definitions::find_detail(&self.pool, id).await?)
    }

    async fn list_tests(&self, query: &TestQuery) -> Result<Vec<TestDetail>, StoreError> {
        Ok(repositories::test_definitions::list(&self.pool, query.professor_id, query.window)
            .await?)
    }
}

#[async_trait]
impl AnswerStore for PgStore {
    async fn has_attempt(&self, student_id: Uuid, test_id: Uuid) -> Result<bool, StoreError> {
        Ok(repositories::answers::exists_for(&self.pool, student_id, test_id).await?)
    }

    async fn insert_answer(&self, answer: &Answer) -> Result<Answer, StoreError> {
        repositories::answers::create(
            &self.pool,
            repositories::answers::CreateAnswer {
                id: answer.id,
                student_id: answer.student_id,
                test_id: answer.test_id,
                questions: &answer.questions.0,
                max_marks: answer.max_marks,
                score: answer.score,
                created_at: answer.created_at,
            },
        )
        .await
        .map_err(classify)
    }

    async fn list_answers(
        &self,
        student_id: Uuid,
        query: &AnswerQuery,
    ) -> Result<Vec<AnswerReview>, StoreError> {
        Ok(repositories::answers::list_for_student(
            &self.pool,
            student_id,
            query.test_id,
            query.window,
        )
        .await?)
    }

    async fn find_answer(
        &self,
        student_id: Uuid,
        answer_id: Uuid,
    ) -> Result<Option<AnswerReview>, StoreError> {
        Ok(repositories::answers::find_for_student(&self.pool, student_id, answer_id).await?)
    }
}

#[async_trait]
impl QuestionSource for PgStore {
    async fn find_question(&self, id: Uuid) -> Result<Option<Question>, StoreError> {
        Ok(repositories::questions::find_by_id(&self.pool, id).await?)
    }

    async fn find_questions(&self, ids: &[Uuid]) -> Result<Vec<Question>, StoreError> {
        Ok(repositories::questions::find_by_ids(&self.pool, ids).await?)
    }
}
