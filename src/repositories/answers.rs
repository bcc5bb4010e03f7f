use sqlx::types::Json;
use sqlx::PgPool;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::models::{Answer, AnswerReview, GradedEntry};

pub(crate) const COLUMNS: &str = "id, student_id, test_id, questions, max_marks, score, created_at";

const REVIEW_SELECT: &str = "\
    SELECT a.id, a.student_id, a.test_id, a.questions, a.max_marks, a.score, a.created_at, \
           t.title AS test_title, t.start_time, t.end_time, \
           s.code AS subject_code, s.name AS subject_name, \
           p.name AS professor_name, p.email AS professor_email \
    FROM answers a \
    JOIN tests t ON t.id = a.test_id \
    LEFT JOIN subjects s ON s.id = t.subject_id \
    LEFT JOIN professors p ON p.id = t.professor_id";

pub(crate) struct CreateAnswer<'a> {
    pub(crate) id: Uuid,
    pub(crate) student_id: Uuid,
    pub(crate) test_id: Uuid,
    pub(crate) questions: &'a [GradedEntry],
    pub(crate) max_marks: i32,
    pub(crate) score: i32,
    pub(crate) created_at: OffsetDateTime,
}

pub(crate) async fn exists_for(
    pool: &PgPool,
    student_id: Uuid,
    test_id: Uuid,
) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM answers WHERE student_id = $1 AND test_id = $2)",
    )
    .bind(student_id)
    .bind(test_id)
    .fetch_one(pool)
    .await
}

/// Fails with a unique violation when the student already has an answer for the test.
pub(crate) async fn create(pool: &PgPool, params: CreateAnswer<'_>) -> Result<Answer, sqlx::Error> {
    sqlx::query_as::<_, Answer>(&format!(
        "INSERT INTO answers ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.student_id)
    .bind(params.test_id)
    .bind(Json(params.questions))
    .bind(params.max_marks)
    .bind(params.score)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn list_for_student(
    pool: &PgPool,
    student_id: Uuid,
    test_id: Option<Uuid>,
    window: Option<(OffsetDateTime, OffsetDateTime)>,
) -> Result<Vec<AnswerReview>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(REVIEW_SELECT);
    builder.push(" WHERE a.student_id = ");
    builder.push_bind(student_id);

    if let Some(test_id) = test_id {
        builder.push(" AND a.test_id = ");
        builder.push_bind(test_id);
    }

    if let Some((after, before)) = window {
        builder.push(" AND a.created_at > ");
        builder.push_bind(after);
        builder.push(" AND a.created_at < ");
        builder.push_bind(before);
    }

    builder.push(" ORDER BY a.created_at DESC");
    builder.build_query_as::<AnswerReview>().fetch_all(pool).await
}

pub(crate) async fn find_for_student(
    pool: &PgPool,
    student_id: Uuid,
    answer_id: Uuid,
) -> Result<Option<AnswerReview>, sqlx::Error> {
    sqlx::query_as::<_, AnswerReview>(&format!(
        "{REVIEW_SELECT} WHERE a.id = $1 AND a.student_id = $2"
    ))
    .bind(answer_id)
    .bind(student_id)
    .fetch_optional(pool)
    .await
}
