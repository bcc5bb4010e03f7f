use sqlx::types::Json;
use sqlx::PgPool;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::db::models::{QuestionSnapshot, Test, TestDetail};

pub(crate) const COLUMNS: &str =
    "id, title, professor_id, subject_id, start_time, end_time, questions, pass_key, created_at";

const DETAIL_SELECT: &str = "\
    SELECT t.id, t.title, t.professor_id, t.subject_id, t.start_time, t.end_time, \
           t.questions, t.pass_key, t.created_at, \
           s.code AS subject_code, s.name AS subject_name, \
           p.name AS professor_name, p.email AS professor_email \
    FROM tests t \
    LEFT JOIN subjects s ON s.id = t.subject_id \
    LEFT JOIN professors p ON p.id = t.professor_id";

pub(crate) struct CreateTest<'a> {
    pub(crate) id: Uuid,
    pub(crate) title: Option<&'a str>,
    pub(crate) professor_id: Uuid,
    pub(crate) subject_id: Uuid,
    pub(crate) start_time: OffsetDateTime,
    pub(crate) end_time: OffsetDateTime,
    pub(crate) questions: &'a [QuestionSnapshot],
    pub(crate) pass_key: i32,
    pub(crate) created_at: OffsetDateTime,
}

pub(crate) async fn create(pool: &PgPool, params: CreateTest<'_>) -> Result<Test, sqlx::Error> {
    sqlx::query_as::<_, Test>(&format!(
        "INSERT INTO tests ({COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.title)
    .bind(params.professor_id)
    .bind(params.subject_id)
    .bind(params.start_time)
    .bind(params.end_time)
    .bind(Json(params.questions))
    .bind(params.pass_key)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Test>, sqlx::Error> {
    sqlx::query_as::<_, Test>(&format!("SELECT {COLUMNS} FROM tests WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_detail(pool: &PgPool, id: Uuid) -> Result<Option<TestDetail>, sqlx::Error> {
    sqlx::query_as::<_, TestDetail>(&format!("{DETAIL_SELECT} WHERE t.id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

/// Lists tests, optionally owned by `professor_id` and starting strictly inside `window`.
pub(crate) async fn list(
    pool: &PgPool,
    professor_id: Option<Uuid>,
    window: Option<(OffsetDateTime, OffsetDateTime)>,
) -> Result<Vec<TestDetail>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(DETAIL_SELECT);
    builder.push(" WHERE TRUE");

    if let Some(professor_id) = professor_id {
        builder.push(" AND t.professor_id = ");
        builder.push_bind(professor_id);
    }

    if let Some((after, before)) = window {
        builder.push(" AND t.start_time > ");
        builder.push_bind(after);
        builder.push(" AND t.start_time < ");
        builder.push_bind(before);
    }

    builder.push(" ORDER BY t.start_time DESC, t.id");
    builder.build_query_as::<TestDetail>().fetch_all(pool).await
}
