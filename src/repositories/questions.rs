use sqlx::PgPool;
use uuid::Uuid;

use crate::db::models::Question;

pub(crate) const COLUMNS: &str = "id, subject_id, module, prompt, options, level, value, answer";

pub(crate) async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<Vec<Question>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, Question>(&format!("SELECT {COLUMNS} FROM questions WHERE id = ANY($1)"))
        .bind(ids)
        .fetch_all(pool)
        .await
}

/// Sampling candidates: every question of `subject_id` whose module is listed.
pub(crate) async fn list_candidates(
    pool: &PgPool,
    subject_id: Uuid,
    modules: &[String],
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE subject_id = $1 AND module = ANY($2) ORDER BY id"
    ))
    .bind(subject_id)
    .bind(modules)
    .fetch_all(pool)
    .await
}
