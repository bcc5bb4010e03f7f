use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use time::OffsetDateTime;

use crate::api::errors::ApiError;
use crate::api::guards::{AnswerSession, CurrentPrincipal, CurrentProfessor, CurrentStudent};
use crate::core::state::AppState;
use crate::schemas::answer::{
    AnswerDetailResponse, AnswerFilter, AnswerResponse, AnswerSummary, FinishTestRequest,
};
use crate::schemas::test_definition::{
    AdmissionResponse, AutoTestCreate, ManualTestCreate, StartTestRequest, TestDetailResponse,
    TestListQuery, TestResponse, TestSummary,
};

pub(super) async fn create_manual_test(
    CurrentProfessor(principal): CurrentProfessor,
    State(state): State<AppState>,
    payload: Result<Json<ManualTestCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<TestResponse>), ApiError> {
    let Json(payload) = payload?;
    let test =
        state.engine().create_manual_test(&principal, payload, OffsetDateTime::now_utc()).await?;
    Ok((StatusCode::CREATED, Json(test.into())))
}

pub(super) async fn create_auto_test(
    CurrentProfessor(principal): CurrentProfessor,
    State(state): State<AppState>,
    payload: Result<Json<AutoTestCreate>, JsonRejection>,
) -> Result<(StatusCode, Json<TestResponse>), ApiError> {
    let Json(payload) = payload?;
    let test =
        state.engine().create_auto_test(&principal, payload, OffsetDateTime::now_utc()).await?;
    Ok((StatusCode::CREATED, Json(test.into())))
}

pub(super) async fn list_tests(
    CurrentPrincipal(principal): CurrentPrincipal,
    State(state): State<AppState>,
    Query(query): Query<TestListQuery>,
) -> Result<Json<Vec<TestSummary>>, ApiError> {
    let tests = state.engine().list_tests(&principal, query.date.as_deref()).await?;
    Ok(Json(tests))
}

pub(super) async fn test_detail(
    Path(test_id): Path<String>,
    CurrentProfessor(principal): CurrentProfessor,
    State(state): State<AppState>,
) -> Result<Json<TestDetailResponse>, ApiError> {
    Ok(Json(state.engine().test_detail(&principal, &test_id).await?))
}

pub(super) async fn start_test(
    Path(test_id): Path<String>,
    CurrentStudent(principal): CurrentStudent,
    State(state): State<AppState>,
    payload: Result<Json<StartTestRequest>, JsonRejection>,
) -> Result<Json<AdmissionResponse>, ApiError> {
    let Json(payload) = payload?;
    let admission = state
        .engine()
        .start_test(&principal, &test_id, payload.pass_key, OffsetDateTime::now_utc())
        .await?;
    Ok(Json(admission))
}

pub(super) async fn finish_test(
    AnswerSession(grant): AnswerSession,
    State(state): State<AppState>,
    payload: Result<Json<FinishTestRequest>, JsonRejection>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let Json(payload) = payload?;
    let answer = state.engine().finish_test(&grant, payload, OffsetDateTime::now_utc()).await?;
    Ok(Json(answer.into()))
}

pub(super) async fn list_answers(
    CurrentStudent(principal): CurrentStudent,
    State(state): State<AppState>,
    filter: Option<Json<AnswerFilter>>,
) -> Result<Json<Vec<AnswerSummary>>, ApiError> {
    let filter = filter.map(|Json(filter)| filter).unwrap_or_default();
    Ok(Json(state.engine().list_answers(&principal, filter).await?))
}

pub(super) async fn answer_detail(
    Path(answer_id): Path<String>,
    CurrentStudent(principal): CurrentStudent,
    State(state): State<AppState>,
) -> Result<Json<AnswerDetailResponse>, ApiError> {
    Ok(Json(state.engine().answer_detail(&principal, &answer_id).await?))
}
