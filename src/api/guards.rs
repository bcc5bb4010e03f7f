use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState};
use crate::db::types::Role;
use crate::services::engine::{Principal, SessionGrant};

/// Any authenticated caller, professor or student.
pub(crate) struct CurrentPrincipal(pub(crate) Principal);
pub(crate) struct CurrentProfessor(pub(crate) Principal);
pub(crate) struct CurrentStudent(pub(crate) Principal);

/// A verified answer-session token for one (test, student) pair.
pub(crate) struct AnswerSession(pub(crate) SessionGrant);

const INVALID_CREDENTIALS: &str = "Invalid authentication credentials";

fn bearer(parts: &Parts) -> Result<&str, ApiError> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or(ApiError::Unauthorized(INVALID_CREDENTIALS))
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer(parts)?;
        let claims = security::verify_token(token, state.settings())
            .map_err(|_| ApiError::Unauthorized(INVALID_CREDENTIALS))?;

        let id = Uuid::parse_str(&claims.sub)
            .map_err(|_| ApiError::Unauthorized(INVALID_CREDENTIALS))?;
        let subject_id = match claims.subject.as_deref() {
            Some(raw) => Some(
                Uuid::parse_str(raw).map_err(|_| ApiError::Unauthorized(INVALID_CREDENTIALS))?,
            ),
            None => None,
        };

        Ok(CurrentPrincipal(Principal { id, role: claims.role, subject_id }))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentProfessor {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentPrincipal(principal) = CurrentPrincipal::from_request_parts(parts, state).await?;
        principal.ensure_role(Role::Professor)?;
        Ok(CurrentProfessor(principal))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentStudent {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentPrincipal(principal) = CurrentPrincipal::from_request_parts(parts, state).await?;
        principal.ensure_role(Role::Student)?;
        Ok(CurrentStudent(principal))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AnswerSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer(parts)?;
        let grant = state.engine().verify_session(token).await?;
        Ok(AnswerSession(grant))
    }
}
