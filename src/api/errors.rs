use axum::extract::rejection::JsonRejection;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::services::errors::{ErrorKind, ExamError};

#[derive(Debug, Serialize)]
struct ErrorResponse {
    status: u16,
    detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
}

#[derive(Debug)]
pub(crate) enum ApiError {
    Unauthorized(&'static str),
    /// A rejected engine operation, carrying its stable error kind.
    Exam(ExamError),
    /// A request body that could not be read as the expected JSON.
    BadRequest(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(rejection.body_text())
    }
}

impl From<ExamError> for ApiError {
    fn from(err: ExamError) -> Self {
        Self::Exam(err)
    }
}

fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation
        | ErrorKind::InsufficientQuestions
        | ErrorKind::InvalidQuestionSet => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::AccessDenied => StatusCode::FORBIDDEN,
        ErrorKind::AlreadyAttempted => StatusCode::CONFLICT,
        ErrorKind::UpstreamUnavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

fn body(status: StatusCode, detail: String, kind: Option<&'static str>) -> Response {
    (status, Json(ErrorResponse { status: status.as_u16(), detail, kind })).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized(message) => {
                let mut response =
                    body(StatusCode::UNAUTHORIZED, message.to_string(), None);
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
                response
            }
            ApiError::Exam(err) => {
                let kind = err.kind();
                let status = status_for(kind);
                if status == StatusCode::SERVICE_UNAVAILABLE {
                    tracing::error!(error = %err, "Service unavailable");
                }
                body(status, err.to_string(), Some(kind.as_str()))
            }
            ApiError::BadRequest(message) => {
                body(StatusCode::BAD_REQUEST, message, Some(ErrorKind::Validation.as_str()))
            }
        }
    }
}
