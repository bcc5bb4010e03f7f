use thiserror::Error;
use uuid::Uuid;

/// Stable classification surfaced to clients next to the human-readable detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    Validation,
    NotFound,
    AccessDenied,
    AlreadyAttempted,
    InsufficientQuestions,
    InvalidQuestionSet,
    UpstreamUnavailable,
}

impl ErrorKind {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation_error",
            ErrorKind::NotFound => "not_found",
            ErrorKind::AccessDenied => "access_denied",
            ErrorKind::AlreadyAttempted => "already_attempted",
            ErrorKind::InsufficientQuestions => "insufficient_questions",
            ErrorKind::InvalidQuestionSet => "invalid_question_set",
            ErrorKind::UpstreamUnavailable => "upstream_unavailable",
        }
    }
}

#[derive(Debug, Error)]
pub(crate) enum ExamError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    NotFound(String),
    #[error("Question with id {0} not found")]
    QuestionNotFound(Uuid),
    #[error("Test can only be accessed between {start} and {end}")]
    OutsideWindow { start: String, end: String },
    #[error("Wrong pass key")]
    WrongPassKey,
    #[error("{0}")]
    AccessDenied(String),
    #[error("Test already attempted")]
    AlreadyAttempted,
    #[error("{0}")]
    InsufficientQuestions(String),
    #[error("{0}")]
    InvalidQuestionSet(String),
    #[error("{0}")]
    Upstream(String),
}

impl ExamError {
    pub(crate) fn kind(&self) -> ErrorKind {
        match self {
            ExamError::Validation(_) => ErrorKind::Validation,
            ExamError::NotFound(_) | ExamError::QuestionNotFound(_) => ErrorKind::NotFound,
            ExamError::OutsideWindow { .. }
            | ExamError::WrongPassKey
            | ExamError::AccessDenied(_) => ErrorKind::AccessDenied,
            ExamError::AlreadyAttempted => ErrorKind::AlreadyAttempted,
            ExamError::InsufficientQuestions(_) => ErrorKind::InsufficientQuestions,
            ExamError::InvalidQuestionSet(_) => ErrorKind::InvalidQuestionSet,
            ExamError::Upstream(_) => ErrorKind::UpstreamUnavailable,
        }
    }

    /// Log the underlying failure with context and return an `Upstream` variant.
    pub(crate) fn upstream(err: impl std::fmt::Display, context: &str) -> Self {
        tracing::error!(error = %err, "{context}");
        Self::Upstream(context.to_string())
    }

    pub(crate) fn access_denied(detail: impl Into<String>) -> Self {
        Self::AccessDenied(detail.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admission_failures_share_the_access_denied_kind() {
        let window = ExamError::OutsideWindow { start: "a".into(), end: "b".into() };
        assert_eq!(window.kind(), ErrorKind::AccessDenied);
        assert_eq!(ExamError::WrongPassKey.kind(), ErrorKind::AccessDenied);
        assert_eq!(ExamError::AlreadyAttempted.kind().as_str(), "already_attempted");
    }

    #[test]
    fn upstream_hides_the_cause() {
        let err = ExamError::upstream("connection reset", "Failed to load test");
        assert_eq!(err.to_string(), "Failed to load test");
        assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);
    }
}
