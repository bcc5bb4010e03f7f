//! Test lifecycle: authoring, admission, grading and review.
//!
//! The engine owns no storage. It talks to the stores, the question source,
//! the sampling channel and the session cache through trait objects, and every
//! operation takes the caller's [`Principal`] plus the current instant so the
//! time-window rules can be exercised deterministically.

mod admission;
mod authoring;
mod grading;
mod review;

use std::sync::Arc;

use uuid::Uuid;

pub(crate) use admission::SessionGrant;

use crate::core::config::{SessionSettings, Settings};
use crate::db::types::Role;
use crate::services::cache::SessionCache;
use crate::services::errors::ExamError;
use crate::services::sampling::SamplingChannel;
use crate::services::stores::{AnswerStore, QuestionSource, TestStore};

/// Verified caller identity handed to every engine operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Principal {
    pub(crate) id: Uuid,
    pub(crate) role: Role,
    pub(crate) subject_id: Option<Uuid>,
}

impl Principal {
    pub(crate) fn ensure_role(&self, role: Role) -> Result<(), ExamError> {
        if self.role == role {
            Ok(())
        } else {
            Err(ExamError::access_denied(format!("{} access required", role.as_str())))
        }
    }

    /// Returns the subject the professor teaches.
    pub(crate) fn require_professor(&self) -> Result<Uuid, ExamError> {
        self.ensure_role(Role::Professor)?;
        self.subject_id
            .ok_or_else(|| ExamError::access_denied("Professor has no subject assigned"))
    }

    pub(crate) fn require_student(&self) -> Result<(), ExamError> {
        self.ensure_role(Role::Student)
    }
}

#[derive(Clone)]
pub(crate) struct ExamEngine {
    settings: Settings,
    tests: Arc<dyn TestStore>,
    answers: Arc<dyn AnswerStore>,
    questions: Arc<dyn QuestionSource>,
    sampling: Arc<dyn SamplingChannel>,
    cache: Arc<dyn SessionCache>,
}

impl ExamEngine {
    pub(crate) fn new(
        settings: Settings,
        tests: Arc<dyn TestStore>,
        answers: Arc<dyn AnswerStore>,
        questions: Arc<dyn QuestionSource>,
        sampling: Arc<dyn SamplingChannel>,
        cache: Arc<dyn SessionCache>,
    ) -> Self {
        Self { settings, tests, answers, questions, sampling, cache }
    }

    fn session(&self) -> &SessionSettings {
        self.settings.session()
    }
}

/// Ids arrive as path or body strings; an unparsable id names nothing.
pub(crate) fn parse_id(raw: &str, entity: &str) -> Result<Uuid, ExamError> {
    Uuid::parse_str(raw.trim()).map_err(|_| ExamError::NotFound(format!("No {entity} found for {raw}")))
}
