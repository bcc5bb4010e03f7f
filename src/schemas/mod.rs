use std::collections::HashMap;

use serde::de::Error as _;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::core::time::parse_instant;

pub(crate) mod answer;
pub(crate) mod test_definition;

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) service: String,
    pub(crate) status: String,
    pub(crate) components: HashMap<String, String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RootResponse {
    pub(crate) message: String,
    pub(crate) version: String,
    pub(crate) docs_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct SubjectInfo {
    pub(crate) code: String,
    pub(crate) name: String,
}

impl SubjectInfo {
    pub(crate) fn from_parts(code: Option<String>, name: Option<String>) -> Option<Self> {
        match (code, name) {
            (Some(code), Some(name)) => Some(Self { code, name }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ProfessorInfo {
    pub(crate) name: String,
    pub(crate) email: String,
}

impl ProfessorInfo {
    pub(crate) fn from_parts(name: Option<String>, email: Option<String>) -> Option<Self> {
        match (name, email) {
            (Some(name), Some(email)) => Some(Self { name, email }),
            _ => None,
        }
    }
}

pub(crate) fn deserialize_instant<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_instant(&raw).ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}")))
}
