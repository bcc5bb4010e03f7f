#![allow(dead_code)]

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use crate::core::config::Settings;
use crate::db::types::Role;

#[derive(Debug, Error)]
pub(crate) enum SecurityError {
    #[error("jwt encoding failed")]
    JwtEncoding,
    #[error("jwt decoding failed")]
    JwtDecoding,
    #[error("unsupported jwt algorithm: {0}")]
    UnsupportedAlgorithm(String),
}

/// Identity claims minted by the external auth service.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct Claims {
    pub(crate) sub: String,
    pub(crate) role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) subject: Option<String>,
    pub(crate) exp: i64,
}

/// Claims of an answer-session token, valid for one (test, student) pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SessionClaims {
    pub(crate) test: Uuid,
    pub(crate) student: Uuid,
    pub(crate) exp: i64,
}

pub(crate) fn create_access_token(
    subject: &str,
    role: Role,
    subject_id: Option<Uuid>,
    settings: &Settings,
    expires_in: Duration,
) -> Result<String, SecurityError> {
    let claims = Claims {
        sub: subject.to_string(),
        role,
        subject: subject_id.map(|id| id.to_string()),
        exp: (OffsetDateTime::now_utc() + expires_in).unix_timestamp(),
    };
    sign(&claims, settings)
}

pub(crate) fn verify_token(token: &str, settings: &Settings) -> Result<Claims, SecurityError> {
    let mut validation = Validation::new(algorithm_from_settings(settings)?);
    validation.validate_exp = true;
    validation.required_spec_claims.insert("exp".to_string());
    validation.required_spec_claims.insert("sub".to_string());

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(settings.security().secret_key.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| SecurityError::JwtDecoding)
}

pub(crate) fn issue_session_token(
    test_id: Uuid,
    student_id: Uuid,
    expires_at: OffsetDateTime,
    settings: &Settings,
) -> Result<String, SecurityError> {
    let claims =
        SessionClaims { test: test_id, student: student_id, exp: expires_at.unix_timestamp() };
    sign(&claims, settings)
}

pub(crate) fn verify_session_token(
    token: &str,
    settings: &Settings,
) -> Result<SessionClaims, SecurityError> {
    let mut validation = Validation::new(algorithm_from_settings(settings)?);
    validation.validate_exp = true;
    // Sessions end exactly at the test's end time.
    validation.leeway = 0;
    validation.required_spec_claims.clear();
    validation.required_spec_claims.insert("exp".to_string());

    decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(settings.security().secret_key.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|_| SecurityError::JwtDecoding)
}

/// Short digest used to correlate a token in logs without writing the token itself.
pub(crate) fn token_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..8])
}

fn sign<T: Serialize>(claims: &T, settings: &Settings) -> Result<String, SecurityError> {
    encode(
        &Header::new(algorithm_from_settings(settings)?),
        claims,
        &EncodingKey::from_secret(settings.security().secret_key.as_bytes()),
    )
    .map_err(|_| SecurityError::JwtEncoding)
}

fn algorithm_from_settings(settings: &Settings) -> Result<Algorithm, SecurityError> {
    match settings.security().algorithm.as_str() {
        "HS256" => Ok(Algorithm::HS256),
        other => Err(SecurityError::UnsupportedAlgorithm(other.to_string())),
    }
}
