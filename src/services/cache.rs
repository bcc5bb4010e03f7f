//! Session cache seam and the projection policy built on top of it.
//!
//! The cache is advisory. Every reader treats a failure as a miss and every
//! writer treats a failure as a no-op, so the engine keeps working against the
//! stores alone when the backing cache is gone.

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub(crate) enum CacheError {
    #[error("cache is not connected")]
    Unavailable,
    #[error("cache command failed: {0}")]
    Command(String),
}

/// Key-value store with per-entry expiry.
///
/// `set_if_absent` must be atomic: it stores `value` only when `key` is empty
/// and returns whichever value the key holds afterwards.
#[async_trait]
pub(crate) trait SessionCache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set_with_expiry(&self, key: &str, value: &str, ttl: Duration)
        -> Result<(), CacheError>;

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration)
        -> Result<String, CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

pub(crate) fn test_key(test_id: Uuid) -> String {
    format!("test:{test_id}")
}

pub(crate) fn question_key(question_id: Uuid) -> String {
    format!("question:{question_id}")
}

pub(crate) fn session_token_key(test_id: Uuid, student_id: Uuid) -> String {
    format!("answer-token:{test_id}:{student_id}")
}

/// Reads and decodes a cached projection. Errors and undecodable payloads are misses.
pub(crate) async fn read_projection<T: DeserializeOwned>(
    cache: &dyn SessionCache,
    key: &str,
) -> Option<T> {
    let raw = match cache.get(key).await {
        Ok(Some(raw)) => raw,
        Ok(None) => {
            metrics::counter!("session_cache_lookups_total", "result" => "miss").increment(1);
            return None;
        }
        Err(CacheError::Unavailable) => return None,
        Err(err) => {
            tracing::warn!(key, error = %err, "Cache read failed; falling back to store");
            return None;
        }
    };

    match serde_json::from_str(&raw) {
        Ok(value) => {
            metrics::counter!("session_cache_lookups_total", "result" => "hit").increment(1);
            Some(value)
        }
        Err(err) => {
            tracing::warn!(key, error = %err, "Discarding undecodable cache entry");
            None
        }
    }
}

/// Best-effort repopulation after a store read; concurrent writers carry equal data.
pub(crate) async fn write_projection<T: Serialize>(
    cache: &dyn SessionCache,
    key: &str,
    value: &T,
    ttl: Duration,
) {
    let payload = match serde_json::to_string(value) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::warn!(key, error = %err, "Failed to encode cache projection");
            return;
        }
    };

    match cache.set_with_expiry(key, &payload, ttl).await {
        Ok(()) | Err(CacheError::Unavailable) => {}
        Err(err) => tracing::warn!(key, error = %err, "Cache write failed"),
    }
}
