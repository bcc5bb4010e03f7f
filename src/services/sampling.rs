//! Auto-sampling: the request/reply round trip to the question bank and the
//! tier selection applied to its candidate set.
//!
//! A request is pushed onto a shared queue together with a private reply key.
//! The responder answers with one JSON array holding every candidate question
//! for the requested subject and modules. Selection then keeps 50% easy, 30%
//! medium and 20% hard questions (quotas rounded down), each tier shuffled on
//! its own.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use redis::{cmd, Client, RedisError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::db::models::Question;
use crate::db::types::DifficultyLevel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct SamplingRequest {
    pub(crate) subject: Uuid,
    pub(crate) modules: Vec<String>,
    pub(crate) reply_to: String,
}

#[derive(Debug, Error)]
pub(crate) enum SamplingError {
    #[error("question bank did not reply")]
    NoReply,
    #[error("sampling transport failed: {0}")]
    Transport(String),
}

impl From<RedisError> for SamplingError {
    fn from(err: RedisError) -> Self {
        SamplingError::Transport(err.to_string())
    }
}

/// One request, one reply. Implementations block until the reply arrives or
/// their own transport gives up; callers bound the wait themselves.
#[async_trait]
pub(crate) trait SamplingChannel: Send + Sync {
    async fn request(
        &self,
        subject: Uuid,
        modules: &[String],
    ) -> Result<serde_json::Value, SamplingError>;
}

#[derive(Clone)]
pub(crate) struct RedisSamplingChannel {
    client: Client,
    queue: String,
    wait: Duration,
}

impl RedisSamplingChannel {
    pub(crate) fn new(url: &str, queue: String, wait: Duration) -> Result<Self, RedisError> {
        Ok(Self { client: Client::open(url)?, queue, wait })
    }

    fn reply_key(&self) -> String {
        format!("{}:reply:{}", self.queue, Uuid::new_v4())
    }
}

#[async_trait]
impl SamplingChannel for RedisSamplingChannel {
    async fn request(
        &self,
        subject: Uuid,
        modules: &[String],
    ) -> Result<serde_json::Value, SamplingError> {
        let request =
            SamplingRequest { subject, modules: modules.to_vec(), reply_to: self.reply_key() };
        let payload = serde_json::to_string(&request)
            .map_err(|err| SamplingError::Transport(err.to_string()))?;

        // BLPOP parks the connection, so it must not be the shared manager.
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        cmd("RPUSH").arg(&self.queue).arg(payload).query_async::<_, i64>(&mut conn).await?;

        let wait_seconds = self.wait.as_secs().max(1) + 1;
        let reply: Option<(String, String)> = cmd("BLPOP")
            .arg(&request.reply_to)
            .arg(wait_seconds)
            .query_async(&mut conn)
            .await?;

        let Some((_, raw)) = reply else {
            return Err(SamplingError::NoReply);
        };

        serde_json::from_str(&raw).map_err(|err| SamplingError::Transport(err.to_string()))
    }
}

/// Decodes a reply. Anything other than an array of question records is `None`.
pub(crate) fn parse_candidates(reply: serde_json::Value) -> Option<Vec<Question>> {
    if !reply.is_array() {
        return None;
    }
    serde_json::from_value(reply).ok()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Shortfall {
    Total { available: usize, requested: usize },
    Tier { level: DifficultyLevel, available: usize, quota: usize },
}

impl fmt::Display for Shortfall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shortfall::Total { available, requested } => write!(
                f,
                "Questions from the selected modules are not sufficient to create a test of \
                 {requested} questions ({available} available)"
            ),
            Shortfall::Tier { level, available, quota } => write!(
                f,
                "Insufficient questions to create test in ratio 50:30:20 \
                 ({} tier has {available}, needs {quota})",
                level.as_str()
            ),
        }
    }
}

pub(crate) fn tier_quota(level: DifficultyLevel, requested: usize) -> usize {
    requested * level.quota_percent() / 100
}

/// Picks the quota of each tier from `candidates`, easy first, then medium, then hard.
pub(crate) fn select_by_tier<R: Rng + ?Sized>(
    candidates: Vec<Question>,
    requested: usize,
    rng: &mut R,
) -> Result<Vec<Question>, Shortfall> {
    if candidates.len() < requested {
        return Err(Shortfall::Total { available: candidates.len(), requested });
    }

    let mut tiers: Vec<(DifficultyLevel, Vec<Question>)> =
        DifficultyLevel::ALL.iter().map(|level| (*level, Vec::new())).collect();
    for question in candidates {
        if let Some((_, bucket)) = tiers.iter_mut().find(|(level, _)| *level == question.level) {
            bucket.push(question);
        }
    }

    for (level, bucket) in &tiers {
        let quota = tier_quota(*level, requested);
        if bucket.len() < quota {
            return Err(Shortfall::Tier { level: *level, available: bucket.len(), quota });
        }
    }

    let mut selected = Vec::with_capacity(requested);
    for (level, mut bucket) in tiers {
        bucket.shuffle(rng);
        bucket.truncate(tier_quota(level, requested));
        selected.extend(bucket);
    }

    Ok(selected)
}
