//! Question-bank side of auto-sampling: pops requests off the shared queue and
//! answers each one with the full candidate set for its subject and modules.

use anyhow::Result;
use redis::aio::MultiplexedConnection;
use redis::{cmd, Client};
use sqlx::PgPool;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};

use crate::core::config::Settings;
use crate::db::models::Question;
use crate::repositories;
use crate::services::sampling::SamplingRequest;

const RESPONDER_CONCURRENCY: usize = 2;
/// BLPOP timeout; bounds how long a responder takes to notice shutdown.
const POLL_SECONDS: u64 = 1;
const REPLY_TTL_SECONDS: u64 = 30;
const EMPTY_REPLY: &str = "[]";

pub(crate) async fn run(settings: &Settings, pool: PgPool) -> Result<()> {
    let client = Client::open(settings.redis().redis_url())?;
    let queue = settings.session().sampling_request_queue.clone();
    let shutdown = crate::core::shutdown::shutdown_channel();

    let mut handles = Vec::with_capacity(RESPONDER_CONCURRENCY);
    for _ in 0..RESPONDER_CONCURRENCY {
        handles.push(tokio::spawn(responder(
            client.clone(),
            pool.clone(),
            queue.clone(),
            shutdown.clone(),
        )));
    }

    tracing::info!(queue = %queue, responders = RESPONDER_CONCURRENCY, "Sampling responders started");

    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "Sampling responder join failed");
        }
    }

    Ok(())
}

async fn responder(
    client: Client,
    pool: PgPool,
    queue: String,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut conn: Option<MultiplexedConnection> = None;

    loop {
        if *shutdown.borrow() {
            break;
        }

        if conn.is_none() {
            match client.get_multiplexed_async_connection().await {
                Ok(fresh) => conn = Some(fresh),
                Err(err) => {
                    tracing::error!(error = %err, "Failed to connect sampling responder");
                    tokio::select! {
                        _ = shutdown.changed() => break,
                        _ = sleep(Duration::from_secs(2)) => {}
                    }
                    continue;
                }
            }
        }
        let Some(active) = conn.as_mut() else {
            continue;
        };

        let popped: Option<(String, String)> = match cmd("BLPOP")
            .arg(&queue)
            .arg(POLL_SECONDS)
            .query_async(active)
            .await
        {
            Ok(popped) => popped,
            Err(err) => {
                tracing::error!(error = %err, "Failed to pop sampling request");
                conn = None;
                continue;
            }
        };

        let Some((_, raw)) = popped else {
            continue;
        };

        let Some(request) = decode_request(&raw) else {
            continue;
        };

        let reply = match repositories::questions::list_candidates(
            &pool,
            request.subject,
            &request.modules,
        )
        .await
        {
            Ok(candidates) => encode_reply(&candidates),
            Err(err) => {
                tracing::error!(
                    subject_id = %request.subject,
                    error = %err,
                    "Failed to load sampling candidates"
                );
                EMPTY_REPLY.to_string()
            }
        };

        if let Err(err) = redis::pipe()
            .cmd("RPUSH")
            .arg(&request.reply_to)
            .arg(reply)
            .ignore()
            .cmd("EXPIRE")
            .arg(&request.reply_to)
            .arg(REPLY_TTL_SECONDS)
            .ignore()
            .query_async::<_, ()>(active)
            .await
        {
            tracing::error!(reply_to = %request.reply_to, error = %err, "Failed to push sampling reply");
            conn = None;
        }
    }
}

/// Requests without a reply key cannot be answered and are dropped.
fn decode_request(raw: &str) -> Option<SamplingRequest> {
    match serde_json::from_str::<SamplingRequest>(raw) {
        Ok(request) if !request.reply_to.trim().is_empty() => Some(request),
        Ok(_) => {
            tracing::warn!("Dropping sampling request without reply key");
            None
        }
        Err(err) => {
            tracing::warn!(error = %err, "Dropping undecodable sampling request");
            None
        }
    }
}

fn encode_reply(candidates: &[Question]) -> String {
    serde_json::to_string(candidates).unwrap_or_else(|err| {
        tracing::error!(error = %err, "Failed to encode sampling reply");
        EMPTY_REPLY.to_string()
    })
}
