pub(crate) mod api;
pub(crate) mod core;
pub(crate) mod db;
pub(crate) mod repositories;
pub(crate) mod schemas;
pub(crate) mod services;
pub(crate) mod tasks;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use crate::core::{config::Settings, redis::RedisHandle, state::AppState, telemetry};
use crate::db::store::PgStore;
use crate::services::engine::ExamEngine;
use crate::services::sampling::RedisSamplingChannel;

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    let redis = RedisHandle::new(settings.redis().redis_url());
    if let Err(err) = redis.connect().await {
        tracing::error!(error = %err, "Failed to connect to Redis; continuing without session cache");
    } else {
        tracing::info!("Redis connected successfully");
    }

    let sampling = RedisSamplingChannel::new(
        redis.url(),
        settings.session().sampling_request_queue.clone(),
        settings.session().sampling_timeout(),
    )?;
    let store = Arc::new(PgStore::new(db_pool.clone()));
    let engine = ExamEngine::new(
        settings.clone(),
        store.clone(),
        store.clone(),
        store,
        Arc::new(sampling),
        Arc::new(redis.clone()),
    );

    let state = AppState::new(settings, db_pool, redis.clone(), engine);
    let app = api::router::router(state.clone());
    let listener = tokio::net::TcpListener::bind(state.settings().server_addr()).await?;

    tracing::info!(
        host = %state.settings().server_host(),
        port = state.settings().server_port(),
        environment = %state.settings().runtime().environment.as_str(),
        "Exam sessions API listening"
    );

    let result =
        axum::serve(listener, app).with_graceful_shutdown(core::shutdown::shutdown_signal()).await;

    redis.disconnect().await;
    tracing::info!("Redis disconnected");

    result?;

    Ok(())
}

/// Runs the question-bank sampling responders until a shutdown signal arrives.
pub async fn run_worker() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::load()?;
    telemetry::init_tracing(&settings)?;
    core::metrics::init(&settings)?;

    let db_pool = db::init_pool(&settings).await?;
    db::run_migrations(&db_pool).await?;

    tasks::sampling_responder::run(&settings, db_pool).await
}
