mod handlers;

use axum::{routing::get, routing::post, Router};

use crate::core::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_tests))
        .route("/create/manual", post(handlers::create_manual_test))
        .route("/create/auto", post(handlers::create_auto_test))
        .route("/detail/:test_id", get(handlers::test_detail))
        .route("/start/:test_id", post(handlers::start_test))
        .route("/finish", post(handlers::finish_test))
        .route("/answers", post(handlers::list_answers))
        .route("/answers/:answer_id", post(handlers::answer_detail))
}
