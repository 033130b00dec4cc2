//! Router and handlers

mod cache;
mod messages;
mod scheduler;

use std::time::Duration;

use axum::{
    Router,
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, post},
};
use tower_http::timeout::TimeoutLayer;

use crate::AppState;

/// Build the control router over `state`. Requests running longer than
/// `request_timeout` are answered with 408.
pub fn router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/api/scheduler/start", post(scheduler::start))
        .route("/api/scheduler/stop", post(scheduler::stop))
        .route("/api/scheduler/status", get(scheduler::status))
        .route("/api/messages", post(messages::create))
        .route("/api/messages/send", post(messages::send))
        .route("/api/messages/sent", get(messages::sent))
        .route("/api/cache/messages", delete(cache::clear_messages))
        .route("/health/live", get(liveness))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
}

/// Liveness probe handler
///
/// Answers as long as the runtime can serve requests at all.
async fn liveness() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
