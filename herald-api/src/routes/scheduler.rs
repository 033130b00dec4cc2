//! Scheduler lifecycle handlers

use axum::{Json, extract::State};
use herald_common::incoming;
use serde::Serialize;

use crate::{AppState, RequestError};

#[derive(Debug, Serialize)]
pub(super) struct Transition {
    message: &'static str,
    status: &'static str,
}

#[derive(Debug, Serialize)]
pub(super) struct Status {
    running: bool,
    interval_secs: u64,
    batch_size: usize,
}

pub(super) async fn start(State(state): State<AppState>) -> Result<Json<Transition>, RequestError> {
    incoming!(level = INFO, "Scheduler start requested");

    state.scheduler.start()?;
    state.cache.mark_scheduler_running().await;

    Ok(Json(Transition {
        message: "Scheduler started",
        status: "running",
    }))
}

pub(super) async fn stop(State(state): State<AppState>) -> Result<Json<Transition>, RequestError> {
    incoming!(level = INFO, "Scheduler stop requested");

    state.scheduler.stop()?;
    state.cache.clear_scheduler_state().await;

    Ok(Json(Transition {
        message: "Scheduler stopped",
        status: "stopped",
    }))
}

pub(super) async fn status(State(state): State<AppState>) -> Json<Status> {
    let scheduler = &state.scheduler;

    Json(Status {
        running: scheduler.is_running(),
        interval_secs: scheduler.interval().as_secs(),
        batch_size: scheduler.batch_size(),
    })
}
