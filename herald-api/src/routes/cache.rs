//! Cache maintenance handlers

use axum::{Json, extract::State};
use herald_common::incoming;
use serde::Serialize;

use crate::{AppState, RequestError};

#[derive(Debug, Serialize)]
pub(super) struct Cleared {
    removed: usize,
}

/// Drop every per-message delivery mark. The sent snapshot and scheduler
/// state are kept.
pub(super) async fn clear_messages(
    State(state): State<AppState>,
) -> Result<Json<Cleared>, RequestError> {
    let removed = state.cache.clear_delivery_marks().await?;
    incoming!(level = INFO, removed, "Delivery marks cleared");

    Ok(Json(Cleared { removed }))
}
