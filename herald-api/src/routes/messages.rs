//! Message handlers: queueing, manual sends and the sent listing

use axum::{Json, extract::State, http::StatusCode};
use herald_common::{incoming, internal};
use herald_delivery::SendOutcome;
use herald_store::{Message, MessageId, NewMessage};
use serde::{Deserialize, Serialize};

use crate::{AppState, RequestError};

#[derive(Debug, Deserialize)]
pub(super) struct SendRequest {
    id: MessageId,
}

#[derive(Debug, Serialize)]
pub(super) struct SendResponse {
    id: MessageId,
    #[serde(flatten)]
    outcome: SendOutcome,
}

pub(super) async fn create(
    State(state): State<AppState>,
    Json(message): Json<NewMessage>,
) -> Result<(StatusCode, Json<Message>), RequestError> {
    let created = state.store.create_message(message).await?;
    incoming!(
        level = INFO,
        message_id = %created.id,
        recipient = %created.recipient_address,
        "Message queued"
    );

    Ok((StatusCode::CREATED, Json(created)))
}

/// Run the single-message protocol for one stored message.
pub(super) async fn send(
    State(state): State<AppState>,
    Json(request): Json<SendRequest>,
) -> Result<Json<SendResponse>, RequestError> {
    incoming!(level = INFO, message_id = %request.id, "Manual send requested");

    let message = state.store.get_message(request.id).await?;
    let outcome = state.sender.send_message(&message).await.map_err(|e| {
        internal!(
            level = WARN,
            message_id = %request.id,
            error = %e,
            "Manual send failed"
        );
        RequestError::from(e)
    })?;

    if matches!(outcome, SendOutcome::Delivered { .. })
        && let Err(e) = state.sent.refresh().await
    {
        internal!(level = WARN, error = %e, "Unable to refresh sent-messages snapshot");
    }

    Ok(Json(SendResponse {
        id: request.id,
        outcome,
    }))
}

pub(super) async fn sent(State(state): State<AppState>) -> Result<Json<Vec<Message>>, RequestError> {
    Ok(Json(state.sent.load().await?))
}
