//! Single-attempt delivery to the recipient endpoint.

use async_trait::async_trait;
use herald_common::outgoing;
use herald_store::Message;
use reqwest::{StatusCode, header::HeaderMap};
use serde::{Deserialize, Serialize};

use crate::{
    config::WebhookConfig,
    error::{DeliveryError, RejectedError, TemporaryError},
};

/// Longest response body kept in an error.
const MAX_ERROR_BODY: usize = 512;

/// What the endpoint says after accepting a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub message: String,
    #[serde(rename = "messageId")]
    pub message_id: String,
}

/// Performs exactly one delivery attempt per call. Retrying is left to the
/// next cycle.
#[async_trait]
pub trait DeliveryClient: Send + Sync + std::fmt::Debug {
    async fn deliver(&self, message: &Message) -> Result<DeliveryReceipt, DeliveryError>;
}

#[derive(Debug, Serialize)]
struct Payload<'a> {
    to: &'a str,
    content: &'a str,
}

/// JSON webhook client.
///
/// Posts `{"to", "content"}` with a static auth header and accepts 200 or 202
/// with a `{"message", "messageId"}` body.
#[derive(Debug, Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
    endpoint: reqwest::Url,
}

impl WebhookClient {
    /// # Errors
    /// Fails on an unusable URL or auth header, or if the HTTP client cannot
    /// be built.
    pub fn new(config: &WebhookConfig) -> Result<Self, DeliveryError> {
        let endpoint = config.endpoint()?;
        let (name, value) = config.auth()?;

        let mut headers = HeaderMap::new();
        headers.insert(name, value);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()?;

        Ok(Self { client, endpoint })
    }

    #[must_use]
    pub const fn endpoint(&self) -> &reqwest::Url {
        &self.endpoint
    }
}

#[async_trait]
impl DeliveryClient for WebhookClient {
    async fn deliver(&self, message: &Message) -> Result<DeliveryReceipt, DeliveryError> {
        outgoing!(
            message_id = %message.id,
            endpoint = %self.endpoint,
            "Posting message"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&Payload {
                to: &message.recipient_address,
                content: &message.content,
            })
            .send()
            .await?;

        let status = response.status();
        outgoing!(level = DEBUG, message_id = %message.id, status = %status, "Endpoint answered");

        match status {
            StatusCode::OK | StatusCode::ACCEPTED => {
                let body = response.bytes().await?;
                serde_json::from_slice(&body).map_err(|e| {
                    DeliveryError::from(RejectedError::InvalidResponse(format!(
                        "{e}: {}",
                        excerpt(&body)
                    )))
                })
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.trim().parse().ok());

                Err(TemporaryError::RateLimited { retry_after }.into())
            }
            status if status.is_server_error() => Err(TemporaryError::ServerError {
                status: status.as_u16(),
                body: excerpt(&response.bytes().await.unwrap_or_default()),
            }
            .into()),
            status => Err(RejectedError::UnexpectedStatus {
                status: status.as_u16(),
                body: excerpt(&response.bytes().await.unwrap_or_default()),
            }
            .into()),
        }
    }
}

fn excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    match text.char_indices().nth(MAX_ERROR_BODY) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.into_owned(),
    }
}
