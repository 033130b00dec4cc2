//! HTTP control surface for herald
//!
//! Operators drive the delivery scheduler and inspect delivery state through a
//! small JSON API. Every endpoint delegates to the delivery core; the API adds
//! no delivery semantics of its own.
//!
//! # Endpoints
//!
//! - **`POST /api/scheduler/start`** - Start the periodic delivery loop
//! - **`POST /api/scheduler/stop`** - Stop it; an in-flight cycle finishes
//! - **`GET /api/scheduler/status`** - Whether the loop is running
//! - **`POST /api/messages`** - Queue a new message
//! - **`POST /api/messages/send`** - Deliver one message now
//! - **`GET /api/messages/sent`** - Sent messages, served from the cache when possible
//! - **`DELETE /api/cache/messages`** - Forget per-message delivery marks
//! - **`GET /health/live`** - Liveness probe
//!
//! # Usage
//!
//! ```rust,no_run
//! use herald_api::{ApiConfig, ApiServer, AppState};
//!
//! # async fn example(state: AppState) -> Result<(), Box<dyn std::error::Error>> {
//! let server = ApiServer::new(ApiConfig::default(), state).await?;
//!
//! // Run until the controller broadcasts shutdown
//! // server.serve(shutdown_receiver).await?;
//! # Ok(())
//! # }
//! ```

mod config;
mod error;
mod routes;
mod server;
mod state;

pub use config::ApiConfig;
pub use error::{ApiError, RequestError};
pub use routes::router;
pub use server::ApiServer;
pub use state::AppState;
