//! Control API HTTP server

use std::net::SocketAddr;

use axum::Router;
use herald_common::{Signal, internal};
use tokio::net::TcpListener;

use crate::{ApiConfig, ApiError, AppState, routes};

/// Control API server
///
/// Binds eagerly so address problems surface at startup, then serves until
/// the controller broadcasts a shutdown.
pub struct ApiServer {
    listener: TcpListener,
    router: Router,
}

impl ApiServer {
    /// Create a new API server
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the specified address fails.
    pub async fn new(config: ApiConfig, state: AppState) -> Result<Self, ApiError> {
        let listener = TcpListener::bind(&config.listen_address)
            .await
            .map_err(|e| ApiError::BindError {
                address: config.listen_address.clone(),
                source: e,
            })?;

        internal!(
            level = INFO,
            address = %config.listen_address,
            "Control API bound successfully"
        );

        let router = routes::router(state, config.request_timeout());

        Ok(Self { listener, router })
    }

    /// The address actually bound, useful when the configured port was 0.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot report its address.
    pub fn local_addr(&self) -> Result<SocketAddr, ApiError> {
        self.listener
            .local_addr()
            .map_err(|e| ApiError::ServerError(e.to_string()))
    }

    /// Run the API server until shutdown signal is received
    ///
    /// # Errors
    ///
    /// Returns an error if the server encounters a runtime error.
    pub async fn serve(
        self,
        mut shutdown: tokio::sync::broadcast::Receiver<Signal>,
    ) -> Result<(), ApiError> {
        internal!(level = INFO, "Control API starting");

        axum::serve(self.listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                internal!(level = INFO, "Control API received shutdown signal");
            })
            .await
            .map_err(|e| ApiError::ServerError(e.to_string()))?;

        internal!(level = INFO, "Control API stopped");
        Ok(())
    }
}
