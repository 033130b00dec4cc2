use std::sync::{Arc, LazyLock};

use herald_api::{ApiConfig, ApiError, ApiServer, AppState};
use herald_cache::{CacheConfig, DedupCache};
use herald_common::{Signal, internal, logging};
use herald_delivery::{BatchSender, DeliveryConfig, Scheduler, WebhookClient};
use herald_store::StoreConfig;
use serde::Deserialize;
use tokio::sync::broadcast;

/// Overrides `delivery.webhook.auth_key` so the secret can stay out of the
/// config file.
pub const AUTH_KEY_ENV: &str = "HERALD_WEBHOOK_AUTH_KEY";

/// Top-level configuration, and the controller that wires it together.
#[derive(Debug, Default, Deserialize)]
pub struct Herald {
    #[serde(default)]
    store: StoreConfig,
    #[serde(default)]
    cache: CacheConfig,
    #[serde(default)]
    delivery: DeliveryConfig,
    #[serde(default)]
    api: ApiConfig,
}

/// The long-lived pieces built from a [`Herald`] configuration.
#[derive(Debug, Clone)]
pub struct Services {
    pub scheduler: Arc<Scheduler>,
    pub cache: DedupCache,
    pub state: AppState,
}

pub static SHUTDOWN_BROADCAST: LazyLock<broadcast::Sender<Signal>> = LazyLock::new(|| {
    let (sender, _receiver) = broadcast::channel(64);
    sender
});

async fn shutdown() -> anyhow::Result<()> {
    let mut terminate = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            internal!(level = INFO, "CTRL+C entered, shutting down");
        }
        _ = terminate.recv() => {
            internal!(level = INFO, "Terminate Signal received, shutting down");
        }
    };

    // No receivers just means nothing is left to drain.
    let _ = SHUTDOWN_BROADCAST.send(Signal::Shutdown);

    Ok(())
}

fn flatten(
    joined: Result<Result<(), ApiError>, tokio::task::JoinError>,
) -> anyhow::Result<()> {
    Ok(joined??)
}

impl Herald {
    /// Replace the webhook secret when `auth_key` is set and non-empty.
    pub fn apply_auth_override(&mut self, auth_key: Option<String>) {
        if let Some(key) = auth_key.filter(|key| !key.trim().is_empty()) {
            internal!(level = DEBUG, "Using webhook auth key from {AUTH_KEY_ENV}");
            self.delivery.webhook.auth_key = key;
        }
    }

    /// Validate the configuration and build the store, cache, sender and
    /// scheduler. Nothing is started.
    ///
    /// # Errors
    ///
    /// Fails on invalid delivery settings or when the store cannot be opened.
    pub async fn build(&self) -> anyhow::Result<Services> {
        self.delivery.validate()?;

        let store = self.store.clone().into_store().await?;
        let cache = DedupCache::new(self.cache.clone().into_backend())
            .with_ttls(self.delivery.message_ttl(), self.delivery.snapshot_ttl());
        let client = Arc::new(WebhookClient::new(&self.delivery.webhook)?);

        let sender = Arc::new(BatchSender::new(Arc::clone(&store), client, cache.clone()));
        let scheduler = Arc::new(Scheduler::new(
            sender.clone(),
            self.delivery.interval(),
            self.delivery.batch_size,
        ));

        let state = AppState::new(Arc::clone(&scheduler), sender, store, cache.clone());

        Ok(Services {
            scheduler,
            cache,
            state,
        })
    }

    /// Run this controller, and everything it controls
    ///
    /// # Errors
    ///
    /// This function will return an error if the configuration is invalid,
    /// the store cannot be opened, or the control API cannot bind.
    pub async fn run(mut self) -> anyhow::Result<()> {
        logging::init();
        self.apply_auth_override(std::env::var(AUTH_KEY_ENV).ok());

        let services = self.build().await?;

        internal!(
            level = INFO,
            interval_secs = self.delivery.interval_secs,
            batch_size = self.delivery.batch_size,
            cache_enabled = services.cache.is_enabled(),
            "Controller running"
        );

        if self.delivery.autostart {
            services.scheduler.start()?;
            services.cache.mark_scheduler_running().await;
        }

        let ret = if self.api.enabled {
            let server = ApiServer::new(self.api, services.state.clone()).await?;
            let mut api = tokio::spawn(server.serve(SHUTDOWN_BROADCAST.subscribe()));

            tokio::select! {
                r = &mut api => flatten(r),
                r = shutdown() => match r {
                    Ok(()) => flatten(api.await),
                    Err(e) => Err(e),
                },
            }
        } else {
            if !self.delivery.autostart {
                internal!(
                    level = WARN,
                    "Control API disabled and autostart off; the scheduler can never run"
                );
            }
            shutdown().await
        };

        internal!(level = INFO, "Shutting down...");
        if let Err(e) = services.scheduler.stop() {
            internal!(level = WARN, error = %e, "Unable to stop scheduler cleanly");
        }
        services.cache.clear_scheduler_state().await;

        ret
    }
}
