// acquire the store before serving, release it after the server drains

use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use crate::config::{Args, RATE_LIMIT_TIMES, RATE_LIMIT_WINDOW, StoreBackend};
use crate::rate_limit::RateLimiter;
use crate::state::AppState;
use crate::store::{MemoryStore, RedisStore, Store, StoreError};

// `stop` consumes the lifecycle so the connection is released once
pub struct Lifecycle {
    store: Arc<dyn Store>,
}

impl Lifecycle {
    pub async fn start(args: &Args) -> Result<Self, StoreError> {
        let store: Arc<dyn Store> = match args.store {
            StoreBackend::Redis => {
                Arc::new(RedisStore::connect(&args.redis_url(), args.store_timeout()).await?)
            }
            StoreBackend::Memory => {
                warn!("using in-memory store, data is lost on exit");
                Arc::new(MemoryStore::new())
            }
        };

        store.ping().await?;
        info!(store = %store.describe(), "store ready");

        Ok(Self { store })
    }

    pub fn app_state(&self, args: &Args) -> Arc<AppState> {
        let rate_limiter = RateLimiter::new(
            Arc::clone(&self.store),
            RATE_LIMIT_TIMES,
            RATE_LIMIT_WINDOW,
            args.limiter_failure_policy,
        );
        info!(
            times = rate_limiter.times(),
            window_secs = rate_limiter.window().as_secs(),
            policy = ?rate_limiter.policy(),
            "rate limiter configured"
        );

        Arc::new(AppState::new(
            Arc::clone(&self.store),
            rate_limiter,
            args.docs_enabled(),
        ))
    }

    pub async fn stop(self) -> Result<(), StoreError> {
        info!(store = %self.store.describe(), "closing store");
        self.store.close().await?;
        info!("store closed");
        Ok(())
    }
}

// SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", err);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => error!("failed to install SIGTERM handler: {}", err),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("received SIGINT, draining in-flight requests");
        }
        _ = terminate => {
            info!("received SIGTERM, draining in-flight requests");
        }
    }
}
