mod config;
mod error;
mod handlers;
mod lifecycle;
mod metrics;
mod middleware;
mod models;
mod rate_limit;
mod router;
mod state;
mod store;

#[cfg(test)]
mod test_support;

use anyhow::Context;
use clap::Parser;
use std::net::SocketAddr;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::config::Args;
use crate::lifecycle::{Lifecycle, shutdown_signal};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    // no store, no traffic
    let lifecycle = Lifecycle::start(&args)
        .await
        .context("failed to connect to the store")?;

    let app = router::build_router(lifecycle.app_state(&args));

    let addr = format!("{}:{}", args.host, args.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            lifecycle.stop().await.ok();
            return Err(e).with_context(|| format!("failed to bind {addr}"));
        }
    };

    info!(%addr, docs = args.docs_enabled(), "phonebook gateway listening");

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await;

    if let Err(e) = &served {
        error!(error = %e, "server exited with error");
    }

    // in-flight requests are done, release the store
    lifecycle.stop().await.context("failed to close the store")?;
    info!("shutdown complete");

    served.context("server error")
}
