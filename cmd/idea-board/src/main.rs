//! # Idea Board Server
//!
//! Loads settings, picks the store backend and serves the API.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use api_adapters::{router, AppState, RouterConfig};
use configs::{LogFormat, LogSettings, Settings, StoreBackend};
use storage_adapters::MemoryStore;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("failed to load configuration")?;
    init_tracing(&settings.log);
    if let Some(path) = &settings.env_file {
        tracing::debug!(path = %path.display(), "loaded .env");
    }

    let keep_alive = Duration::from_secs(settings.realtime.keep_alive_secs);
    let capacity = settings.realtime.channel_capacity;
    let router_config = RouterConfig {
        base_path: settings.server.base_path.clone(),
        cors_permissive: settings.server.cors_permissive,
    };

    let (state, listener_task) = match settings.store.backend {
        StoreBackend::Memory => {
            tracing::info!("using the in-memory store; data is lost on exit");
            let store = Arc::new(MemoryStore::new(capacity));
            (AppState::new(store, keep_alive), None)
        }
        StoreBackend::Postgres => {
            let (state, task) = postgres_state(&settings, keep_alive).await?;
            (state, Some(task))
        }
    };

    let app = router(state, &router_config);
    let addr = settings.server.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!(%addr, base_path = %router_config.base_path, "idea board listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    if let Some(task) = listener_task {
        task.abort();
    }
    tracing::info!("idea board stopped");
    Ok(())
}

#[cfg(feature = "db-postgres")]
async fn postgres_state(
    settings: &Settings,
    keep_alive: Duration,
) -> anyhow::Result<(AppState, JoinHandle<()>)> {
    use secrecy::ExposeSecret;
    use storage_adapters::PgStore;

    let url = settings
        .store
        .database_url
        .as_ref()
        .context("store.database_url is not set")?;
    let store = PgStore::connect(
        url.expose_secret(),
        settings.store.max_connections,
        settings.realtime.channel_capacity,
    )
    .await
    .context("failed to connect to postgres")?;
    store.migrate().await.context("failed to run migrations")?;
    let task = store.spawn_change_listener();
    tracing::info!("using the postgres store");
    Ok((AppState::new(Arc::new(store), keep_alive), task))
}

#[cfg(not(feature = "db-postgres"))]
async fn postgres_state(
    _settings: &Settings,
    _keep_alive: Duration,
) -> anyhow::Result<(AppState, JoinHandle<()>)> {
    anyhow::bail!("store.backend = postgres, but this build has no db-postgres feature")
}

/// `RUST_LOG` wins over `log.filter`.
fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
