//! # cropcloudd: cropcloud daemon
//!
//! Composition root that wires all adapters together and starts the server.
//!
//! ## Responsibilities
//! - Load configuration (config file, env vars) and install logging
//! - Initialize the `SQLite` connection pool and run migrations
//! - Construct the `InfluxDB` sink and the Cloud IoT registry client
//! - Construct application services, injecting adapters via port traits
//! - Run the MQTT subscriber and the scheduler tick as background tasks
//! - Bind to a TCP port and serve the axum router
//! - Handle graceful shutdown (SIGTERM/SIGINT)
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer; no domain logic belongs here.

mod config;
mod tick;

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use cropcloud_adapter_cloud_iot::CloudIotRegistry;
use cropcloud_adapter_http_axum::router;
use cropcloud_adapter_http_axum::state::AppState;
use cropcloud_adapter_influxdb::InfluxSink;
use cropcloud_adapter_mqtt::run_subscriber;
use cropcloud_adapter_storage_sqlite_sqlx::{SqliteAnalyticsSink, SqliteEntityStore, pool};
use cropcloud_app::ports::SystemClock;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;

    let filter = EnvFilter::try_new(&config.logging.filter).context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Database
    let db = pool::Config {
        database_url: config.database.url.clone(),
    }
    .build()
    .await
    .context("failed to open database")?;
    let store = SqliteEntityStore::new(db.pool().clone());
    let analytics = SqliteAnalyticsSink::new(db.pool().clone());

    // Remote services
    let sink = InfluxSink::new(config.influx.clone()).context("failed to build InfluxDB client")?;
    if config.cloud_iot.project.is_empty() {
        tracing::warn!("no Cloud IoT project configured, registry calls will fail");
    }
    let registry = CloudIotRegistry::new(config.cloud_iot.clone())
        .context("failed to build Cloud IoT client")?;

    let state = AppState::new(
        store,
        analytics,
        sink,
        registry,
        SystemClock,
        config.service_settings(),
    );

    // Background tasks
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = Vec::new();
    if let Some(mqtt) = config.mqtt.clone() {
        tasks.push(tokio::spawn(run_subscriber(
            mqtt,
            Arc::clone(&state.relay),
            shutdown_rx.clone(),
        )));
    }
    if config.scheduler.enabled {
        tasks.push(tokio::spawn(tick::run(
            Arc::clone(&state.directory),
            Arc::clone(&state.scheduler),
            config.scheduler.interval(),
            shutdown_rx,
        )));
    }

    // HTTP
    let app = router::build(state);
    let bind_addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;
    tracing::info!(addr = %bind_addr, "cropcloudd listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await
        .context("server error")?;

    for task in tasks {
        if let Err(err) = task.await {
            tracing::warn!(%err, "background task ended abnormally");
        }
    }
    tracing::info!("cropcloudd stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM, then tell background tasks to stop.
async fn shutdown_signal(shutdown: watch::Sender<bool>) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!(%err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("shutdown signal received");
    shutdown.send_replace(true);
}
