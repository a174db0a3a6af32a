//! greenhouse-alerts - Greenhouse sensor alert monitor
//!
//! Subscribes to one MQTT topic of sensor readings, keeps a chronological
//! alert log in memory, persists it to local SQLite storage and serves it
//! over HTTP/SSE for display.

use anyhow::Result;
use clap::Parser;
use greenhouse_alerts::api::{build_router, AppContext};
use greenhouse_alerts::config::{Config, Overrides};
use greenhouse_alerts::ingest::IngestionController;
use greenhouse_alerts::persist::PersistenceGateway;
use greenhouse_alerts::state::SharedState;
use greenhouse_alerts::storage::{SqliteStorage, Storage};
use greenhouse_alerts::transport::mqtt::{self, MqttConfig};
use greenhouse_alerts::transport::Qos;
use greenhouse_alerts::{reconcile, transport};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "greenhouse-alerts", version, about)]
struct Cli {
    /// Path to TOML config file
    #[arg(long, env = "GREENHOUSE_CONFIG")]
    config: Option<PathBuf>,

    /// MQTT broker host
    #[arg(long, env = "GREENHOUSE_BROKER_HOST")]
    broker_host: Option<String>,

    /// MQTT broker port
    #[arg(long, env = "GREENHOUSE_BROKER_PORT")]
    broker_port: Option<u16>,

    /// Client identifier presented to the broker
    #[arg(long, env = "GREENHOUSE_CLIENT_ID")]
    client_id: Option<String>,

    /// Topic to subscribe to
    #[arg(long, env = "GREENHOUSE_TOPIC")]
    topic: Option<String>,

    /// Requested QoS level (0, 1 or 2)
    #[arg(long, env = "GREENHOUSE_QOS")]
    qos: Option<u8>,

    /// SQLite database path
    #[arg(long, env = "GREENHOUSE_DATABASE")]
    database: Option<PathBuf>,

    /// HTTP port for the display surface
    #[arg(long, env = "GREENHOUSE_PORT")]
    port: Option<u16>,

    /// Log level directive (tracing EnvFilter syntax)
    #[arg(long, env = "GREENHOUSE_LOG_LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::resolve(&Overrides {
        config_file: cli.config,
        broker_host: cli.broker_host,
        broker_port: cli.broker_port,
        client_id: cli.client_id,
        topic: cli.topic,
        qos: cli.qos,
        database_path: cli.database,
        http_port: cli.port,
        log_level: cli.log_level,
    })?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    info!(
        "Starting greenhouse-alerts v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!(
        "Broker: {}:{}, topic: {:?}",
        config.broker_host, config.broker_port, config.topic
    );

    let storage: Arc<dyn Storage> =
        Arc::new(SqliteStorage::open(&config.database_path).await?);
    let gateway = PersistenceGateway::new(Arc::clone(&storage));
    let state = Arc::new(SharedState::new(gateway));

    // Reconciliation must complete before live ingestion begins, so a live
    // message is always appended after the reconciled snapshot
    reconcile::load_persisted(&state, storage.as_ref()).await;

    let qos = Qos::try_from(config.qos)
        .map_err(|q| anyhow::anyhow!("invalid qos {}", q))?;
    let (session, notifications) = mqtt::connect(&MqttConfig {
        host: config.broker_host.clone(),
        port: config.broker_port,
        client_id: config.client_id.clone(),
    });

    let controller = IngestionController::new(
        Box::new(session) as Box<dyn transport::Session>,
        notifications,
        config.topic.clone(),
        qos,
        Arc::clone(&state),
    );
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let ingest_task = tokio::spawn(controller.run(shutdown_rx));

    let app = build_router(AppContext::new(Arc::clone(&state)));
    let listener =
        tokio::net::TcpListener::bind(("127.0.0.1", config.http_port)).await?;
    info!("Listening on http://127.0.0.1:{}", config.http_port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Stop ingestion before exiting; in-flight persistence tasks are
    // allowed to complete or fail silently
    let _ = shutdown_tx.send(());
    let _ = ingest_task.await;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", err);
    }
}
