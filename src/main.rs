//! Riskgate entrypoint: open the store, wire the auth orchestrator, and
//! serve the axum surface until Ctrl+C.

use riskgate::{
    config::ServiceConfig,
    http::{self, AppState},
    logging::StructuredLogger,
    store::EventStore,
    AuthOrchestrator,
};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("RISKGATE_CONFIG_PATH")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("config.json"));
    let config = ServiceConfig::load(&config_path);

    StructuredLogger::init(config.log.json, &config.log.level);

    info!(data_dir = ?config.data_dir, "riskgate starting");

    std::fs::create_dir_all(&config.data_dir)?;
    let store_path = config.data_dir.join("store.db");
    let store = Arc::new(EventStore::open(&store_path)?);

    let auth = AuthOrchestrator::new(store, config.auth.clone());
    let state = Arc::new(AppState { auth });
    let app = http::router(state);

    let addr = format!("{}:{}", config.http.bind_addr, config.http.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "listening");

    let (stop_tx, mut stop_rx) = tokio::sync::watch::channel(false);
    let _ = ctrlc::set_handler(move || {
        let _ = stop_tx.send(true);
    });

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = stop_rx.changed().await;
        })
        .await?;

    info!("riskgate stopping");
    Ok(())
}
