mod handlers;
mod routes;
mod state;

use std::sync::Arc;

use log::{info, warn};

use bgtranslate::config::load_config_from_str;
use bgtranslate::{load_config, Config, Database, JobDispatcher, SqliteStore};

use state::{config_path, AppState};

fn load_settings() -> Result<Config, Box<dyn std::error::Error>> {
    match config_path() {
        Some(path) if path.exists() => {
            let config = load_config(&path)?;
            Ok(config)
        }
        Some(path) => {
            eprintln!(
                "Config file {} not found, using defaults",
                path.display()
            );
            Ok(load_config_from_str(r#"{"version": "1.0"}"#)?)
        }
        None => Ok(load_config_from_str(r#"{"version": "1.0"}"#)?),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_settings()?;
    bgtranslate::logging::init(&config.logging)?;

    info!("Starting bgtranslate-server v{}", env!("CARGO_PKG_VERSION"));

    let db_path = config
        .database_path()
        .ok_or("Could not determine a database path; set database_path in the config")?;
    info!("Using database {:?}", db_path);
    let db = Database::open(&db_path)?;
    let store = Arc::new(SqliteStore::with_max_rows(
        db,
        config.processing.max_rows_per_select,
    ));

    let dispatcher = JobDispatcher::from_config(&config, store)?;
    let state = Arc::new(AppState::new(dispatcher, config.supervisor_settings()));
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_address).await?;
    info!("Listening on http://{}", config.listen_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("bgtranslate-server: {}", e);
        std::process::exit(1);
    }
}
