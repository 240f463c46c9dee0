//! Process-wide logging setup.
//!
//! `log` records (emitted by the db and store layers) are bridged into
//! `tracing` so a single subscriber formats everything.

use std::sync::OnceLock;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

use crate::config::LoggingConfig;
use crate::error::BgTranslateError;

/// Result of the one and only installation attempt.
static INSTALLED: OnceLock<Result<(), String>> = OnceLock::new();

/// Installs the global subscriber. Only the first call installs anything;
/// later calls return that first call's result.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init(config: &LoggingConfig) -> Result<(), BgTranslateError> {
    let filter = build_filter(std::env::var(EnvFilter::DEFAULT_ENV).ok(), &config.level)?;
    let json = config.json;

    INSTALLED
        .get_or_init(|| install(filter, json))
        .clone()
        .map_err(BgTranslateError::Logging)
}

fn build_filter(rust_log: Option<String>, level: &str) -> Result<EnvFilter, BgTranslateError> {
    let directives = rust_log
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| level.to_string());
    EnvFilter::try_new(&directives).map_err(|e| {
        BgTranslateError::Logging(format!("Invalid log filter '{}': {}", directives, e))
    })
}

fn install(filter: EnvFilter, json: bool) -> Result<(), String> {
    let result = if json {
        let subscriber = Registry::default()
            .with(filter)
            .with(fmt::layer().json().with_current_span(true));
        tracing::subscriber::set_global_default(subscriber)
    } else {
        let subscriber = Registry::default()
            .with(filter)
            .with(fmt::layer().with_target(true));
        tracing::subscriber::set_global_default(subscriber)
    };
    result.map_err(|e| e.to_string())?;

    // The subscriber is in place; without the bridge only `log` records are lost.
    if let Err(e) = tracing_log::LogTracer::init() {
        tracing::warn!("log records are not bridged into tracing: {}", e);
    }
    Ok(())
}
