//! Shared state for the HTTP handlers.

use std::path::PathBuf;
use std::sync::Arc;

use bgtranslate::{JobDispatcher, SupervisorSettings};

pub const CONFIG_ENV: &str = "BGTRANSLATE_CONFIG";

pub struct AppState {
    pub dispatcher: Arc<JobDispatcher>,
    pub supervisor: SupervisorSettings,
}

impl AppState {
    pub fn new(dispatcher: JobDispatcher, supervisor: SupervisorSettings) -> Self {
        Self {
            dispatcher: Arc::new(dispatcher),
            supervisor,
        }
    }
}

/// `$BGTRANSLATE_CONFIG`, or `~/.bgtranslate/config.json`.
pub fn config_path() -> Option<PathBuf> {
    match std::env::var(CONFIG_ENV) {
        Ok(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => dirs::home_dir().map(|home| home.join(".bgtranslate").join("config.json")),
    }
}
