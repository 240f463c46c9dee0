use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ai::RetryPolicy;
use crate::pipeline::PipelineSettings;
use crate::supervisor::SupervisorSettings;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub version: String,
    #[serde(default)]
    pub database_path: Option<String>,
    #[serde(default = "default_listen_address")]
    pub listen_address: String,
    #[serde(default)]
    pub ai: AiConfig,
    #[serde(default)]
    pub processing: ProcessingConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_listen_address() -> String {
    "127.0.0.1:8787".to_string()
}

impl Config {
    /// Resolves the SQLite path, falling back to `~/.bgtranslate/data/bgtranslate.db`.
    pub fn database_path(&self) -> Option<PathBuf> {
        match self.database_path {
            Some(ref path) if !path.is_empty() => Some(PathBuf::from(path)),
            _ => crate::db::default_database_path(),
        }
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            page_size: self.processing.page_size,
            batch_size: self.processing.batch_size,
            time_budget: Duration::from_secs(self.processing.time_budget_secs),
            inter_batch_delay: Duration::from_millis(self.processing.inter_batch_delay_ms),
        }
    }

    pub fn supervisor_settings(&self) -> SupervisorSettings {
        SupervisorSettings {
            watchdog_timeout: Duration::from_secs(self.processing.watchdog_timeout_secs),
            auto_resume: self.processing.auto_resume,
            max_resumes: self.processing.max_resumes,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.retry.max_retries,
            initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
            retryable_statuses: self.retry.retryable_statuses.clone(),
            fatal_statuses: self.retry.fatal_statuses.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub api_key_file: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_temperature() -> f32 {
    0.3
}

fn default_request_timeout_secs() -> u64 {
    60
}

fn default_api_key_env() -> Option<String> {
    Some("BGTRANSLATE_AI_API_KEY".to_string())
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            request_timeout_secs: default_request_timeout_secs(),
            api_key: None,
            api_key_file: None,
            api_key_env: default_api_key_env(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Hard cap the store applies to a single select.
    #[serde(default = "default_page_size")]
    pub max_rows_per_select: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_time_budget_secs")]
    pub time_budget_secs: u64,
    #[serde(default = "default_inter_batch_delay_ms")]
    pub inter_batch_delay_ms: u64,
    #[serde(default = "default_watchdog_timeout_secs")]
    pub watchdog_timeout_secs: u64,
    #[serde(default = "default_true")]
    pub auto_resume: bool,
    #[serde(default = "default_max_resumes")]
    pub max_resumes: u32,
}

fn default_page_size() -> usize {
    1000
}

fn default_batch_size() -> usize {
    20
}

fn default_time_budget_secs() -> u64 {
    25
}

fn default_inter_batch_delay_ms() -> u64 {
    100
}

fn default_watchdog_timeout_secs() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

fn default_max_resumes() -> u32 {
    50
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            max_rows_per_select: default_page_size(),
            batch_size: default_batch_size(),
            time_budget_secs: default_time_budget_secs(),
            inter_batch_delay_ms: default_inter_batch_delay_ms(),
            watchdog_timeout_secs: default_watchdog_timeout_secs(),
            auto_resume: true,
            max_resumes: default_max_resumes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_retryable_statuses")]
    pub retryable_statuses: Vec<u16>,
    #[serde(default = "default_fatal_statuses")]
    pub fatal_statuses: Vec<u16>,
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_backoff_ms() -> u64 {
    2000
}

fn default_retryable_statuses() -> Vec<u16> {
    vec![429]
}

fn default_fatal_statuses() -> Vec<u16> {
    vec![402]
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            retryable_statuses: default_retryable_statuses(),
            fatal_statuses: default_fatal_statuses(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
