use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use crate::config::schema::Config;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/config-v1.json");

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let config: Config = serde_json::from_value(json_value)?;

    validate_config(&config)?;

    Ok(config)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported config version: {}", config.version),
        });
    }

    if config.retry.max_retries > 5 {
        return Err(ConfigError::Validation {
            message: format!(
                "retry.max_retries is {}, at most 5 retries are allowed",
                config.retry.max_retries
            ),
        });
    }

    let retryable: HashSet<u16> = config.retry.retryable_statuses.iter().copied().collect();
    if let Some(status) = config
        .retry
        .fatal_statuses
        .iter()
        .find(|s| retryable.contains(s))
    {
        return Err(ConfigError::Validation {
            message: format!("Status {} cannot be both retryable and fatal", status),
        });
    }

    let watchdog = Duration::from_secs(config.processing.watchdog_timeout_secs);
    let required = longest_invocation(config);
    if watchdog <= required {
        return Err(ConfigError::Validation {
            message: format!(
                "processing.watchdog_timeout_secs is {}s but an invocation may run for {}s \
                 (time budget plus one fully retried batch)",
                watchdog.as_secs(),
                required.as_secs()
            ),
        });
    }

    Ok(())
}

/// Upper bound of one invocation: the time budget can be exhausted just as a
/// batch starts, and that batch may spend every attempt waiting on the AI
/// request timeout plus the backoff between attempts.
fn longest_invocation(config: &Config) -> Duration {
    let policy = config.retry_policy();
    let attempts = u64::from(policy.max_retries) + 1;
    let backoff: Duration = (0..policy.max_retries)
        .map(|attempt| policy.backoff_for(attempt))
        .sum();
    Duration::from_secs(config.processing.time_budget_secs)
        + Duration::from_secs(config.ai.request_timeout_secs.saturating_mul(attempts))
        + backoff
}
