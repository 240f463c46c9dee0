pub mod ai;
pub mod config;
pub mod db;
pub mod dispatcher;
pub mod error;
pub mod job;
pub mod logging;
pub mod pipeline;
pub mod secrets;
pub mod store;
pub mod supervisor;
pub mod translate;

pub use ai::{AiError, CompletionClient, HttpCompletionClient, RetryPolicy};
pub use config::{load_config, Config};
pub use db::Database;
pub use dispatcher::JobDispatcher;
pub use error::{BgTranslateError, ConfigError, Result};
pub use job::{JobMode, JobRepository, JobStatus, JobType, NewJob, TranslationJob};
pub use pipeline::{PipelineSettings, RunOutcome};
pub use secrets::{resolve_secret, SecretError};
pub use store::{fetch_all, Filter, Row, SelectQuery, SqliteStore, StoreError, TableStore};
pub use supervisor::SupervisorSettings;
pub use translate::BatchTranslator;
