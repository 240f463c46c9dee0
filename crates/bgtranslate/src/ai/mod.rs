//! Chat-completion client used by the batch translator.

pub mod client;
pub mod error;
pub mod retry;

pub use client::{CompletionClient, HttpCompletionClient};
pub use error::AiError;
pub use retry::{retry_request, RetryPolicy};
