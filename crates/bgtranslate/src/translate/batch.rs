use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use super::payload::{build_payload, merge_response, BatchItem, PayloadShape};
use super::prompt::system_prompt;
use super::response::parse_response;
use crate::ai::{retry_request, AiError, CompletionClient, RetryPolicy};
use crate::store::Row;

/// Failures that must stop the whole job rather than the batch.
#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("AI credits exhausted: {0}")]
    QuotaExhausted(#[source] AiError),
}

/// Translates batches of records with one completion call per batch.
pub struct BatchTranslator {
    client: Arc<dyn CompletionClient>,
    policy: RetryPolicy,
}

impl BatchTranslator {
    pub fn new(client: Arc<dyn CompletionClient>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    /// Returns one entry per item: the translated fields, or `None` when the
    /// item could not be translated.
    ///
    /// Rate limiting is retried per the policy. Fatal statuses surface as
    /// [`TranslateError::QuotaExhausted`]; any other failure marks every item
    /// of the batch as untranslated.
    pub async fn translate_batch(
        &self,
        shape: &PayloadShape,
        items: &[BatchItem<'_>],
        source_language: &str,
        target_language: &str,
    ) -> Result<Vec<Option<Row>>, TranslateError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let system = system_prompt(shape, source_language, target_language);
        let payload = build_payload(shape, items).to_string();

        let client = self.client.as_ref();
        let (system, payload) = (system.as_str(), payload.as_str());
        let completion = retry_request(&self.policy, move || client.complete(system, payload)).await;

        let text = match completion {
            Ok(text) => text,
            Err(err) if self.policy.is_fatal(&err) => {
                return Err(TranslateError::QuotaExhausted(err));
            }
            Err(err) => {
                warn!(batch_size = items.len(), "Batch translation failed: {}", err);
                return Ok(vec![None; items.len()]);
            }
        };

        let expect_array = matches!(shape, PayloadShape::Structured { .. });
        let Some(response) = parse_response(&text, expect_array) else {
            warn!(
                batch_size = items.len(),
                "AI response is not valid JSON, keeping source text"
            );
            return Ok(vec![None; items.len()]);
        };

        let merged = merge_response(shape, items, &response);
        let missing = merged.iter().filter(|r| r.is_none()).count();
        if missing > 0 {
            debug!(missing, "AI response omitted {} of {} records", missing, items.len());
        }
        Ok(merged)
    }
}
