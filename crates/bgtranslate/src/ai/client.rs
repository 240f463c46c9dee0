//! OpenAI-compatible chat-completion client.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;

use super::error::AiError;
use crate::config::AiConfig;
use crate::secrets::resolve_secret;

/// Default connect timeout for gateway requests.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A single-turn text completion.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Sends one system and one user message, returning the assistant's text.
    async fn complete(&self, system: &str, user: &str) -> Result<String, AiError>;
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completion client for an OpenAI-compatible gateway.
pub struct HttpCompletionClient {
    client: Client,
    endpoint: String,
    model: String,
    temperature: f32,
    api_key: SecretString,
}

impl HttpCompletionClient {
    pub fn new(config: &AiConfig, api_key: SecretString) -> Result<Self, AiError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AiError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key,
        })
    }

    /// Builds a client with the API key resolved from the configured sources.
    pub fn from_config(config: &AiConfig) -> crate::Result<Self> {
        let api_key = resolve_secret(
            config.api_key.as_deref(),
            config.api_key_file.as_deref(),
            config.api_key_env.as_deref(),
        )?;
        Ok(Self::new(config, api_key)?)
    }
}

#[async_trait]
impl CompletionClient for HttpCompletionClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String, AiError> {
        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user},
            ],
        });

        debug!("Sending completion request to {}", self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::status(status.as_u16(), &body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| AiError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| AiError::InvalidResponse("response has no message content".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn client_for(server: &Server) -> HttpCompletionClient {
        let config = AiConfig {
            base_url: server.url(),
            ..AiConfig::default()
        };
        HttpCompletionClient::new(&config, SecretString::from("test-key".to_string())).unwrap()
    }

    #[tokio::test]
    async fn test_complete_returns_content() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::PartialJson(json!({"model": "gpt-4o-mini"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"{\"a\":\"b\"}"}}]}"#)
            .create_async()
            .await;

        let content = client_for(&server).complete("system", "user").await.unwrap();
        assert_eq!(content, r#"{"a":"b"}"#);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_payment_required_is_status_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(402)
            .with_body("credits exhausted")
            .create_async()
            .await;

        let err = client_for(&server).complete("s", "u").await.unwrap_err();
        assert_eq!(err.status_code(), Some(402));
    }

    #[tokio::test]
    async fn test_empty_choices_is_invalid() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let err = client_for(&server).complete("s", "u").await.unwrap_err();
        assert!(matches!(err, AiError::InvalidResponse(_)));
    }

    #[test]
    fn test_from_config_requires_key() {
        let config = AiConfig {
            api_key: None,
            api_key_file: None,
            api_key_env: Some("BGTRANSLATE_TEST_KEY_THAT_IS_NOT_SET".to_string()),
            ..AiConfig::default()
        };
        assert!(HttpCompletionClient::from_config(&config).is_err());

        let config = AiConfig {
            api_key: Some("inline".to_string()),
            ..AiConfig::default()
        };
        assert!(HttpCompletionClient::from_config(&config).is_ok());
    }
}
