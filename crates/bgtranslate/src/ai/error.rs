//! AI client error types.

use thiserror::Error;

/// Longest response body kept in an error message.
const MAX_BODY_LEN: usize = 200;

#[derive(Error, Debug)]
pub enum AiError {
    /// The request never produced an HTTP response.
    #[error("AI request failed: {0}")]
    Transport(String),

    /// The gateway answered with a non-success status.
    #[error("AI gateway returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The response could not be read as a chat completion.
    #[error("Invalid AI response: {0}")]
    InvalidResponse(String),
}

impl AiError {
    pub fn status(status: u16, body: &str) -> Self {
        let body = match body.char_indices().nth(MAX_BODY_LEN) {
            Some((cut, _)) => &body[..cut],
            None => body,
        };
        AiError::Status {
            status,
            body: body.to_string(),
        }
    }

    /// HTTP status of the failure, if the gateway answered.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            AiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}
