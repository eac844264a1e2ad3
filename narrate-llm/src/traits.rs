use async_trait::async_trait;
use narrate_http::HttpError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub model: Option<String>,
    pub tokens_used: Option<u32>,
}

#[derive(thiserror::Error, Debug)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error: {0}")]
    Api(String),

    /// The prompt did not fit the model's context window.
    #[error("Context too large: {0}")]
    ContextTooLarge(String),

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Phrases providers use when a prompt overflows the context window.
const CONTEXT_OVERFLOW_MARKERS: &[&str] = &[
    "context_length_exceeded",
    "maximum context length",
    "context window",
    "context length",
    "too many tokens",
    "prompt is too long",
];

/// Whether an error message reports a context-window overflow.
pub fn is_context_overflow(message: &str) -> bool {
    let lower = message.to_ascii_lowercase();
    CONTEXT_OVERFLOW_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
}

impl From<HttpError> for LlmError {
    fn from(e: HttpError) -> Self {
        match &e {
            HttpError::Api { status, message, .. } => {
                if is_context_overflow(message) {
                    LlmError::ContextTooLarge(message.clone())
                } else if status.as_u16() == 429 {
                    LlmError::RateLimit
                } else if status.as_u16() == 404 {
                    LlmError::ModelNotAvailable(message.clone())
                } else {
                    LlmError::Api(e.to_string())
                }
            }
            HttpError::Network(msg) => LlmError::Network(msg.clone()),
            HttpError::Url(_) | HttpError::Build(_) => LlmError::Config(e.to_string()),
            HttpError::Decode(..) => LlmError::Api(e.to_string()),
        }
    }
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a response to the given prompt with optional system prompt
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse, LlmError>;

    /// Check if the LLM service is available
    async fn health_check(&self) -> bool;

    /// Get the model name being used
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    fn api(status: u16, message: &str) -> HttpError {
        HttpError::Api {
            status: StatusCode::from_u16(status).unwrap(),
            message: message.into(),
            request_id: "-".into(),
        }
    }

    #[test]
    fn overflow_messages_map_to_context_too_large() {
        let e = LlmError::from(api(
            400,
            "This model's maximum context length is 128000 tokens (context_length_exceeded)",
        ));
        assert!(matches!(e, LlmError::ContextTooLarge(_)));
    }

    #[test]
    fn other_statuses_keep_their_meaning() {
        assert!(matches!(LlmError::from(api(429, "slow down")), LlmError::RateLimit));
        assert!(matches!(
            LlmError::from(api(404, "model 'x' not found")),
            LlmError::ModelNotAvailable(_)
        ));
        assert!(matches!(LlmError::from(api(500, "boom")), LlmError::Api(_)));
        assert!(matches!(
            LlmError::from(HttpError::Network("reset".into())),
            LlmError::Network(_)
        ));
    }
}
