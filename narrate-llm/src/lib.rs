//! Provider‑agnostic LLM integration for narrate.
//!
//! This crate exposes a common [`traits::LlmClient`] interface, concrete
//! OpenAI and Ollama clients, and the [`summarizer`] that turns page
//! fragments into short spoken summaries under a size budget.
//!
//! # Examples
//! ```no_run
//! use narrate_config::LlmConfig;
//! use narrate_llm::{ensure_llm_ready, summarizer::{LlmSummarizer, PageSummarizer}};
//!
//! # #[tokio::main]
//! # async fn main() -> narrate_common::Result<()> {
//! let client = ensure_llm_ready(&LlmConfig::default()).await?;
//! let summarizer = LlmSummarizer::new(client);
//! let analysis = summarizer.analyze("<main><h1>Hello</h1></main>").await;
//! println!("{}", analysis.summary);
//! # Ok(())
//! # }
//! ```
pub mod ollama;
pub mod openai;
pub mod summarizer;
pub mod traits;

use narrate_common::NarrateError;
use narrate_config::LlmConfig;
use ollama::OllamaClient;
use openai::OpenAiClient;
use std::sync::Arc;
use traits::LlmClient;

/// Build the configured LLM client, verifying local models where applicable.
pub async fn ensure_llm_ready(
    config: &LlmConfig,
) -> narrate_common::Result<Arc<dyn LlmClient + Send + Sync + 'static>> {
    match config {
        LlmConfig::Openai {
            model, endpoint, ..
        } => {
            let api_key = config.openai_token().ok_or_else(|| {
                NarrateError::Config(
                    "no OpenAI key: set llm.auth_token or OPENAI_API_KEY".to_string(),
                )
            })?;
            let client = OpenAiClient::with_endpoint(endpoint, api_key, model.clone())
                .map_err(|e| NarrateError::Config(e.to_string()))?;
            Ok(Arc::new(client))
        }
        LlmConfig::Ollama {
            model, endpoint, ..
        } => {
            let client = OllamaClient::new(endpoint, model.clone())
                .await
                .map_err(|e| NarrateError::Config(e.to_string()))?;
            Ok(Arc::new(client))
        }
    }
}

/// Summary request knobs taken from the provider config, defaults elsewhere.
pub fn summary_options(config: &LlmConfig) -> summarizer::SummaryOptions {
    let defaults = summarizer::SummaryOptions::default();
    let (temperature, max_tokens) = match config {
        LlmConfig::Openai {
            temperature,
            max_tokens,
            ..
        }
        | LlmConfig::Ollama {
            temperature,
            max_tokens,
            ..
        } => (*temperature, *max_tokens),
    };
    summarizer::SummaryOptions {
        temperature: temperature.unwrap_or(defaults.temperature),
        max_tokens: max_tokens.unwrap_or(defaults.max_tokens),
        ..defaults
    }
}
