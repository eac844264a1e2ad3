use crate::traits::{LlmClient, LlmError, LlmResponse, is_context_overflow};
use async_trait::async_trait;
use narrate_http::HttpClient;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

const OLLAMA_CONNECTION_ERROR: &str = "No running Ollama server detected. Start it with: `ollama serve` (after installing). Install instructions: https://github.com/ollama/ollama";

/// Ollama client for local model inference.
pub struct OllamaClient {
    client: HttpClient,
    model: String,
}

#[derive(Debug, Deserialize)]
struct GenerateReply {
    #[serde(default)]
    response: String,
    #[serde(default)]
    eval_count: Option<u32>,
    #[serde(default)]
    done_reason: Option<String>,
}

impl OllamaClient {
    /// Create a new client and verify server/model availability.
    pub async fn new(base_url: &str, model: String) -> Result<Self, LlmError> {
        let base = format!("{}/", base_url.trim_end_matches('/'));
        let client = HttpClient::new(&base)
            .map_err(|e| LlmError::Config(format!("Failed to create HTTP client: {e}")))?;

        let ollama = Self { client, model };
        let models = ollama.fetch_available_models().await?;
        if !models.contains(&ollama.model) {
            tracing::info!(target: "llm", "Model {} not found locally, pulling...", ollama.model);
            ollama.pull_model().await?;
        }
        Ok(ollama)
    }

    async fn fetch_available_models(&self) -> Result<Vec<String>, LlmError> {
        let val: JsonValue = self
            .client
            .get_json("api/tags", None)
            .await
            .map_err(|_| LlmError::Config(OLLAMA_CONNECTION_ERROR.to_string()))?;

        Ok(val
            .get("models")
            .and_then(|m| m.as_array())
            .map(|arr| {
                arr.iter()
                    .filter_map(|v| v.get("name").and_then(|n| n.as_str()))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn pull_model(&self) -> Result<(), LlmError> {
        let payload = json!({ "model": self.model, "stream": false });
        let _: JsonValue = self
            .client
            .post_json("api/pull", None, &payload)
            .await
            .map_err(|e| LlmError::ModelNotAvailable(format!("{}: {e}", self.model)))?;
        tracing::info!(target: "llm", "Successfully pulled model: {}", self.model);
        Ok(())
    }
}

#[async_trait]
impl LlmClient for OllamaClient {
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: Option<&str>,
        max_tokens: Option<u32>,
        temperature: Option<f32>,
    ) -> Result<LlmResponse, LlmError> {
        let mut options = serde_json::Map::new();
        if let Some(temp) = temperature {
            options.insert("temperature".to_string(), json!(temp));
        }
        if let Some(max_tok) = max_tokens {
            options.insert("num_predict".to_string(), json!(max_tok));
        }

        let mut payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
            "options": options
        });
        if let Some(system) = system_prompt {
            payload["system"] = json!(system);
        }

        let reply: GenerateReply = self
            .client
            .post_json("api/generate", None, &payload)
            .await?;

        // Ollama silently truncates oversized prompts; a "length" stop with
        // no output is the only hint it overflowed.
        if reply.response.trim().is_empty()
            && reply
                .done_reason
                .as_deref()
                .is_some_and(|r| r == "length" || is_context_overflow(r))
        {
            return Err(LlmError::ContextTooLarge(format!(
                "{} produced no output (done_reason=length)",
                self.model
            )));
        }

        Ok(LlmResponse {
            text: reply.response,
            model: Some(self.model.clone()),
            tokens_used: reply.eval_count,
        })
    }

    async fn health_check(&self) -> bool {
        self.fetch_available_models().await.is_ok()
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
