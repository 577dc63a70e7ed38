use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::LlmConfig;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request to model server failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed model response: {0}")]
    Malformed(String),
}

/// Seam between the summarization pipeline and the generative model.
/// Production uses an OpenAI-compatible server; tests plug in a canned
/// implementation.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

pub struct OpenAIClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAIClient {
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl LLMProvider for OpenAIClient {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [{"role": "user", "content": prompt}],
                "max_tokens": 1024,
                "temperature": 0.7
            }));
        if !self.api_key.is_empty() {
            request = request.header("Authorization", format!("Bearer {}", self.api_key));
        }

        let response = request.send().await?.error_for_status()?;
        let result: Value = response.json().await?;
        let content = result["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| {
                LlmError::Malformed("response carries no message content".to_string())
            })?;

        Ok(content.to_string())
    }
}
