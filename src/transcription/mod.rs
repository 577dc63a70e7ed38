use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::config::WhisperConfig;

#[derive(Debug, Error)]
pub enum TranscriptionError {
    #[error("failed to read audio file: {0}")]
    Io(#[from] std::io::Error),
    #[error("request to transcription server failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("malformed transcription response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait SpeechToText: Send + Sync {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError>;
}

/// Client for an OpenAI-compatible speech-to-text endpoint
/// (`POST {base}/audio/transcriptions`, multipart upload).
pub struct WhisperClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
}

impl WhisperClient {
    pub fn new(config: &WhisperConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.api_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        }
    }
}

#[async_trait]
impl SpeechToText for WhisperClient {
    async fn transcribe(&self, audio_path: &Path) -> Result<String, TranscriptionError> {
        let bytes = tokio::fs::read(audio_path).await?;
        let filename = audio_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "audio".to_string());

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename)
            .mime_str("application/octet-stream")
            .map_err(|e| TranscriptionError::Malformed(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .part("file", part)
            .text("model", self.model.clone());

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .multipart(form)
            .send()
            .await?
            .error_for_status()?;

        let result: Value = response.json().await?;
        result["text"]
            .as_str()
            .map(|text| text.trim().to_string())
            .ok_or_else(|| {
                TranscriptionError::Malformed("response carries no text field".to_string())
            })
    }
}
