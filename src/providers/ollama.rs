use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::language_utils;

use super::{TranslationBackend, base_url, request_error, status_error};

/// Ollama client prompted to act as a translation backend
#[derive(Debug, Clone)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// Model used for generation
    model: String,
    /// Sampling temperature
    temperature: f32,
    /// HTTP client for making requests
    client: Client,
}

/// Generate request for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Model name to use for generation
    model: String,
    /// Prompt to generate from
    prompt: String,
    /// System message to guide the model
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

/// Generation options for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

/// Generation response from the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Model name
    #[serde(default)]
    pub model: String,
    /// Generated text
    #[serde(default)]
    pub response: String,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
}

impl GenerationRequest {
    /// Create a new non-streaming generation request
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            prompt: prompt.into(),
            system: None,
            options: None,
            stream: Some(false),
        }
    }

    /// Set the system prompt
    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.options = Some(GenerationOptions {
            temperature: Some(temperature),
        });
        self
    }
}

impl Ollama {
    /// Create a new Ollama client for a host and port
    ///
    /// Ollama speaks HTTP/1.1; connections are pooled for parallel pages.
    pub fn new(host: impl AsRef<str>, port: u16, model: impl Into<String>, temperature: f32) -> Self {
        Self {
            base_url: base_url(host.as_ref(), port),
            model: model.into(),
            temperature,
            client: Client::builder()
                .http1_only()
                .pool_idle_timeout(Duration::from_secs(90))
                .pool_max_idle_per_host(20)
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
        }
    }

    fn system_prompt(source_language: &str, target_language: &str) -> String {
        let source = if source_language == "und" {
            "the source language".to_string()
        } else {
            language_utils::get_language_name(source_language).unwrap_or_else(|_| source_language.to_string())
        };
        let target =
            language_utils::get_language_name(target_language).unwrap_or_else(|_| target_language.to_string());
        format!(
            "You are a professional translator. Translate the user's text from {} into {}. \
             Keep line breaks, numbers and punctuation. Reply with the translation only.",
            source, target
        )
    }

    /// Generate text from the Ollama API
    pub async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ProviderError> {
        let url = format!("{}/api/generate", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let response_text = response.text().await.map_err(request_error)?;
        if !status.is_success() {
            error!("Ollama API error ({}): {}", status, response_text);
            return Err(status_error(status, response_text));
        }

        match serde_json::from_str::<GenerationResponse>(&response_text) {
            Ok(generated) => Ok(generated),
            Err(e) => {
                // Some servers stream JSONL even with stream=false
                let pieces: Vec<GenerationResponse> = response_text
                    .lines()
                    .filter(|l| !l.trim().is_empty())
                    .filter_map(|l| serde_json::from_str::<GenerationResponse>(l).ok())
                    .collect();
                if pieces.is_empty() {
                    return Err(ProviderError::ParseError(format!(
                        "Failed to parse Ollama API response: {}",
                        e
                    )));
                }
                Ok(GenerationResponse {
                    model: pieces[0].model.clone(),
                    response: pieces.iter().map(|p| p.response.as_str()).collect(),
                    done: pieces.iter().any(|p| p.done),
                })
            }
        }
    }

    /// Get the Ollama API version
    pub async fn version(&self) -> Result<String, ProviderError> {
        let url = format!("{}/api/version", self.base_url);
        let response: serde_json::Value = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(request_error)?
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        response["version"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| ProviderError::ParseError("Invalid version format in response".to_string()))
    }
}

#[async_trait]
impl TranslationBackend for Ollama {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        let request = GenerationRequest::new(&self.model, text)
            .system(Self::system_prompt(source_language, target_language))
            .temperature(self.temperature);

        debug!("Ollama request with model {}", self.model);
        let response = self.generate(request).await?;
        Ok(response.response.trim().to_string())
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        self.version().await.map(|_| ())
    }
}
