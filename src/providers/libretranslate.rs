/*!
 * LibreTranslate client.
 *
 * Talks to the `/translate` endpoint of a LibreTranslate server with a
 * form-encoded request and reads `translatedText` from the JSON answer.
 */

use async_trait::async_trait;
use log::{debug, error};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::ProviderError;

use super::{TranslationBackend, base_url, request_error, status_error};

/// Source code LibreTranslate uses for auto-detection
const AUTO_DETECT: &str = "auto";

/// LibreTranslate client
#[derive(Debug, Clone)]
pub struct LibreTranslate {
    /// Base URL of the server, without the endpoint path
    base_url: String,
    /// Optional API key for hosted instances
    api_key: Option<String>,
    /// HTTP client for making requests
    client: Client,
}

/// Successful response of `/translate`
#[derive(Debug, Deserialize)]
pub struct TranslateResponse {
    #[serde(rename = "translatedText")]
    pub translated_text: String,
}

/// Error body returned by LibreTranslate
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Response of `/languages`
#[derive(Debug, Deserialize)]
pub struct SupportedLanguage {
    pub code: String,
    pub name: String,
}

impl LibreTranslate {
    /// Create a client for the given host and port
    pub fn new(host: impl AsRef<str>, port: u16, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url(host.as_ref(), port),
            api_key: api_key.filter(|k| !k.is_empty()),
            client: Client::builder()
                .pool_idle_timeout(Duration::from_secs(90))
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
        }
    }

    /// Create a client from a complete base URL
    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            base_url: url.into().trim_end_matches('/').to_string(),
            api_key: None,
            client: Client::new(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/translate", self.base_url)
    }

    fn form<'a>(&'a self, text: &'a str, source: &'a str, target: &'a str) -> Vec<(&'static str, &'a str)> {
        let source = if source == "und" || source.is_empty() {
            AUTO_DETECT
        } else {
            source
        };
        let mut form = vec![("q", text), ("source", source), ("target", target), ("format", "text")];
        if let Some(key) = &self.api_key {
            form.push(("api_key", key.as_str()));
        }
        form
    }

    /// List the languages the server supports
    pub async fn languages(&self) -> Result<Vec<SupportedLanguage>, ProviderError> {
        let url = format!("{}/languages", self.base_url);
        let response = self.client.get(&url).send().await.map_err(request_error)?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, text));
        }
        response
            .json::<Vec<SupportedLanguage>>()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl TranslationBackend for LibreTranslate {
    fn name(&self) -> &str {
        "libretranslate"
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        let form = self.form(text, source_language, target_language);
        debug!(
            "LibreTranslate request: {} chars {} -> {}",
            text.chars().count(),
            source_language,
            target_language
        );

        let response = self
            .client
            .post(self.endpoint())
            .form(&form)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let body = response.text().await.map_err(request_error)?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            error!("LibreTranslate error ({}): {}", status, message);
            return Err(status_error(status, message));
        }

        serde_json::from_str::<TranslateResponse>(&body)
            .map(|r| r.translated_text)
            .map_err(|e| ProviderError::ParseError(format!("{}: {}", e, body.chars().take(200).collect::<String>())))
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        self.languages().await.map(|_| ())
    }
}
