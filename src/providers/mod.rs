/*!
 * Translation backends.
 *
 * This module contains client implementations for the machine translation
 * services the pipeline can call:
 * - LibreTranslate: self-hosted or public LibreTranslate server
 * - Ollama: local LLM server prompted to translate
 * - Mock: scripted backend used by tests
 */

use async_trait::async_trait;
use std::fmt::Debug;

use crate::errors::ProviderError;

/// Common trait for all translation backends
///
/// Backends are assumed idempotent: resubmitting the same input after a
/// timeout is always safe.
#[async_trait]
pub trait TranslationBackend: Send + Sync + Debug {
    /// Short name used in logs and reports
    fn name(&self) -> &str;

    /// Translate one text from `source_language` to `target_language`
    ///
    /// Language codes are ISO 639-1; `und` means the source is unknown.
    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError>;

    /// Test the connection to the backend
    async fn test_connection(&self) -> Result<(), ProviderError> {
        Ok(())
    }
}

/// Map a reqwest failure onto the provider error taxonomy
pub(crate) fn request_error(error: reqwest::Error) -> ProviderError {
    if error.is_timeout() || error.is_connect() {
        ProviderError::ConnectionError(error.to_string())
    } else {
        ProviderError::RequestFailed(error.to_string())
    }
}

/// Map a non-success HTTP status onto the provider error taxonomy
pub(crate) fn status_error(status: reqwest::StatusCode, message: String) -> ProviderError {
    match status.as_u16() {
        401 | 403 => ProviderError::AuthenticationError(message),
        429 => ProviderError::RateLimitExceeded(message),
        code => ProviderError::ApiError {
            status_code: code,
            message,
        },
    }
}

/// Build a base URL from a host that may or may not carry a scheme and port
pub(crate) fn base_url(host: &str, port: u16) -> String {
    let host = host.trim_end_matches('/');
    match host.split_once("://") {
        Some((scheme, rest)) if rest.contains(':') => format!("{}://{}", scheme, rest),
        Some((scheme, rest)) => format!("{}://{}:{}", scheme, rest, port),
        None => format!("http://{}:{}", host, port),
    }
}

pub mod libretranslate;
pub mod mock;
pub mod ollama;
