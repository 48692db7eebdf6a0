/*!
 * Backend-specific concurrency tuning.
 *
 * Default concurrency and timeout budgets per backend, used when the
 * configuration does not set them explicitly.
 */

use std::time::Duration;

use crate::app_config::TranslationProvider;

/// Backend concurrency profile with tuned defaults
#[derive(Debug, Clone, PartialEq)]
pub struct BackendProfile {
    /// Maximum concurrent requests
    pub max_concurrent_requests: usize,
    /// Target requests per minute, if the backend is rate limited
    pub target_rpm: Option<u32>,
    /// Reasonable per-call timeout
    pub call_timeout: Duration,
}

impl BackendProfile {
    /// Get the profile for a given backend
    pub fn for_provider(provider: TranslationProvider) -> Self {
        match provider {
            // A LibreTranslate container is CPU-bound; a few parallel calls saturate it
            TranslationProvider::LibreTranslate => Self {
                max_concurrent_requests: 4,
                target_rpm: None,
                call_timeout: Duration::from_secs(30),
            },
            // Local LLM generation is slow per call but tolerates parallel requests
            TranslationProvider::Ollama => Self {
                max_concurrent_requests: 8,
                target_rpm: None,
                call_timeout: Duration::from_secs(120),
            },
        }
    }

    /// Get effective concurrent requests, respecting any user override
    pub fn effective_concurrent_requests(&self, user_override: Option<usize>) -> usize {
        user_override.filter(|n| *n > 0).unwrap_or(self.max_concurrent_requests)
    }
}
