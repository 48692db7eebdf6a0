/*!
 * Mock translation backend for testing.
 *
 * This module provides a scripted backend that simulates different behaviors:
 * - `MockBackend::working()` - Always succeeds with a tagged translation
 * - `MockBackend::intermittent(n)` - Fails every nth request
 * - `MockBackend::failing()` - Always fails with an error
 * - `MockBackend::slow(ms)` - Succeeds after a delay (for timeout testing)
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::TranslationBackend;

/// Behavior mode for the mock backend
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Fails intermittently (every Nth request)
    Intermittent { fail_every: usize },
    /// Always fails with an error
    Failing,
    /// Returns an empty translation
    Empty,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// One recorded backend call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockCall {
    pub text: String,
    pub source_language: String,
    pub target_language: String,
}

/// Mock backend for testing translation behavior
#[derive(Debug, Clone)]
pub struct MockBackend {
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter shared between clones
    request_count: Arc<AtomicUsize>,
    /// Every call received, in arrival order
    calls: Arc<Mutex<Vec<MockCall>>>,
    /// Fixed answers by source text
    translations: HashMap<String, String>,
    /// Extra delay for inputs containing a marker
    delays: Vec<(String, Duration)>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&MockCall) -> String>,
}

impl MockBackend {
    /// Create a new mock backend with the specified behavior
    pub fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
            translations: HashMap::new(),
            delays: Vec::new(),
            custom_response: None,
        }
    }

    pub fn working() -> Self {
        Self::new(MockBehavior::Working)
    }

    pub fn intermittent(fail_every: usize) -> Self {
        Self::new(MockBehavior::Intermittent {
            fail_every: fail_every.max(1),
        })
    }

    pub fn failing() -> Self {
        Self::new(MockBehavior::Failing)
    }

    pub fn empty() -> Self {
        Self::new(MockBehavior::Empty)
    }

    pub fn slow(delay_ms: u64) -> Self {
        Self::new(MockBehavior::Slow { delay_ms })
    }

    /// Answer `source` with `translation` instead of the default tagged text
    pub fn with_translation(mut self, source: impl Into<String>, translation: impl Into<String>) -> Self {
        self.translations.insert(source.into(), translation.into());
        self
    }

    /// Delay every input containing `marker` by `delay`
    pub fn with_delay_for(mut self, marker: impl Into<String>, delay: Duration) -> Self {
        self.delays.push((marker.into(), delay));
        self
    }

    /// Set a custom response generator
    pub fn with_custom_response(mut self, generator: fn(&MockCall) -> String) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Number of requests received so far
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Snapshot of the calls received so far
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Number of calls received for one exact text
    pub fn calls_for(&self, text: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.text == text).count()
    }

    fn answer(&self, call: &MockCall) -> String {
        if let Some(generator) = self.custom_response {
            return generator(call);
        }
        if let Some(fixed) = self.translations.get(&call.text) {
            return fixed.clone();
        }
        format!("[{}] {}", call.target_language, call.text)
    }
}

#[async_trait]
impl TranslationBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    async fn translate(
        &self,
        text: &str,
        source_language: &str,
        target_language: &str,
    ) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        let call = MockCall {
            text: text.to_string(),
            source_language: source_language.to_string(),
            target_language: target_language.to_string(),
        };
        self.calls.lock().push(call.clone());

        for (marker, delay) in &self.delays {
            if text.contains(marker.as_str()) {
                tokio::time::sleep(*delay).await;
            }
        }

        match self.behavior {
            MockBehavior::Working => Ok(self.answer(&call)),
            MockBehavior::Intermittent { fail_every } => {
                if count % fail_every == fail_every - 1 {
                    Err(ProviderError::ApiError {
                        message: format!("Simulated intermittent failure (request #{})", count + 1),
                        status_code: 503,
                    })
                } else {
                    Ok(self.answer(&call))
                }
            }
            MockBehavior::Failing => Err(ProviderError::ApiError {
                message: "Simulated backend failure".to_string(),
                status_code: 500,
            }),
            MockBehavior::Empty => Ok(String::new()),
            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                Ok(self.answer(&call))
            }
        }
    }
}
