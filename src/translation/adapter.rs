/*!
 * Translation engine adapter.
 *
 * Turns per-block translation requests into deduplicated backend calls:
 * identical (normalized text, source, target) triples share one call through
 * the single-flight cache, every attempt holds one permit of the global
 * backend semaphore and is bounded by the per-call timeout. A unit that
 * still fails after its retries degrades to pass-through of the original
 * text.
 */

use futures::stream::{self, StreamExt};
use log::{debug, warn};
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::classification::ScriptCoverage;
use crate::document::BlockId;
use crate::errors::{ProviderError, TranslationError};
use crate::language_utils;
use crate::providers::TranslationBackend;

use super::cache::{CacheStats, TranslationCache, TranslationKey, TranslationOutcome, truncate_text};

/// Call policy of the adapter
#[derive(Debug, Clone, PartialEq)]
pub struct AdapterOptions {
    /// Upper bound for a single backend call
    pub call_timeout: Duration,
    /// Extra attempts after a retryable failure
    pub retry_count: u32,
    /// Base delay of the exponential backoff between attempts
    pub retry_backoff: Duration,
    /// Global cap on concurrent backend calls
    pub concurrency_limit: usize,
}

impl Default for AdapterOptions {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(30),
            retry_count: 2,
            retry_backoff: Duration::from_millis(500),
            concurrency_limit: 4,
        }
    }
}

/// One block's translation request
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationRequest {
    pub block_id: BlockId,
    pub text: String,
    pub source_language: String,
    pub target_language: String,
}

impl TranslationRequest {
    pub fn new(
        block_id: BlockId,
        text: impl Into<String>,
        source_language: impl Into<String>,
        target_language: impl Into<String>,
    ) -> Self {
        Self {
            block_id,
            text: text.into(),
            source_language: source_language.into(),
            target_language: target_language.into(),
        }
    }
}

/// Why a block was passed through without calling the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassThroughReason {
    SameLanguage,
    BlankText,
    NoLetters,
}

/// Outcome kind of one block
#[derive(Debug, Clone, PartialEq)]
pub enum TranslationStatus {
    Translated,
    PassedThrough(PassThroughReason),
    /// Backend failed or timed out; the text is the original
    Failed(String),
}

/// Translation result mapped back to its block
#[derive(Debug, Clone, PartialEq)]
pub struct BlockTranslation {
    pub block_id: BlockId,
    /// Text to render: the translation, or the original on pass-through/failure
    pub text: String,
    pub status: TranslationStatus,
    /// Change in character count relative to the source text
    pub length_delta: i64,
}

impl BlockTranslation {
    fn new(request: &TranslationRequest, text: String, status: TranslationStatus) -> Self {
        let length_delta = text.chars().count() as i64 - request.text.chars().count() as i64;
        Self {
            block_id: request.block_id,
            text,
            status,
            length_delta,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, TranslationStatus::Failed(_))
    }
}

/// Backend usage of one adapter
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AdapterStats {
    /// Backend attempts, retries included
    pub backend_calls: usize,
    /// Units that failed after all attempts
    pub failed_units: usize,
    pub cache: CacheStats,
}

/// Adapter between text blocks and a translation backend
#[derive(Debug)]
pub struct TranslationAdapter {
    backend: Arc<dyn TranslationBackend>,
    cache: Arc<TranslationCache>,
    semaphore: Arc<Semaphore>,
    options: AdapterOptions,
    backend_calls: AtomicUsize,
    failed_units: AtomicUsize,
}

impl TranslationAdapter {
    pub fn new(backend: Arc<dyn TranslationBackend>, options: AdapterOptions) -> Self {
        let permits = options.concurrency_limit.max(1);
        Self {
            backend,
            cache: Arc::new(TranslationCache::new()),
            semaphore: Arc::new(Semaphore::new(permits)),
            options,
            backend_calls: AtomicUsize::new(0),
            failed_units: AtomicUsize::new(0),
        }
    }

    /// Share an existing cache instead of a fresh one
    pub fn with_cache(mut self, cache: Arc<TranslationCache>) -> Self {
        self.cache = cache;
        self
    }

    pub fn options(&self) -> &AdapterOptions {
        &self.options
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn stats(&self) -> AdapterStats {
        AdapterStats {
            backend_calls: self.backend_calls.load(Ordering::Relaxed),
            failed_units: self.failed_units.load(Ordering::Relaxed),
            cache: self.cache.stats(),
        }
    }

    /// Reason to skip the backend for a request, if any
    pub fn pass_through_reason(request: &TranslationRequest) -> Option<PassThroughReason> {
        if request.text.trim().is_empty() {
            return Some(PassThroughReason::BlankText);
        }
        if ScriptCoverage::measure(&request.text).letters() == 0 {
            return Some(PassThroughReason::NoLetters);
        }
        if request.source_language == request.target_language
            || language_utils::language_codes_match(&request.source_language, &request.target_language)
        {
            return Some(PassThroughReason::SameLanguage);
        }
        None
    }

    /// Translate a set of block requests, one backend call per distinct unit
    ///
    /// The result has one entry per request, in request order.
    pub async fn translate_all(&self, requests: &[TranslationRequest]) -> Vec<BlockTranslation> {
        let mut groups: HashMap<TranslationKey, Vec<usize>> = HashMap::new();
        let mut results: Vec<Option<BlockTranslation>> = vec![None; requests.len()];

        for (index, request) in requests.iter().enumerate() {
            match Self::pass_through_reason(request) {
                Some(reason) => {
                    results[index] = Some(BlockTranslation::new(
                        request,
                        request.text.clone(),
                        TranslationStatus::PassedThrough(reason),
                    ));
                }
                None => {
                    let key = TranslationKey::new(&request.text, &request.source_language, &request.target_language);
                    groups.entry(key).or_default().push(index);
                }
            }
        }

        debug!(
            "Translating {} block(s) as {} distinct unit(s)",
            requests.len(),
            groups.len()
        );

        let resolved: Vec<(TranslationKey, TranslationOutcome)> = stream::iter(groups.keys().cloned())
            .map(|key| async move {
                let outcome = self.resolve(&key).await;
                (key, outcome)
            })
            .buffer_unordered(self.options.concurrency_limit.max(1))
            .collect()
            .await;

        for (key, outcome) in resolved {
            let Some(indices) = groups.get(&key) else { continue };
            for &index in indices {
                let request = &requests[index];
                results[index] = Some(match &outcome {
                    Ok(text) => BlockTranslation::new(request, text.clone(), TranslationStatus::Translated),
                    Err(e) => BlockTranslation::new(request, request.text.clone(), TranslationStatus::Failed(e.to_string())),
                });
            }
        }

        results
            .into_iter()
            .zip(requests)
            .map(|(result, request)| {
                result.unwrap_or_else(|| {
                    BlockTranslation::new(
                        request,
                        request.text.clone(),
                        TranslationStatus::Failed("unit was never resolved".to_string()),
                    )
                })
            })
            .collect()
    }

    /// Translate a single request
    pub async fn translate_one(&self, request: &TranslationRequest) -> BlockTranslation {
        self.translate_all(std::slice::from_ref(request))
            .await
            .pop()
            .unwrap_or_else(|| {
                BlockTranslation::new(
                    request,
                    request.text.clone(),
                    TranslationStatus::Failed("no result".to_string()),
                )
            })
    }

    /// Resolve one unit through the single-flight cache
    async fn resolve(&self, key: &TranslationKey) -> TranslationOutcome {
        self.cache.get_or_translate(key, || self.call_with_retries(key)).await
    }

    async fn call_with_retries(&self, key: &TranslationKey) -> TranslationOutcome {
        let mut attempt = 0u32;
        loop {
            let result = self.call_once(key).await;
            match result {
                Ok(text) => return Ok(text),
                Err(e) if attempt < self.options.retry_count && is_retryable(&e) => {
                    let delay = backoff_delay(self.options.retry_backoff, attempt);
                    debug!(
                        "Retrying '{}' after {:?} (attempt {}/{}): {}",
                        truncate_text(key.text(), 30),
                        delay,
                        attempt + 1,
                        self.options.retry_count,
                        e
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    self.failed_units.fetch_add(1, Ordering::Relaxed);
                    warn!(
                        "Translation of '{}' ({} -> {}) failed: {}",
                        truncate_text(key.text(), 30),
                        key.source_language(),
                        key.target_language(),
                        e
                    );
                    return Err(e);
                }
            }
        }
    }

    /// One backend attempt under a concurrency permit and the call timeout
    async fn call_once(&self, key: &TranslationKey) -> TranslationOutcome {
        let _permit = self
            .semaphore
            .acquire()
            .await
            .map_err(|_| ProviderError::ConnectionError("backend limiter closed".to_string()))?;

        self.backend_calls.fetch_add(1, Ordering::Relaxed);
        let call = self
            .backend
            .translate(key.text(), key.source_language(), key.target_language());

        match tokio::time::timeout(self.options.call_timeout, call).await {
            Err(_) => Err(TranslationError::Timeout(self.options.call_timeout)),
            Ok(Err(e)) => Err(TranslationError::Provider(e)),
            Ok(Ok(text)) if text.trim().is_empty() => Err(TranslationError::EmptyResponse),
            Ok(Ok(text)) => Ok(text),
        }
    }
}

/// Whether resubmitting the unit can help
fn is_retryable(error: &TranslationError) -> bool {
    match error {
        TranslationError::Timeout(_) => true,
        TranslationError::EmptyResponse => false,
        TranslationError::Provider(e) => match e {
            ProviderError::ConnectionError(_) | ProviderError::RateLimitExceeded(_) | ProviderError::RequestFailed(_) => {
                true
            }
            ProviderError::ApiError { status_code, .. } => *status_code >= 500,
            ProviderError::ParseError(_) | ProviderError::AuthenticationError(_) => false,
        },
    }
}

/// Exponential backoff with up to 50% random jitter
fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let base_ms = base.as_millis() as u64;
    let exp = base_ms.saturating_mul(1u64 << attempt.min(16));
    let jitter = if base_ms > 0 {
        rand::rng().random_range(0..=base_ms / 2)
    } else {
        0
    };
    Duration::from_millis(exp.saturating_add(jitter))
}
