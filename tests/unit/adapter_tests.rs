/*!
 * Tests for the translation adapter
 */

use std::sync::Arc;
use std::time::Duration;

use doctrans::document::BlockId;
use doctrans::providers::mock::MockBackend;
use doctrans::translation::{
    AdapterOptions, PassThroughReason, TranslationAdapter, TranslationRequest, TranslationStatus,
};

use crate::common::mock_backends::{SLOW_MARKER, hindi_backend, slow_on_marker};

fn fast_options() -> AdapterOptions {
    AdapterOptions {
        call_timeout: Duration::from_secs(5),
        retry_count: 2,
        retry_backoff: Duration::from_millis(1),
        concurrency_limit: 4,
    }
}

fn request(index: usize, text: &str) -> TranslationRequest {
    TranslationRequest::new(BlockId::new(0, index), text, "en", "hi")
}

#[tokio::test]
async fn test_translateAll_shouldKeepRequestOrderAndDeduplicate() {
    let backend = hindi_backend();
    let adapter = TranslationAdapter::new(Arc::new(backend.clone()), fast_options());
    let requests = vec![
        request(0, "Hello"),
        request(1, "Thank you"),
        request(2, "Hello"),
        request(3, "  Hello  "),
    ];

    let results = adapter.translate_all(&requests).await;

    assert_eq!(results.len(), 4);
    for (result, request) in results.iter().zip(&requests) {
        assert_eq!(result.block_id, request.block_id);
    }
    assert_eq!(results[0].text, "नमस्ते");
    assert_eq!(results[1].text, "धन्यवाद");
    assert_eq!(results[3].text, "नमस्ते");
    assert_eq!(backend.call_count(), 2);
    assert_eq!(adapter.stats().cache.entries, 2);
}

#[tokio::test]
async fn test_translateAll_shouldPassThroughWithoutCallingBackend() {
    let backend = MockBackend::working();
    let adapter = TranslationAdapter::new(Arc::new(backend.clone()), fast_options());
    let requests = vec![
        TranslationRequest::new(BlockId::new(0, 0), "नमस्ते दुनिया", "hi", "hi"),
        TranslationRequest::new(BlockId::new(0, 1), "   ", "en", "hi"),
        TranslationRequest::new(BlockId::new(0, 2), "42 / 17 %", "en", "hi"),
        TranslationRequest::new(BlockId::new(0, 3), "Bonjour", "fra", "fr"),
    ];

    let results = adapter.translate_all(&requests).await;

    assert_eq!(results[0].status, TranslationStatus::PassedThrough(PassThroughReason::SameLanguage));
    assert_eq!(results[1].status, TranslationStatus::PassedThrough(PassThroughReason::BlankText));
    assert_eq!(results[2].status, TranslationStatus::PassedThrough(PassThroughReason::NoLetters));
    assert_eq!(results[3].status, TranslationStatus::PassedThrough(PassThroughReason::SameLanguage));
    assert!(results.iter().zip(&requests).all(|(r, q)| r.text == q.text));
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn test_translateOne_withTransientFailure_shouldRetry() {
    // every second backend request fails with a 503
    let backend = MockBackend::intermittent(2);
    let adapter = TranslationAdapter::new(Arc::new(backend.clone()), fast_options());

    let first = adapter.translate_one(&request(0, "Alpha")).await;
    let second = adapter.translate_one(&request(1, "Beta")).await;

    assert_eq!(first.status, TranslationStatus::Translated);
    assert_eq!(second.status, TranslationStatus::Translated);
    assert_eq!(second.text, "[hi] Beta");
    assert_eq!(backend.call_count(), 3);
    assert_eq!(adapter.stats().failed_units, 0);
}

#[tokio::test]
async fn test_translateOne_withFailingBackend_shouldKeepOriginalText() {
    let backend = MockBackend::failing();
    let options = AdapterOptions {
        retry_count: 1,
        ..fast_options()
    };
    let adapter = TranslationAdapter::new(Arc::new(backend.clone()), options);

    let result = adapter.translate_one(&request(0, "Quarterly results")).await;

    assert!(result.is_failed());
    assert_eq!(result.text, "Quarterly results");
    assert_eq!(result.length_delta, 0);
    assert_eq!(backend.call_count(), 2);
    assert_eq!(adapter.stats().failed_units, 1);
}

#[tokio::test]
async fn test_translateOne_withEmptyAnswer_shouldFailWithoutRetry() {
    let backend = MockBackend::empty();
    let adapter = TranslationAdapter::new(Arc::new(backend.clone()), fast_options());

    let result = adapter.translate_one(&request(0, "Summary")).await;

    assert!(result.is_failed());
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn test_translateAll_withSlowUnit_shouldTimeOutOnlyThatUnit() {
    let backend = slow_on_marker(Duration::from_millis(500));
    let options = AdapterOptions {
        call_timeout: Duration::from_millis(50),
        retry_count: 0,
        ..fast_options()
    };
    let adapter = TranslationAdapter::new(Arc::new(backend), options);
    let slow_text = format!("Appendix {}", SLOW_MARKER);
    let requests = vec![request(0, "Preface"), request(1, &slow_text), request(2, "Index")];

    let results = adapter.translate_all(&requests).await;

    assert_eq!(results[0].status, TranslationStatus::Translated);
    assert!(results[1].is_failed());
    assert_eq!(results[1].text, slow_text);
    assert_eq!(results[2].status, TranslationStatus::Translated);
}

#[tokio::test]
async fn test_translateAll_shouldRespectConcurrencyLimit() {
    let backend = MockBackend::slow(30);
    let options = AdapterOptions {
        concurrency_limit: 1,
        ..fast_options()
    };
    let adapter = TranslationAdapter::new(Arc::new(backend.clone()), options);
    let requests: Vec<_> = ["One", "Two", "Three"]
        .iter()
        .enumerate()
        .map(|(i, t)| request(i, t))
        .collect();

    let start = std::time::Instant::now();
    let results = adapter.translate_all(&requests).await;

    assert!(results.iter().all(|r| r.status == TranslationStatus::Translated));
    // three calls of 30ms cannot overlap under a single permit
    assert!(start.elapsed() >= Duration::from_millis(85));
}
