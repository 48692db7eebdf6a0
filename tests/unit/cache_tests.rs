/*!
 * Tests for the single-flight translation cache
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use doctrans::errors::TranslationError;
use doctrans::translation::{TranslationCache, TranslationKey, normalize_text};

#[test]
fn test_normalizeText_shouldCollapseWhitespaceAndCompose() {
    assert_eq!(normalize_text("  Hello \n\t world  "), "Hello world");
    // e + combining acute composes to é
    assert_eq!(normalize_text("cafe\u{301}"), "caf\u{e9}");
}

#[test]
fn test_translationKey_shouldIgnoreWhitespaceVariants() {
    let a = TranslationKey::new("Annual  report", "en", "hi");
    let b = TranslationKey::new(" Annual report\n", "en", "hi");
    let other_pair = TranslationKey::new("Annual report", "en", "ta");
    assert_eq!(a, b);
    assert_ne!(a, other_pair);
}

#[test]
fn test_translationKey_shouldNormalizeLanguageCodes() {
    let lower = TranslationKey::new("Annual report", "en", "hi");
    assert_eq!(lower, TranslationKey::new("Annual report", "EN", "HI"));
    assert_eq!(lower, TranslationKey::new("Annual report", "eng", "hin"));
    assert_eq!(lower.target_language(), "hi");
    assert_eq!(TranslationKey::new("x", "UND", "hi").source_language(), "und");
}

#[tokio::test]
async fn test_getOrTranslate_withConcurrentRequesters_shouldCallOnce() {
    let cache = Arc::new(TranslationCache::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let key = TranslationKey::new("Hello", "en", "hi");

    let mut handles = Vec::new();
    for _ in 0..16 {
        let cache = cache.clone();
        let calls = calls.clone();
        let key = key.clone();
        handles.push(tokio::spawn(async move {
            cache
                .get_or_translate(&key, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    Ok("नमस्ते".to_string())
                })
                .await
        }));
    }

    for handle in handles {
        assert_eq!(handle.await.unwrap().unwrap(), "नमस्ते");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let stats = cache.stats();
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.misses, 1);
    assert_eq!(stats.hits, 15);
}

#[tokio::test]
async fn test_getOrTranslate_withFailure_shouldMemoizeFailure() {
    let cache = TranslationCache::new();
    let key = TranslationKey::new("Hello", "en", "hi");

    let first = cache
        .get_or_translate(&key, || async { Err(TranslationError::Timeout(Duration::from_millis(5))) })
        .await;
    assert!(first.is_err());

    let second = cache.get_or_translate(&key, || async { Ok("unused".to_string()) }).await;
    assert!(second.is_err());
    assert!(cache.get(&key).unwrap().is_err());
}

#[tokio::test]
async fn test_clear_shouldDropEntriesAndCounters() {
    let cache = TranslationCache::new();
    let key = TranslationKey::new("Hello", "en", "hi");
    let _ = cache.get_or_translate(&key, || async { Ok("x".to_string()) }).await;
    assert_eq!(cache.len(), 1);

    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.stats().misses, 0);
}
