/*!
 * Single-flight translation cache.
 *
 * Every distinct translation unit maps to one shared cell. The first
 * requester runs the backend call; concurrent requesters for the same key
 * await that in-flight call instead of issuing their own. Failures are
 * memoized too, so a failing unit costs one backend round per document.
 */

use log::debug;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::OnceCell;
use unicode_normalization::UnicodeNormalization;

use crate::errors::TranslationError;
use crate::language_utils::canonical_code;

/// Resolved outcome of one translation unit
pub type TranslationOutcome = Result<String, TranslationError>;

/// Cache key: normalized source text plus the language pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TranslationKey {
    /// Normalized source text
    text: String,

    /// Source language code
    source_language: String,

    /// Target language code
    target_language: String,
}

impl TranslationKey {
    /// Create a key, normalizing the text so whitespace variants share an entry
    /// and the language codes so `HI`, `hi` and `hin` do too
    pub fn new(text: &str, source_language: &str, target_language: &str) -> Self {
        Self {
            text: normalize_text(text),
            source_language: canonical_code(source_language),
            target_language: canonical_code(target_language),
        }
    }

    /// Normalized text sent to the backend
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn source_language(&self) -> &str {
        &self.source_language
    }

    pub fn target_language(&self) -> &str {
        &self.target_language
    }
}

/// NFC-normalize, collapse whitespace runs to one space, trim
pub fn normalize_text(text: &str) -> String {
    let composed: String = text.nfc().collect();
    composed.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Distinct keys seen
    pub entries: usize,
    /// Lookups that joined an existing cell
    pub hits: usize,
    /// Lookups that created a cell
    pub misses: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Translation cache shared by all block tasks of one document
#[derive(Debug, Default)]
pub struct TranslationCache {
    /// key → in-flight or resolved outcome
    cells: Mutex<HashMap<TranslationKey, Arc<OnceCell<TranslationOutcome>>>>,

    /// Cache hit counter
    hits: AtomicUsize,

    /// Cache miss counter
    misses: AtomicUsize,
}

impl TranslationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `key`, running `translate` only if no other task has claimed it
    ///
    /// The map lock is held only to fetch or insert the cell, never across
    /// the backend call.
    pub async fn get_or_translate<F, Fut>(&self, key: &TranslationKey, translate: F) -> TranslationOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = TranslationOutcome>,
    {
        let (cell, created) = {
            let mut cells = self.cells.lock();
            match cells.get(key) {
                Some(cell) => (Arc::clone(cell), false),
                None => {
                    let cell = Arc::new(OnceCell::new());
                    cells.insert(key.clone(), Arc::clone(&cell));
                    (cell, true)
                }
            }
        };

        if created {
            self.misses.fetch_add(1, Ordering::Relaxed);
            debug!(
                "Cache miss for '{}' ({} -> {})",
                truncate_text(key.text(), 30),
                key.source_language(),
                key.target_language()
            );
        } else {
            self.hits.fetch_add(1, Ordering::Relaxed);
            debug!(
                "Cache hit for '{}' ({} -> {})",
                truncate_text(key.text(), 30),
                key.source_language(),
                key.target_language()
            );
        }

        cell.get_or_init(translate).await.clone()
    }

    /// Resolved outcome for a key, if any
    pub fn get(&self, key: &TranslationKey) -> Option<TranslationOutcome> {
        let cell = self.cells.lock().get(key).cloned()?;
        cell.get().cloned()
    }

    /// Get cache statistics
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }

    /// Get the number of entries in the cache
    pub fn len(&self) -> usize {
        self.cells.lock().len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.cells.lock().is_empty()
    }

    /// Clear the cache
    pub fn clear(&self) {
        self.cells.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        debug!("Translation cache cleared");
    }
}

/// Truncate text to a maximum number of characters with ellipsis
pub(crate) fn truncate_text(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        format!("{}...", text.chars().take(max_chars).collect::<String>())
    }
}
