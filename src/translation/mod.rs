/*!
 * Translation of text blocks through a pluggable backend.
 *
 * - `adapter`: deduplication, timeouts, retries and pass-through policy
 * - `cache`: single-flight cache of translation units
 * - `concurrency`: per-backend default budgets
 */

pub use self::adapter::{
    AdapterOptions, AdapterStats, BlockTranslation, PassThroughReason, TranslationAdapter, TranslationRequest,
    TranslationStatus,
};
pub use self::cache::{CacheStats, TranslationCache, TranslationKey, normalize_text};
pub use self::concurrency::BackendProfile;

pub mod adapter;
pub mod cache;
pub mod concurrency;
