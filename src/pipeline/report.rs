/*!
 * Machine-readable run report.
 *
 * Every degradation the pipeline absorbs ends up here: document-level
 * errors, per-page status and per-block flags. The report is serialized as
 * JSON next to the output document.
 */

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::Path;
use std::time::Duration;

use crate::translation::CacheStats;

/// Per-block degradation flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockFlag {
    /// Text was recognized from a raster region
    OcrUsed,
    /// OCR was needed but failed or no engine was configured
    OcrFailed,
    /// The backend failed; the original text was kept
    TranslationFailed,
    /// Text did not fit even with full box expansion
    Overflow,
    /// No script covered more than half of the letters
    LowConfidenceScript,
}

impl fmt::Display for BlockFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BlockFlag::OcrUsed => "ocr-used",
            BlockFlag::OcrFailed => "ocr-failed",
            BlockFlag::TranslationFailed => "translation-failed",
            BlockFlag::Overflow => "overflow",
            BlockFlag::LowConfidenceScript => "low-confidence-script",
        };
        f.write_str(name)
    }
}

/// A flag plus the reason it was raised
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlagEntry {
    pub flag: BlockFlag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// How a block's text was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockStatus {
    Translated,
    PassedThrough,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockReport {
    /// Stable block id, e.g. `p0-b3`
    pub block_id: String,
    pub status: BlockStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub flags: Vec<FlagEntry>,
}

impl BlockReport {
    pub fn new(block_id: impl fmt::Display, status: BlockStatus) -> Self {
        Self {
            block_id: block_id.to_string(),
            status,
            source_language: None,
            scale: None,
            flags: Vec::new(),
        }
    }

    pub fn flag(&mut self, flag: BlockFlag, reason: Option<String>) {
        if !self.has_flag(flag) {
            self.flags.push(FlagEntry { flag, reason });
        }
    }

    pub fn has_flag(&self, flag: BlockFlag) -> bool {
        self.flags.iter().any(|f| f.flag == flag)
    }
}

/// Final state of one page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Composed,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageReport {
    pub page: usize,
    pub status: PageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default)]
    pub blocks: Vec<BlockReport>,
}

impl PageReport {
    pub fn composed(page: usize, blocks: Vec<BlockReport>) -> Self {
        Self {
            page,
            status: PageStatus::Composed,
            reason: None,
            blocks,
        }
    }

    pub fn failed(page: usize, reason: impl Into<String>) -> Self {
        Self {
            page,
            status: PageStatus::Failed,
            reason: Some(reason.into()),
            blocks: Vec::new(),
        }
    }

    pub fn cancelled(page: usize) -> Self {
        Self {
            page,
            status: PageStatus::Cancelled,
            reason: None,
            blocks: Vec::new(),
        }
    }
}

/// Document-level result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentOutcome {
    /// At least one page was composed
    Success,
    /// No page was composed
    Failed,
}

/// Backend and cache usage of the run
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    pub backend_calls: usize,
    pub failed_units: usize,
    pub cache_entries: usize,
    pub cache_hits: usize,
    pub cache_misses: usize,
}

impl RunStats {
    pub fn new(backend_calls: usize, failed_units: usize, cache: CacheStats) -> Self {
        Self {
            backend_calls,
            failed_units,
            cache_entries: cache.entries,
            cache_hits: cache.hits,
            cache_misses: cache.misses,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranslationReport {
    pub run_id: String,
    pub generated_at: String,
    pub input_sha256: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
    pub target_language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dominant_language: Option<String>,
    pub backend: String,
    pub outcome: DocumentOutcome,
    pub cancelled: bool,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub pages: Vec<PageReport>,
    pub stats: RunStats,
    pub duration_ms: u64,
}

impl TranslationReport {
    /// Empty report for a run over `input`
    pub fn new(input: &[u8], target_language: &str, backend: &str) -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            generated_at: chrono::Local::now().to_rfc3339(),
            input_sha256: sha256_hex(input),
            source_format: None,
            source_language: None,
            target_language: target_language.to_string(),
            dominant_language: None,
            backend: backend.to_string(),
            outcome: DocumentOutcome::Failed,
            cancelled: false,
            errors: Vec::new(),
            pages: Vec::new(),
            stats: RunStats::default(),
            duration_ms: 0,
        }
    }

    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_ms = duration.as_millis() as u64;
    }

    pub fn is_success(&self) -> bool {
        self.outcome == DocumentOutcome::Success
    }

    pub fn pages_with_status(&self, status: PageStatus) -> usize {
        self.pages.iter().filter(|p| p.status == status).count()
    }

    /// Number of blocks carrying `flag`, across all pages
    pub fn flag_count(&self, flag: BlockFlag) -> usize {
        self.pages
            .iter()
            .flat_map(|p| &p.blocks)
            .filter(|b| b.has_flag(flag))
            .count()
    }

    pub fn block(&self, block_id: &str) -> Option<&BlockReport> {
        self.pages.iter().flat_map(|p| &p.blocks).find(|b| b.block_id == block_id)
    }

    /// One-line human summary
    pub fn summary(&self) -> String {
        let mut parts = vec![
            format!("{:?}", self.outcome),
            format!(
                "pages: {} composed, {} failed, {} cancelled",
                self.pages_with_status(PageStatus::Composed),
                self.pages_with_status(PageStatus::Failed),
                self.pages_with_status(PageStatus::Cancelled)
            ),
        ];

        let flags: Vec<String> = [
            BlockFlag::OcrUsed,
            BlockFlag::OcrFailed,
            BlockFlag::TranslationFailed,
            BlockFlag::Overflow,
            BlockFlag::LowConfidenceScript,
        ]
        .iter()
        .filter_map(|&flag| match self.flag_count(flag) {
            0 => None,
            n => Some(format!("{} {}", n, flag)),
        })
        .collect();
        if !flags.is_empty() {
            parts.push(format!("flags: {}", flags.join(", ")));
        }

        parts.push(format!("backend calls: {}", self.stats.backend_calls));
        parts.push(format!("{:.2}s", self.duration_ms as f64 / 1000.0));

        if let Some(error) = self.errors.first() {
            parts.push(format!("error: {}", error));
        }

        parts.join(" | ")
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize report")
    }

    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        std::fs::write(path, self.to_json()?).with_context(|| format!("Failed to write report: {}", path.display()))
    }
}

/// Lowercase hex SHA-256 of `bytes`
pub fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes).iter().map(|b| format!("{:02x}", b)).collect()
}
