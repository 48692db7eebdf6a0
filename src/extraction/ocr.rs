/*!
 * OCR collaborator.
 *
 * `OcrEngine` is the pluggable interface; `TesseractCli` drives a local
 * `tesseract` binary and reads its TSV output.
 */

use async_trait::async_trait;
use log::{debug, error};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;
use tokio::process::Command;

use crate::classification::Script;
use crate::document::{BlockId, BoundingBox, ImagePayload};
use crate::errors::OcrError;

/// Image region handed to the OCR engine
#[derive(Debug, Clone)]
pub struct ImageRegion<'a> {
    /// Placeholder block the text will land in
    pub block_id: BlockId,
    pub bbox: BoundingBox,
    pub payload: &'a ImagePayload,
    /// Expected language of the text, if known
    pub language_hint: Option<&'a str>,
}

/// Recognized text with the engine's confidence in [0, 1]
#[derive(Debug, Clone, PartialEq)]
pub struct OcrOutput {
    pub text: String,
    pub confidence: f32,
}

/// Text recognition backend
#[async_trait]
pub trait OcrEngine: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    async fn extract_text(&self, region: &ImageRegion<'_>) -> Result<OcrOutput, OcrError>;
}

/// Script used to print a language, for picking a recognition model
pub fn script_for_language(language: &str) -> Option<Script> {
    let script = match language {
        "hi" | "mr" | "ne" | "sa" | "kok" | "brx" | "doi" | "mai" => Script::Devanagari,
        "bn" | "as" | "mni" => Script::Bengali,
        "sat" => Script::OlChiki,
        "ta" => Script::Tamil,
        "te" => Script::Telugu,
        "gu" => Script::Gujarati,
        "kn" => Script::Kannada,
        "ml" => Script::Malayalam,
        "or" => Script::Oriya,
        "pa" => Script::Gurmukhi,
        "si" => Script::Sinhala,
        "ur" | "sd" | "ks" | "ar" | "fa" => Script::Arabic,
        "ru" | "uk" | "bg" | "sr" => Script::Cyrillic,
        "el" => Script::Greek,
        "he" => Script::Hebrew,
        "th" => Script::Thai,
        "zh" => Script::Han,
        "ja" => Script::Kana,
        "ko" => Script::Hangul,
        "en" | "fr" | "de" | "es" | "it" | "pt" | "nl" => Script::Latin,
        _ => return None,
    };
    Some(script)
}

/// OCR through the `tesseract` command line tool
#[derive(Debug, Clone)]
pub struct TesseractCli {
    /// Binary to run
    pub binary: PathBuf,
    /// Optional `--tessdata-dir`
    pub tessdata_dir: Option<PathBuf>,
    /// Language packs used when no hint is given, e.g. `eng+script/Devanagari`
    pub default_languages: String,
    /// Upper bound for one invocation
    pub timeout: Duration,
}

impl Default for TesseractCli {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("tesseract"),
            tessdata_dir: None,
            default_languages: "script/Devanagari".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl TesseractCli {
    pub fn new(binary: impl Into<PathBuf>, tessdata_dir: Option<PathBuf>, default_languages: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            tessdata_dir,
            default_languages: default_languages.into(),
            ..Self::default()
        }
    }

    /// Language packs for a region
    pub fn languages_for(&self, region: &ImageRegion<'_>) -> String {
        region
            .language_hint
            .and_then(script_for_language)
            .map(|script| script.tesseract_language().to_string())
            .unwrap_or_else(|| self.default_languages.clone())
    }

    fn suffix(media_type: &str) -> &'static str {
        match media_type {
            "image/png" => ".png",
            "image/jpeg" | "image/jpg" => ".jpg",
            "image/tiff" => ".tif",
            "image/bmp" => ".bmp",
            "image/webp" => ".webp",
            _ => ".img",
        }
    }

    /// Keep the lines of tesseract's stderr that carry an actual error
    fn filter_stderr(stderr: &str) -> String {
        let noise = ["Tesseract Open Source OCR Engine", "Estimating resolution", "Detected ", "Warning: Invalid resolution"];
        let meaningful: Vec<&str> = stderr
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty() && !noise.iter().any(|n| l.starts_with(n)))
            .collect();
        if meaningful.is_empty() {
            "unknown tesseract error".to_string()
        } else {
            meaningful.join("\n")
        }
    }
}

/// Assemble TSV word rows into text and a mean confidence
///
/// Words on the same (block, paragraph, line) are joined by spaces, lines
/// by newlines. Rows with negative confidence are layout rows, not words.
pub fn parse_tsv(tsv: &str) -> Result<OcrOutput, OcrError> {
    let mut lines: BTreeMap<(u32, u32, u32, u32), Vec<String>> = BTreeMap::new();
    let mut confidences = Vec::new();

    for row in tsv.lines().skip(1) {
        let columns: Vec<&str> = row.split('\t').collect();
        if columns.len() < 12 || columns[0] != "5" {
            continue;
        }
        let number = |i: usize| -> Result<u32, OcrError> {
            columns[i]
                .trim()
                .parse::<u32>()
                .map_err(|_| OcrError::EngineFailed(format!("malformed TSV row: {}", row)))
        };
        let confidence: f32 = columns[10]
            .trim()
            .parse()
            .map_err(|_| OcrError::EngineFailed(format!("malformed confidence in row: {}", row)))?;
        let word = columns[11].trim();
        if confidence < 0.0 || word.is_empty() {
            continue;
        }
        let key = (number(1)?, number(2)?, number(3)?, number(4)?);
        lines.entry(key).or_default().push(word.to_string());
        confidences.push(confidence);
    }

    let text = lines.values().map(|words| words.join(" ")).collect::<Vec<_>>().join("\n");
    let confidence = if confidences.is_empty() {
        0.0
    } else {
        confidences.iter().sum::<f32>() / confidences.len() as f32 / 100.0
    };

    Ok(OcrOutput { text, confidence })
}

#[async_trait]
impl OcrEngine for TesseractCli {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn extract_text(&self, region: &ImageRegion<'_>) -> Result<OcrOutput, OcrError> {
        if region.payload.data.is_empty() {
            return Err(OcrError::InvalidPayload(format!("region {} has no image data", region.block_id)));
        }

        let mut image = tempfile::Builder::new()
            .prefix("doctrans-ocr-")
            .suffix(Self::suffix(&region.payload.media_type))
            .tempfile()
            .map_err(|e| OcrError::EngineFailed(format!("cannot create temporary image: {}", e)))?;
        image
            .write_all(&region.payload.data)
            .and_then(|_| image.flush())
            .map_err(|e| OcrError::EngineFailed(format!("cannot write temporary image: {}", e)))?;

        let languages = self.languages_for(region);
        let mut command = Command::new(&self.binary);
        command.arg(image.path()).arg("stdout").arg("-l").arg(&languages);
        if let Some(dir) = &self.tessdata_dir {
            command.arg("--tessdata-dir").arg(dir);
        }
        command.arg("tsv").kill_on_drop(true);

        debug!("Running tesseract on {} with {}", region.block_id, languages);

        let result = tokio::select! {
            result = command.output() => {
                result.map_err(|e| OcrError::EngineFailed(format!("failed to run {}: {}", self.binary.display(), e)))?
            },
            _ = tokio::time::sleep(self.timeout) => {
                return Err(OcrError::EngineFailed(format!("tesseract timed out after {:?}", self.timeout)));
            }
        };

        if !result.status.success() {
            let stderr = Self::filter_stderr(&String::from_utf8_lossy(&result.stderr));
            error!("OCR of {} failed: {}", region.block_id, stderr);
            return Err(OcrError::EngineFailed(stderr));
        }

        parse_tsv(&String::from_utf8_lossy(&result.stdout))
    }
}
