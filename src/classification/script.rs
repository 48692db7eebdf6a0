/*!
 * Writing-system detection from Unicode character ranges.
 */

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Writing system of a run of text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Script {
    Latin,
    Cyrillic,
    Greek,
    Arabic,
    Hebrew,
    Devanagari,
    Bengali,
    Gurmukhi,
    Gujarati,
    Oriya,
    Tamil,
    Telugu,
    Kannada,
    Malayalam,
    Sinhala,
    Thai,
    Lao,
    Khmer,
    Myanmar,
    Han,
    Kana,
    Hangul,
    OlChiki,
    Unknown,
}

impl Script {
    /// Script of a single character, or `None` for script-neutral characters
    /// (whitespace, digits, punctuation, symbols)
    pub fn of(c: char) -> Option<Script> {
        if c.is_whitespace() || c.is_numeric() || c.is_ascii_punctuation() {
            return None;
        }
        let cp = c as u32;
        let script = match cp {
            0x0041..=0x005A | 0x0061..=0x007A => Script::Latin,
            0x00D7 | 0x00F7 => return None,
            0x00C0..=0x024F | 0x1E00..=0x1EFF => Script::Latin,
            0x0370..=0x03FF | 0x1F00..=0x1FFF => Script::Greek,
            0x0400..=0x052F => Script::Cyrillic,
            0x0590..=0x05FF => Script::Hebrew,
            0x0600..=0x06FF | 0x0750..=0x077F | 0xFB50..=0xFDFF | 0xFE70..=0xFEFF => Script::Arabic,
            // danda and double danda are shared across Indic scripts
            0x0964 | 0x0965 => return None,
            0x0900..=0x097F | 0xA8E0..=0xA8FF => Script::Devanagari,
            0x0980..=0x09FF => Script::Bengali,
            0x0A00..=0x0A7F => Script::Gurmukhi,
            0x0A80..=0x0AFF => Script::Gujarati,
            0x0B00..=0x0B7F => Script::Oriya,
            0x0B80..=0x0BFF => Script::Tamil,
            0x0C00..=0x0C7F => Script::Telugu,
            0x0C80..=0x0CFF => Script::Kannada,
            0x0D00..=0x0D7F => Script::Malayalam,
            0x0D80..=0x0DFF => Script::Sinhala,
            0x0E00..=0x0E7F => Script::Thai,
            0x0E80..=0x0EFF => Script::Lao,
            0x1000..=0x109F => Script::Myanmar,
            0x1780..=0x17FF => Script::Khmer,
            0x1C50..=0x1C7F => Script::OlChiki,
            0x1100..=0x11FF | 0x3130..=0x318F | 0xAC00..=0xD7AF => Script::Hangul,
            0x3040..=0x30FF | 0x31F0..=0x31FF => Script::Kana,
            0x3400..=0x4DBF | 0x4E00..=0x9FFF | 0xF900..=0xFAFF | 0x20000..=0x2A6DF => Script::Han,
            0x2000..=0x206F | 0x3000..=0x303F | 0xFF00..=0xFF0F => return None,
            _ if c.is_alphabetic() => Script::Unknown,
            _ => return None,
        };
        Some(script)
    }

    /// Whether the script separates words with spaces
    pub fn uses_word_spacing(&self) -> bool {
        !matches!(
            self,
            Script::Han | Script::Kana | Script::Thai | Script::Lao | Script::Khmer | Script::Myanmar
        )
    }

    /// Tesseract language pack used to OCR this script
    pub fn tesseract_language(&self) -> &'static str {
        match self {
            Script::Latin => "eng",
            Script::Cyrillic => "rus",
            Script::Greek => "ell",
            Script::Arabic => "script/Arabic",
            Script::Hebrew => "heb",
            Script::Devanagari => "script/Devanagari",
            Script::Bengali => "script/Bengali",
            Script::Gurmukhi => "script/Gurmukhi",
            Script::Gujarati => "script/Gujarati",
            Script::Oriya => "script/Oriya",
            Script::Tamil => "script/Tamil",
            Script::Telugu => "script/Telugu",
            Script::Kannada => "script/Kannada",
            Script::Malayalam => "script/Malayalam",
            Script::Sinhala => "script/Sinhala",
            Script::Thai => "tha",
            Script::Lao => "lao",
            Script::Khmer => "khm",
            Script::Myanmar => "mya",
            Script::Han => "chi_sim",
            Script::Kana => "jpn",
            Script::Hangul => "kor",
            // Ol Chiki has no tesseract model; Santali is commonly printed in Bengali script too
            Script::OlChiki => "script/Bengali",
            Script::Unknown => "eng",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Script::Latin => "Latin",
            Script::Cyrillic => "Cyrillic",
            Script::Greek => "Greek",
            Script::Arabic => "Arabic",
            Script::Hebrew => "Hebrew",
            Script::Devanagari => "Devanagari",
            Script::Bengali => "Bengali",
            Script::Gurmukhi => "Gurmukhi",
            Script::Gujarati => "Gujarati",
            Script::Oriya => "Oriya",
            Script::Tamil => "Tamil",
            Script::Telugu => "Telugu",
            Script::Kannada => "Kannada",
            Script::Malayalam => "Malayalam",
            Script::Sinhala => "Sinhala",
            Script::Thai => "Thai",
            Script::Lao => "Lao",
            Script::Khmer => "Khmer",
            Script::Myanmar => "Myanmar",
            Script::Han => "Han",
            Script::Kana => "Kana",
            Script::Hangul => "Hangul",
            Script::OlChiki => "Ol Chiki",
            Script::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Per-script letter counts of a text
#[derive(Debug, Clone, Default)]
pub struct ScriptCoverage {
    counts: BTreeMap<Script, usize>,
    letters: usize,
}

impl ScriptCoverage {
    pub fn measure(text: &str) -> Self {
        let mut coverage = Self::default();
        for script in text.chars().filter_map(Script::of) {
            *coverage.counts.entry(script).or_insert(0) += 1;
            coverage.letters += 1;
        }
        coverage
    }

    /// Number of script-bearing characters
    pub fn letters(&self) -> usize {
        self.letters
    }

    /// Most frequent script and its share of letters; ties go to the earlier script
    pub fn dominant(&self) -> (Script, f32) {
        let mut best = (Script::Unknown, 0usize);
        for (&script, &count) in &self.counts {
            if count > best.1 {
                best = (script, count);
            }
        }
        if self.letters == 0 {
            return (Script::Unknown, 0.0);
        }
        (best.0, best.1 as f32 / self.letters as f32)
    }

    pub fn count(&self, script: Script) -> usize {
        self.counts.get(&script).copied().unwrap_or(0)
    }
}
