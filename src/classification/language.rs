/*!
 * Statistical language identification.
 *
 * The `LanguageModel` trait is the pluggable collaborator; the bundled
 * heuristic model combines per-script priors with function-word hits.
 */

use once_cell::sync::Lazy;
use std::collections::{BTreeMap, HashSet};
use std::fmt::Debug;
use unicode_segmentation::UnicodeSegmentation;

use crate::document::{LanguageDistribution, TextBlock};
use crate::language_utils::UNDETERMINED;

use super::script::Script;

/// Language identification backend
pub trait LanguageModel: Send + Sync + Debug {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Probability distribution over ISO 639-1 codes for a text of the given script
    fn detect(&self, text: &str, script: Script) -> LanguageDistribution;
}

struct FunctionWords {
    language: &'static str,
    prior: f32,
    words: HashSet<&'static str>,
}

fn table(entries: Vec<(&'static str, f32, Vec<&'static str>)>) -> Vec<FunctionWords> {
    entries
        .into_iter()
        .map(|(language, prior, words)| FunctionWords {
            language,
            prior,
            words: words.into_iter().collect(),
        })
        .collect()
}

static LATIN_WORDS: Lazy<Vec<FunctionWords>> = Lazy::new(|| {
    table(vec![
        ("en", 0.5, vec!["the", "and", "of", "to", "is", "in", "that", "it", "for", "with", "was", "on", "are", "this", "be"]),
        ("es", 0.1, vec!["el", "la", "de", "que", "y", "en", "los", "se", "del", "las", "por", "un", "para", "con", "es"]),
        ("fr", 0.1, vec!["le", "la", "les", "de", "et", "des", "est", "un", "une", "du", "que", "pour", "dans", "en", "pas"]),
        ("de", 0.1, vec!["der", "die", "und", "das", "ist", "nicht", "zu", "den", "mit", "ein", "von", "sich", "auch", "dem", "ich"]),
        ("it", 0.1, vec!["il", "di", "che", "e", "la", "per", "un", "non", "una", "sono", "del", "della", "con", "le", "gli"]),
        ("pt", 0.1, vec!["o", "de", "que", "e", "do", "da", "em", "um", "para", "não", "com", "uma", "os", "no", "se"]),
        ("nl", 0.1, vec!["de", "het", "een", "en", "van", "is", "dat", "op", "te", "zijn", "niet", "met", "voor", "ook", "maar"]),
    ])
});

static DEVANAGARI_WORDS: Lazy<Vec<FunctionWords>> = Lazy::new(|| {
    table(vec![
        ("hi", 0.4, vec!["है", "के", "में", "की", "और", "से", "का", "को", "हैं", "यह", "था", "पर"]),
        ("mr", 0.2, vec!["आहे", "आणि", "या", "हे", "ला", "आहेत", "होते", "मध्ये", "व", "नाही"]),
        ("ne", 0.2, vec!["छ", "र", "मा", "हो", "गर्न", "थियो", "पनि", "छन्", "लागि"]),
        ("sa", 0.2, vec!["अस्ति", "च", "इति", "एव", "तत्", "सः", "न", "अपि"]),
    ])
});

/// Static priors for scripts without function-word tables
fn script_priors(script: Script) -> &'static [(&'static str, f32)] {
    match script {
        Script::Bengali => &[("bn", 0.8), ("as", 0.2)],
        Script::Gurmukhi => &[("pa", 1.0)],
        Script::Gujarati => &[("gu", 1.0)],
        Script::Oriya => &[("or", 1.0)],
        Script::Tamil => &[("ta", 1.0)],
        Script::Telugu => &[("te", 1.0)],
        Script::Kannada => &[("kn", 1.0)],
        Script::Malayalam => &[("ml", 1.0)],
        Script::Sinhala => &[("si", 1.0)],
        Script::Arabic => &[("ar", 0.5), ("ur", 0.3), ("fa", 0.2)],
        Script::Cyrillic => &[("ru", 0.7), ("uk", 0.15), ("bg", 0.15)],
        Script::Greek => &[("el", 1.0)],
        Script::Hebrew => &[("he", 1.0)],
        Script::Thai => &[("th", 1.0)],
        Script::Lao => &[("lo", 1.0)],
        Script::Khmer => &[("km", 1.0)],
        Script::Myanmar => &[("my", 1.0)],
        Script::Han => &[("zh", 1.0)],
        Script::Kana => &[("ja", 1.0)],
        Script::Hangul => &[("ko", 1.0)],
        Script::OlChiki => &[("sat", 1.0)],
        Script::Latin | Script::Devanagari | Script::Unknown => &[],
    }
}

/// Heuristic language model: script priors plus function-word evidence
#[derive(Debug, Clone, Default)]
pub struct HeuristicLanguageModel;

impl HeuristicLanguageModel {
    pub fn new() -> Self {
        Self
    }

    fn score_words(text: &str, tables: &[FunctionWords]) -> LanguageDistribution {
        let words: Vec<String> = text.unicode_words().map(|w| w.to_lowercase()).collect();
        let weights = tables.iter().map(|t| {
            let hits = words.iter().filter(|w| t.words.contains(w.as_str())).count();
            (t.language, t.prior + hits as f32)
        });
        LanguageDistribution::from_weights(weights)
    }

    fn adjust_for_letters(text: &str, script: Script, base: &[(&'static str, f32)]) -> LanguageDistribution {
        let mut weights: BTreeMap<&'static str, f32> = base.iter().copied().collect();
        match script {
            Script::Arabic => {
                let urdu = text.chars().filter(|c| matches!(c, 'ے' | 'ٹ' | 'ڈ' | 'ڑ' | 'ں' | 'ھ')).count();
                let persian = text.chars().filter(|c| matches!(c, 'پ' | 'چ' | 'ژ' | 'گ')).count();
                if urdu > 0 {
                    *weights.entry("ur").or_insert(0.0) += urdu as f32;
                } else if persian > 0 {
                    *weights.entry("fa").or_insert(0.0) += persian as f32;
                }
            }
            Script::Cyrillic => {
                let ukrainian = text.chars().filter(|c| matches!(c, 'і' | 'ї' | 'є' | 'ґ')).count();
                *weights.entry("uk").or_insert(0.0) += ukrainian as f32;
            }
            Script::Bengali => {
                // ৰ and ৱ are Assamese-only letters
                let assamese = text.chars().filter(|c| matches!(c, 'ৰ' | 'ৱ')).count();
                *weights.entry("as").or_insert(0.0) += assamese as f32;
            }
            Script::Han => {
                if text.chars().any(|c| Script::of(c) == Some(Script::Kana)) {
                    weights.insert("ja", 4.0);
                }
            }
            _ => {}
        }
        LanguageDistribution::from_weights(weights)
    }
}

impl LanguageModel for HeuristicLanguageModel {
    fn name(&self) -> &str {
        "heuristic"
    }

    fn detect(&self, text: &str, script: Script) -> LanguageDistribution {
        match script {
            Script::Latin => Self::score_words(text, &LATIN_WORDS),
            Script::Devanagari => Self::score_words(text, &DEVANAGARI_WORDS),
            Script::Unknown => LanguageDistribution::certain(UNDETERMINED),
            other => Self::adjust_for_letters(text, other, script_priors(other)),
        }
    }
}

/// Dominant language of a set of text blocks: argmax of
/// Σ probability × block area, ties broken by language code order.
/// The undetermined code never wins; `None` when nothing else is known.
///
/// Contributions are summed in sorted order so the result does not depend
/// on block order.
pub fn dominant_language<'a, I>(blocks: I) -> Option<String>
where
    I: IntoIterator<Item = &'a TextBlock>,
{
    let mut contributions: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for block in blocks {
        let area = block.bbox.area() as f64;
        if area <= 0.0 {
            continue;
        }
        for (language, p) in block.languages.iter() {
            if p > 0.0 && language != UNDETERMINED {
                contributions.entry(language).or_default().push(p as f64 * area);
            }
        }
    }

    let mut best: Option<(&str, f64)> = None;
    for (language, mut values) in contributions {
        values.sort_by(|a, b| a.total_cmp(b));
        let total: f64 = values.iter().sum();
        match best {
            Some((_, b)) if total <= b => {}
            _ => best = Some((language, total)),
        }
    }
    best.map(|(language, _)| language.to_string())
}
