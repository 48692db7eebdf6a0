use anyhow::{Result, anyhow};
use isolang::Language;

/// Language utilities for ISO language code handling
///
/// The pipeline works with ISO 639-1 codes where one exists and falls back
/// to ISO 639-3 otherwise (e.g. `sat` for Santali). Users may also pass
/// ISO 639-2/B codes or English language names on the command line.
/// Language code type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LanguageCodeType {
    /// ISO 639-1 (2-letter) code
    Part1,
    /// ISO 639-2/T or 639-3 (3-letter) code
    Part2T,
    /// ISO 639-2/B (3-letter) code
    Part2B,
}

/// Code used for an undetermined language
pub const UNDETERMINED: &str = "und";

/// ISO 639-2/B codes that differ from their 639-2/T form
fn bibliographic_to_terminology(code: &str) -> Option<&'static str> {
    let t = match code {
        "fre" => "fra",
        "ger" => "deu",
        "dut" => "nld",
        "gre" => "ell",
        "chi" => "zho",
        "cze" => "ces",
        "ice" => "isl",
        "alb" => "sqi",
        "arm" => "hye",
        "baq" => "eus",
        "bur" => "mya",
        "per" => "fas",
        "geo" => "kat",
        "may" => "msa",
        "mac" => "mkd",
        "rum" => "ron",
        "slo" => "slk",
        "wel" => "cym",
        _ => return None,
    };
    Some(t)
}

/// Validate if a language code is a valid ISO 639-1 or ISO 639-2 code
pub fn validate_language_code(code: &str) -> Result<LanguageCodeType> {
    let normalized_code = code.trim().to_lowercase();

    match normalized_code.len() {
        2 if Language::from_639_1(&normalized_code).is_some() => Ok(LanguageCodeType::Part1),
        3 if Language::from_639_3(&normalized_code).is_some() => Ok(LanguageCodeType::Part2T),
        3 if bibliographic_to_terminology(&normalized_code).is_some() => Ok(LanguageCodeType::Part2B),
        _ => Err(anyhow!("Invalid language code: {}", code)),
    }
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Result<String> {
    let normalized_code = code.trim().to_lowercase();

    match normalized_code.len() {
        2 => Language::from_639_1(&normalized_code).map(|lang| lang.to_639_3().to_string()),
        3 if Language::from_639_3(&normalized_code).is_some() => Some(normalized_code.clone()),
        3 => bibliographic_to_terminology(&normalized_code).map(str::to_string),
        _ => None,
    }
    .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))
}

/// Normalize a language code to ISO 639-1 (2-letter) format if possible
/// Falls back to ISO 639-2/T if no ISO 639-1 code exists
pub fn normalize_to_part1_or_part2t(code: &str) -> Result<String> {
    let part2t = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&part2t)
        .ok_or_else(|| anyhow!("Cannot normalize invalid language code: {}", code))?;
    Ok(lang.to_639_1().map(str::to_string).unwrap_or(part2t))
}

/// Canonical form of a language code: ISO 639-1 where one exists, otherwise
/// the lower-cased input (e.g. `und`, regional tags)
pub fn canonical_code(code: &str) -> String {
    normalize_to_part1_or_part2t(code).unwrap_or_else(|_| code.trim().to_lowercase())
}

/// Resolve a user-supplied language: a code in any supported form, or an
/// English language name such as "Hindi" or "Odia"
pub fn resolve_language(input: &str) -> Result<String> {
    if let Ok(code) = normalize_to_part1_or_part2t(input) {
        return Ok(code);
    }
    let lowered = input.trim().to_lowercase();
    // Everyday names that ISO 639 lists under another form
    let alias = match lowered.as_str() {
        "odia" | "oriya" => Some("or"),
        "punjabi" | "panjabi" => Some("pa"),
        "santhali" | "santali" => Some("sat"),
        "persian" | "farsi" => Some("fa"),
        "chinese" => Some("zh"),
        _ => None,
    };
    if let Some(code) = alias {
        return Ok(code.to_string());
    }

    let mut chars = lowered.chars();
    let title_case: String = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    };
    Language::from_name(&title_case)
        .map(|lang| lang.to_639_1().map(str::to_string).unwrap_or_else(|| lang.to_639_3().to_string()))
        .ok_or_else(|| anyhow!("Unknown language: {}", input))
}

/// Check if two language codes match (represent the same language)
pub fn language_codes_match(code1: &str, code2: &str) -> bool {
    match (normalize_to_part2t(code1), normalize_to_part2t(code2)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Get the language name from a code
pub fn get_language_name(code: &str) -> Result<String> {
    let normalized = normalize_to_part2t(code)?;
    let lang = Language::from_639_3(&normalized)
        .ok_or_else(|| anyhow!("Failed to get language from code: {}", normalized))?;

    Ok(lang.to_name().to_string())
}
