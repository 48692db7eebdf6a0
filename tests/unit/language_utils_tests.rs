/*!
 * Tests for language code utilities
 */

use doctrans::language_utils::{
    LanguageCodeType, get_language_name, language_codes_match, normalize_to_part1_or_part2t, normalize_to_part2t,
    resolve_language, validate_language_code,
};

#[test]
fn test_validateLanguageCode_shouldClassifyCodeForms() {
    assert_eq!(validate_language_code("hi").unwrap(), LanguageCodeType::Part1);
    assert_eq!(validate_language_code("hin").unwrap(), LanguageCodeType::Part2T);
    assert_eq!(validate_language_code("fre").unwrap(), LanguageCodeType::Part2B);
    assert!(validate_language_code("xx").is_err());
    assert!(validate_language_code("").is_err());
}

#[test]
fn test_normalize_shouldConvertBetweenForms() {
    assert_eq!(normalize_to_part2t("ta").unwrap(), "tam");
    assert_eq!(normalize_to_part2t("FRE").unwrap(), "fra");
    assert_eq!(normalize_to_part1_or_part2t("mar").unwrap(), "mr");
    // Santali has no two-letter code
    assert_eq!(normalize_to_part1_or_part2t("sat").unwrap(), "sat");
}

#[test]
fn test_resolveLanguage_shouldAcceptCodesAndNames() {
    assert_eq!(resolve_language("Hindi").unwrap(), "hi");
    assert_eq!(resolve_language("tamil").unwrap(), "ta");
    assert_eq!(resolve_language("Odia").unwrap(), "or");
    assert_eq!(resolve_language("Santhali").unwrap(), "sat");
    assert_eq!(resolve_language("ben").unwrap(), "bn");
    assert!(resolve_language("Klingonese").is_err());
}

#[test]
fn test_languageCodesMatch_shouldCompareAcrossForms() {
    assert!(language_codes_match("hi", "hin"));
    assert!(language_codes_match("de", "ger"));
    assert!(!language_codes_match("hi", "mr"));
    assert!(!language_codes_match("und", "xx"));
}

#[test]
fn test_getLanguageName_shouldReturnEnglishName() {
    assert_eq!(get_language_name("hi").unwrap(), "Hindi");
    assert_eq!(get_language_name("ta").unwrap(), "Tamil");
    assert!(get_language_name("zz").is_err());
}
