/*!
 * Tests for script and language classification
 */

use doctrans::classification::{Script, ScriptClassifier, dominant_language};
use doctrans::document::{BlockId, BoundingBox, FontDescriptor, LanguageDistribution, TextBlock};
use doctrans::errors::ClassifyError;

fn block(width: f32, height: f32, languages: &[(&str, f32)]) -> TextBlock {
    let mut block = TextBlock::new(
        BlockId::new(0, 0),
        BoundingBox::new(0.0, 0.0, width, height),
        FontDescriptor::default(),
        "text",
    );
    block.languages = LanguageDistribution::from_weights(languages.iter().map(|(l, p)| (*l, *p)));
    block
}

#[test]
fn test_classify_withIndicScripts_shouldPickTheScript() {
    let classifier = ScriptClassifier::heuristic();
    let cases = [
        ("यह एक परीक्षा है", Script::Devanagari),
        ("இது ஒரு சோதனை", Script::Tamil),
        ("ᱥᱟᱱᱛᱟᱲᱤ ᱯᱟᱹᱨᱥᱤ", Script::OlChiki),
        ("This is a test", Script::Latin),
    ];
    for (text, expected) in cases {
        let classification = classifier.classify(text).unwrap();
        assert_eq!(classification.script, expected, "text: {}", text);
        assert!(classification.script_coverage > 0.5);
    }
}

#[test]
fn test_classify_withSantali_shouldReportSat() {
    let classification = ScriptClassifier::heuristic().classify("ᱥᱟᱱᱛᱟᱲᱤ ᱯᱟᱹᱨᱥᱤ").unwrap();
    assert_eq!(classification.top_language(), Some("sat"));
}

#[test]
fn test_classify_withEvenScriptMix_shouldBeAmbiguousButRecoverable() {
    let result = ScriptClassifier::heuristic().classify("abcd अआइई");
    match result {
        Err(ClassifyError::AmbiguousScript(best)) => {
            assert!(best.script_coverage <= 0.5);
            assert!(matches!(best.script, Script::Latin | Script::Devanagari));
        }
        other => panic!("expected AmbiguousScript, got {:?}", other),
    }
}

#[test]
fn test_classify_withEmptyText_shouldFail() {
    assert!(matches!(
        ScriptClassifier::heuristic().classify("   "),
        Err(ClassifyError::EmptyText)
    ));
}

#[test]
fn test_languageDistribution_shouldSumToOne() {
    let classification = ScriptClassifier::heuristic()
        .classify("The house of the rising sun is in the valley")
        .unwrap();
    assert!((classification.languages.total() - 1.0).abs() < 1e-3);
    assert_eq!(classification.top_language(), Some("en"));
}

#[test]
fn test_dominantLanguage_shouldWeightByArea() {
    let big_hindi = block(400.0, 300.0, &[("hi", 1.0)]);
    let small_english_a = block(100.0, 20.0, &[("en", 1.0)]);
    let small_english_b = block(100.0, 20.0, &[("en", 0.9), ("fr", 0.1)]);
    let blocks = [small_english_a, big_hindi, small_english_b];
    assert_eq!(dominant_language(blocks.iter()).as_deref(), Some("hi"));
}

#[test]
fn test_dominantLanguage_shouldNotDependOnBlockOrder() {
    let blocks = vec![
        block(120.0, 40.0, &[("en", 0.6), ("fr", 0.4)]),
        block(80.0, 30.0, &[("fr", 0.7), ("en", 0.3)]),
        block(150.0, 10.0, &[("de", 1.0)]),
        block(90.0, 45.0, &[("fr", 0.5), ("en", 0.5)]),
    ];
    let forward = dominant_language(blocks.iter());
    let reversed = dominant_language(blocks.iter().rev());
    let rotated: Vec<_> = blocks[2..].iter().chain(blocks[..2].iter()).collect();
    assert_eq!(forward, reversed);
    assert_eq!(forward, dominant_language(rotated.into_iter()));
}

#[test]
fn test_dominantLanguage_withTie_shouldPreferLowerCode() {
    let blocks = [block(10.0, 10.0, &[("fr", 1.0)]), block(10.0, 10.0, &[("en", 1.0)])];
    assert_eq!(dominant_language(blocks.iter()).as_deref(), Some("en"));
}

#[test]
fn test_dominantLanguage_shouldIgnoreUndetermined() {
    let blocks = [block(400.0, 400.0, &[("und", 1.0)]), block(10.0, 10.0, &[("ta", 1.0)])];
    assert_eq!(dominant_language(blocks.iter()).as_deref(), Some("ta"));

    let unknown_only = [block(400.0, 400.0, &[("und", 1.0)])];
    assert_eq!(dominant_language(unknown_only.iter()), None);
}

#[test]
fn test_dominantLanguage_withNoBlocks_shouldBeNone() {
    let blocks: Vec<TextBlock> = Vec::new();
    assert_eq!(dominant_language(blocks.iter()), None);
}
