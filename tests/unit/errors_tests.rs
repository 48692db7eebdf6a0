/*!
 * Tests for error display formats
 *
 * Report entries start with the error kind, so the prefixes are part of
 * the report format.
 */

use std::time::Duration;

use doctrans::document::BlockId;
use doctrans::errors::{CompositionError, ExtractError, ProviderError, TranslationError};

#[test]
fn test_extractError_display_shouldStartWithKind() {
    let unsupported = ExtractError::UnsupportedFormat("pdf".to_string());
    let corrupt = ExtractError::CorruptDocument("page 2: bad size".to_string());
    assert_eq!(unsupported.to_string(), "UnsupportedFormat: pdf");
    assert_eq!(corrupt.to_string(), "CorruptDocument: page 2: bad size");
}

#[test]
fn test_compositionError_display_shouldNameTheBlock() {
    let error = CompositionError::MissingBlock(BlockId::new(3, 7));
    assert_eq!(error.to_string(), "CompositionError: missing rendered block p3-b7");
}

#[test]
fn test_translationError_fromProviderError_shouldWrap() {
    let error: TranslationError = ProviderError::ApiError {
        status_code: 503,
        message: "busy".to_string(),
    }
    .into();
    assert!(matches!(error, TranslationError::Provider(ProviderError::ApiError { status_code: 503, .. })));
    assert!(error.to_string().contains("503"));
    assert!(TranslationError::Timeout(Duration::from_secs(30)).to_string().contains("30s"));
}
