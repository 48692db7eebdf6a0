/*!
 * Error types for the doctrans application.
 *
 * This module contains custom error types for each pipeline stage,
 * using the thiserror crate for ergonomic error definitions.
 */

use std::time::Duration;
use thiserror::Error;

use crate::classification::Classification;
use crate::document::BlockId;

/// Errors raised while decoding a document into pages and blocks
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    /// The byte signature does not match any known container
    #[error("UnsupportedFormat: {0}")]
    UnsupportedFormat(String),

    /// The signature is valid but the structure cannot be read
    #[error("CorruptDocument: {0}")]
    CorruptDocument(String),
}

/// Errors raised by the script classifier
///
/// Classification never aborts the pipeline: the ambiguous case still carries
/// the best-effort classification so callers can recover it.
#[derive(Error, Debug, Clone)]
pub enum ClassifyError {
    /// No script covers more than half of the block's letters
    #[error("AmbiguousScript: best script covers {:.0}% of letters", .0.script_coverage * 100.0)]
    AmbiguousScript(Classification),

    /// Classification requires non-empty text
    #[error("Cannot classify an empty block")]
    EmptyText,
}

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

/// Errors that can occur during translation of a single unit
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The backend did not answer within the per-call timeout
    #[error("Backend call timed out after {0:?}")]
    Timeout(Duration),

    /// The backend answered with nothing usable
    #[error("Backend returned an empty translation")]
    EmptyResponse,
}

/// Errors from the OCR collaborator
#[derive(Error, Debug, Clone)]
pub enum OcrError {
    /// No OCR engine is configured
    #[error("No OCR engine configured")]
    Unavailable,

    /// The engine could not be run
    #[error("OCR engine failed: {0}")]
    EngineFailed(String),

    /// The image payload could not be handed to the engine
    #[error("Invalid image payload: {0}")]
    InvalidPayload(String),
}

/// Internal invariant violations while composing an output page
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompositionError {
    /// A text block of the source page has no rendered counterpart
    #[error("CompositionError: missing rendered block {0}")]
    MissingBlock(BlockId),

    /// A rendered block does not belong to the source page
    #[error("CompositionError: unknown block {0}")]
    UnknownBlock(BlockId),

    /// A rendered block targets a non-text region
    #[error("CompositionError: block {0} is not a text block")]
    NotTextBlock(BlockId),

    /// Two rendered blocks claim the same id
    #[error("CompositionError: block {0} was rendered twice")]
    DuplicateBlock(BlockId),
}
