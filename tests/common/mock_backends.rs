/*!
 * Mock backends for testing
 *
 * Canned backends built on `MockBackend` so tests never reach a real
 * translation server.
 */

use std::time::Duration;

use doctrans::providers::mock::MockBackend;

/// Marker that makes `slow_on_marker` stall
pub const SLOW_MARKER: &str = "SLOW";

/// English → Hindi answers for the phrases used across the suite
pub fn hindi_backend() -> MockBackend {
    MockBackend::working()
        .with_translation("Hello", "नमस्ते")
        .with_translation("Thank you", "धन्यवाद")
        .with_translation("Good morning", "सुप्रभात")
}

/// Backend that answers immediately except for inputs containing `SLOW_MARKER`
pub fn slow_on_marker(delay: Duration) -> MockBackend {
    MockBackend::working().with_delay_for(SLOW_MARKER, delay)
}

/// Backend whose every answer is much longer than its input
pub fn verbose_backend() -> MockBackend {
    MockBackend::working().with_custom_response(|call| {
        let word = format!("{} ", call.text);
        word.repeat(12).trim_end().to_string()
    })
}
