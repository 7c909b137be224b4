//! Centralized default constants for reelsmith.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers. Organized by domain area.

// =============================================================================
// BACKEND
// =============================================================================

/// Default base URL of the analysis/generation backend.
pub const BACKEND_URL: &str = "http://localhost:8000";

/// Path prefix of every backend endpoint.
pub const API_PREFIX: &str = "/api";

// =============================================================================
// JOBS
// =============================================================================

/// Interval between progress polls while a job is running (milliseconds).
pub const POLL_INTERVAL_MS: u64 = 1000;

/// Minimum number of filtered images required to submit a generation job.
pub const MIN_GENERATION_IMAGES: usize = 10;

/// Broadcast buffer for the pipeline event bus.
pub const EVENT_BUS_CAPACITY: usize = 256;

/// Status message shown when an analysis job is submitted.
pub const MSG_ANALYSIS_STARTING: &str = "Starting analysis...";

/// Status message shown when a generation job is submitted.
pub const MSG_GENERATION_STARTING: &str = "Starting generation...";

/// Status message after a successful analysis.
pub const MSG_ANALYSIS_COMPLETE: &str = "Analysis Complete!";

/// Status message after a successful generation.
pub const MSG_GENERATION_COMPLETE: &str = "Complete!";

/// Failure message when the backend reports an analysis error without text.
pub const MSG_ANALYSIS_FAILED: &str = "Analysis failed";

/// Failure message when the backend reports a generation error without text.
pub const MSG_GENERATION_FAILED: &str = "Video generation failed";

/// Failure message for an immediate analysis reply carrying no results.
pub const MSG_NO_IMAGES: &str = "No images found or error occurred.";

/// Failure message for an unrecognised immediate generation reply.
pub const MSG_UNKNOWN_ERROR: &str = "Unknown error";

/// Notification when the folder picker request fails.
pub const MSG_BROWSE_FOLDER_FAILED: &str = "Failed to browse folder";

// =============================================================================
// SELECTION
// =============================================================================

/// Default output file for generated videos.
pub const OUTPUT_PATH: &str = "output.mp4";

/// Default seconds each image stays on screen.
pub const IMAGE_DURATION_SECS: f64 = 3.0;

/// Lower bound for per-image duration (seconds).
pub const IMAGE_DURATION_MIN_SECS: f64 = 1.0;

/// Upper bound for per-image duration (seconds).
pub const IMAGE_DURATION_MAX_SECS: f64 = 10.0;

// =============================================================================
// DISPLAY
// =============================================================================

/// Number of theme facets offered for selection (top by count).
pub const THEME_DISPLAY_LIMIT: usize = 10;

/// Number of filtered images shown in the preview grid.
pub const IMAGE_PREVIEW_LIMIT: usize = 24;

// =============================================================================
// ENVIRONMENT VARIABLE NAMES
// =============================================================================

/// Backend base URL override.
pub const ENV_BACKEND_URL: &str = "REELSMITH_BACKEND_URL";

/// Optional per-request timeout in seconds.
pub const ENV_REQUEST_TIMEOUT_SECS: &str = "REELSMITH_REQUEST_TIMEOUT_SECS";

/// Progress poll interval override (milliseconds).
pub const ENV_POLL_INTERVAL_MS: &str = "REELSMITH_POLL_INTERVAL_MS";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_duration_bounds_are_ordered() {
        assert!(IMAGE_DURATION_MIN_SECS < IMAGE_DURATION_MAX_SECS);
        assert!((IMAGE_DURATION_MIN_SECS..=IMAGE_DURATION_MAX_SECS).contains(&IMAGE_DURATION_SECS));
    }

    #[test]
    fn test_backend_url_is_http() {
        assert!(BACKEND_URL.starts_with("http://"));
    }
}
