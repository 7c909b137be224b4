//! Core traits for reelsmith abstractions.
//!
//! These traits define the seams between the pipeline and its external
//! collaborators, enabling pluggable backends and testability.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{AnalyzeResponse, GenerateResponse, GenerationRequest, ProgressReport};

/// The analysis/generation backend the pipeline talks to.
#[async_trait]
pub trait JobBackend: Send + Sync {
    /// Start an analysis of the given folders.
    async fn start_analysis(&self, folder_paths: &[String]) -> Result<AnalyzeResponse>;

    /// Start generating a video.
    async fn start_generation(&self, request: &GenerationRequest) -> Result<GenerateResponse>;

    /// Fetch the current progress of whichever job the backend is running.
    async fn progress(&self) -> Result<ProgressReport>;

    /// Ask the backend to show a folder picker. `None` when cancelled.
    async fn browse_folder(&self) -> Result<Option<String>>;

    /// Ask the backend to show a file picker. `None` when cancelled.
    async fn browse_file(&self) -> Result<Option<String>>;

    /// URL that streams the resource at `path` (image, audio or video).
    fn media_url(&self, path: &str) -> Result<String>;
}
