//! Selection store: the folders, audio track and output settings the user
//! has chosen. Every operation is synchronous and free of I/O.

use serde::{Deserialize, Serialize};

use crate::defaults;
use crate::models::Resolution;

/// Ordered set of folder paths; insertion order is kept, duplicates are not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderSelection {
    paths: Vec<String>,
}

impl FolderSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `path` unless it is blank or already present.
    ///
    /// Returns `true` if the path was inserted.
    pub fn add(&mut self, path: impl Into<String>) -> bool {
        let path = path.into();
        if path.trim().is_empty() || self.contains(&path) {
            return false;
        }
        self.paths.push(path);
        true
    }

    /// Remove every occurrence of `path`. Returns `true` if anything was removed.
    pub fn remove(&mut self, path: &str) -> bool {
        let before = self.paths.len();
        self.paths.retain(|p| p != path);
        self.paths.len() != before
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.iter().any(|p| p == path)
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Everything the user has picked outside of facet filters and trim bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionStore {
    folders: FolderSelection,
    audio_path: String,
    output_path: String,
    resolution: Resolution,
    image_duration: f64,
    title_text: String,
    ken_burns: Option<bool>,
}

impl Default for SelectionStore {
    fn default() -> Self {
        Self {
            folders: FolderSelection::new(),
            audio_path: String::new(),
            output_path: defaults::OUTPUT_PATH.to_string(),
            resolution: Resolution::default(),
            image_duration: defaults::IMAGE_DURATION_SECS,
            title_text: String::new(),
            ken_burns: None,
        }
    }
}

impl SelectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_folder(&mut self, path: impl Into<String>) -> bool {
        self.folders.add(path)
    }

    pub fn remove_folder(&mut self, path: &str) -> bool {
        self.folders.remove(path)
    }

    pub fn folders(&self) -> &FolderSelection {
        &self.folders
    }

    pub fn set_output_path(&mut self, path: impl Into<String>) {
        self.output_path = path.into();
    }

    pub fn output_path(&self) -> &str {
        &self.output_path
    }

    pub fn set_resolution(&mut self, resolution: Resolution) {
        self.resolution = resolution;
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Set seconds per image, clamped to the allowed range.
    ///
    /// Non-finite input leaves the current value untouched. Returns the value
    /// now in effect.
    pub fn set_image_duration(&mut self, secs: f64) -> f64 {
        if secs.is_finite() {
            self.image_duration =
                secs.clamp(defaults::IMAGE_DURATION_MIN_SECS, defaults::IMAGE_DURATION_MAX_SECS);
        }
        self.image_duration
    }

    pub fn image_duration(&self) -> f64 {
        self.image_duration
    }

    pub fn set_title(&mut self, text: impl Into<String>) {
        self.title_text = text.into();
    }

    pub fn title(&self) -> &str {
        &self.title_text
    }

    pub fn set_audio_path(&mut self, path: impl Into<String>) {
        self.audio_path = path.into();
    }

    pub fn audio_path(&self) -> &str {
        &self.audio_path
    }

    /// `None` leaves the choice to the backend.
    pub fn set_ken_burns(&mut self, enabled: Option<bool>) {
        self.ken_burns = enabled;
    }

    pub fn ken_burns(&self) -> Option<bool> {
        self.ken_burns
    }
}
