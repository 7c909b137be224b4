//! Assembly of the generation request from the current selections.

use crate::defaults;
use crate::error::{Error, Result};
use crate::models::{AnalysisImage, GenerationRequest};
use crate::selection::SelectionStore;
use crate::trim::AudioTrim;

/// Build a [`GenerationRequest`] from the visible images, the trim bounds and
/// the store's output settings.
///
/// Fails with [`Error::InsufficientImages`] when fewer than
/// [`defaults::MIN_GENERATION_IMAGES`] images are visible. Trim bounds are
/// only sent when they belong to the selected audio track; otherwise `0/0`
/// is sent, which the backend reads as the whole track.
pub fn build_generation_request(
    visible: &[&AnalysisImage],
    trim: &AudioTrim,
    store: &SelectionStore,
) -> Result<GenerationRequest> {
    if visible.len() < defaults::MIN_GENERATION_IMAGES {
        return Err(Error::InsufficientImages {
            count: visible.len(),
            required: defaults::MIN_GENERATION_IMAGES,
        });
    }

    let audio_path = store.audio_path().to_string();
    let (audio_start, audio_end) = if !audio_path.is_empty() && trim.path == audio_path {
        (trim.start, trim.end)
    } else {
        (0.0, 0.0)
    };

    Ok(GenerationRequest {
        image_paths: visible.iter().map(|img| img.path.clone()).collect(),
        output_path: store.output_path().to_string(),
        resolution: store.resolution(),
        audio_path,
        audio_start,
        audio_end,
        image_duration: store.image_duration(),
        title_text: store.title().to_string(),
        ken_burns_effect: store.ken_burns(),
    })
}
