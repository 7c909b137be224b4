//! Applies terminal job outcomes to the session state.

use tracing::{info, warn};

use reelsmith_core::{
    EventBus, FacetFilter, GeneratedVideo, JobBackend, JobPayload, PipelineEvent, Result,
    StaleSelections,
};

use crate::orchestrator::JobOutcome;

/// What a merge changed.
#[derive(Debug, Clone, PartialEq)]
pub enum Merged {
    /// Analysis results were replaced.
    Analysis {
        images: usize,
        stale: StaleSelections,
    },
    /// A run completed without a result; prior state is kept.
    Unchanged,
    /// A video is ready for preview.
    Video(GeneratedVideo),
    /// The run failed; state is untouched.
    Failed { message: String },
}

/// Fold `outcome` into the filter and preview state and notify the user.
///
/// A completed analysis replaces results and facet lists wholesale and
/// re-resolves the active selections. A completed generation records the
/// video and leaves the analysis untouched. A failure only notifies.
pub fn merge_outcome<B>(
    outcome: &JobOutcome,
    filter: &mut FacetFilter,
    video: &mut Option<GeneratedVideo>,
    backend: &B,
    events: &EventBus,
) -> Result<Merged>
where
    B: JobBackend + ?Sized,
{
    match outcome {
        JobOutcome::Completed {
            payload: Some(JobPayload::Analysis(payload)),
            ..
        } => {
            let images = payload.results.len();
            let stale = filter.replace(payload.clone());
            info!(
                images,
                people = filter.people().len(),
                themes = filter.themes().len(),
                "Merged analysis results"
            );
            events.emit(PipelineEvent::success(format!("Found {} images.", images)));
            Ok(Merged::Analysis { images, stale })
        }
        JobOutcome::Completed {
            payload: Some(JobPayload::Video(output_path)),
            ..
        } => {
            let generated = GeneratedVideo {
                output_path: output_path.clone(),
                preview_url: backend.media_url(output_path)?,
            };
            *video = Some(generated.clone());
            info!(output_path = %output_path, "Video generated");
            events.emit(PipelineEvent::success(format!(
                "Video Generated! Saved to {}",
                output_path
            )));
            Ok(Merged::Video(generated))
        }
        JobOutcome::Completed {
            kind,
            payload: None,
            ..
        } => {
            warn!(job_kind = %kind, "Job completed without a result, keeping previous state");
            Ok(Merged::Unchanged)
        }
        JobOutcome::Failed { message, .. } => {
            events.emit(PipelineEvent::error(message.clone()));
            Ok(Merged::Failed {
                message: message.clone(),
            })
        }
    }
}
