//! The editing session: selections, filters, audio trim and jobs in one place.
//!
//! [`Studio`] is the only writer of session state. Poll tasks feed it updates
//! through the orchestrator, and every result is merged here, in the order
//! the updates arrive.

use std::sync::Arc;

use tracing::{debug, warn};

use reelsmith_core::defaults;
use reelsmith_core::{
    build_generation_request, AudioSessionFactory, AudioTrimController, EventBus, FacetFilter,
    GeneratedVideo, JobBackend, JobKind, JobRun, PersonId, PipelineEvent, Result,
    SelectionStore, SessionId,
};

use crate::merger::{merge_outcome, Merged};
use crate::orchestrator::{JobOrchestrator, JobOutcome, JobRequest, OrchestratorConfig};

pub struct Studio<B: JobBackend + ?Sized + 'static> {
    orchestrator: JobOrchestrator<B>,
    store: SelectionStore,
    filter: FacetFilter,
    audio: AudioTrimController,
    video: Option<GeneratedVideo>,
}

impl<B: JobBackend + ?Sized + 'static> Studio<B> {
    pub fn new(
        backend: Arc<B>,
        sessions: Box<dyn AudioSessionFactory>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            orchestrator: JobOrchestrator::new(backend, config, EventBus::default()),
            store: SelectionStore::new(),
            filter: FacetFilter::new(),
            audio: AudioTrimController::new(sessions),
            video: None,
        }
    }

    pub fn events(&self) -> &EventBus {
        self.orchestrator.events()
    }

    pub fn backend(&self) -> &Arc<B> {
        self.orchestrator.backend()
    }

    pub fn orchestrator(&self) -> &JobOrchestrator<B> {
        &self.orchestrator
    }

    pub fn job(&self, kind: JobKind) -> &JobRun {
        self.orchestrator.run(kind)
    }

    pub fn store(&self) -> &SelectionStore {
        &self.store
    }

    /// Output settings, folders and title. Prefer [`Self::set_audio_path`]
    /// for the audio track so the trim session follows it.
    pub fn store_mut(&mut self) -> &mut SelectionStore {
        &mut self.store
    }

    pub fn filter(&self) -> &FacetFilter {
        &self.filter
    }

    pub fn audio(&self) -> &AudioTrimController {
        &self.audio
    }

    /// Trim controller, for forwarding session events.
    pub fn audio_mut(&mut self) -> &mut AudioTrimController {
        &mut self.audio
    }

    /// The last generated video, cleared when a new generation is submitted.
    pub fn video(&self) -> Option<&GeneratedVideo> {
        self.video.as_ref()
    }

    // =========================================================================
    // SELECTIONS
    // =========================================================================

    pub fn add_folder(&mut self, path: impl Into<String>) -> bool {
        self.store.add_folder(path)
    }

    pub fn remove_folder(&mut self, path: &str) -> bool {
        self.store.remove_folder(path)
    }

    /// Select the audio track and rebind the trim session to it.
    pub fn set_audio_path(&mut self, path: impl Into<String>) -> Result<Option<SessionId>> {
        let path = path.into();
        self.store.set_audio_path(path.clone());
        self.audio.set_path(&path)
    }

    pub fn toggle_person(&mut self, id: &PersonId) -> Option<bool> {
        self.filter.toggle_person(id)
    }

    pub fn toggle_theme(&mut self, name: &str) -> Option<bool> {
        self.filter.toggle_theme(name)
    }

    pub fn clear_filters(&mut self) {
        self.filter.person_selection_mut().clear();
        self.filter.theme_selection_mut().clear();
    }

    // =========================================================================
    // BROWSING
    // =========================================================================

    /// Ask the backend for a folder and add it to the selection.
    pub async fn browse_folder(&mut self) -> Result<Option<String>> {
        let picked = self.orchestrator.backend().browse_folder().await;
        match picked {
            Ok(Some(path)) => {
                self.store.add_folder(path.clone());
                Ok(Some(path))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(error = %e, "Folder picker failed");
                self.events()
                    .emit(PipelineEvent::error(defaults::MSG_BROWSE_FOLDER_FAILED));
                Err(e)
            }
        }
    }

    /// Ask the backend for a folder and use it as the output path.
    pub async fn browse_output(&mut self) -> Result<Option<String>> {
        let picked = self.orchestrator.backend().browse_folder().await;
        match picked {
            Ok(Some(path)) => {
                self.store.set_output_path(path.clone());
                Ok(Some(path))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(error = %e, "Output picker failed");
                Err(e)
            }
        }
    }

    /// Ask the backend for an audio file and select it.
    pub async fn browse_audio(&mut self) -> Result<Option<String>> {
        let picked = self.orchestrator.backend().browse_file().await;
        match picked {
            Ok(Some(path)) => {
                self.set_audio_path(path.clone())?;
                Ok(Some(path))
            }
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(error = %e, "Audio picker failed");
                Err(e)
            }
        }
    }

    // =========================================================================
    // JOBS
    // =========================================================================

    /// Submit an analysis of the selected folders.
    ///
    /// Returns the outcome when the backend answered synchronously.
    pub async fn start_analysis(&mut self) -> Result<Option<JobOutcome>> {
        let request = JobRequest::Analysis {
            folder_paths: self.store.folders().paths().to_vec(),
        };
        self.submit(request).await
    }

    /// Submit a generation of the visible images.
    ///
    /// Fails without contacting the backend when too few images are visible.
    pub async fn start_generation(&mut self) -> Result<Option<JobOutcome>> {
        let request = {
            let visible = self.filter.visible();
            build_generation_request(&visible, self.audio.trim(), &self.store)?
        };
        self.video = None;
        self.submit(JobRequest::Generation(request)).await
    }

    async fn submit(&mut self, request: JobRequest) -> Result<Option<JobOutcome>> {
        let kind = request.kind();
        match self.orchestrator.submit(request).await {
            Ok(Some(outcome)) => {
                self.merge(&outcome);
                Ok(Some(outcome))
            }
            Ok(None) => Ok(None),
            Err(e) if e.is_precondition() => {
                debug!(job_kind = %kind, error = %e, "Submission rejected");
                Err(e)
            }
            Err(e) => {
                self.events().emit(PipelineEvent::error(e.to_string()));
                Err(e)
            }
        }
    }

    fn merge(&mut self, outcome: &JobOutcome) -> Option<Merged> {
        let merged = merge_outcome(
            outcome,
            &mut self.filter,
            &mut self.video,
            self.orchestrator.backend().as_ref(),
            self.orchestrator.events(),
        );
        match merged {
            Ok(merged) => Some(merged),
            Err(e) => {
                warn!(job_kind = %outcome.kind(), error = %e, "Failed to merge job result");
                self.orchestrator
                    .events()
                    .emit(PipelineEvent::error(e.to_string()));
                None
            }
        }
    }

    /// Wait for the next poll update and apply it. Returns the outcome if a
    /// run became terminal.
    pub async fn process_next_update(&mut self) -> Option<JobOutcome> {
        let update = self.orchestrator.next_update().await?;
        let outcome = self.orchestrator.apply(update)?;
        self.merge(&outcome);
        Some(outcome)
    }

    /// Process updates until `kind` is no longer active.
    ///
    /// Returns the outcome of `kind`'s run, or `None` if it was not active.
    pub async fn wait_for(&mut self, kind: JobKind) -> Option<JobOutcome> {
        let mut last = None;
        while self.job(kind).status.is_active() {
            if let Some(outcome) = self.process_next_update().await {
                if outcome.kind() == kind {
                    last = Some(outcome);
                }
            }
        }
        last
    }

    /// Stop every poller and release the audio session.
    pub async fn shutdown(&mut self) {
        self.orchestrator.shutdown().await;
        self.audio.teardown();
    }
}
