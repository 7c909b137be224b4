//! Job orchestrator: per-kind state records plus their poll tasks.
//!
//! Each [`JobKind`] moves through `Idle → Submitting → Running →
//! {Completed | Failed}`. Submitting a kind again cancels its poller and
//! starts a new run with a fresh run id; late updates stamped with an older
//! id are dropped when applied.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use reelsmith_core::defaults;
use reelsmith_core::{
    AnalysisPayload, AnalyzeResponse, Error, EventBus, GenerateResponse, GenerationRequest,
    JobBackend, JobKind, JobPayload, JobRun, JobStatus, PipelineEvent, ProgressReport,
    ProgressStatus, Result,
};

use crate::poller::{PollHandle, PollUpdate};

/// Configuration for the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrchestratorConfig {
    /// Interval between progress polls in milliseconds.
    pub poll_interval_ms: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::POLL_INTERVAL_MS,
        }
    }
}

impl OrchestratorConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `REELSMITH_POLL_INTERVAL_MS` | `1000` | Progress poll interval |
    pub fn from_env() -> Self {
        let poll_interval_ms = std::env::var(defaults::ENV_POLL_INTERVAL_MS)
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::POLL_INTERVAL_MS)
            .max(1);

        Self { poll_interval_ms }
    }

    /// Create a new config with custom poll interval.
    pub fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(Error::Config(
                "poll interval must be at least 1 ms".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Start request for one job kind.
#[derive(Debug, Clone, PartialEq)]
pub enum JobRequest {
    Analysis { folder_paths: Vec<String> },
    Generation(GenerationRequest),
}

impl JobRequest {
    pub fn kind(&self) -> JobKind {
        match self {
            Self::Analysis { .. } => JobKind::Analysis,
            Self::Generation(_) => JobKind::Generation,
        }
    }

    /// Structural checks that must hold before anything is sent.
    pub fn check(&self) -> Result<()> {
        match self {
            Self::Analysis { folder_paths } if folder_paths.is_empty() => Err(Error::NoFolders),
            Self::Generation(request) if request.image_paths.len() < defaults::MIN_GENERATION_IMAGES => {
                Err(Error::InsufficientImages {
                    count: request.image_paths.len(),
                    required: defaults::MIN_GENERATION_IMAGES,
                })
            }
            _ => Ok(()),
        }
    }
}

/// A run reaching a terminal state.
#[derive(Debug, Clone, PartialEq)]
pub enum JobOutcome {
    Completed {
        kind: JobKind,
        run_id: Uuid,
        /// `None` when the backend finished without sending a result.
        payload: Option<JobPayload>,
    },
    Failed {
        kind: JobKind,
        run_id: Uuid,
        message: String,
    },
}

impl JobOutcome {
    pub fn kind(&self) -> JobKind {
        match self {
            Self::Completed { kind, .. } | Self::Failed { kind, .. } => *kind,
        }
    }
}

struct Slot {
    run: JobRun,
    poller: Option<PollHandle>,
}

impl Slot {
    fn new(kind: JobKind) -> Self {
        Self {
            run: JobRun::new(kind),
            poller: None,
        }
    }
}

fn starting_message(kind: JobKind) -> &'static str {
    match kind {
        JobKind::Analysis => defaults::MSG_ANALYSIS_STARTING,
        JobKind::Generation => defaults::MSG_GENERATION_STARTING,
    }
}

fn complete_message(kind: JobKind) -> &'static str {
    match kind {
        JobKind::Analysis => defaults::MSG_ANALYSIS_COMPLETE,
        JobKind::Generation => defaults::MSG_GENERATION_COMPLETE,
    }
}

fn failed_message(kind: JobKind) -> &'static str {
    match kind {
        JobKind::Analysis => defaults::MSG_ANALYSIS_FAILED,
        JobKind::Generation => defaults::MSG_GENERATION_FAILED,
    }
}

/// Interpret the `result` of a completed progress report.
fn completed_payload(kind: JobKind, report: &ProgressReport) -> Result<Option<JobPayload>> {
    let Some(result) = report.result.clone() else {
        return Ok(None);
    };
    match kind {
        JobKind::Analysis => {
            let payload: AnalysisPayload = serde_json::from_value(result).map_err(|e| {
                Error::Serialization(format!("Failed to parse analysis result: {}", e))
            })?;
            Ok(Some(JobPayload::Analysis(payload)))
        }
        JobKind::Generation => match result {
            serde_json::Value::String(path) if !path.is_empty() => Ok(Some(JobPayload::Video(path))),
            serde_json::Value::Null => Ok(None),
            other => Err(Error::Serialization(format!(
                "Failed to parse generation result: expected output path, got {}",
                other
            ))),
        },
    }
}

/// How the backend answered a start request.
enum StartReply {
    /// Accepted; progress must be polled.
    Running,
    /// Finished synchronously.
    Finished(Option<JobPayload>),
    /// Refused or failed synchronously, with the message to show.
    Rejected(String),
}

async fn start_job<B>(backend: &B, kind: JobKind, run_id: Uuid, request: &JobRequest) -> Result<StartReply>
where
    B: JobBackend + ?Sized,
{
    match request {
        JobRequest::Analysis { folder_paths } => match backend.start_analysis(folder_paths).await? {
            AnalyzeResponse::Started => Ok(StartReply::Running),
            AnalyzeResponse::Completed(payload) => {
                Ok(StartReply::Finished(Some(JobPayload::Analysis(payload))))
            }
            AnalyzeResponse::Rejected { message } => {
                if let Some(message) = message {
                    warn!(job_kind = %kind, %run_id, backend_message = %message, "Analysis returned no results");
                }
                Ok(StartReply::Rejected(defaults::MSG_NO_IMAGES.to_string()))
            }
        },
        JobRequest::Generation(request) => match backend.start_generation(request).await? {
            GenerateResponse::Started => Ok(StartReply::Running),
            GenerateResponse::Success { output_path } => {
                Ok(StartReply::Finished(Some(JobPayload::Video(output_path))))
            }
            GenerateResponse::Failed { message } => Ok(StartReply::Rejected(
                message.unwrap_or_else(|| defaults::MSG_UNKNOWN_ERROR.to_string()),
            )),
        },
    }
}

/// Holds a run in `Submitting` while its start request is in flight.
///
/// If the submitting future is dropped before the reply arrives, the run
/// goes back to `Idle` so the kind can be submitted again.
struct SubmitGuard<'a> {
    run: &'a mut JobRun,
    armed: bool,
}

impl<'a> SubmitGuard<'a> {
    fn arm(run: &'a mut JobRun, run_id: Uuid) -> Self {
        run.status = JobStatus::Submitting;
        run.percent = 0.0;
        run.message = starting_message(run.kind).to_string();
        run.result = None;
        run.run_id = Some(run_id);
        Self { run, armed: true }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for SubmitGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            warn!(job_kind = %self.run.kind, "Submission abandoned before the backend replied");
            self.run.reset_to_idle();
        }
    }
}

/// Submits jobs and tracks one [`JobRun`] per kind.
pub struct JobOrchestrator<B: JobBackend + ?Sized + 'static> {
    backend: Arc<B>,
    config: OrchestratorConfig,
    events: EventBus,
    analysis: Slot,
    generation: Slot,
    updates_tx: mpsc::UnboundedSender<PollUpdate>,
    updates_rx: mpsc::UnboundedReceiver<PollUpdate>,
    live: Arc<AtomicUsize>,
}

impl<B: JobBackend + ?Sized + 'static> JobOrchestrator<B> {
    pub fn new(backend: Arc<B>, config: OrchestratorConfig, events: EventBus) -> Self {
        let (updates_tx, updates_rx) = mpsc::unbounded_channel();
        Self {
            backend,
            config,
            events,
            analysis: Slot::new(JobKind::Analysis),
            generation: Slot::new(JobKind::Generation),
            updates_tx,
            updates_rx,
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    fn slot(&self, kind: JobKind) -> &Slot {
        match kind {
            JobKind::Analysis => &self.analysis,
            JobKind::Generation => &self.generation,
        }
    }

    fn slot_mut(&mut self, kind: JobKind) -> &mut Slot {
        match kind {
            JobKind::Analysis => &mut self.analysis,
            JobKind::Generation => &mut self.generation,
        }
    }

    /// Current state record for `kind`.
    pub fn run(&self, kind: JobKind) -> &JobRun {
        &self.slot(kind).run
    }

    /// Number of poll tasks still running.
    pub fn live_pollers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Whether `kind` currently has a poller attached.
    pub fn is_polling(&self, kind: JobKind) -> bool {
        self.slot(kind)
            .poller
            .as_ref()
            .map_or(false, |p| !p.is_finished())
    }

    async fn cancel_poller(&mut self, kind: JobKind) {
        if let Some(poller) = self.slot_mut(kind).poller.take() {
            debug!(job_kind = %kind, run_id = %poller.run_id(), "Cancelling poller");
            poller.cancel().await;
        }
    }

    /// Submit a job.
    ///
    /// Precondition failures return an error without touching state or the
    /// network. A transport failure returns the kind to `Idle`. Otherwise
    /// the run is `Running` (a poller was started) or already terminal, in
    /// which case the outcome is returned.
    pub async fn submit(&mut self, request: JobRequest) -> Result<Option<JobOutcome>> {
        request.check()?;
        let kind = request.kind();

        self.cancel_poller(kind).await;

        let run_id = Uuid::now_v7();
        info!(job_kind = %kind, %run_id, "Submitting job");
        self.events.emit(PipelineEvent::JobSubmitted { kind, run_id });

        let backend = self.backend.clone();
        let reply = {
            let guard = SubmitGuard::arm(&mut self.slot_mut(kind).run, run_id);
            let reply = start_job(backend.as_ref(), kind, run_id, &request).await;
            guard.disarm();
            reply
        };

        match reply {
            Err(e) => {
                warn!(job_kind = %kind, %run_id, error = %e, "Job submission failed");
                self.slot_mut(kind).run.reset_to_idle();
                Err(e)
            }
            Ok(StartReply::Running) => {
                self.slot_mut(kind).run.status = JobStatus::Running;
                let poller = PollHandle::spawn(
                    backend,
                    kind,
                    run_id,
                    self.config.poll_interval(),
                    self.updates_tx.clone(),
                    &self.live,
                );
                self.slot_mut(kind).poller = Some(poller);
                debug!(job_kind = %kind, %run_id, "Job running, polling for progress");
                Ok(None)
            }
            Ok(StartReply::Finished(payload)) => Ok(Some(self.complete(kind, run_id, payload))),
            Ok(StartReply::Rejected(message)) => Ok(Some(self.fail(kind, run_id, message))),
        }
    }

    fn complete(&mut self, kind: JobKind, run_id: Uuid, payload: Option<JobPayload>) -> JobOutcome {
        let run = &mut self.slot_mut(kind).run;
        run.status = JobStatus::Completed;
        run.percent = 100.0;
        run.message = complete_message(kind).to_string();
        run.result = payload.clone();
        info!(job_kind = %kind, %run_id, has_result = payload.is_some(), "Job completed");
        self.events.emit(PipelineEvent::JobCompleted { kind, run_id });
        JobOutcome::Completed {
            kind,
            run_id,
            payload,
        }
    }

    fn fail(&mut self, kind: JobKind, run_id: Uuid, message: String) -> JobOutcome {
        let run = &mut self.slot_mut(kind).run;
        run.status = JobStatus::Failed;
        run.message = message.clone();
        run.result = None;
        warn!(job_kind = %kind, %run_id, error = %message, "Job failed");
        self.events.emit(PipelineEvent::JobFailed {
            kind,
            run_id,
            message: message.clone(),
        });
        JobOutcome::Failed {
            kind,
            run_id,
            message,
        }
    }

    /// Apply one poll update. Returns the outcome if the run became terminal.
    ///
    /// Updates for a run other than the current one of their kind, or for a
    /// run that is no longer `Running`, are discarded.
    pub fn apply(&mut self, update: PollUpdate) -> Option<JobOutcome> {
        let PollUpdate {
            kind,
            run_id,
            report,
        } = update;

        let run = &self.slot(kind).run;
        if run.run_id != Some(run_id) || run.status != JobStatus::Running {
            debug!(job_kind = %kind, %run_id, "Discarding superseded poll update");
            return None;
        }

        match report.status {
            ProgressStatus::Completed => {
                self.slot_mut(kind).poller = None;
                Some(match completed_payload(kind, &report) {
                    Ok(payload) => self.complete(kind, run_id, payload),
                    Err(e) => self.fail(kind, run_id, e.to_string()),
                })
            }
            ProgressStatus::Error => {
                self.slot_mut(kind).poller = None;
                let message = report
                    .message()
                    .map(String::from)
                    .unwrap_or_else(|| failed_message(kind).to_string());
                Some(self.fail(kind, run_id, message))
            }
            status if status.is_progress_for(kind) => {
                let percent = report.clamped_percent();
                let message = report.message().unwrap_or_default().to_string();
                let run = &mut self.slot_mut(kind).run;
                run.percent = percent;
                run.message = message.clone();
                debug!(job_kind = %kind, %run_id, percent, "Job progress");
                self.events.emit(PipelineEvent::JobProgress {
                    kind,
                    run_id,
                    percent,
                    message,
                });
                None
            }
            _ => None,
        }
    }

    /// Wait for the next poll update. `None` only if every sender is gone,
    /// which cannot happen while the orchestrator is alive.
    pub async fn next_update(&mut self) -> Option<PollUpdate> {
        self.updates_rx.recv().await
    }

    /// Wait until `kind` is no longer active, applying updates for either
    /// kind as they arrive. Returns every terminal outcome observed.
    pub async fn wait_for(&mut self, kind: JobKind) -> Vec<JobOutcome> {
        let mut outcomes = Vec::new();
        while self.run(kind).status.is_active() {
            let Some(update) = self.next_update().await else {
                break;
            };
            if let Some(outcome) = self.apply(update) {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    /// Stop every poller and wait for the tasks to exit.
    pub async fn shutdown(&mut self) {
        for kind in JobKind::ALL {
            self.cancel_poller(kind).await;
        }
        info!("Job orchestrator shut down");
    }
}
