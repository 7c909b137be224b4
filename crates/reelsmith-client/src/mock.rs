//! Scripted backend for deterministic testing.
//!
//! Replies are queued up front (or pushed while a test runs) and handed out
//! in order. Once the progress queue is drained the last report is repeated,
//! which mimics a backend that keeps answering with its final state.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use reelsmith_client::mock::MockBackend;
//! use reelsmith_core::{AnalyzeResponse, ProgressReport, ProgressStatus};
//!
//! let backend = MockBackend::new()
//!     .with_analyze_response(AnalyzeResponse::Started)
//!     .with_progress(ProgressReport::new(ProgressStatus::Analyzing, 40.0, "Scanning"));
//! assert!(backend.calls().is_empty());
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use reelsmith_core::{
    AnalyzeResponse, Error, GenerateResponse, GenerationRequest, JobBackend, ProgressReport,
    ProgressStatus, Result,
};

/// One recorded call against the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    StartAnalysis(Vec<String>),
    StartGeneration(GenerationRequest),
    Progress,
    BrowseFolder,
    BrowseFile,
}

impl MockCall {
    pub fn operation(&self) -> &'static str {
        match self {
            Self::StartAnalysis(_) => "analyze",
            Self::StartGeneration(_) => "generate",
            Self::Progress => "progress",
            Self::BrowseFolder => "browse",
            Self::BrowseFile => "browse_file",
        }
    }
}

type Scripted<T> = std::result::Result<T, String>;

#[derive(Default)]
struct MockState {
    analyze: VecDeque<Scripted<AnalyzeResponse>>,
    generate: VecDeque<Scripted<GenerateResponse>>,
    progress: VecDeque<Scripted<ProgressReport>>,
    last_progress: Option<ProgressReport>,
    folders: VecDeque<Option<String>>,
    files: VecDeque<Option<String>>,
    calls: Vec<MockCall>,
    latency_ms: u64,
}

/// Mock implementation of [`JobBackend`].
#[derive(Clone, Default)]
pub struct MockBackend {
    state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a reply for the next analysis start.
    pub fn with_analyze_response(self, response: AnalyzeResponse) -> Self {
        self.state().analyze.push_back(Ok(response));
        self
    }

    /// Queue a transport failure for the next analysis start.
    pub fn with_analyze_error(self, message: impl Into<String>) -> Self {
        self.state().analyze.push_back(Err(message.into()));
        self
    }

    /// Queue a reply for the next generation start.
    pub fn with_generate_response(self, response: GenerateResponse) -> Self {
        self.state().generate.push_back(Ok(response));
        self
    }

    /// Queue a transport failure for the next generation start.
    pub fn with_generate_error(self, message: impl Into<String>) -> Self {
        self.state().generate.push_back(Err(message.into()));
        self
    }

    pub fn with_progress(self, report: ProgressReport) -> Self {
        self.push_progress(report);
        self
    }

    /// Queue a transport failure for one progress poll.
    pub fn with_progress_error(self, message: impl Into<String>) -> Self {
        self.state().progress.push_back(Err(message.into()));
        self
    }

    pub fn with_browse_folder(self, path: Option<&str>) -> Self {
        self.state().folders.push_back(path.map(String::from));
        self
    }

    pub fn with_browse_file(self, path: Option<&str>) -> Self {
        self.state().files.push_back(path.map(String::from));
        self
    }

    /// Delay every call by `latency_ms`.
    pub fn with_latency_ms(self, latency_ms: u64) -> Self {
        self.state().latency_ms = latency_ms;
        self
    }

    /// Queue a progress report while the mock is in use.
    pub fn push_progress(&self, report: ProgressReport) {
        self.state().progress.push_back(Ok(report));
    }

    /// Get all logged calls for assertion.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state().calls.clone()
    }

    pub fn call_count(&self, operation: &str) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.operation() == operation)
            .count()
    }

    /// Requests sent to the generation endpoint, oldest first.
    pub fn generation_requests(&self) -> Vec<GenerationRequest> {
        self.state()
            .calls
            .iter()
            .filter_map(|c| match c {
                MockCall::StartGeneration(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear()
    }

    fn log_call(&self, call: MockCall) -> u64 {
        let mut state = self.state();
        state.calls.push(call);
        state.latency_ms
    }

    async fn simulate_latency(latency_ms: u64) {
        if latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(latency_ms)).await;
        }
    }
}

#[async_trait]
impl JobBackend for MockBackend {
    async fn start_analysis(&self, folder_paths: &[String]) -> Result<AnalyzeResponse> {
        let latency = self.log_call(MockCall::StartAnalysis(folder_paths.to_vec()));
        Self::simulate_latency(latency).await;
        match self.state().analyze.pop_front() {
            Some(scripted) => scripted.map_err(Error::Request),
            None => Ok(AnalyzeResponse::Started),
        }
    }

    async fn start_generation(&self, request: &GenerationRequest) -> Result<GenerateResponse> {
        let latency = self.log_call(MockCall::StartGeneration(request.clone()));
        Self::simulate_latency(latency).await;
        match self.state().generate.pop_front() {
            Some(scripted) => scripted.map_err(Error::Request),
            None => Ok(GenerateResponse::Started),
        }
    }

    async fn progress(&self) -> Result<ProgressReport> {
        let latency = self.log_call(MockCall::Progress);
        Self::simulate_latency(latency).await;
        let mut state = self.state();
        match state.progress.pop_front() {
            Some(Ok(report)) => {
                state.last_progress = Some(report.clone());
                Ok(report)
            }
            Some(Err(message)) => Err(Error::Request(message)),
            None => Ok(state.last_progress.clone().unwrap_or(ProgressReport {
                status: ProgressStatus::Unknown,
                percent: None,
                message: None,
                result: None,
            })),
        }
    }

    async fn browse_folder(&self) -> Result<Option<String>> {
        let latency = self.log_call(MockCall::BrowseFolder);
        Self::simulate_latency(latency).await;
        Ok(self.state().folders.pop_front().flatten())
    }

    async fn browse_file(&self) -> Result<Option<String>> {
        let latency = self.log_call(MockCall::BrowseFile);
        Self::simulate_latency(latency).await;
        Ok(self.state().files.pop_front().flatten())
    }

    fn media_url(&self, path: &str) -> Result<String> {
        Ok(format!("http://mock.invalid/api/image?path={}", path))
    }
}
