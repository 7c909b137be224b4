//! Data model shared by every reelsmith crate: backend wire types, job
//! records and the generation request.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::error::{Error, Result};

// =============================================================================
// ANALYSIS RESULTS
// =============================================================================

/// One image discovered by an analysis job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisImage {
    pub path: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl AnalysisImage {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            tags: BTreeSet::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }
}

/// Cluster identifier assigned by the backend. Numeric or textual on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PersonId {
    Number(i64),
    Text(String),
}

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for PersonId {
    /// Parses digits as a numeric id so CLI input matches either wire form.
    fn from(s: &str) -> Self {
        match s.parse::<i64>() {
            Ok(n) => Self::Number(n),
            Err(_) => Self::Text(s.to_string()),
        }
    }
}

/// A detected person and the images they appear in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonFacet {
    pub id: PersonId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub count: u32,
    #[serde(default)]
    pub images: BTreeSet<String>,
}

impl PersonFacet {
    pub fn contains(&self, path: &str) -> bool {
        self.images.contains(path)
    }
}

/// A thematic tag with the number of images carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeFacet {
    pub name: String,
    #[serde(default)]
    pub count: u32,
}

/// Full payload of a completed analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    #[serde(default)]
    pub results: Vec<AnalysisImage>,
    #[serde(default)]
    pub people: Vec<PersonFacet>,
    #[serde(default)]
    pub themes: Vec<ThemeFacet>,
}

// =============================================================================
// JOB START RESPONSES
// =============================================================================

fn status_of(value: &JsonValue) -> Option<&str> {
    value.get("status").and_then(JsonValue::as_str)
}

fn message_of(value: &JsonValue) -> Option<String> {
    value
        .get("message")
        .and_then(JsonValue::as_str)
        .filter(|m| !m.is_empty())
        .map(String::from)
}

/// Reply to `POST /api/analyze`.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzeResponse {
    /// Job accepted; progress must be polled.
    Started,
    /// The backend finished synchronously.
    Completed(AnalysisPayload),
    /// Anything else: no results were produced.
    Rejected { message: Option<String> },
}

impl AnalyzeResponse {
    /// Interpret a raw JSON reply.
    pub fn from_value(value: JsonValue) -> Result<Self> {
        if status_of(&value) == Some("started") {
            return Ok(Self::Started);
        }
        if value.get("results").map_or(false, JsonValue::is_array) {
            let payload: AnalysisPayload = serde_json::from_value(value)?;
            return Ok(Self::Completed(payload));
        }
        Ok(Self::Rejected {
            message: message_of(&value),
        })
    }
}

/// Reply to `POST /api/generate`.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerateResponse {
    Started,
    Success { output_path: String },
    Failed { message: Option<String> },
}

impl GenerateResponse {
    /// Interpret a raw JSON reply.
    pub fn from_value(value: JsonValue) -> Result<Self> {
        match status_of(&value) {
            Some("started") => Ok(Self::Started),
            Some("success") => {
                let output_path = value
                    .get("output_path")
                    .and_then(JsonValue::as_str)
                    .ok_or_else(|| {
                        Error::Serialization("success reply without output_path".to_string())
                    })?;
                Ok(Self::Success {
                    output_path: output_path.to_string(),
                })
            }
            _ => Ok(Self::Failed {
                message: message_of(&value),
            }),
        }
    }
}

/// Reply to the folder/file picker endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrowseResponse {
    #[serde(default)]
    pub path: Option<String>,
}

impl BrowseResponse {
    /// The chosen path, `None` when the picker was cancelled.
    pub fn into_path(self) -> Option<String> {
        self.path.filter(|p| !p.trim().is_empty())
    }
}

// =============================================================================
// PROGRESS
// =============================================================================

/// Status reported by `GET /api/progress`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Analyzing,
    Clustering,
    Generating,
    Completed,
    Error,
    #[serde(other)]
    Unknown,
}

impl ProgressStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }

    /// Whether this non-terminal status carries progress for `kind`.
    pub fn is_progress_for(self, kind: JobKind) -> bool {
        match kind {
            JobKind::Analysis => matches!(self, Self::Analyzing | Self::Clustering),
            JobKind::Generation => matches!(self, Self::Generating),
        }
    }
}

/// One progress snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub status: ProgressStatus,
    #[serde(default)]
    pub percent: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JsonValue>,
}

impl ProgressReport {
    pub fn new(status: ProgressStatus, percent: f64, message: impl Into<String>) -> Self {
        Self {
            status,
            percent: Some(percent),
            message: Some(message.into()),
            result: None,
        }
    }

    pub fn with_result(mut self, result: JsonValue) -> Self {
        self.result = Some(result);
        self
    }

    /// Percent clamped into `0..=100`; missing or non-finite values read as 0.
    pub fn clamped_percent(&self) -> f64 {
        match self.percent {
            Some(p) if p.is_finite() => p.clamp(0.0, 100.0),
            _ => 0.0,
        }
    }

    /// Non-empty message, if any.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref().filter(|m| !m.is_empty())
    }
}

// =============================================================================
// JOBS
// =============================================================================

/// The two long-running backend jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Analysis,
    Generation,
}

impl JobKind {
    pub const ALL: [JobKind; 2] = [JobKind::Analysis, JobKind::Generation];
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analysis => write!(f, "analysis"),
            Self::Generation => write!(f, "generation"),
        }
    }
}

/// Lifecycle of one job kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    #[default]
    Idle,
    Submitting,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Submitting or Running.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Submitting | Self::Running)
    }
}

/// Result carried by a completed job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobPayload {
    Analysis(AnalysisPayload),
    /// Path of the generated video on the backend host.
    Video(String),
}

/// State record for one job kind.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRun {
    pub kind: JobKind,
    pub status: JobStatus,
    pub percent: f64,
    pub message: String,
    pub result: Option<JobPayload>,
    /// Minted on each submission; `None` before the first one.
    pub run_id: Option<Uuid>,
}

impl JobRun {
    pub fn new(kind: JobKind) -> Self {
        Self {
            kind,
            status: JobStatus::Idle,
            percent: 0.0,
            message: String::new(),
            result: None,
            run_id: None,
        }
    }

    /// Back to a re-submittable `Idle` after a submission that never got a reply.
    pub fn reset_to_idle(&mut self) {
        self.status = JobStatus::Idle;
        self.percent = 0.0;
        self.message.clear();
        self.result = None;
    }

    /// Status line for display: the backend message, or a percent fallback.
    pub fn display_message(&self) -> String {
        if !self.message.is_empty() {
            return self.message.clone();
        }
        let verb = match self.kind {
            JobKind::Analysis => "Analyzing",
            JobKind::Generation => "Generating",
        };
        format!("{}: {}%", verb, self.percent.round() as i64)
    }
}

// =============================================================================
// GENERATION
// =============================================================================

/// Output aspect ratio.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// 16:9 (PC/TV).
    #[default]
    #[serde(rename = "1080p")]
    Landscape,
    /// 9:16 (smartphone).
    #[serde(rename = "9:16")]
    Portrait,
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Landscape => write!(f, "1080p"),
            Self::Portrait => write!(f, "9:16"),
        }
    }
}

impl FromStr for Resolution {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "1080p" | "16:9" => Ok(Self::Landscape),
            "9:16" => Ok(Self::Portrait),
            _ => Err(Error::InvalidInput(format!("unknown resolution: {}", s))),
        }
    }
}

/// Body of `POST /api/generate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub image_paths: Vec<String>,
    pub output_path: String,
    pub resolution: Resolution,
    pub audio_path: String,
    pub audio_start: f64,
    pub audio_end: f64,
    pub image_duration: f64,
    pub title_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ken_burns_effect: Option<bool>,
}

/// A finished video available for preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedVideo {
    pub output_path: String,
    pub preview_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_analyze_response_started() {
        let resp = AnalyzeResponse::from_value(json!({"status": "started"})).unwrap();
        assert_eq!(resp, AnalyzeResponse::Started);
    }

    #[test]
    fn test_analyze_response_immediate_results() {
        let resp = AnalyzeResponse::from_value(json!({
            "results": [{"path": "/a/1.jpg", "tags": ["beach"]}],
            "people": [{"id": 3, "name": "Person 3", "count": 1, "images": ["/a/1.jpg"]}],
            "themes": [{"name": "beach", "count": 1}]
        }))
        .unwrap();

        match resp {
            AnalyzeResponse::Completed(payload) => {
                assert_eq!(payload.results.len(), 1);
                assert!(payload.results[0].has_tag("beach"));
                assert_eq!(payload.people[0].id, PersonId::Number(3));
                assert!(payload.people[0].contains("/a/1.jpg"));
                assert_eq!(payload.themes[0].name, "beach");
            }
            other => panic!("Expected Completed, got {:?}", other),
        }
    }

    #[test]
    fn test_analyze_response_without_results_is_rejected() {
        let resp = AnalyzeResponse::from_value(json!({"error": "nothing"})).unwrap();
        assert_eq!(resp, AnalyzeResponse::Rejected { message: None });

        let resp =
            AnalyzeResponse::from_value(json!({"status": "error", "message": "bad folder"}))
                .unwrap();
        assert_eq!(
            resp,
            AnalyzeResponse::Rejected {
                message: Some("bad folder".to_string())
            }
        );
    }

    #[test]
    fn test_image_without_tags_defaults_empty() {
        let img: AnalysisImage = serde_json::from_value(json!({"path": "/x.jpg"})).unwrap();
        assert!(img.tags.is_empty());
    }

    #[test]
    fn test_generate_response_shapes() {
        assert_eq!(
            GenerateResponse::from_value(json!({"status": "started"})).unwrap(),
            GenerateResponse::Started
        );
        assert_eq!(
            GenerateResponse::from_value(json!({"status": "success", "output_path": "/o.mp4"}))
                .unwrap(),
            GenerateResponse::Success {
                output_path: "/o.mp4".to_string()
            }
        );
        assert_eq!(
            GenerateResponse::from_value(json!({"status": "error", "message": "disk full"}))
                .unwrap(),
            GenerateResponse::Failed {
                message: Some("disk full".to_string())
            }
        );
        assert_eq!(
            GenerateResponse::from_value(json!({"status": "weird"})).unwrap(),
            GenerateResponse::Failed { message: None }
        );
    }

    #[test]
    fn test_generate_success_without_path_is_error() {
        let err = GenerateResponse::from_value(json!({"status": "success"})).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_progress_report_parsing() {
        let report: ProgressReport = serde_json::from_value(json!({
            "status": "clustering",
            "percent": 55.5,
            "message": "Grouping faces"
        }))
        .unwrap();
        assert_eq!(report.status, ProgressStatus::Clustering);
        assert_eq!(report.clamped_percent(), 55.5);
        assert_eq!(report.message(), Some("Grouping faces"));
        assert!(report.result.is_none());
    }

    #[test]
    fn test_progress_report_unknown_status_and_nulls() {
        let report: ProgressReport = serde_json::from_value(json!({
            "status": "idle",
            "percent": null,
            "message": null
        }))
        .unwrap();
        assert_eq!(report.status, ProgressStatus::Unknown);
        assert_eq!(report.clamped_percent(), 0.0);
        assert_eq!(report.message(), None);
    }

    #[test]
    fn test_progress_percent_is_clamped() {
        let report = ProgressReport::new(ProgressStatus::Generating, 140.0, "");
        assert_eq!(report.clamped_percent(), 100.0);
        let report = ProgressReport::new(ProgressStatus::Generating, -3.0, "");
        assert_eq!(report.clamped_percent(), 0.0);
    }

    #[test]
    fn test_progress_status_relevance_per_kind() {
        assert!(ProgressStatus::Analyzing.is_progress_for(JobKind::Analysis));
        assert!(ProgressStatus::Clustering.is_progress_for(JobKind::Analysis));
        assert!(!ProgressStatus::Generating.is_progress_for(JobKind::Analysis));
        assert!(ProgressStatus::Generating.is_progress_for(JobKind::Generation));
        assert!(!ProgressStatus::Completed.is_progress_for(JobKind::Generation));
        assert!(ProgressStatus::Completed.is_terminal());
        assert!(ProgressStatus::Error.is_terminal());
        assert!(!ProgressStatus::Unknown.is_terminal());
    }

    #[test]
    fn test_resolution_wire_values() {
        assert_eq!(serde_json::to_value(Resolution::Landscape).unwrap(), json!("1080p"));
        assert_eq!(serde_json::to_value(Resolution::Portrait).unwrap(), json!("9:16"));
        assert_eq!("9:16".parse::<Resolution>().unwrap(), Resolution::Portrait);
        assert_eq!("16:9".parse::<Resolution>().unwrap(), Resolution::Landscape);
        assert!("4:3".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_generation_request_omits_unset_ken_burns() {
        let request = GenerationRequest {
            image_paths: vec!["/a.jpg".to_string()],
            output_path: "out.mp4".to_string(),
            resolution: Resolution::Portrait,
            audio_path: String::new(),
            audio_start: 0.0,
            audio_end: 0.0,
            image_duration: 3.0,
            title_text: "Trip".to_string(),
            ken_burns_effect: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("ken_burns_effect").is_none());
        assert_eq!(value["resolution"], json!("9:16"));

        let value = serde_json::to_value(GenerationRequest {
            ken_burns_effect: Some(true),
            ..request
        })
        .unwrap();
        assert_eq!(value["ken_burns_effect"], json!(true));
    }

    #[test]
    fn test_person_id_forms() {
        let id: PersonId = serde_json::from_value(json!("cluster-a")).unwrap();
        assert_eq!(id, PersonId::Text("cluster-a".to_string()));
        assert_eq!(PersonId::from("7"), PersonId::Number(7));
        assert_eq!(PersonId::from("p7"), PersonId::Text("p7".to_string()));
        assert_eq!(PersonId::Number(7).to_string(), "7");
    }

    #[test]
    fn test_job_run_reset_to_idle() {
        let mut run = JobRun::new(JobKind::Generation);
        run.status = JobStatus::Submitting;
        run.message = "Starting generation...".to_string();
        run.reset_to_idle();
        assert_eq!(run.status, JobStatus::Idle);
        assert!(run.message.is_empty());
        assert!(!run.status.is_active());
    }

    #[test]
    fn test_job_run_display_message_fallback() {
        let mut run = JobRun::new(JobKind::Analysis);
        run.percent = 39.6;
        assert_eq!(run.display_message(), "Analyzing: 40%");
        run.message = "Scanning".to_string();
        assert_eq!(run.display_message(), "Scanning");
    }

    #[test]
    fn test_browse_response_cancelled() {
        let resp: BrowseResponse = serde_json::from_value(json!({"path": ""})).unwrap();
        assert_eq!(resp.into_path(), None);
        let resp: BrowseResponse = serde_json::from_value(json!({})).unwrap();
        assert_eq!(resp.into_path(), None);
        let resp: BrowseResponse = serde_json::from_value(json!({"path": "/pics"})).unwrap();
        assert_eq!(resp.into_path(), Some("/pics".to_string()));
    }

    #[test]
    fn test_job_status_helpers() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Running.is_active());
        assert!(JobStatus::Submitting.is_active());
        assert!(!JobStatus::Idle.is_active());
        assert_eq!(JobStatus::default(), JobStatus::Idle);
    }
}
