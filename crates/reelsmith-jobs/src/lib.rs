//! # reelsmith-jobs
//!
//! Job orchestration for reelsmith.
//!
//! This crate provides:
//! - Submission of analysis and generation jobs with per-kind state records
//! - Cancellable progress poll tasks feeding a single state owner
//! - Merging of completed results into the filter and preview state
//! - [`Studio`], the session object wiring selections, filters, audio trim
//!   and jobs together
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use reelsmith_client::HttpBackend;
//! use reelsmith_jobs::{OrchestratorConfig, Studio};
//!
//! let backend = Arc::new(HttpBackend::from_env()?);
//! let mut studio = Studio::new(backend, Box::new(sessions), OrchestratorConfig::from_env());
//!
//! studio.add_folder("/photos/2026");
//! studio.start_analysis().await?;
//! studio.wait_for(JobKind::Analysis).await;
//!
//! println!("{} images", studio.filter().visible_count());
//! studio.shutdown().await;
//! ```

pub mod merger;
pub mod orchestrator;
pub mod poller;
pub mod studio;

// Re-export core types
pub use reelsmith_core::*;

pub use merger::{merge_outcome, Merged};
pub use orchestrator::{JobOrchestrator, JobOutcome, JobRequest, OrchestratorConfig};
pub use poller::{PollHandle, PollUpdate};
pub use studio::Studio;
