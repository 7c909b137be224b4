//! # reelsmith-core
//!
//! Core types, selection state and traits for reelsmith.
//!
//! This crate holds everything that can be decided without talking to the
//! backend: the wire model, folder/output selections, facet filtering of
//! analysis results, audio trim bounds and the generation request built from
//! them. Other reelsmith crates depend on it.

pub mod defaults;
pub mod error;
pub mod events;
pub mod facet;
pub mod models;
pub mod request;
pub mod selection;
pub mod traits;
pub mod trim;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use events::{EventBus, EventEnvelope, NotificationLevel, PipelineEvent};
pub use facet::{filter_images, top_by_count, Facet, FacetFilter, FacetSelection, StaleSelections};
pub use models::*;
pub use request::build_generation_request;
pub use selection::{FolderSelection, SelectionStore};
pub use traits::*;
pub use trim::{AudioSession, AudioSessionFactory, AudioTrim, AudioTrimController, SessionId};
