//! # reelsmith-client
//!
//! HTTP access to the reelsmith analysis/generation backend.
//!
//! This crate provides:
//! - [`HttpBackend`], the reqwest implementation of [`reelsmith_core::JobBackend`]
//! - [`ClientConfig`], environment-driven connection settings
//! - [`mock::MockBackend`], a scripted backend (feature `mock`)
//!
//! # Feature Flags
//!
//! - `mock`: Enable the scripted mock backend for tests in dependent crates
//!
//! # Example
//!
//! ```rust,no_run
//! use reelsmith_client::HttpBackend;
//! use reelsmith_core::JobBackend;
//!
//! #[tokio::main]
//! async fn main() -> reelsmith_core::Result<()> {
//!     let backend = HttpBackend::from_env()?;
//!     let report = backend.progress().await?;
//!     println!("{:?}", report.status);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod http;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use config::ClientConfig;
pub use http::HttpBackend;
