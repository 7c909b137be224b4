//! Error types for reelsmith.

use thiserror::Error;

/// Result type alias using reelsmith's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for reelsmith operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Analysis was requested with an empty folder selection
    #[error("No folders selected")]
    NoFolders,

    /// Generation was requested with too few filtered images
    #[error("Need at least {required} images (selected: {count})")]
    InsufficientImages { count: usize, required: usize },

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Audio visualization session could not be created or driven
    #[error("Audio session error: {0}")]
    AudioSession(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors raised before any network call was made.
    pub fn is_precondition(&self) -> bool {
        matches!(self, Error::NoFolders | Error::InsufficientImages { .. })
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
