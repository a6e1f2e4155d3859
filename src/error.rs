//! Error handling for the ExamWatch proctoring core

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Detection backend wholly unavailable at startup
    #[error("Initialization error: {0}")]
    Initialization(String),

    /// Frame capture failure
    #[error("Capture error: {0}")]
    Capture(String),

    /// Detection backend failure for a single frame
    #[error("Detection error: {0}")]
    Detection(String),

    /// Config error
    #[error("Config error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
