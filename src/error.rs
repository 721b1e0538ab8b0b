//! Error types for the Soulpet service

use thiserror::Error;

/// Result type alias for Soulpet operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while scoring, rendering or proxying
#[derive(Error, Debug)]
pub enum Error {
    /// A request or input failed validation (maps to HTTP 400)
    #[error("{0}")]
    Validation(String),

    /// A required setting (usually an environment variable) is missing
    #[error("Server misconfigured: missing {0}")]
    Misconfigured(&'static str),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Failed to load or decode an image
    #[error("Image error: {0}")]
    Image(String),

    /// Failed to render content
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Network error talking to an upstream service
    #[error("Network error: {0}")]
    NetworkError(String),

    /// The mint flow stopped; the message is shown to the user as-is
    #[error("{0}")]
    MintError(String),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::NetworkError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Other(format!("JSON error: {}", err))
    }
}

impl From<png::EncodingError> for Error {
    fn from(err: png::EncodingError) -> Self {
        Error::RenderError(format!("PNG encoding failed: {}", err))
    }
}

impl From<png::DecodingError> for Error {
    fn from(err: png::DecodingError) -> Self {
        Error::Image(format!("PNG decoding failed: {}", err))
    }
}
