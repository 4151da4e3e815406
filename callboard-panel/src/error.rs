//! Error types for callboard-panel
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation. Core playback failures never reach this type: they degrade
//! in place (see the media and playback modules), so these variants cover
//! startup, configuration, and the HTTP surface.

use thiserror::Error;

/// Main error type for the callboard panel
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Playback engine errors
    #[error("Engine error: {0}")]
    Engine(#[from] crate::media::EngineError),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using the panel Error
pub type Result<T> = std::result::Result<T, Error>;
