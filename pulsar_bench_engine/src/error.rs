//! Error types for the Pulsar Bench engine
//!
//! Recoverable failures (backend resource creation, bad scene input)
//! travel through `Result`. API misuse — scheduling after finalize,
//! rendering shadows before building frustums, exhausting the cull
//! instance pool — is a programming error and panics after logging.

use std::fmt;

/// Result type for Pulsar Bench engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pulsar Bench engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Initialization failed (engine, subsystems)
    InitializationFailed(String),

    /// Malformed scene input (dangling keys, degenerate portals, ...)
    InvalidScene(String),

    /// Backend-specific error (resource creation, job recording)
    BackendError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::InvalidScene(msg) => write!(f, "Invalid scene: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
