//! Error types for the Sidekick assistant core.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the whole Sidekick workspace.
///
/// Precondition variants (`NoActiveSession`, `RequestInFlight`, ...) indicate
/// a bug in the surrounding command-enablement logic and are meant to fail
/// fast. Transport and storage variants are recovered locally and never reach
/// the end user.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum SidekickError {
    /// A request was submitted without an existing session.
    #[error("No active session")]
    NoActiveSession,

    /// A second request was submitted while one is still in flight.
    #[error("Request '{request_id}' is still in flight")]
    RequestInFlight { request_id: String },

    /// `rerun` was called before any request was ever submitted.
    #[error("No prior request to rerun")]
    NoPriorRequest,

    /// A command required a settled, complete response.
    #[error("Response is not complete")]
    ResponseNotComplete,

    /// A command required a non-empty response.
    #[error("Response is empty")]
    EmptyResponse,

    /// A run/insert command was issued with the wrong number of code blocks.
    #[error("Expected {expected} code artifact(s), found {actual}")]
    ArtifactMismatch {
        expected: &'static str,
        actual: usize,
    },

    /// The operation was canceled before it could finish.
    #[error("Operation canceled")]
    Canceled,

    /// Transport-level failure while talking to the chat service.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Data access error (view-state storage layer).
    #[error("Data access error: {0}")]
    DataAccess(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SidekickError {
    /// Creates a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates a DataAccess error
    pub fn data_access(message: impl Into<String>) -> Self {
        Self::DataAccess(message.into())
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error is a precondition violation.
    ///
    /// Precondition violations indicate a gating bug in the caller (context
    /// keys, command enablement) rather than a runtime failure.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Self::NoActiveSession
                | Self::RequestInFlight { .. }
                | Self::NoPriorRequest
                | Self::ResponseNotComplete
                | Self::EmptyResponse
                | Self::ArtifactMismatch { .. }
        )
    }

    /// Check if this is a cancellation outcome
    pub fn is_canceled(&self) -> bool {
        matches!(self, Self::Canceled)
    }

    /// Check if this is a transport error
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for SidekickError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for SidekickError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for SidekickError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for SidekickError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, SidekickError>`.
pub type Result<T> = std::result::Result<T, SidekickError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_classification() {
        assert!(SidekickError::NoActiveSession.is_precondition());
        assert!(
            SidekickError::RequestInFlight {
                request_id: "r-1".to_string()
            }
            .is_precondition()
        );
        assert!(!SidekickError::transport("boom").is_precondition());
        assert!(!SidekickError::Canceled.is_precondition());
    }

    #[test]
    fn test_io_conversion() {
        let err: SidekickError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(matches!(err, SidekickError::Io { .. }));
    }
}
