//! Error types for the studyrun engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A shared error type for the whole engine.
///
/// Validation findings are deliberately absent: they are returned as data
/// (`AdvanceOutcome::Rejected`) and never travel through this type.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum StudyError {
    /// A per-block save failed. Progression is blocked until the caller retries.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// The initial block list could not be fetched. Fatal to the session instance.
    #[error("Load error: {0}")]
    Load(String),

    /// A conditional-branch block is misconfigured (authoring defect).
    #[error("Branch configuration error in block '{block_id}': {message}")]
    BranchConfiguration { block_id: String, message: String },

    /// The requested operation is not allowed in the current session status.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// A save of the same kind is already in flight.
    #[error("A save is already in flight")]
    SaveInFlight,

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization { format: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StudyError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence(message.into())
    }

    pub fn load(message: impl Into<String>) -> Self {
        Self::Load(message.into())
    }

    pub fn branch_configuration(block_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BranchConfiguration {
            block_id: block_id.into(),
            message: message.into(),
        }
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    pub fn is_persistence(&self) -> bool {
        matches!(self, Self::Persistence(_))
    }

    pub fn is_load(&self) -> bool {
        matches!(self, Self::Load(_))
    }

    pub fn is_branch_configuration(&self) -> bool {
        matches!(self, Self::BranchConfiguration { .. })
    }

    pub fn is_invalid_state(&self) -> bool {
        matches!(self, Self::InvalidState(_))
    }

    pub fn is_save_in_flight(&self) -> bool {
        matches!(self, Self::SaveInFlight)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether the presentation layer may offer the participant a retry.
    ///
    /// Load failures need a fresh session instance and authoring defects
    /// need a content fix, so neither is retryable in place.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Persistence(_) | Self::SaveInFlight | Self::Io { .. })
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for StudyError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for StudyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for StudyError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for StudyError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// Conversion from anyhow::Error (infrastructure internals use anyhow)
impl From<anyhow::Error> for StudyError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(format!("{:#}", err))
    }
}

/// A type alias for `Result<T, StudyError>`.
pub type Result<T> = std::result::Result<T, StudyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_branch_configuration_display() {
        let err = StudyError::branch_configuration("branch-1", "no default target");
        assert_eq!(
            err.to_string(),
            "Branch configuration error in block 'branch-1': no default target"
        );
        assert!(err.is_branch_configuration());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(StudyError::persistence("timeout").is_retryable());
        assert!(StudyError::SaveInFlight.is_retryable());
        assert!(!StudyError::load("404").is_retryable());
        assert!(!StudyError::invalid_state("paused").is_retryable());
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: StudyError = io.into();
        match err {
            StudyError::Io { message } => assert!(message.contains("NotFound")),
            other => panic!("unexpected variant: {other:?}"),
        }
    }
}
