//! Error handling for PBS script generation and submission.

use thiserror::Error;

/// Result type for pbsgen operations.
pub type PbsGenResult<T> = Result<T, PbsGenError>;

/// Errors that can occur while resolving, persisting or submitting a job.
#[derive(Error, Debug)]
pub enum PbsGenError {
    /// The input is not a key/value mapping.
    #[error("Invalid input kind: expected a mapping, found {0}")]
    InvalidInputKind(String),

    /// One or more required scheduler parameters are absent.
    #[error("Missing required scheduler parameters: {}", .0.join(", "))]
    MissingRequiredField(Vec<String>),

    /// A present parameter cannot be represented by its field.
    #[error("Invalid value for '{field}': {reason}")]
    InvalidFieldValue { field: String, reason: String },

    /// The submission command could not be launched.
    #[error("Submission command failed: {command} - {message}")]
    ExternalProcessFailure { command: String, message: String },

    /// IO error. Covers the filesystem half of external failures: creating
    /// the script directory and writing the script.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML serialization/deserialization error.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml_ng::Error),
}

impl PbsGenError {
    /// Build an [`PbsGenError::InvalidFieldValue`] for `field`.
    pub(crate) fn invalid_field(field: &str, reason: impl Into<String>) -> Self {
        PbsGenError::InvalidFieldValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}
