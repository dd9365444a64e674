//! Error types for critpath operations.

use crate::domain::TaskId;
use std::io;
use thiserror::Error;

/// The error type for critpath operations.
///
/// Dependency cycles are not errors. The solver orders cyclic nodes on a
/// best-effort basis and reports them in `CpmResult::cyclic_task_ids` instead.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input to a simulate request.
    #[error("Invalid {field}: {reason}")]
    Validation {
        /// The offending input field.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },

    /// The requested task is not part of the active task set.
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),

    /// The enrichment service timed out or failed.
    #[error("Enrichment unavailable: {0}")]
    EnrichmentUnavailable(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error from a task store or cache backend.
    #[error("Storage error: {0}")]
    Storage(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] on `field`.
    pub fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }
}

/// A specialized Result type for critpath operations.
pub type Result<T> = std::result::Result<T, Error>;
