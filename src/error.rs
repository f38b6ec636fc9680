//! Error types for `taskchain`.

use crate::tasks::models::TaskId;

/// Errors that can occur in the task engine.
///
/// `NotFound`, `Validation`, and `Conflict` are caller errors (a transport
/// layer would map them to 404, 400, and 409). The remaining variants are
/// infrastructure failures and are the ones worth retrying.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No task exists with the given id.
    #[error("task not found: {0}")]
    NotFound(TaskId),

    /// The supplied task properties failed validation.
    ///
    /// The message aggregates every violated field, so one round trip
    /// reports every problem.
    #[error("{0}")]
    Validation(String),

    /// A concurrent request modified the task between read and write.
    #[error("task {0} was modified concurrently, retry the request")]
    Conflict(TaskId),

    /// A `SQLite` database error occurred.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON serialization error occurred.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML parsing error occurred.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Whether this error is the caller's fault (bad input, stale read)
    /// rather than an infrastructure failure.
    #[must_use]
    pub const fn is_caller_error(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::Validation(_) | Self::Conflict(_))
    }
}

/// A specialized Result type for this crate.
pub type Result<T> = std::result::Result<T, Error>;
