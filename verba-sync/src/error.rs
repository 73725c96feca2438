//! Error types for the sync layer.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur in sync operations.
///
/// None of these reach the application: the public sync operations turn them
/// into log records and report entries.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network error (connection refused, reset, DNS, ...).
    #[error("network error: {0}")]
    Network(String),

    /// The remote store rejected a request.
    #[error("remote rejected request ({status}): {message}")]
    Remote { status: u16, message: String },

    /// Local store error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// HTTP client error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Record-level type error.
    #[error("invalid record: {0}")]
    InvalidRecord(#[from] verba_types::Error),

    /// A remote call exceeded its deadline.
    #[error("operation timed out")]
    Timeout,

    /// The engine was constructed outside a Tokio runtime.
    #[error("no tokio runtime available")]
    NoRuntime,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SyncError {
    /// Returns true for failures likely to clear on their own.
    ///
    /// Failed pushes are re-queued either way; this only picks the log level.
    pub fn is_transient(&self) -> bool {
        match self {
            SyncError::Network(_) | SyncError::Timeout => true,
            SyncError::Remote { status, .. } => *status == 429 || *status >= 500,
            SyncError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
