use thiserror::Error;

/// Errors that can occur while capturing, playing back or persisting takes.
///
/// Nothing in the crate retries on error: hardware and storage failures are
/// surfaced so the operator can restart the take.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// No audio device matches the configured name. Fatal at construction.
    #[error("audio device not found: '{0}'")]
    DeviceNotFound(String),

    /// The device rejected the requested stream format.
    #[error("unsupported stream format: {0}")]
    UnsupportedFormat(String),

    /// Required participant fields are missing.
    #[error("participant record incomplete, missing: {}", .0.join(", "))]
    IncompleteRecord(Vec<String>),

    #[error("invalid dataset mode: '{0}'")]
    InvalidMode(String),

    /// An operation was called from a state that does not allow it.
    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("stream error: {0}")]
    StreamError(String),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),

    /// File read/write failure.
    #[error("storage error: {0}")]
    StorageError(String),
}

impl From<std::io::Error> for CaptureError {
    fn from(e: std::io::Error) -> Self {
        CaptureError::StorageError(e.to_string())
    }
}

impl From<hound::Error> for CaptureError {
    fn from(e: hound::Error) -> Self {
        match e {
            hound::Error::Unsupported => {
                CaptureError::UnsupportedFormat("wav encoding not supported".into())
            }
            other => CaptureError::StorageError(format!("wav: {}", other)),
        }
    }
}

impl From<csv::Error> for CaptureError {
    fn from(e: csv::Error) -> Self {
        CaptureError::StorageError(format!("metadata table: {}", e))
    }
}

impl From<serde_json::Error> for CaptureError {
    fn from(e: serde_json::Error) -> Self {
        CaptureError::StorageError(format!("json: {}", e))
    }
}
