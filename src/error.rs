// src/error.rs
//! Error kinds for each pipeline stage. Only `PipelineError` aborts a run.

use std::time::Duration;

use thiserror::Error;

/// A source could not be fetched. Isolated per source.
#[derive(Debug, Error)]
pub enum SourceFetchError {
    #[error("{source_name}: fetch timed out after {after:?}")]
    Timeout { source_name: String, after: Duration },

    #[error("{source_name}: transport error: {message}")]
    Transport { source_name: String, message: String },

    #[error("{source_name}: HTTP status {status}")]
    Status { source_name: String, status: u16 },

    #[error("{source_name}: parse error: {message}")]
    Parse { source_name: String, message: String },
}

impl SourceFetchError {
    /// Network trouble, timeouts and 5xx/429 are worth one more attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            SourceFetchError::Timeout { .. } | SourceFetchError::Transport { .. } => true,
            SourceFetchError::Status { status, .. } => *status == 429 || *status >= 500,
            SourceFetchError::Parse { .. } => false,
        }
    }
}

/// The LLM oracle failed to answer.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle call timed out after {0:?}")]
    Timeout(Duration),

    #[error("oracle transport error: {0}")]
    Transport(String),

    #[error("oracle API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("oracle returned empty content")]
    EmptyContent,

    #[error("oracle disabled: {0}")]
    Disabled(String),
}

/// Scoring is fail-closed: any of these drops the posting for this run.
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("oracle failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("malformed scoring output: {0}")]
    Malformed(String),

    #[error("sub-score {field}={value} outside 0..={cap}")]
    OutOfRange {
        field: &'static str,
        value: f32,
        cap: f32,
    },
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage transport error: {0}")]
    Transport(String),

    #[error("storage API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage not configured: {0}")]
    NotConfigured(String),
}

/// Generation failed; the record status is left as is so it can be retried.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("oracle failed: {0}")]
    Oracle(#[from] OracleError),

    #[error("malformed generation output: {0}")]
    Malformed(String),

    #[error("upload failed: {0}")]
    Upload(#[from] StorageError),
}

/// A record store operation failed.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The store cannot be reached at all.
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    #[error("record store rejected {key}: {message}")]
    Rejected { key: String, message: String },

    #[error("record {0} not found")]
    NotFound(String),

    #[error("could not decode store data: {0}")]
    Decode(String),
}

impl SyncError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, SyncError::Unavailable(_))
    }
}

/// Run-fatal errors.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("aborting run, record store unreachable: {0}")]
    StoreUnavailable(SyncError),

    #[error("observed-status cache: {0}")]
    State(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        let t = SourceFetchError::Timeout {
            source_name: "x".into(),
            after: Duration::from_secs(1),
        };
        assert!(t.is_transient());
        let s503 = SourceFetchError::Status {
            source_name: "x".into(),
            status: 503,
        };
        assert!(s503.is_transient());
        let s404 = SourceFetchError::Status {
            source_name: "x".into(),
            status: 404,
        };
        assert!(!s404.is_transient());
        let p = SourceFetchError::Parse {
            source_name: "x".into(),
            message: "bad xml".into(),
        };
        assert!(!p.is_transient());
    }
}
