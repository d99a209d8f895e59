//! Per-check audit logs.
//!
//! Every evaluation appends one JSON line to the check's active log. A
//! rotation pass periodically compresses each active log into an archive
//! named `{checkId}-{rotationTimestamp}` and truncates the active log in place.

pub mod file;
pub mod rotator;
pub mod writer;

pub use file::FileLogStore;
pub use rotator::{LogRotator, RotationReport};
pub use writer::LogWriter;

use async_trait::async_trait;
use thiserror::Error;

/// Operation a log store error happened in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStep {
    Append,
    Read,
    Compress,
    Decompress,
    Truncate,
}

impl std::fmt::Display for LogStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogStep::Append => write!(f, "append"),
            LogStep::Read => write!(f, "read"),
            LogStep::Compress => write!(f, "compress"),
            LogStep::Decompress => write!(f, "decompress"),
            LogStep::Truncate => write!(f, "truncate"),
        }
    }
}

#[derive(Debug, Error)]
pub enum LogStoreError {
    #[error("log {0} not found")]
    NotFound(String),

    #[error("archive {0} already exists")]
    ArchiveExists(String),

    #[error("invalid log id: {0}")]
    InvalidId(String),

    #[error("could not encode log record: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("archive {archive_id} is not valid base64: {source}")]
    Decode {
        archive_id: String,
        #[source]
        source: base64::DecodeError,
    },

    #[error("{step} failed for {id}: {source}")]
    Io {
        step: LogStep,
        id: String,
        #[source]
        source: std::io::Error,
    },
}

impl LogStoreError {
    /// Rotation or append step that failed, when known
    pub fn step(&self) -> Option<LogStep> {
        match self {
            LogStoreError::Io { step, .. } => Some(*step),
            LogStoreError::ArchiveExists(_) => Some(LogStep::Compress),
            LogStoreError::Decode { .. } => Some(LogStep::Decompress),
            _ => None,
        }
    }
}

#[async_trait]
pub trait LogStore: Send + Sync {
    /// Append `line` to the active log, creating it if absent
    async fn append(&self, log_id: &str, line: &str) -> Result<(), LogStoreError>;

    /// Ids of active logs, plus archive ids when `include_archived` is set
    async fn list(&self, include_archived: bool) -> Result<Vec<String>, LogStoreError>;

    /// Full contents of an active log
    async fn read(&self, log_id: &str) -> Result<Vec<u8>, LogStoreError>;

    /// Compress an active log into a new archive; never overwrites an archive
    async fn compress(&self, log_id: &str, archive_id: &str) -> Result<(), LogStoreError>;

    /// Text of an archive
    async fn decompress(&self, archive_id: &str) -> Result<String, LogStoreError>;

    /// Empty an active log, keeping the file
    async fn truncate(&self, log_id: &str) -> Result<(), LogStoreError>;

    /// Compress then truncate
    async fn rotate(&self, log_id: &str, archive_id: &str) -> Result<(), LogStoreError> {
        self.compress(log_id, archive_id).await?;
        self.truncate(log_id).await
    }
}

/// Archive id for a rotation of `log_id` at `timestamp_millis`
pub fn archive_id(log_id: &str, timestamp_millis: i64) -> String {
    format!("{log_id}-{timestamp_millis}")
}
