//! Error taxonomy shared by the store, the orchestrator and the service layer.
//!
//! `DownloadFailed` and `Timeout` describe per-file outcomes; they are recorded
//! as [`ErrorCode`]s and never surface from a batch run. `Storage` is the only
//! error a batch run returns to its caller.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Result alias using the BDM error type.
pub type Result<T> = std::result::Result<T, BdmError>;

#[derive(Debug, Error)]
pub enum BdmError {
    /// Caller-supplied batch is empty or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Unknown request or file id.
    #[error("not found: {0}")]
    NotFound(String),

    /// Network or HTTP-level failure for one item.
    #[error("download failed: {0}")]
    DownloadFailed(String),

    /// Item did not complete before its deadline.
    #[error("timed out: {0}")]
    Timeout(String),

    /// Persistence layer unavailable or rejected a write.
    #[error("storage: {0}")]
    Storage(#[from] StorageError),
}

impl From<sqlx::Error> for BdmError {
    fn from(e: sqlx::Error) -> Self {
        BdmError::Storage(StorageError::Db(e))
    }
}

impl BdmError {
    /// Short machine-readable code, used for structured error payloads.
    pub fn code(&self) -> &'static str {
        match self {
            BdmError::InvalidInput(_) => "INVALID_INPUT",
            BdmError::NotFound(_) => "NOT_FOUND",
            BdmError::DownloadFailed(_) => ErrorCode::DownloadFailed.as_str(),
            BdmError::Timeout(_) => ErrorCode::Timeout.as_str(),
            BdmError::Storage(_) => "STORAGE_ERROR",
        }
    }
}

/// Failure inside the persistence layer.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    Db(#[from] sqlx::Error),

    /// A bounded write (e.g. the deadline sweep) did not finish in time.
    #[error("storage call timed out after {0:?}")]
    TimedOut(Duration),

    /// Store reachable but temporarily refusing work.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Row payload could not be (de)serialized.
    #[error("corrupt row: {0}")]
    Corrupt(String),

    /// An update matched no row.
    #[error("no such row: {0}")]
    MissingRow(String),
}

/// Terminal failure code persisted on a file row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    DownloadFailed,
    Timeout,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::DownloadFailed => "DOWNLOAD_FAILED",
            ErrorCode::Timeout => "TIMEOUT",
        }
    }

    /// Unknown codes read back from the database are reported as download failures.
    pub fn from_str(s: &str) -> Self {
        match s {
            "TIMEOUT" => ErrorCode::Timeout,
            _ => ErrorCode::DownloadFailed,
        }
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
