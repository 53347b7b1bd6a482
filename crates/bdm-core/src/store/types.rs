//! Types used by the request/file store.

use serde::Serialize;
use std::time::Duration;

use crate::error::ErrorCode;

/// Request identifier.
pub type RequestId = i64;

/// File identifier (unique across requests).
pub type FileId = i64;

/// Aggregate request state stored as a string in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
    Processing,
    Done,
}

impl RequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RequestStatus::Processing => "PROCESSING",
            RequestStatus::Done => "DONE",
        }
    }

    /// Unknown values are treated as still processing so recovery picks them up.
    pub fn from_str(s: &str) -> Self {
        match s {
            "DONE" => RequestStatus::Done,
            _ => RequestStatus::Processing,
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request row.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub id: RequestId,
    pub status: RequestStatus,
    /// Batch deadline the caller asked for.
    pub timeout: Duration,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Resolution state of a file row, derived from which column is set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Pending,
    Downloaded { size: u64 },
    Failed(ErrorCode),
}

impl FileState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, FileState::Pending)
    }
}

/// File row as listed in a status query (payload bytes are not loaded).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub id: FileId,
    pub request_id: RequestId,
    pub url: String,
    pub state: FileState,
}

/// Full file row including payload, used when serving a file.
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub id: FileId,
    pub request_id: RequestId,
    pub url: String,
    pub data: Option<Vec<u8>>,
    pub error_code: Option<ErrorCode>,
}

/// Terminal outcome written for one file: payload XOR error code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Data(Vec<u8>),
    Failed(ErrorCode),
}

impl FileOutcome {
    pub(crate) fn columns(&self) -> (Option<&[u8]>, Option<&'static str>) {
        match self {
            FileOutcome::Data(bytes) => (Some(bytes.as_slice()), None),
            FileOutcome::Failed(code) => (None, Some(code.as_str())),
        }
    }

    /// The state a row has once this outcome is recorded.
    pub fn state(&self) -> FileState {
        match self {
            FileOutcome::Data(bytes) => FileState::Downloaded {
                size: bytes.len() as u64,
            },
            FileOutcome::Failed(code) => FileState::Failed(*code),
        }
    }
}
