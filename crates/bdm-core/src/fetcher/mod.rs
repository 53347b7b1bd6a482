//! Single-item retrieval.
//!
//! An [`ItemFetcher`] performs one GET bounded by its own client-side timeout
//! and classifies the outcome. No retries happen here; a failed item is
//! recorded as failed and only a whole-batch re-run fetches it again.

mod http;

pub use http::CurlFetcher;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::error::ErrorCode;

/// Per-item fetch failure.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Shared deadline cancelled the fetch, or the client-side timeout fired.
    #[error("timed out")]
    Timeout,
    /// Transport error or non-success HTTP status.
    #[error("download failed: {0}")]
    DownloadFailed(String),
}

impl FetchError {
    /// Code persisted on the file row.
    pub fn code(&self) -> ErrorCode {
        match self {
            FetchError::Timeout => ErrorCode::Timeout,
            FetchError::DownloadFailed(_) => ErrorCode::DownloadFailed,
        }
    }
}

/// Performs one URL retrieval.
///
/// `cancel` is the batch's shared deadline scope. Implementations must return
/// promptly with [`FetchError::Timeout`] once it is cancelled.
#[async_trait]
pub trait ItemFetcher: Send + Sync {
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, FetchError>;
}
