//! Single GET via libcurl, buffered in memory.

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::config::BdmConfig;
use crate::retry::{classify_curl_error, ErrorKind};

use super::{FetchError, ItemFetcher};

/// Production fetcher: one libcurl Easy handle per item on the blocking pool.
///
/// The shared cancellation token is polled from curl's progress callback, so
/// an in-flight transfer aborts within about a second of the batch deadline.
#[derive(Debug, Clone, Copy)]
pub struct CurlFetcher {
    timeout: Duration,
    connect_timeout: Duration,
}

impl CurlFetcher {
    pub fn new(timeout: Duration, connect_timeout: Duration) -> Self {
        Self {
            timeout,
            connect_timeout: connect_timeout.min(timeout),
        }
    }

    pub fn from_config(cfg: &BdmConfig) -> Self {
        Self::new(cfg.item_timeout(), cfg.connect_timeout())
    }
}

#[async_trait]
impl ItemFetcher for CurlFetcher {
    async fn fetch(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Timeout);
        }
        let opts = *self;
        let url = url.to_string();
        let token = cancel.clone();
        tokio::task::spawn_blocking(move || opts.get(&url, &token))
            .await
            .unwrap_or_else(|e| Err(FetchError::DownloadFailed(format!("fetch task join: {e}"))))
    }
}

impl CurlFetcher {
    /// Blocking GET. Runs in the current thread; call from `spawn_blocking`.
    fn get(&self, url: &str, cancel: &CancellationToken) -> Result<Vec<u8>, FetchError> {
        let mut body: Vec<u8> = Vec::new();

        let mut easy = curl::easy::Easy::new();
        easy.url(url).map_err(transport)?;
        easy.follow_location(true).map_err(transport)?;
        easy.max_redirections(10).map_err(transport)?;
        easy.connect_timeout(self.connect_timeout).map_err(transport)?;
        easy.timeout(self.timeout).map_err(transport)?;
        easy.progress(true).map_err(transport)?;

        {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|data| {
                    body.extend_from_slice(data);
                    Ok(data.len())
                })
                .map_err(transport)?;
            // Returning false aborts the transfer.
            transfer
                .progress_function(|_, _, _, _| !cancel.is_cancelled())
                .map_err(transport)?;

            if let Err(e) = transfer.perform() {
                if cancel.is_cancelled() || e.is_aborted_by_callback() {
                    tracing::debug!(url, "fetch cancelled by batch deadline");
                    return Err(FetchError::Timeout);
                }
                return Err(match classify_curl_error(&e) {
                    ErrorKind::Timeout => FetchError::Timeout,
                    kind => {
                        tracing::debug!(url, ?kind, error = %e, "fetch transport error");
                        FetchError::DownloadFailed(e.to_string())
                    }
                });
            }
        }

        let code = easy.response_code().map_err(transport)?;
        if !(200..300).contains(&code) {
            tracing::debug!(url, code, "fetch non-success status");
            return Err(FetchError::DownloadFailed(format!("HTTP {code}")));
        }

        Ok(body)
    }
}

fn transport(e: curl::Error) -> FetchError {
    FetchError::DownloadFailed(e.to_string())
}
