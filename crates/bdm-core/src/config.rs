use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::retry::RetryPolicy;

/// Retry policy parameters (optional sections in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first).
    pub max_attempts: u32,
    /// Base delay in seconds for exponential backoff (e.g. 0.25 = 250ms).
    pub base_delay_secs: f64,
    /// Maximum backoff delay in seconds.
    pub max_delay_secs: u64,
}

impl RetryConfig {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay: Duration::from_secs_f64(self.base_delay_secs.max(0.0)),
            max_delay: Duration::from_secs(self.max_delay_secs),
        }
    }
}

/// Global configuration loaded once from `~/.config/bdm/config.toml` and passed down.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BdmConfig {
    /// Maximum fetches in flight per batch.
    pub concurrency_limit: usize,
    /// Client-side timeout for a single item fetch.
    pub item_timeout_secs: u64,
    /// TCP/TLS connect timeout for a single item fetch.
    pub connect_timeout_secs: u64,
    /// Batch deadline used when the caller does not give one.
    pub default_batch_timeout_secs: u64,
    /// Own deadline for sweep writes and the final status write (the batch deadline has passed by then).
    pub finalize_grace_secs: u64,
    /// How long to wait for in-flight fetches after the batch deadline before aborting them.
    pub join_grace_secs: u64,
    /// Start-to-close timeout for one whole-batch attempt.
    pub attempt_timeout_secs: u64,
    /// Database file; defaults to `~/.local/state/bdm/bdm.db`.
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    /// Per-item storage write retries; built-in defaults when missing.
    #[serde(default)]
    pub storage_retry: Option<RetryConfig>,
    /// Whole-batch retries on storage failure; built-in defaults when missing.
    #[serde(default)]
    pub batch_retry: Option<RetryConfig>,
}

impl Default for BdmConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: 3,
            item_timeout_secs: 30,
            connect_timeout_secs: 15,
            default_batch_timeout_secs: 60,
            finalize_grace_secs: 10,
            join_grace_secs: 5,
            attempt_timeout_secs: 600,
            db_path: None,
            storage_retry: None,
            batch_retry: None,
        }
    }
}

impl BdmConfig {
    pub fn item_timeout(&self) -> Duration {
        Duration::from_secs(self.item_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn default_batch_timeout(&self) -> Duration {
        Duration::from_secs(self.default_batch_timeout_secs)
    }

    pub fn finalize_grace(&self) -> Duration {
        Duration::from_secs(self.finalize_grace_secs)
    }

    pub fn join_grace(&self) -> Duration {
        Duration::from_secs(self.join_grace_secs)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    /// Storage write retries: 3 quick attempts unless configured.
    pub fn storage_retry_policy(&self) -> RetryPolicy {
        match &self.storage_retry {
            Some(r) => r.to_policy(),
            None => RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_millis(100),
                max_delay: Duration::from_secs(2),
            },
        }
    }

    /// Whole-batch retries: 1s initial, doubling, capped at 1 minute, 3 attempts.
    pub fn batch_retry_policy(&self) -> RetryPolicy {
        match &self.batch_retry {
            Some(r) => r.to_policy(),
            None => RetryPolicy {
                max_attempts: 3,
                base_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(60),
            },
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("bdm")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<BdmConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = BdmConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: BdmConfig = toml::from_str(&data)?;
    Ok(cfg)
}
