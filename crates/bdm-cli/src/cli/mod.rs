//! CLI for the BDM batch download manager.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use bdm_core::config::{self, BdmConfig};
use bdm_core::fetcher::CurlFetcher;
use bdm_core::orchestrator::{BatchDownloadOrchestrator, OrchestratorSettings};
use bdm_core::service::DownloadService;
use bdm_core::store::{ResultSink, SqliteStore};
use bdm_core::workflow::BatchWorkflow;
use std::path::PathBuf;
use std::sync::Arc;

use commands::{run_fetch, run_recover, run_status, run_submit};

/// Top-level CLI for the BDM batch download manager.
#[derive(Debug, Parser)]
#[command(name = "bdm")]
#[command(about = "BDM: bounded-parallel batch downloads with per-file outcomes", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Submit a batch of URLs as one request.
    Submit {
        /// URLs to download, in order.
        urls: Vec<String>,
        /// Overall batch deadline in seconds (default from config).
        #[arg(long, value_name = "SECS")]
        timeout_secs: Option<u64>,
        /// Download the batch now instead of leaving it for `bdm run`.
        #[arg(long)]
        run: bool,
    },

    /// Show a request and the state of each of its files.
    Status {
        /// Request identifier.
        id: i64,
    },

    /// Write a downloaded file's bytes to stdout or a path.
    Fetch {
        /// Request identifier.
        request_id: i64,
        /// File identifier (from `bdm status`).
        file_id: i64,
        /// Write to this path instead of stdout.
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },

    /// Download every request still in PROCESSING.
    Run,
}

/// Collaborators shared by the commands, wired once from the config.
pub struct App {
    pub cfg: BdmConfig,
    pub service: DownloadService,
    pub workflow: BatchWorkflow,
}

impl App {
    async fn open(cfg: BdmConfig) -> Result<Self> {
        let store = SqliteStore::open(&cfg)
            .await
            .context("opening request store")?;
        let sink: Arc<dyn ResultSink> = Arc::new(store);
        let orchestrator = Arc::new(BatchDownloadOrchestrator::new(
            Arc::new(CurlFetcher::from_config(&cfg)),
            Arc::clone(&sink),
            OrchestratorSettings::from_config(&cfg),
        ));
        Ok(Self {
            service: DownloadService::new(Arc::clone(&sink), cfg.default_batch_timeout()),
            workflow: BatchWorkflow::from_config(orchestrator, sink, &cfg),
            cfg,
        })
    }
}

/// `{"error":{"code":..,"message":..}}`, the payload printed for any failure.
pub fn error_payload(code: &str, message: &str) -> serde_json::Value {
    serde_json::json!({ "error": { "code": code, "message": message } })
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init().context("loading config")?;
        tracing::debug!("loaded config: {:?}", cfg);
        let app = App::open(cfg).await?;

        match cli.command {
            CliCommand::Submit {
                urls,
                timeout_secs,
                run,
            } => run_submit(&app, &urls, timeout_secs, run).await?,
            CliCommand::Status { id } => run_status(&app, id).await?,
            CliCommand::Fetch {
                request_id,
                file_id,
                output,
            } => run_fetch(&app, request_id, file_id, output.as_deref()).await?,
            CliCommand::Run => run_recover(&app).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
