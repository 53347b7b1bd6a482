pub mod config;
pub mod error;
pub mod logging;

pub mod fetcher;
pub mod orchestrator;
pub mod retry;
pub mod service;
pub mod store;
pub mod tracker;
pub mod workflow;

pub use error::{BdmError, ErrorCode, Result, StorageError};
