use bdm_core::{logging, BdmError};

mod cli;

use crate::cli::CliCommand;

#[tokio::main]
async fn main() {
    // Initialize logging as early as possible; stderr if the state dir is unusable.
    if let Err(err) = logging::init_logging() {
        match logging::init_logging_stderr() {
            Ok(()) => tracing::warn!("file logging unavailable: {:#}", err),
            Err(stderr_err) => eprintln!("bdm: no logging: {:#}; {:#}", err, stderr_err),
        }
    }

    if let Err(err) = CliCommand::run_from_args().await {
        match err.downcast_ref::<BdmError>() {
            Some(e) => println!("{}", cli::error_payload(e.code(), &e.to_string())),
            None => eprintln!("bdm error: {:#}", err),
        }
        std::process::exit(1);
    }
}
