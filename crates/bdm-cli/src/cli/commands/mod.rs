//! CLI command handlers, one file per command.

mod fetch;
mod run;
mod status;
mod submit;

pub use fetch::run_fetch;
pub use run::run_recover;
pub use status::run_status;
pub use submit::run_submit;
