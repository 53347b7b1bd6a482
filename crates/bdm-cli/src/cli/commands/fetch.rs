//! `bdm fetch <request_id> <file_id>` – emit a file's bytes, or its error payload.

use anyhow::{Context, Result};
use bdm_core::service::FileContent;
use std::io::Write;
use std::path::Path;

use crate::cli::{error_payload, App};

pub async fn run_fetch(
    app: &App,
    request_id: i64,
    file_id: i64,
    output: Option<&Path>,
) -> Result<()> {
    let content = app.service.get_file(request_id, file_id).await?;
    let data = match content {
        FileContent::Data(data) => data,
        other => {
            if let Some(err) = other.error_view() {
                let message = err.message.unwrap_or_default();
                println!("{}", error_payload(&err.code, &message));
            }
            return Ok(());
        }
    };

    match output {
        Some(path) => {
            std::fs::write(path, &data)
                .with_context(|| format!("writing {}", path.display()))?;
            tracing::info!(request_id, file_id, bytes = data.len(), path = %path.display(), "file written");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&data).context("writing to stdout")?;
            stdout.flush()?;
        }
    }
    Ok(())
}
