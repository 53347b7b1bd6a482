//! `bdm submit <url>...` – create a request, optionally download it right away.

use anyhow::Result;
use std::time::Duration;

use crate::cli::App;

pub async fn run_submit(
    app: &App,
    urls: &[String],
    timeout_secs: Option<u64>,
    run: bool,
) -> Result<()> {
    let timeout = timeout_secs.map(Duration::from_secs);
    let submitted = app.service.create_request(urls, timeout).await?;

    if !run {
        println!("{}", serde_json::to_string_pretty(&submitted)?);
        return Ok(());
    }

    let deadline = timeout.unwrap_or_else(|| app.cfg.default_batch_timeout());
    app.workflow
        .run_request(submitted.id, urls, deadline)
        .await?;
    let view = app.service.get_request(submitted.id).await?;
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}
