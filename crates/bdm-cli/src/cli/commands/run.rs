//! `bdm run` – drive every request still in PROCESSING to DONE.

use anyhow::Result;

use crate::cli::App;

pub async fn run_recover(app: &App) -> Result<()> {
    let summary = app.workflow.recover().await?;
    if !summary.failed.is_empty() {
        tracing::warn!(failed = ?summary.failed, "some requests are still PROCESSING");
    }
    let out = serde_json::json!({
        "finished": summary.finished,
        "failed": summary.failed,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
