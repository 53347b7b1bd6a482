//! `bdm status <id>` – show a request and its files as JSON.

use anyhow::Result;

use crate::cli::App;

pub async fn run_status(app: &App, id: i64) -> Result<()> {
    let view = app.service.get_request(id).await?;
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}
