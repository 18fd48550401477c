//! CLI Status Command
//!
//! Queries the health endpoint of a running server.

use anyhow::Result;
use serde_json::Value;

use crate::terminal_output::{note_success, note_warn};

pub async fn run(port: u16) -> Result<()> {
    let url = format!("http://localhost:{port}/api/health");
    match reqwest::Client::new().get(&url).send().await {
        Ok(resp) if resp.status().is_success() => {
            let body: Value = resp.json().await?;
            note_success(&format!("snapsheet is running on port {port}"));
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Ok(resp) => note_warn(&format!("{url} answered {}", resp.status())),
        Err(_) => note_warn(&format!("snapsheet is not running on port {port}")),
    }
    Ok(())
}
