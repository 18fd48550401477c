use std::sync::Arc;

use anyhow::{bail, Context, Result};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use snapsheet_logging::redact_sensitive_data;
use tracing::debug;

use crate::auth::TokenProvider;

const DEFAULT_BASE_URL: &str = "https://sheets.googleapis.com/v4";

/// Minimal Google Sheets v4 `spreadsheets.values` client.
pub struct SheetsClient {
    http: Client,
    tokens: Arc<dyn TokenProvider>,
    base_url: String,
    spreadsheet_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValueRange<'a> {
    major_dimension: &'static str,
    values: &'a [Vec<String>],
}

#[derive(Deserialize)]
struct AppendResponse {
    updates: Option<UpdateValuesResponse>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateValuesResponse {
    updated_cells: Option<u64>,
}

impl SheetsClient {
    pub fn new(tokens: Arc<dyn TokenProvider>, spreadsheet_id: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            tokens,
            base_url: DEFAULT_BASE_URL.to_string(),
            spreadsheet_id: spreadsheet_id.into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    fn values_url(&self, range: &str, action: &str) -> String {
        format!(
            "{}/spreadsheets/{}/values/{}:{}",
            self.base_url,
            urlencoding::encode(&self.spreadsheet_id),
            urlencoding::encode(range),
            action
        )
    }

    /// Clear all values in `range`.
    pub async fn clear(&self, range: &str) -> Result<()> {
        let token = self.tokens.access_token().await?;
        let response = self
            .http
            .post(self.values_url(range, "clear"))
            .bearer_auth(token)
            .json(&serde_json::json!({}))
            .send()
            .await
            .context("Sheets clear request failed")?;
        check_status(response, "clear").await?;
        debug!(range, "Cleared range");
        Ok(())
    }

    /// Append rows after the last row of `range` as raw values.
    /// Returns the number of updated cells.
    pub async fn append(&self, range: &str, values: &[Vec<String>]) -> Result<u64> {
        let token = self.tokens.access_token().await?;
        let body = ValueRange { major_dimension: "ROWS", values };
        let response = self
            .http
            .post(self.values_url(range, "append"))
            .query(&[("valueInputOption", "RAW"), ("insertDataOption", "INSERT_ROWS")])
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .context("Sheets append request failed")?;
        let response = check_status(response, "append").await?;
        let parsed: AppendResponse = response
            .json()
            .await
            .context("Failed to parse Sheets append response")?;
        Ok(parsed.updates.and_then(|u| u.updated_cells).unwrap_or(0))
    }
}

async fn check_status(response: Response, action: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_body = response.text().await.unwrap_or_default();
    bail!("Sheets {action} returned {status}: {}", redact_sensitive_data(&error_body));
}
