//! LINE Messaging API client: downloads message content and sends replies.
use anyhow::{Context, Result, bail};
use bytes::Bytes;
use reqwest::Client;
use snapsheet_logging::redact_sensitive_data;
use tracing::info;

use crate::line_send::text_reply;

pub const DEFAULT_API_BASE: &str = "https://api.line.me";
pub const DEFAULT_DATA_API_BASE: &str = "https://api-data.line.me";

pub struct LineClient {
    http: Client,
    access_token: String,
    api_base: String,
    data_api_base: String,
}

impl LineClient {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            access_token: access_token.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            data_api_base: DEFAULT_DATA_API_BASE.to_string(),
        }
    }

    pub fn with_base_urls(mut self, api_base: &str, data_api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self.data_api_base = data_api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    /// Answer an event with a single text message.
    pub async fn reply_text(&self, reply_token: &str, text: &str) -> Result<()> {
        let resp = self
            .http
            .post(format!("{}/v2/bot/message/reply", self.api_base))
            .bearer_auth(&self.access_token)
            .json(&text_reply(reply_token, text))
            .send()
            .await
            .context("LINE reply request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("LINE reply returned {status}: {}", redact_sensitive_data(&body));
        }
        Ok(())
    }

    /// Download the binary content of a message (image, video, file).
    pub async fn fetch_content(&self, message_id: &str) -> Result<Bytes> {
        let resp = self
            .http
            .get(format!("{}/v2/bot/message/{}/content", self.data_api_base, message_id))
            .bearer_auth(&self.access_token)
            .send()
            .await
            .context("LINE content request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("LINE content for {message_id} returned {status}: {}", redact_sensitive_data(&body));
        }
        let data = resp.bytes().await.context("Failed to read LINE content body")?;
        info!(message_id, bytes = data.len(), "Downloaded LINE message content");
        Ok(data)
    }
}
