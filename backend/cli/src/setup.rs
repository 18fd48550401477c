//! Builds runtime components from resolved `Settings`.

use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use tracing::info;

use snapsheet_channels::LineClient;
use snapsheet_config::{CredentialsSource, Settings};
use snapsheet_media::ImageStore;
use snapsheet_pipeline::Pipeline;
use snapsheet_sheets::{authorize, Credentials, GoogleAuth, SheetsClient, SpreadsheetAppender};
use snapsheet_understanding::{GeminiClient, TableFormatter, TextExtractor};

/// Shared outbound HTTP client carrying the configured request timeout.
pub fn http_client(settings: &Settings) -> Result<Client> {
    Client::builder()
        .timeout(settings.server.http_timeout)
        .build()
        .context("Failed to build HTTP client")
}

pub fn line_client(settings: &Settings, http: Client) -> LineClient {
    LineClient::new(&settings.line.channel_access_token)
        .with_base_urls(&settings.line.api_base_url, &settings.line.data_api_base_url)
        .with_http_client(http)
}

async fn load_credentials(source: &CredentialsSource) -> Result<Credentials> {
    let json = match source {
        CredentialsSource::Inline(json) => json.clone(),
        CredentialsSource::File(path) => tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Cannot read Google credentials from {}", path.display()))?,
    };
    Credentials::parse(&json)
}

/// Wire the image store, Gemini-backed recognizers and the spreadsheet sink.
pub async fn build_pipeline(settings: &Settings, http: Client) -> Result<Pipeline> {
    let store = ImageStore::new(&settings.image_dir);
    store.ensure_dir().await?;

    let gemini = Arc::new(
        GeminiClient::new(&settings.gemini.api_key, &settings.gemini.model)
            .with_base_url(&settings.gemini.base_url)
            .with_http_client(http.clone()),
    );
    let mut extractor = TextExtractor::new(gemini.clone());
    if let Some(prompt) = &settings.gemini.extract_prompt {
        extractor = extractor.with_prompt(prompt);
    }
    let mut formatter = TableFormatter::new(gemini);
    if let Some(template) = &settings.gemini.table_prompt {
        formatter = formatter.with_template(template);
    }

    let credentials = load_credentials(&settings.sheets.credentials).await?;
    let auth = Arc::new(GoogleAuth::new(credentials, &settings.sheets.token_cache_path).await?);
    authorize(&*auth).await?;
    let sheets = SheetsClient::new(auth, &settings.sheets.spreadsheet_id)
        .with_base_url(&settings.sheets.base_url)
        .with_http_client(http);
    let sink = SpreadsheetAppender::new(sheets, &settings.sheets.sheet_name);

    info!(
        model = %settings.gemini.model,
        spreadsheet = %settings.sheets.spreadsheet_id,
        sheet = %settings.sheets.sheet_name,
        images = %settings.image_dir.display(),
        "Pipeline ready"
    );
    Ok(Pipeline::new(store, extractor, formatter, Arc::new(sink)))
}
