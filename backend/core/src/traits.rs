use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;

use crate::types::{AppendReport, SheetRow};

/// A hosted generative model that accepts a prompt and an optional image.
#[async_trait]
pub trait GenerativeModel: Send + Sync {
    /// Provider name (e.g., "gemini").
    fn name(&self) -> &str;

    /// Send one generation request and return the model's text.
    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse>;
}

/// Image bytes sent inline with a generation request.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime_type: String,
    pub data: Bytes,
}

/// Request to a generative model.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub prompt: String,
    pub image: Option<InlineImage>,
}

impl GenerateRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self { prompt: prompt.into(), image: None }
    }

    pub fn with_image(prompt: impl Into<String>, image: InlineImage) -> Self {
        Self { prompt: prompt.into(), image: Some(image) }
    }
}

/// Response from a generative model.
#[derive(Debug, Clone)]
pub struct GenerateResponse {
    pub text: String,
    pub model: String,
    pub latency_ms: u64,
}

/// Destination for a formatted table.
///
/// Implementations clear the target before writing; one call is one
/// complete write cycle.
#[async_trait]
pub trait SheetSink: Send + Sync {
    async fn replace_contents(&self, header: &[String], rows: Vec<SheetRow>) -> Result<AppendReport>;
}
