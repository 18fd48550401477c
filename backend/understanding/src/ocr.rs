//! Optical Character Recognition (OCR)
//!
//! Sends an image to a vision model and returns the text it reads.

use std::sync::Arc;

use bytes::Bytes;
use snapsheet_core::{GenerateRequest, GenerativeModel, InlineImage, PipelineError};
use tracing::{info, warn};

/// Instruction sent along with the image.
pub const EXTRACT_PROMPT: &str = "この画像から文字を抽出してください。";

pub struct TextExtractor {
    model: Arc<dyn GenerativeModel>,
    prompt: String,
}

impl TextExtractor {
    pub fn new(model: Arc<dyn GenerativeModel>) -> Self {
        Self { model, prompt: EXTRACT_PROMPT.to_string() }
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = prompt.into();
        self
    }

    /// Extract text from image bytes.
    ///
    /// A transport failure and a blank answer are both reported as errors;
    /// nothing is retried.
    pub async fn extract(&self, data: Bytes, mime_type: &str) -> Result<String, PipelineError> {
        info!(provider = self.model.name(), bytes = data.len(), "Extracting text from image");

        let request = GenerateRequest::with_image(
            self.prompt.clone(),
            InlineImage { mime_type: mime_type.to_string(), data },
        );

        let response = self.model.generate(&request).await.map_err(|e| {
            warn!(error = %e, "Text extraction failed");
            PipelineError::Extraction(format!("{e:#}"))
        })?;

        let text = response.text.trim();
        if text.is_empty() {
            warn!("Text extraction returned no text");
            return Err(PipelineError::EmptyExtraction);
        }
        Ok(text.to_string())
    }
}
