/// Gemini `generateContent` client.
///
/// Text prompts and inline base64 images go out in a single user turn; the
/// text parts of the first candidate come back joined.
use std::time::Instant;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use snapsheet_core::{GenerateRequest, GenerateResponse, GenerativeModel};
use snapsheet_logging::redact_sensitive_data;
use tracing::{debug, info};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[async_trait]
impl GenerativeModel for GeminiClient {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, request: &GenerateRequest) -> Result<GenerateResponse> {
        let start = Instant::now();

        let mut parts = vec![Part::Text { text: &request.prompt }];
        if let Some(image) = &request.image {
            parts.push(Part::InlineData {
                inline_data: InlineData {
                    mime_type: &image.mime_type,
                    data: STANDARD.encode(&image.data),
                },
            });
        }
        let body = GenerateContentRequest { contents: vec![Content { role: "user", parts }] };

        debug!(
            model = %self.model,
            image_bytes = request.image.as_ref().map(|i| i.data.len()).unwrap_or(0),
            "Sending request to Gemini"
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .context("Gemini HTTP request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            bail!("Gemini returned {}: {}", status, redact_sensitive_data(&error_body));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
            bail!("Gemini blocked the prompt: {reason}");
        }

        let text = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<Vec<_>>().join(""))
            .unwrap_or_default();

        let latency_ms = start.elapsed().as_millis() as u64;
        info!(model = %self.model, latency_ms, chars = text.chars().count(), "Gemini responded");

        Ok(GenerateResponse { text, model: self.model.clone(), latency_ms })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::HeaderMap, http::StatusCode, http::Uri};
    use bytes::Bytes;
    use serde_json::{Value, json};
    use snapsheet_core::InlineImage;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};

    async fn serve(app: Router) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        addr
    }

    #[tokio::test]
    async fn sends_inline_image_and_joins_text_parts() {
        let seen: Arc<Mutex<Option<(String, String, Value)>>> = Arc::default();
        let seen_in = seen.clone();
        let app = Router::new().fallback(move |uri: Uri, headers: HeaderMap, Json(body): Json<Value>| {
            let seen = seen_in.clone();
            async move {
                let key = headers["x-goog-api-key"].to_str().unwrap().to_string();
                *seen.lock().unwrap() = Some((uri.path().to_string(), key, body));
                Json(json!({
                    "candidates": [{ "content": { "parts": [{ "text": "品名 | 金額\n" }, { "text": "りんご | 120" }] } }]
                }))
            }
        });
        let addr = serve(app).await;

        let client = GeminiClient::new("test-key", "test-model").with_base_url(format!("http://{addr}"));
        let image = InlineImage { mime_type: "image/jpeg".into(), data: Bytes::from_static(&[1, 2, 3]) };
        let resp = client.generate(&GenerateRequest::with_image("read this", image)).await.unwrap();

        assert_eq!(resp.text, "品名 | 金額\nりんご | 120");
        let (path, key, body) = seen.lock().unwrap().take().unwrap();
        assert_eq!(path, "/models/test-model:generateContent");
        assert_eq!(key, "test-key");
        let parts = &body["contents"][0]["parts"];
        assert_eq!(parts[0]["text"], "read this");
        assert_eq!(parts[1]["inlineData"]["mimeType"], "image/jpeg");
        assert_eq!(parts[1]["inlineData"]["data"], "AQID");
    }

    #[tokio::test]
    async fn http_error_is_reported() {
        let app = Router::new().fallback(|| async { (StatusCode::FORBIDDEN, "API key not valid") });
        let addr = serve(app).await;
        let client = GeminiClient::new("bad", "m").with_base_url(format!("http://{addr}/"));
        let err = client.generate(&GenerateRequest::text("hi")).await.unwrap_err();
        assert!(err.to_string().contains("403"));
    }

    #[tokio::test]
    async fn missing_candidates_yield_empty_text() {
        let app = Router::new().fallback(|| async { Json(json!({ "candidates": [] })) });
        let addr = serve(app).await;
        let client = GeminiClient::new("k", "m").with_base_url(format!("http://{addr}"));
        let resp = client.generate(&GenerateRequest::text("hi")).await.unwrap();
        assert!(resp.text.is_empty());
    }

    #[tokio::test]
    async fn blocked_prompt_is_an_error() {
        let app = Router::new()
            .fallback(|| async { Json(json!({ "promptFeedback": { "blockReason": "SAFETY" } })) });
        let addr = serve(app).await;
        let client = GeminiClient::new("k", "m").with_base_url(format!("http://{addr}"));
        let err = client.generate(&GenerateRequest::text("hi")).await.unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }
}
