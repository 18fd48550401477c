use std::sync::Arc;

use axum::{
    async_trait,
    body::Bytes,
    extract::{FromRequestParts, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap, StatusCode},
    response::Json,
    routing::{get, post},
    Router,
};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tracing::{debug, error, info, warn};

use snapsheet_channels::{parse_webhook, verify_signature, LineClient, WebhookEvent, SIGNATURE_HEADER};
use snapsheet_pipeline::{api_message, reply_for_error, reply_for_failure, Pipeline, REPLY_SUCCESS};

/// Shared application state for API handlers.
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub line: LineClient,
    pub channel_secret: String,
    /// Bearer token required by operator endpoints; `None` leaves them open.
    pub api_token: Option<String>,
}

/// Build the Axum router: the LINE webhook plus the operator API.
pub fn build_router(state: Arc<AppState>, webhook_path: &str) -> Router {
    Router::new()
        .route(webhook_path, post(line_webhook))
        .route("/api/health", get(health))
        .route("/api/process-latest", post(process_latest))
        .with_state(state)
}

/// Health check endpoint.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "snapsheet",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// LINE webhook. Rejects unsigned or mis-signed deliveries with 400, then
/// handles each event in order before acknowledging.
async fn line_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let Some(signature) = headers.get(SIGNATURE_HEADER).and_then(|v| v.to_str().ok()) else {
        warn!("LINE webhook without signature header");
        return (StatusCode::BAD_REQUEST, "Missing signature");
    };
    if !verify_signature(&state.channel_secret, signature, &body) {
        warn!("Invalid LINE signature; check the channel secret");
        return (StatusCode::BAD_REQUEST, "Invalid signature");
    }

    let payload = match parse_webhook(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "Rejected LINE webhook body");
            return (StatusCode::BAD_REQUEST, "Malformed body");
        }
    };

    for event in &payload.events {
        handle_event(&state, event).await;
    }
    (StatusCode::OK, "OK")
}

async fn handle_event(state: &AppState, event: &WebhookEvent) {
    let Some(message_id) = event.image_message_id() else {
        debug!(event_type = %event.event_type, "Ignoring non-image event");
        return;
    };
    info!(message_id, user = event.user_id().unwrap_or("-"), "Received image message");

    let reply = match state.line.fetch_content(message_id).await {
        Ok(data) => match state.pipeline.save_and_run(data).await {
            Ok(outcome) => {
                info!(image = %outcome.image, rows = outcome.report.rows_written(), "Image processed");
                REPLY_SUCCESS.to_string()
            }
            Err(e) => {
                error!(message_id, error = %e, "Image processing failed");
                reply_for_error(&e)
            }
        },
        Err(e) => {
            error!(message_id, error = %format!("{e:#}"), "Failed to download image");
            reply_for_failure(format!("{e:#}"))
        }
    };

    let Some(reply_token) = event.reply_token.as_deref() else {
        return;
    };
    if let Err(e) = state.line.reply_text(reply_token, &reply).await {
        error!(message_id, error = %format!("{e:#}"), "Failed to send LINE reply");
    }
}

/// Run the pipeline on the most recent stored image.
async fn process_latest(
    _auth: RequireApiToken,
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<Value>) {
    match state.pipeline.run_latest().await {
        Ok(outcome) => {
            info!(image = %outcome.image, rows = outcome.report.rows_written(), "Processed latest image");
            (StatusCode::OK, Json(json!({ "status": "success" })))
        }
        Err(e) => {
            error!(error = %e, "Processing latest image failed");
            let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, Json(json!({ "status": "error", "message": api_message(&e) })))
        }
    }
}

/// Bearer-token guard for operator endpoints.
pub struct RequireApiToken;

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireApiToken {
    type Rejection = (StatusCode, Json<Value>);

    async fn from_request_parts(parts: &mut Parts, state: &Arc<AppState>) -> Result<Self, Self::Rejection> {
        let Some(expected) = state.api_token.as_deref() else {
            return Ok(RequireApiToken);
        };
        let bearer = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|val| val.to_str().ok())
            .and_then(|header| header.strip_prefix("Bearer "));

        match bearer {
            Some(token) if token_matches(token, expected) => Ok(RequireApiToken),
            Some(_) => {
                warn!("Invalid API bearer token");
                Err(unauthorized("Invalid token"))
            }
            None => {
                warn!("Missing or invalid Authorization header");
                Err(unauthorized("Missing credentials"))
            }
        }
    }
}

/// Compare the presented token against the configured one without an
/// early exit on the first differing byte.
fn token_matches(given: &str, expected: &str) -> bool {
    let tag = |token: &str| {
        Hmac::<Sha256>::new_from_slice(b"snapsheet-api-token").map(|mut mac| {
            mac.update(token.as_bytes());
            mac
        })
    };
    let (Ok(given), Ok(expected)) = (tag(given), tag(expected)) else {
        return false;
    };
    given.verify_slice(&expected.finalize().into_bytes()).is_ok()
}

fn unauthorized(message: &str) -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({ "status": "error", "message": message })))
}
