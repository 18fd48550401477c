//! LINE Webhook Receiver
//!
//! Signature validation and deserialization of inbound webhook deliveries.

use anyhow::{Context, Result};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::debug;

/// Header carrying base64(HMAC-SHA256(channel secret, body)).
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Validates `signature` against the raw request body. The comparison is
/// constant-time; an undecodable signature never matches.
pub fn verify_signature(secret: &str, signature: &str, body: &[u8]) -> bool {
    let Ok(expected) = STANDARD.decode(signature.trim()) else {
        debug!("LINE signature is not valid base64");
        return false;
    };
    let mut mac = match Hmac::<Sha256>::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<WebhookEvent>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub message: Option<EventMessage>,
    pub source: Option<EventSource>,
    pub reply_token: Option<String>,
    pub timestamp: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventSource {
    #[serde(rename = "type")]
    pub kind: String,
    pub user_id: Option<String>,
}

impl WebhookEvent {
    /// Message id of an image message event, `None` for anything else.
    pub fn image_message_id(&self) -> Option<&str> {
        match &self.message {
            Some(m) if self.event_type == "message" && m.kind == "image" => Some(&m.id),
            _ => None,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.source.as_ref().and_then(|s| s.user_id.as_deref())
    }
}

pub fn parse_webhook(body: &[u8]) -> Result<WebhookPayload> {
    serde_json::from_slice(body).context("Malformed LINE webhook body")
}
