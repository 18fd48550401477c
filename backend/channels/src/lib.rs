//! LINE Messaging API plumbing: webhook payloads, signature verification,
//! content download and replies.

pub mod line;
pub mod line_receive;
pub mod line_send;

pub use line::LineClient;
pub use line_receive::{
    parse_webhook, verify_signature, EventMessage, EventSource, WebhookEvent, WebhookPayload,
    SIGNATURE_HEADER,
};
pub use line_send::{text_reply, truncate_text, ReplyMessageRequest, MAX_TEXT_CHARS};
