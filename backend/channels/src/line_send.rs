//! Reply request bodies.

use serde::Serialize;

/// LINE rejects text messages longer than this.
pub const MAX_TEXT_CHARS: usize = 5000;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyMessageRequest {
    pub reply_token: String,
    pub messages: Vec<TextMessage>,
}

#[derive(Debug, Serialize)]
pub struct TextMessage {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: String,
}

/// Cut `text` to at most `MAX_TEXT_CHARS` characters.
pub fn truncate_text(text: &str) -> String {
    match text.char_indices().nth(MAX_TEXT_CHARS) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

pub fn text_reply(reply_token: &str, text: &str) -> ReplyMessageRequest {
    ReplyMessageRequest {
        reply_token: reply_token.to_string(),
        messages: vec![TextMessage { kind: "text", text: truncate_text(text) }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_reply_body() {
        let body = serde_json::to_value(text_reply("tok", "保存しました")).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "replyToken": "tok",
                "messages": [{ "type": "text", "text": "保存しました" }]
            })
        );
    }

    #[test]
    fn truncates_on_char_boundary() {
        let long = "あ".repeat(MAX_TEXT_CHARS + 10);
        let cut = truncate_text(&long);
        assert_eq!(cut.chars().count(), MAX_TEXT_CHARS);
        assert_eq!(truncate_text("short"), "short");
    }
}
