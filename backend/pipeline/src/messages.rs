//! User-facing texts for replies and the operator API.

use std::fmt::Display;

use snapsheet_core::PipelineError;

pub const REPLY_SUCCESS: &str = "画像を保存し、文字を抽出しました。\nスプレッドシートに保存しました。";
pub const REPLY_RECOGNITION_FAILED: &str = "文字の抽出に失敗しました。";

pub const API_EXTRACTION_FAILED: &str = "テキストの抽出に失敗しました。";
pub const API_FORMATTING_FAILED: &str = "テキストの整形に失敗しました。";

/// Reply sent to the LINE user when a run fails.
pub fn reply_for_error(err: &PipelineError) -> String {
    if err.is_recognition_failure() {
        REPLY_RECOGNITION_FAILED.to_string()
    } else {
        reply_for_failure(err)
    }
}

/// Reply for failures outside the pipeline, such as a content download.
pub fn reply_for_failure(err: impl Display) -> String {
    format!("エラーが発生しました: {err}")
}

/// `message` field of an operator API error body.
pub fn api_message(err: &PipelineError) -> String {
    match err {
        PipelineError::ImageNotFound(dir) => format!("{dir}ディレクトリに画像ファイルが見つかりません。"),
        PipelineError::Extraction(_) | PipelineError::EmptyExtraction => API_EXTRACTION_FAILED.to_string(),
        PipelineError::Formatting(_) | PipelineError::EmptyTable => API_FORMATTING_FAILED.to_string(),
        other => other.to_string(),
    }
}
