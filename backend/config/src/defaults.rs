//! Config defaults: fills unset optional values.

use crate::schema::{
    GeminiConfig, LineConfig, LoggingConfig, ServerConfig, SheetsConfig, SnapsheetConfig,
    StorageConfig,
};

pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_WEBHOOK_PATH: &str = "/callback";
pub const DEFAULT_LINE_API_BASE: &str = "https://api.line.me";
pub const DEFAULT_LINE_DATA_API_BASE: &str = "https://api-data.line.me";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_SHEET_NAME: &str = "Sheet1";
pub const DEFAULT_CREDENTIALS_PATH: &str = "credentials.json";
pub const DEFAULT_TOKEN_CACHE_PATH: &str = "token.json";
pub const DEFAULT_SHEETS_BASE: &str = "https://sheets.googleapis.com/v4";
pub const DEFAULT_IMAGE_DIR: &str = "saved_images";
pub const DEFAULT_LOG_LEVEL: &str = "info";
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: SnapsheetConfig) -> SnapsheetConfig {
    let config = apply_server_defaults(config);
    let config = apply_line_defaults(config);
    let config = apply_gemini_defaults(config);
    let config = apply_sheets_defaults(config);
    let config = apply_storage_defaults(config);
    apply_logging_defaults(config)
}

fn apply_server_defaults(mut config: SnapsheetConfig) -> SnapsheetConfig {
    let server = config.server.get_or_insert_with(ServerConfig::default);
    server.bind.get_or_insert_with(|| DEFAULT_BIND.to_string());
    server.port.get_or_insert(DEFAULT_PORT);
    server.http_timeout_secs.get_or_insert(DEFAULT_HTTP_TIMEOUT_SECS);
    config
}

fn apply_line_defaults(mut config: SnapsheetConfig) -> SnapsheetConfig {
    let line = config.line.get_or_insert_with(LineConfig::default);
    line.webhook_path.get_or_insert_with(|| DEFAULT_WEBHOOK_PATH.to_string());
    line.api_base_url.get_or_insert_with(|| DEFAULT_LINE_API_BASE.to_string());
    line.data_api_base_url
        .get_or_insert_with(|| DEFAULT_LINE_DATA_API_BASE.to_string());
    config
}

fn apply_gemini_defaults(mut config: SnapsheetConfig) -> SnapsheetConfig {
    let gemini = config.gemini.get_or_insert_with(GeminiConfig::default);
    gemini.model.get_or_insert_with(|| DEFAULT_GEMINI_MODEL.to_string());
    gemini.base_url.get_or_insert_with(|| DEFAULT_GEMINI_BASE.to_string());
    config
}

/// Inline credentials win over a credentials file; the file path is only
/// defaulted when no inline JSON is present.
fn apply_sheets_defaults(mut config: SnapsheetConfig) -> SnapsheetConfig {
    let sheets = config.sheets.get_or_insert_with(SheetsConfig::default);
    sheets.sheet_name.get_or_insert_with(|| DEFAULT_SHEET_NAME.to_string());
    if sheets.credentials_json.is_none() {
        sheets.credentials_path
            .get_or_insert_with(|| DEFAULT_CREDENTIALS_PATH.to_string());
    }
    sheets.token_cache_path
        .get_or_insert_with(|| DEFAULT_TOKEN_CACHE_PATH.to_string());
    sheets.base_url.get_or_insert_with(|| DEFAULT_SHEETS_BASE.to_string());
    config
}

fn apply_storage_defaults(mut config: SnapsheetConfig) -> SnapsheetConfig {
    let storage = config.storage.get_or_insert_with(StorageConfig::default);
    storage.image_dir.get_or_insert_with(|| DEFAULT_IMAGE_DIR.to_string());
    config
}

fn apply_logging_defaults(mut config: SnapsheetConfig) -> SnapsheetConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    logging.level.get_or_insert_with(|| DEFAULT_LOG_LEVEL.to_string());
    logging.dir.get_or_insert_with(|| DEFAULT_LOG_DIR.to_string());
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_empty_config() {
        let cfg = apply_all_defaults(SnapsheetConfig::default());
        let server = cfg.server.unwrap();
        assert_eq!(server.port, Some(DEFAULT_PORT));
        assert_eq!(cfg.line.unwrap().webhook_path.as_deref(), Some("/callback"));
        let sheets = cfg.sheets.unwrap();
        assert_eq!(sheets.sheet_name.as_deref(), Some("Sheet1"));
        assert_eq!(sheets.credentials_path.as_deref(), Some("credentials.json"));
        assert_eq!(cfg.storage.unwrap().image_dir.as_deref(), Some("saved_images"));
    }

    #[test]
    fn does_not_override_user_values() {
        let mut cfg = SnapsheetConfig::default();
        cfg.sheets = Some(SheetsConfig {
            sheet_name: Some("受信".into()),
            credentials_json: Some("{}".into()),
            ..Default::default()
        });
        let cfg = apply_all_defaults(cfg);
        let sheets = cfg.sheets.unwrap();
        assert_eq!(sheets.sheet_name.as_deref(), Some("受信"));
        assert_eq!(sheets.credentials_path, None);
    }
}
