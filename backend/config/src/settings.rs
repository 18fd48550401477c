//! Resolved runtime settings: the validated config with no optional gaps.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::defaults::apply_all_defaults;
use crate::schema::SnapsheetConfig;
use crate::validation::{validate, ConfigValidationError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration:\n{}", format_errors(.0))]
    Invalid(Vec<ConfigValidationError>),
}

fn format_errors(errors: &[ConfigValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}: {}", e.path, e.message))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub line: LineSettings,
    pub gemini: GeminiSettings,
    pub sheets: SheetsSettings,
    pub image_dir: PathBuf,
    pub log_level: String,
    pub log_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub bind: String,
    pub port: u16,
    pub api_token: Option<String>,
    pub http_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct LineSettings {
    pub channel_secret: String,
    pub channel_access_token: String,
    pub webhook_path: String,
    pub api_base_url: String,
    pub data_api_base_url: String,
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub extract_prompt: Option<String>,
    pub table_prompt: Option<String>,
}

/// Where the Google credentials JSON comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsSource {
    Inline(String),
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct SheetsSettings {
    pub spreadsheet_id: String,
    pub sheet_name: String,
    pub credentials: CredentialsSource,
    pub token_cache_path: PathBuf,
    pub base_url: String,
}

impl Settings {
    /// Apply defaults, validate, and resolve.
    pub fn from_config(config: SnapsheetConfig) -> Result<Self, ConfigError> {
        let config = apply_all_defaults(config);
        let report = validate(&config);
        for warning in &report.warnings {
            tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
        }
        if !report.is_valid() {
            return Err(ConfigError::Invalid(report.errors));
        }

        // Defaults and validation guarantee every field below is present.
        let server = config.server.unwrap_or_default();
        let line = config.line.unwrap_or_default();
        let gemini = config.gemini.unwrap_or_default();
        let sheets = config.sheets.unwrap_or_default();
        let storage = config.storage.unwrap_or_default();
        let logging = config.logging.unwrap_or_default();

        let credentials = match (sheets.credentials_json, sheets.credentials_path) {
            (Some(json), _) => CredentialsSource::Inline(json),
            (None, path) => CredentialsSource::File(path.unwrap_or_default().into()),
        };

        Ok(Self {
            server: ServerSettings {
                bind: server.bind.unwrap_or_default(),
                port: server.port.unwrap_or_default(),
                api_token: server.api_token,
                http_timeout: Duration::from_secs(server.http_timeout_secs.unwrap_or_default()),
            },
            line: LineSettings {
                channel_secret: line.channel_secret.unwrap_or_default(),
                channel_access_token: line.channel_access_token.unwrap_or_default(),
                webhook_path: line.webhook_path.unwrap_or_default(),
                api_base_url: line.api_base_url.unwrap_or_default(),
                data_api_base_url: line.data_api_base_url.unwrap_or_default(),
            },
            gemini: GeminiSettings {
                api_key: gemini.api_key.unwrap_or_default(),
                model: gemini.model.unwrap_or_default(),
                base_url: gemini.base_url.unwrap_or_default(),
                extract_prompt: gemini.extract_prompt,
                table_prompt: gemini.table_prompt,
            },
            sheets: SheetsSettings {
                spreadsheet_id: sheets.spreadsheet_id.unwrap_or_default(),
                sheet_name: sheets.sheet_name.unwrap_or_default(),
                credentials,
                token_cache_path: sheets.token_cache_path.unwrap_or_default().into(),
                base_url: sheets.base_url.unwrap_or_default(),
            },
            image_dir: storage.image_dir.unwrap_or_default().into(),
            log_level: logging.level.unwrap_or_default(),
            log_dir: logging.dir.unwrap_or_default().into(),
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.bind, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::config_from_env_with;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn resolves_env_config_with_defaults() {
        let cfg = config_from_env_with(&env(&[
            ("LINE_CHANNEL_SECRET", "secret"),
            ("LINE_CHANNEL_ACCESS_TOKEN", "token"),
            ("GOOGLE_API_KEY", "key"),
            ("SPREADSHEET_ID", "sheet-1"),
        ]));
        let settings = Settings::from_config(cfg).unwrap();
        assert_eq!(settings.bind_address(), "0.0.0.0:5000");
        assert_eq!(settings.sheets.sheet_name, "Sheet1");
        assert_eq!(settings.sheets.credentials, CredentialsSource::File("credentials.json".into()));
        assert_eq!(settings.line.webhook_path, "/callback");
        assert_eq!(settings.server.http_timeout, Duration::from_secs(60));
    }

    #[test]
    fn inline_credentials_take_precedence() {
        let cfg = config_from_env_with(&env(&[
            ("LINE_CHANNEL_SECRET", "secret"),
            ("LINE_CHANNEL_ACCESS_TOKEN", "token"),
            ("GOOGLE_API_KEY", "key"),
            ("SPREADSHEET_ID", "sheet-1"),
            ("CREDENTIALS_JSON", "{\"installed\":{}}"),
        ]));
        let settings = Settings::from_config(cfg).unwrap();
        assert_eq!(settings.sheets.credentials, CredentialsSource::Inline("{\"installed\":{}}".into()));
    }

    #[test]
    fn missing_settings_are_fatal_and_listed() {
        let err = Settings::from_config(config_from_env_with(&env(&[("GOOGLE_API_KEY", "key")])))
            .unwrap_err()
            .to_string();
        assert!(err.contains("LINE_CHANNEL_SECRET"));
        assert!(err.contains("LINE_CHANNEL_ACCESS_TOKEN"));
        assert!(err.contains("SPREADSHEET_ID"));
        assert!(!err.contains("GOOGLE_API_KEY"));
    }

    #[test]
    fn malformed_port_and_timeout_are_fatal() {
        let cfg = config_from_env_with(&env(&[
            ("LINE_CHANNEL_SECRET", "secret"),
            ("LINE_CHANNEL_ACCESS_TOKEN", "token"),
            ("GOOGLE_API_KEY", "key"),
            ("SPREADSHEET_ID", "sheet-1"),
            ("SNAPSHEET_PORT", "80800"),
            ("HTTP_TIMEOUT_SECS", "30s"),
        ]));
        let err = Settings::from_config(cfg).unwrap_err().to_string();
        assert!(err.contains("server.port: not a valid number: 80800"));
        assert!(err.contains("server.httpTimeoutSecs: not a valid number: 30s"));
    }
}
