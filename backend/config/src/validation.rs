//! Config validation: reports every missing or malformed setting in one pass.

use crate::schema::SnapsheetConfig;
use thiserror::Error;

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError { path: path.into(), message: message.into() });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError { path: path.into(), message: message.into() });
    }

    fn require(&mut self, path: &str, env_var: &str, value: Option<&String>) {
        if value.map_or(true, |v| v.trim().is_empty()) {
            self.error(path, format!("required (set {env_var})"));
        }
    }
}

/// Validate a config after defaults have been applied.
pub fn validate(config: &SnapsheetConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_server(config, &mut report);
    validate_line(config, &mut report);
    validate_gemini(config, &mut report);
    validate_sheets(config, &mut report);
    report
}

fn validate_server(config: &SnapsheetConfig, report: &mut ValidationReport) {
    let Some(server) = &config.server else { return };
    for (path, raw) in &server.unparsed {
        report.error(path.as_str(), format!("not a valid number: {raw}"));
    }
    if server.http_timeout_secs == Some(0) {
        report.error("server.httpTimeoutSecs", "must be greater than zero");
    }
    if server.api_token.is_none() {
        report.warn("server.apiToken", "operator endpoints are unauthenticated");
    }
}

fn validate_line(config: &SnapsheetConfig, report: &mut ValidationReport) {
    let line = config.line.clone().unwrap_or_default();
    report.require("line.channelSecret", "LINE_CHANNEL_SECRET", line.channel_secret.as_ref());
    report.require(
        "line.channelAccessToken",
        "LINE_CHANNEL_ACCESS_TOKEN",
        line.channel_access_token.as_ref(),
    );
    if let Some(path) = &line.webhook_path {
        if !path.starts_with('/') {
            report.error("line.webhookPath", format!("must start with '/': {path}"));
        }
    }
}

fn validate_gemini(config: &SnapsheetConfig, report: &mut ValidationReport) {
    let gemini = config.gemini.clone().unwrap_or_default();
    report.require("gemini.apiKey", "GOOGLE_API_KEY", gemini.api_key.as_ref());
    if let Some(template) = &gemini.table_prompt {
        if !template.contains("{text}") {
            report.error("gemini.tablePrompt", "must contain a {text} placeholder");
        }
    }
}

fn validate_sheets(config: &SnapsheetConfig, report: &mut ValidationReport) {
    let sheets = config.sheets.clone().unwrap_or_default();
    report.require("sheets.spreadsheetId", "SPREADSHEET_ID", sheets.spreadsheet_id.as_ref());
    if let Some(name) = &sheets.sheet_name {
        if name.contains('!') {
            report.error("sheets.sheetName", "must not contain '!'");
        }
    }
    if sheets.credentials_json.is_none() && sheets.credentials_path.is_none() {
        report.error(
            "sheets.credentialsPath",
            "set CREDENTIALS_JSON or CREDENTIALS_PATH",
        );
    }
}
