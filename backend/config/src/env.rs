//! Environment variables as a config source.
//!
//! Two jobs: `${VAR_NAME}` substitution inside YAML string values, and
//! building a whole config from the process environment when no file is given.
//! Only uppercase `[A-Z_][A-Z0-9_]*` names are matched; `$${VAR}` escapes to a
//! literal `${VAR}`.

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;

use crate::schema::{
    GeminiConfig, LineConfig, LoggingConfig, ServerConfig, SheetsConfig, SnapsheetConfig,
    StorageConfig,
};

/// Matches `${VAR}` and, with a leading `$`, the escaped form `$${VAR}`.
static ENV_VAR_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").expect("valid env var regex"));

/// Error returned for missing env vars.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Substitute `${VAR}` references in a config JSON value tree.
///
/// Returns an error if any referenced env var is not set or is empty.
pub fn resolve_env_vars(value: &Value) -> Result<Value> {
    substitute_value(value, &std::env::vars().collect(), "")
}

/// Substitute env vars using a provided map.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(arr) => {
            let result: Result<Vec<_>> = arr
                .iter()
                .enumerate()
                .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
                .collect();
            Ok(Value::Array(result?))
        }
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (k, v) in map {
                let child_path = if path.is_empty() { k.clone() } else { format!("{path}.{k}") };
                result.insert(k.clone(), substitute_value(v, env, &child_path)?);
            }
            Ok(Value::Object(result))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut missing: Option<MissingEnvVarError> = None;
    let substituted = ENV_VAR_PATTERN.replace_all(s, |caps: &regex::Captures| {
        let var_name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{var_name}}}");
        }
        match env.get(var_name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: var_name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    if let Some(err) = missing {
        bail!(err);
    }
    Ok(substituted.into_owned())
}

// ---------------------------------------------------------------------------
// Config from the process environment
// ---------------------------------------------------------------------------

/// Build a config from the process environment.
pub fn config_from_env() -> SnapsheetConfig {
    config_from_env_with(&std::env::vars().collect())
}

/// Build a config from the given variable map. Empty values count as unset.
pub fn config_from_env_with(env: &HashMap<String, String>) -> SnapsheetConfig {
    let get = |key: &str| env.get(key).filter(|v| !v.trim().is_empty()).cloned();

    let mut unparsed = Vec::new();
    let port = parse_number(get("SNAPSHEET_PORT"), "server.port", &mut unparsed);
    let http_timeout_secs =
        parse_number(get("HTTP_TIMEOUT_SECS"), "server.httpTimeoutSecs", &mut unparsed);

    SnapsheetConfig {
        server: Some(ServerConfig {
            bind: get("SNAPSHEET_BIND"),
            port,
            api_token: get("SNAPSHEET_API_TOKEN"),
            http_timeout_secs,
            unparsed,
        }),
        line: Some(LineConfig {
            channel_secret: get("LINE_CHANNEL_SECRET"),
            channel_access_token: get("LINE_CHANNEL_ACCESS_TOKEN"),
            webhook_path: get("LINE_WEBHOOK_PATH"),
            api_base_url: None,
            data_api_base_url: None,
        }),
        gemini: Some(GeminiConfig {
            api_key: get("GOOGLE_API_KEY"),
            model: get("GEMINI_MODEL"),
            ..Default::default()
        }),
        sheets: Some(SheetsConfig {
            spreadsheet_id: get("SPREADSHEET_ID"),
            sheet_name: get("SHEET_NAME"),
            credentials_json: get("CREDENTIALS_JSON"),
            credentials_path: get("CREDENTIALS_PATH"),
            token_cache_path: get("TOKEN_CACHE_PATH"),
            base_url: None,
        }),
        storage: Some(StorageConfig { image_dir: get("IMAGE_DIR") }),
        logging: Some(LoggingConfig {
            level: get("RUST_LOG"),
            dir: get("SNAPSHEET_LOG_DIR"),
        }),
    }
}

/// Parse a numeric variable; a malformed value is recorded for validation.
fn parse_number<T: FromStr>(
    raw: Option<String>,
    path: &str,
    unparsed: &mut Vec<(String, String)>,
) -> Option<T> {
    let raw = raw?;
    match raw.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            unparsed.push((path.to_string(), raw));
            None
        }
    }
}
