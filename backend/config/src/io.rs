//! Config file reading.

use crate::env::resolve_env_vars;
use crate::schema::SnapsheetConfig;
use anyhow::{Context, Result};
use serde_json::Value;
use std::path::Path;
use tokio::fs;
use tracing::info;

/// Load a YAML config file and substitute `${VAR}` references.
pub async fn load_config(path: &Path) -> Result<SnapsheetConfig> {
    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config = parse_config(&raw, resolve_env_vars)
        .with_context(|| format!("Failed to load config at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(config)
}

/// Parse YAML text, running `substitute` over the value tree before typing it.
pub fn parse_config(
    raw: &str,
    substitute: impl Fn(&Value) -> Result<Value>,
) -> Result<SnapsheetConfig> {
    let value: Value = serde_yaml::from_str(raw).context("Failed to parse config YAML")?;
    // An empty file parses as null.
    let value = if value.is_null() { Value::Object(Default::default()) } else { value };
    let value = substitute(&value)?;
    serde_json::from_value(value).context("Config does not match the expected schema")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::resolve_env_vars_with;
    use std::collections::HashMap;

    #[test]
    fn parses_with_substitution() {
        let env: HashMap<String, String> =
            [("LINE_SECRET".to_string(), "s3cr3t".to_string())].into_iter().collect();
        let cfg = parse_config(
            "line:\n  channelSecret: ${LINE_SECRET}\n",
            |v| resolve_env_vars_with(v, &env),
        )
        .unwrap();
        assert_eq!(cfg.line.unwrap().channel_secret.as_deref(), Some("s3cr3t"));
    }

    #[test]
    fn empty_file_is_default_config() {
        let cfg = parse_config("", |v| Ok(v.clone())).unwrap();
        assert_eq!(cfg, SnapsheetConfig::default());
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_config(&dir.path().join("nope.yaml")).await.unwrap_err();
        assert!(err.to_string().contains("nope.yaml"));
    }

    #[tokio::test]
    async fn loads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapsheet.yaml");
        std::fs::write(&path, "server:\n  port: 9000\nstorage:\n  imageDir: /tmp/imgs\n").unwrap();
        let cfg = load_config(&path).await.unwrap();
        assert_eq!(cfg.server.unwrap().port, Some(9000));
        assert_eq!(cfg.storage.unwrap().image_dir.as_deref(), Some("/tmp/imgs"));
    }
}
