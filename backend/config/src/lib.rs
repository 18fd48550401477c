//! `snapsheet-config`: runtime configuration.
//!
//! Provides:
//! - Typed config schema (server, LINE, Gemini, Sheets, storage, logging)
//! - YAML loading with `${ENV_VAR}` substitution
//! - Config assembled from plain environment variables
//! - Default value application and validation
//! - Config redaction for safe logging

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod settings;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{
    config_from_env, config_from_env_with, resolve_env_vars,
    resolve_env_vars_with, MissingEnvVarError,
};
pub use io::{load_config, parse_config};
pub use redact::{mask_secret, redact};
pub use schema::SnapsheetConfig;
pub use settings::{
    ConfigError, CredentialsSource, GeminiSettings, LineSettings, ServerSettings, Settings,
    SheetsSettings,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::Result;
use std::path::Path;

/// Read the raw config from `path` when given, otherwise from the
/// environment. Defaults are not applied yet.
pub async fn load_source(path: Option<&Path>) -> Result<SnapsheetConfig> {
    match path {
        Some(path) => load_config(path).await,
        None => Ok(config_from_env()),
    }
}
