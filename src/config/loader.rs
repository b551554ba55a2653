//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid environment variable {name}: {reason}")]
    Env { name: &'static str, reason: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Build the runtime configuration: file (or defaults), then environment, then validation.
pub fn load_runtime_config(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ProxyConfig::default(),
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply environment overrides using `lookup` to read variables.
///
/// | Setting | Variable | Aliases |
/// |---------|----------|---------|
/// | `upstream.app_token` | `APP_TOKEN` | `SOCRATA_APP_TOKEN`, `CMS_APP_TOKEN` |
/// | `upstream.timeout_ms` | `UPSTREAM_TIMEOUT_MS` | `CMS_UPSTREAM_TIMEOUT_MS` |
/// | `photo.gmaps_api_key` | `GMAPS_API_KEY` | - |
/// | `fallback.policy` | `FALLBACK_POLICY` | - |
pub fn apply_env_overrides<F>(config: &mut ProxyConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let first = |names: &[&str]| {
        names
            .iter()
            .filter_map(|name| lookup(*name))
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty())
    };

    if let Some(token) = first(&["APP_TOKEN", "SOCRATA_APP_TOKEN", "CMS_APP_TOKEN"]) {
        config.upstream.app_token = Some(token);
    }

    if let Some(raw) = first(&["UPSTREAM_TIMEOUT_MS", "CMS_UPSTREAM_TIMEOUT_MS"]) {
        config.upstream.timeout_ms = raw.parse().map_err(|e: std::num::ParseIntError| ConfigError::Env {
            name: "UPSTREAM_TIMEOUT_MS",
            reason: e.to_string(),
        })?;
    }

    if let Some(key) = first(&["GMAPS_API_KEY"]) {
        config.photo.gmaps_api_key = Some(key);
    }

    if let Some(raw) = first(&["FALLBACK_POLICY"]) {
        config.fallback.policy = raw.parse().map_err(|reason| ConfigError::Env {
            name: "FALLBACK_POLICY",
            reason,
        })?;
    }

    Ok(())
}
