//! Application configuration: API key, page size, and data directory.
//!
//! Loaded from `config.yaml` in the data directory when present, with
//! `ARTTOK_*` environment variables taking precedence.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

use crate::data_dir::AppDir;
use crate::harvard::DEFAULT_BASE_URL;

/// Default number of records per page. The catalog allows much larger pages,
/// but small pages keep the feed responsive.
pub const DEFAULT_PAGE_SIZE: u32 = 8;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no API key configured; set ARTTOK_API_KEY or api_key in config.yaml")]
    MissingApiKey,
}

/// YAML config file structure (all fields optional).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigYaml {
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub page_size: Option<u32>,
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Resolved application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub api_key: String,
    /// Records per page, clamped to the catalog's practical 1..=50 range.
    pub page_size: u32,
    pub base_url: String,
    pub app_dir: AppDir,
}

impl Config {
    /// Load configuration from the default data directory (or
    /// `ARTTOK_DATA_DIR` when set).
    pub fn load() -> Result<Self, ConfigError> {
        let app_dir = match std::env::var("ARTTOK_DATA_DIR") {
            Ok(dir) if !dir.is_empty() => AppDir::new(PathBuf::from(dir)),
            _ => AppDir::default_location(),
        };
        let file = read_config_yaml(&app_dir)?;
        Self::resolve(app_dir, file)
    }

    fn resolve(app_dir: AppDir, file: ConfigYaml) -> Result<Self, ConfigError> {
        let api_key = std::env::var("ARTTOK_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .or(file.api_key)
            .filter(|key| !key.is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let page_size = std::env::var("ARTTOK_PAGE_SIZE")
            .ok()
            .and_then(|value| value.parse().ok())
            .or(file.page_size)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, 50);

        let base_url = std::env::var("ARTTOK_BASE_URL")
            .ok()
            .filter(|url| !url.is_empty())
            .or(file.base_url)
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Config {
            api_key,
            page_size,
            base_url,
            app_dir,
        })
    }
}

fn read_config_yaml(app_dir: &AppDir) -> Result<ConfigYaml, ConfigError> {
    let path = app_dir.config_path();
    if !path.exists() {
        return Ok(ConfigYaml::default());
    }
    let raw = std::fs::read_to_string(&path)?;
    debug!("loaded config from {}", path.display());
    serde_yaml::from_str(&raw).map_err(|e| ConfigError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaml_with_missing_fields_defaults() {
        let parsed: ConfigYaml = serde_yaml::from_str("api_key: abc\n").unwrap();
        assert_eq!(parsed.api_key.as_deref(), Some("abc"));
        assert!(parsed.page_size.is_none());
        assert!(parsed.base_url.is_none());
    }

    #[test]
    fn resolve_clamps_page_size() {
        let file = ConfigYaml {
            api_key: Some("abc".to_string()),
            page_size: Some(500),
            base_url: None,
        };
        let config = Config::resolve(AppDir::new("/tmp/arttok-test"), file).unwrap();
        assert_eq!(config.page_size, 50);
    }

    #[test]
    fn resolve_without_api_key_errors() {
        let result = Config::resolve(AppDir::new("/tmp/arttok-test"), ConfigYaml::default());
        assert!(matches!(result, Err(ConfigError::MissingApiKey)));
    }
}
