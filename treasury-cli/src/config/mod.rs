//! Configuration
//!
//! Settings come from `<config dir>/treasury-cli/config.toml`, then a `.env`
//! file in the working directory, then `TREASURY_*` environment variables.
//! Later sources win.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::import::DEFAULT_IMPORT_URL;

const APP_DIR: &str = "treasury-cli";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub service: ServiceConfig,
    pub retry: RetrySettings,
    pub download: DownloadSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Origin of the local OData proxy
    pub base_url: String,
    /// REST endpoint rows are imported to
    pub import_url: String,
    /// Username offered when none is passed on the command line
    pub username: Option<String>,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            import_url: DEFAULT_IMPORT_URL.to_string(),
            username: None,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 1000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    /// `all` or a positive number
    pub default_limit: String,
    /// Workbook downloads and imports operate on
    pub workbook: PathBuf,
    /// Cash-flow fields that may be selected; empty allows any valid name
    pub cash_flow_fields: Vec<String>,
    /// Selection used when `--fields` is not given
    pub default_cash_flow_fields: Vec<String>,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            default_limit: "50".to_string(),
            workbook: PathBuf::from("treasury.xlsx"),
            cash_flow_fields: Vec::new(),
            default_cash_flow_fields: Vec::new(),
        }
    }
}

/// Password handed over through the environment, never stored in the file
pub fn env_password() -> Option<String> {
    std::env::var("TREASURY_PASSWORD").ok().filter(|p| !p.is_empty())
}

impl Config {
    /// Default location of the config file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Load from `path` (or the default location) and apply overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                log::warn!("Ignoring unreadable .env file: {}", e);
            }
        }

        let path = path.map(Path::to_path_buf).or_else(Self::default_path);
        let mut config = match path {
            Some(ref p) if p.exists() => Self::load_from(p)?,
            Some(ref p) => {
                log::debug!("No config file at {}, using defaults", p.display());
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a config file without any overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Apply `TREASURY_*` overrides looked up through `lookup`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("TREASURY_BASE_URL") {
            self.service.base_url = v;
        }
        if let Some(v) = get("TREASURY_IMPORT_URL") {
            self.service.import_url = v;
        }
        if let Some(v) = get("TREASURY_USERNAME") {
            self.service.username = Some(v);
        }
        if let Some(v) = get("TREASURY_WORKBOOK") {
            self.download.workbook = PathBuf::from(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.service.base_url, "http://localhost:3000");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.delay_ms, 1000);
        assert_eq!(config.download.default_limit, "50");
        assert!(config.download.cash_flow_fields.is_empty());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[service]
base_url = "https://proxy.internal"

[download]
cash_flow_fields = ["Id", "Amount", "TrnDate"]
"#,
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.service.base_url, "https://proxy.internal");
        assert_eq!(config.service.import_url, DEFAULT_IMPORT_URL);
        assert_eq!(config.retry, RetrySettings::default());
        assert_eq!(config.download.cash_flow_fields, vec!["Id", "Amount", "TrnDate"]);
    }

    #[test]
    fn test_bad_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "retry = 3").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TREASURY_BASE_URL", "http://10.0.0.5:8080"),
            ("TREASURY_USERNAME", "ana"),
            ("TREASURY_WORKBOOK", ""),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.service.base_url, "http://10.0.0.5:8080");
        assert_eq!(config.service.username.as_deref(), Some("ana"));
        // Blank values do not override
        assert_eq!(config.download.workbook, PathBuf::from("treasury.xlsx"));
    }
}
