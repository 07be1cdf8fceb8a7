//! Client configuration
//!
//! Values are layered: built-in defaults, then `.trellis.toml` in the
//! project root, then `.env` and process environment. Command line flags
//! are applied by the caller on top of the result.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const CONFIG_FILE: &str = ".trellis.toml";

pub const ENV_API_URL: &str = "TRELLIS_API_URL";
pub const ENV_TIMEOUT_SECS: &str = "TRELLIS_TIMEOUT_SECS";
pub const ENV_REFETCH: &str = "TRELLIS_REFETCH";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the pipeline backend
    pub api_url: String,
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Re-fetch the authoritative graph after a clean deploy
    pub refetch_after_deploy: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:7890".to_string(),
            timeout_secs: 30,
            refetch_after_deploy: true,
        }
    }
}

impl ClientConfig {
    /// Load configuration for a project rooted at `root`.
    pub fn load(root: &Path) -> Result<Self> {
        let mut config = Self::from_file(&root.join(CONFIG_FILE))?;

        let dotenv = root.join(".env");
        if dotenv.is_file() {
            dotenvy::from_path(&dotenv)
                .with_context(|| format!("Failed to read {}", dotenv.display()))?;
        }
        config.apply_env(|key| std::env::var(key).ok())?;

        debug!("Client config: {:?}", config);
        Ok(config)
    }

    /// Defaults overlaid with `path`, if it exists.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("Invalid config in {}", path.display()))
    }

    /// Override fields from environment variables resolved by `lookup`.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = lookup(ENV_API_URL) {
            self.api_url = url;
        }
        if let Some(secs) = lookup(ENV_TIMEOUT_SECS) {
            self.timeout_secs = secs
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of seconds, got {:?}", ENV_TIMEOUT_SECS, secs))?;
        }
        if let Some(flag) = lookup(ENV_REFETCH) {
            self.refetch_after_deploy = parse_flag(&flag)
                .with_context(|| format!("{} must be true or false, got {:?}", ENV_REFETCH, flag))?;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = ClientConfig::from_file(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, ClientConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "api_url = \"http://backend:9000\"\n").unwrap();

        let config = ClientConfig::from_file(&path).unwrap();
        assert_eq!(config.api_url, "http://backend:9000");
        assert_eq!(config.timeout_secs, 30);
        assert!(config.refetch_after_deploy);
    }

    #[test]
    fn test_invalid_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, "timeout_secs = \"soon\"\n").unwrap();
        assert!(ClientConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_env_overrides_file() {
        let env: HashMap<&str, &str> = [
            (ENV_API_URL, "http://env:1"),
            (ENV_TIMEOUT_SECS, " 5 "),
            (ENV_REFETCH, "off"),
        ]
        .into_iter()
        .collect();

        let mut config = ClientConfig::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.api_url, "http://env:1");
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert!(!config.refetch_after_deploy);
    }

    #[test]
    fn test_bad_env_values_rejected() {
        let mut config = ClientConfig::default();
        assert!(config
            .apply_env(|key| (key == ENV_TIMEOUT_SECS).then(|| "never".to_string()))
            .is_err());
        assert!(config
            .apply_env(|key| (key == ENV_REFETCH).then(|| "maybe".to_string()))
            .is_err());
    }
}
