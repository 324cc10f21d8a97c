use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Result, anyhow};
use serde::Deserialize;
use tracing::debug;

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

pub const API_URL_ENV: &str = "RESULTS_API_URL";
pub const TIMEOUT_ENV: &str = "RESULTS_TIMEOUT";
pub const NO_COLOR_ENV: &str = "NO_COLOR";

/// Connection and output settings, layered as defaults, then the config
/// file, then the environment. Command-line flags are applied last by the
/// CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_url: String,
    pub timeout_secs: u64,
    pub no_color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            no_color: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    api_url: Option<String>,
    timeout_secs: Option<u64>,
    no_color: Option<bool>,
}

/// `~/.config/results-cli/config.toml`
pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".config").join("results-cli").join("config.toml"))
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();
        if let Some(path) = config_path() {
            config.apply_file(&path)?;
        }
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    /// Missing files are skipped; unreadable or invalid ones are errors.
    pub fn apply_file(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Ok(());
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
        let file: FileConfig = toml::from_str(&contents)
            .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
        debug!(path = %path.display(), "loaded config file");

        if let Some(api_url) = file.api_url {
            self.api_url = api_url;
        }
        if let Some(timeout_secs) = file.timeout_secs {
            self.timeout_secs = timeout_secs;
        }
        if let Some(no_color) = file.no_color {
            self.no_color = no_color;
        }
        Ok(())
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(api_url) = lookup(API_URL_ENV).filter(|v| !v.is_empty()) {
            self.api_url = api_url;
        }
        if let Some(raw) = lookup(TIMEOUT_ENV).filter(|v| !v.is_empty()) {
            self.timeout_secs = raw
                .trim()
                .parse()
                .map_err(|_| anyhow!("invalid {} value '{}': expected whole seconds", TIMEOUT_ENV, raw))?;
        }
        // Any non-empty value disables color, per no-color.org.
        if lookup(NO_COLOR_ENV).is_some_and(|v| !v.is_empty()) {
            self.no_color = true;
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.api_url, "http://localhost:8080");
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert!(!config.no_color);
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api_url = \"https://results.example.com\"\ntimeout_secs = 5\n")
            .expect("write");

        let mut config = Config::default();
        config.apply_file(&path).expect("apply");
        assert_eq!(config.api_url, "https://results.example.com");
        assert_eq!(config.timeout_secs, 5);
        assert!(!config.no_color);
    }

    #[test]
    fn missing_file_is_ignored() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = Config::default();
        config
            .apply_file(&dir.path().join("absent.toml"))
            .expect("missing file");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "timeout_secs = \"soon\"").expect("write");

        let err = Config::default().apply_file(&path).expect_err("invalid");
        assert!(err.to_string().starts_with("invalid config file"), "{}", err);
    }

    #[test]
    fn env_overrides_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "api_url = \"https://from-file\"\nno_color = false\n").expect("write");

        let mut config = Config::default();
        config.apply_file(&path).expect("apply");
        config
            .apply_env(env(&[
                ("RESULTS_API_URL", "https://from-env"),
                ("RESULTS_TIMEOUT", "12"),
                ("NO_COLOR", "1"),
            ]))
            .expect("env");
        assert_eq!(config.api_url, "https://from-env");
        assert_eq!(config.timeout_secs, 12);
        assert!(config.no_color);
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let mut config = Config::default();
        config
            .apply_env(env(&[("RESULTS_API_URL", ""), ("NO_COLOR", "")]))
            .expect("env");
        assert_eq!(config, Config::default());
    }

    #[test]
    fn bad_timeout_env_is_an_error() {
        let err = Config::default()
            .apply_env(env(&[("RESULTS_TIMEOUT", "ten")]))
            .expect_err("bad timeout");
        assert!(err.to_string().contains("RESULTS_TIMEOUT"));
    }
}
