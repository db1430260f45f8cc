//! Runtime configuration.
//!
//! Resolution order: defaults, then an optional YAML file, then
//! `SIGNDESK_*` environment variables. CLI flags are applied last by the
//! caller.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SigndeskError};

/// Config file looked up in the working directory when none is given.
pub const DEFAULT_CONFIG_FILE: &str = "signdesk.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Talk to a remote REST backend instead of the in-process store.
    pub use_remote: bool,
    /// Base URL of the remote backend, including any path prefix.
    pub api_base_url: String,
    /// Artificial delay before each local-mode call.
    pub latency_ms: u64,
    /// Fallback refetch interval for watchers.
    pub poll_interval_secs: u64,
    /// Directory holding the session file.
    pub state_dir: PathBuf,
    /// Listen address for `signdesk serve`.
    pub bind: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            use_remote: false,
            api_base_url: "http://127.0.0.1:4000/api".to_string(),
            latency_ms: 500,
            poll_interval_secs: 5,
            state_dir: PathBuf::from(".signdesk"),
            bind: "127.0.0.1:4000".to_string(),
        }
    }
}

impl Config {
    /// Load from `path`, or from `signdesk.yaml` if present, then apply the
    /// process environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(SigndeskError::Config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text)
    }

    pub fn from_yaml(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(text)?)
    }

    /// Apply `SIGNDESK_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("SIGNDESK_USE_REMOTE") {
            self.use_remote = parse_bool("SIGNDESK_USE_REMOTE", &v)?;
        }
        if let Some(v) = lookup("SIGNDESK_API_URL") {
            self.api_base_url = v;
        }
        if let Some(v) = lookup("SIGNDESK_LATENCY_MS") {
            self.latency_ms = parse_number("SIGNDESK_LATENCY_MS", &v)?;
        }
        if let Some(v) = lookup("SIGNDESK_POLL_INTERVAL_SECS") {
            self.poll_interval_secs = parse_number("SIGNDESK_POLL_INTERVAL_SECS", &v)?;
        }
        if let Some(v) = lookup("SIGNDESK_STATE_DIR") {
            self.state_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("SIGNDESK_BIND") {
            self.bind = v;
        }
        Ok(())
    }

    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(SigndeskError::Config(format!(
            "{} must be a boolean, got '{}'",
            key, value
        ))),
    }
}

fn parse_number(key: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse()
        .map_err(|_| SigndeskError::Config(format!("{} must be a number, got '{}'", key, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.use_remote);
        assert_eq!(config.latency(), Duration::from_millis(500));
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_yaml_overrides_only_given_fields() {
        let config = Config::from_yaml("use_remote: true\nlatency_ms: 0\n").unwrap();
        assert!(config.use_remote);
        assert_eq!(config.latency_ms, 0);
        assert_eq!(config.api_base_url, Config::default().api_base_url);
    }

    #[test]
    fn test_env_overrides_file() {
        let vars: HashMap<&str, &str> = [
            ("SIGNDESK_USE_REMOTE", "yes"),
            ("SIGNDESK_API_URL", "http://backend:9000/api"),
            ("SIGNDESK_LATENCY_MS", "25"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::from_yaml("latency_ms: 900").unwrap();
        config
            .apply_env(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert!(config.use_remote);
        assert_eq!(config.api_base_url, "http://backend:9000/api");
        assert_eq!(config.latency_ms, 25);
    }

    #[test]
    fn test_invalid_env_value_is_rejected() {
        let mut config = Config::default();
        let result = config.apply_env(|key| {
            (key == "SIGNDESK_LATENCY_MS").then(|| "fast".to_string())
        });
        assert!(matches!(result, Err(SigndeskError::Config(_))));
    }

    #[test]
    fn test_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("signdesk.yaml");
        std::fs::write(&path, "bind: 0.0.0.0:8080\npoll_interval_secs: 2\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.bind, "0.0.0.0:8080");
        assert_eq!(config.poll_interval(), Duration::from_secs(2));

        assert!(Config::from_file(&tmp.path().join("missing.yaml")).is_err());
    }
}
