//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.urlgather.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".urlgather.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP entry point settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Outbound HTTP client settings.
    #[serde(default)]
    pub client: ClientConfig,

    /// Aggregation limits.
    #[serde(default)]
    pub aggregation: AggregationConfig,
}

/// HTTP entry point settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on.
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

/// Outbound HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Per-request timeout in seconds (0 disables it).
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Connect timeout in seconds (0 disables it).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout(),
            connect_timeout_seconds: default_connect_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    format!("urlgather/{}", env!("CARGO_PKG_VERSION"))
}

/// Aggregation limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregationConfig {
    /// Maximum number of URLs accepted in one aggregation.
    #[serde(default = "default_max_urls")]
    pub max_urls: usize,

    /// Overall deadline in seconds; unset means wait for every request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline_seconds: Option<u64>,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            max_urls: default_max_urls(),
            deadline_seconds: None,
        }
    }
}

fn default_max_urls() -> usize {
    256
}

impl AggregationConfig {
    /// The overall deadline, if one is configured.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_seconds.map(Duration::from_secs)
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        Self::load_from_dir(Path::new("."))
    }

    /// Try to load `.urlgather.toml` from a directory.
    pub fn load_from_dir(dir: &Path) -> Result<Option<Self>> {
        let config_path = dir.join(CONFIG_FILE_NAME);

        if config_path.exists() {
            Ok(Some(Self::load(&config_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref listen) = args.listen {
            self.server.listen = listen.clone();
        }

        if let Some(timeout) = args.timeout {
            self.client.timeout_seconds = timeout;
        }

        if let Some(deadline) = args.deadline {
            self.aggregation.deadline_seconds = Some(deadline);
        }

        if let Some(max_urls) = args.max_urls {
            self.aggregation.max_urls = max_urls;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::tests::make_args;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.listen, "127.0.0.1:8080");
        assert_eq!(config.client.timeout_seconds, 30);
        assert_eq!(config.aggregation.max_urls, 256);
        assert!(config.aggregation.deadline().is_none());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[server]
listen = "0.0.0.0:9000"

[client]
timeout_seconds = 5
user_agent = "tester"

[aggregation]
max_urls = 10
deadline_seconds = 3
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.server.listen, "0.0.0.0:9000");
        assert_eq!(config.client.timeout_seconds, 5);
        assert_eq!(config.client.connect_timeout_seconds, 10);
        assert_eq!(config.client.user_agent, "tester");
        assert_eq!(config.aggregation.max_urls, 10);
        assert_eq!(config.aggregation.deadline(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_load_from_dir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(Config::load_from_dir(temp_dir.path()).unwrap().is_none());

        std::fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "[server]\nlisten = \"127.0.0.1:1234\"\n",
        )
        .unwrap();

        let config = Config::load_from_dir(temp_dir.path()).unwrap().unwrap();
        assert_eq!(config.server.listen, "127.0.0.1:1234");
        assert_eq!(config.aggregation.max_urls, 256);
    }

    #[test]
    fn test_load_invalid_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[server\nlisten = ").unwrap();

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_merge_with_args() {
        let mut config = Config::default();
        let mut args = make_args();
        args.listen = Some("0.0.0.0:7000".to_string());
        args.timeout = Some(3);
        args.deadline = Some(9);

        config.merge_with_args(&args);

        assert_eq!(config.server.listen, "0.0.0.0:7000");
        assert_eq!(config.client.timeout_seconds, 3);
        assert_eq!(config.aggregation.deadline_seconds, Some(9));
        assert_eq!(config.aggregation.max_urls, 256);
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[server]"));
        assert!(toml_str.contains("[client]"));
        assert!(toml_str.contains("[aggregation]"));

        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.client.timeout_seconds, 30);
    }
}
