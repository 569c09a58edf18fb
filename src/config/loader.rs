// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::config::consts::{DEFAULT_FINISHED_RETENTION, DEFAULT_REDIS_URL, DEFAULT_STOP_TIMEOUT};
use crate::config::UnitConfig;
use crate::errors::ConfigError;

/// Runtime configuration: which pilot to use, deployer tuning, and the units
/// to deploy at startup.
///
/// # Example
/// ```yaml
/// pilot:
///   kind: memory
/// deployer:
///   stop_timeout_ms: 5000
/// deployments:
///   - id: btc-feed
///     type: price_feed
///     config:
///       symbol: BTCUSDT
///       prices: [100, 150, 250, 150]
///   - id: btc-alert
///     type: price_alert
///     config:
///       symbol: BTCUSDT
///       thresholds: [100, 200, 300]
/// ```
#[derive(Debug, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub pilot: PilotConfig,
    #[serde(default)]
    pub deployer: DeployerSettings,
    #[serde(default)]
    pub deployments: Vec<DeploymentConfig>,
}

/// Transport selection.
#[derive(Debug, Deserialize, Default)]
pub struct PilotConfig {
    #[serde(default)]
    pub kind: PilotKind,
    /// Broker URL (redis only).
    pub url: Option<String>,
}

impl PilotConfig {
    pub fn url_or_default(&self) -> &str {
        self.url.as_deref().unwrap_or(DEFAULT_REDIS_URL)
    }
}

/// Available pilot implementations.
///
/// # Variants
/// * `Memory` - In-process routing, single process only
/// * `Redis` - Redis pub/sub broker
#[derive(Debug, Deserialize, PartialEq, Clone, Copy, Default)]
#[serde(rename_all = "snake_case")]
pub enum PilotKind {
    #[default]
    Memory,
    Redis,
}

/// Deployer tuning options. All optional.
#[derive(Debug, Deserialize, Default)]
pub struct DeployerSettings {
    /// Per-unit stop timeout in milliseconds.
    pub stop_timeout_ms: Option<u64>,
    /// How many finished deployments `lifecycle` can still report on.
    pub finished_retention: Option<usize>,
}

impl DeployerSettings {
    pub fn stop_timeout(&self) -> Duration {
        self.stop_timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_STOP_TIMEOUT)
    }

    pub fn finished_retention(&self) -> usize {
        self.finished_retention.unwrap_or(DEFAULT_FINISHED_RETENTION)
    }
}

/// One deploy request: `(id, type, config)`.
#[derive(Debug, Deserialize, Clone)]
pub struct DeploymentConfig {
    pub id: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub config: UnitConfig,
}

/// Serialization format of a config file.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
}

impl ConfigFormat {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();

        match extension.as_str() {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            _ => Err(ConfigError::UnsupportedFormat(extension)),
        }
    }
}

/// Parse a config from a string in the given format.
pub fn parse_config(content: &str, format: ConfigFormat) -> Result<RuntimeConfig, ConfigError> {
    let cfg: RuntimeConfig = match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content)?,
        ConfigFormat::Toml => toml::from_str(content)?,
    };
    Ok(cfg)
}

/// Load a config from a YAML or TOML file, chosen by extension.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RuntimeConfig, ConfigError> {
    let path = path.as_ref();
    let format = ConfigFormat::from_path(path)?;
    let content = fs::read_to_string(path)?;
    parse_config(&content, format)
}

/// Reject configs whose deployments could never all be live at once.
pub fn validate_config(cfg: &RuntimeConfig) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();
    for (position, deployment) in cfg.deployments.iter().enumerate() {
        if deployment.id.trim().is_empty() {
            return Err(ConfigError::EmptyId(position));
        }
        if !seen.insert(deployment.id.as_str()) {
            return Err(ConfigError::DuplicateDeploymentId(deployment.id.clone()));
        }
    }
    Ok(())
}

/// Load and validate a config file.
pub fn load_and_validate_config<P: AsRef<Path>>(path: P) -> Result<RuntimeConfig, ConfigError> {
    let cfg = load_config(path)?;
    validate_config(&cfg)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const YAML: &str = r#"
pilot:
  kind: redis
  url: redis://broker:6379/
deployer:
  stop_timeout_ms: 250
  finished_retention: 16
deployments:
  - id: btc-feed
    type: price_feed
    config:
      symbol: BTCUSDT
      tick_ms: 50
  - id: btc-alert
    type: price_alert
    config:
      symbol: BTCUSDT
      thresholds: [100, 200, 300]
"#;

    fn write_temp(suffix: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parse_basic_config() {
        let cfg = parse_config(YAML, ConfigFormat::Yaml).unwrap();

        assert_eq!(cfg.pilot.kind, PilotKind::Redis);
        assert_eq!(cfg.pilot.url_or_default(), "redis://broker:6379/");
        assert_eq!(cfg.deployer.stop_timeout(), Duration::from_millis(250));
        assert_eq!(cfg.deployer.finished_retention(), 16);
        assert_eq!(cfg.deployments.len(), 2);
        assert_eq!(cfg.deployments[1].type_name, "price_alert");
        assert_eq!(
            cfg.deployments[1].config.require_f64_list("thresholds").unwrap(),
            vec![100.0, 200.0, 300.0]
        );
    }

    #[test]
    fn test_defaults() {
        let cfg = parse_config("deployments: []", ConfigFormat::Yaml).unwrap();

        assert_eq!(cfg.pilot.kind, PilotKind::Memory);
        assert_eq!(cfg.pilot.url_or_default(), DEFAULT_REDIS_URL);
        assert_eq!(cfg.deployer.stop_timeout(), DEFAULT_STOP_TIMEOUT);
        assert_eq!(cfg.deployer.finished_retention(), DEFAULT_FINISHED_RETENTION);
        assert!(cfg.deployments.is_empty());
    }

    #[test]
    fn test_parse_toml() {
        let toml = r#"
[pilot]
kind = "memory"

[[deployments]]
id = "logger"
type = "message_logger"

[deployments.config]
subjects = ["alerts:BTCUSDT"]
"#;
        let cfg = parse_config(toml, ConfigFormat::Toml).unwrap();
        assert_eq!(cfg.deployments[0].id, "logger");
        assert_eq!(
            cfg.deployments[0].config.get_str_list("subjects").unwrap(),
            Some(vec!["alerts:BTCUSDT".to_string()])
        );
    }

    #[test]
    fn test_load_and_validate_yaml_file() {
        let file = write_temp(".yaml", YAML);
        let cfg = load_and_validate_config(file.path()).unwrap();
        assert_eq!(cfg.deployments[0].id, "btc-feed");
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let file = write_temp(".json", "{}");
        let result = load_config(file.path());
        assert!(matches!(result, Err(ConfigError::UnsupportedFormat(ext)) if ext == "json"));
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/definitely/not/here.yaml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_validate_rejects_duplicate_ids() {
        let yaml = r#"
deployments:
  - id: a
    type: price_feed
  - id: a
    type: price_alert
"#;
        let file = write_temp(".yml", yaml);
        let result = load_and_validate_config(file.path());
        assert!(matches!(result, Err(ConfigError::DuplicateDeploymentId(id)) if id == "a"));
    }

    #[test]
    fn test_validate_rejects_empty_id() {
        let cfg = parse_config(
            "deployments:\n  - id: ok\n    type: x\n  - id: '  '\n    type: y\n",
            ConfigFormat::Yaml,
        )
        .unwrap();
        assert!(matches!(validate_config(&cfg), Err(ConfigError::EmptyId(1))));
    }
}
