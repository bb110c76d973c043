//! Configuration loading and validation

use anyhow::Result;
use lanwatch_discovery::OrchestratorConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Bind address for web server
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Seconds between scan cycle starts
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,
    /// Loopback port held exclusively as the single-instance guard
    #[serde(default = "default_lock_port")]
    pub instance_lock_port: u16,
    /// Open the UI in the default browser on startup
    #[serde(default = "default_true")]
    pub open_ui: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            scan_interval_secs: default_scan_interval(),
            instance_lock_port: default_lock_port(),
            open_ui: default_true(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:5050".to_string()
}

fn default_scan_interval() -> u64 {
    300
}

fn default_lock_port() -> u16 {
    5051
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Scan this CIDR instead of auto-detecting the local subnet
    #[serde(default)]
    pub subnet: Option<String>,
    /// Probe worker count, bounding concurrently spawned ping processes
    #[serde(default = "default_workers")]
    pub workers: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            subnet: None,
            workers: default_workers(),
        }
    }
}

fn default_workers() -> usize {
    lanwatch_discovery::pool::WORKER_COUNT
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the JSON manifest file
    #[serde(default = "default_storage_path")]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> String {
    "./lanwatch.json".to_string()
}

impl Config {
    /// Convert to the orchestrator's settings
    pub fn to_orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            scan_interval: Duration::from_secs(self.daemon.scan_interval_secs),
            range_override: self.discovery.subnet.clone(),
        }
    }
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if path.exists() {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    } else {
        info!(
            path = %path.display(),
            "Configuration file not found, using defaults"
        );
        Ok(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.daemon.bind, "127.0.0.1:5050");
        assert_eq!(config.daemon.scan_interval_secs, 300);
        assert_eq!(config.daemon.instance_lock_port, 5051);
        assert!(config.daemon.open_ui);
        assert_eq!(config.discovery.subnet, None);
        assert_eq!(config.discovery.workers, 20);
        assert_eq!(config.storage.path, "./lanwatch.json");
    }

    #[test]
    fn test_partial_override() {
        let config: Config = toml::from_str(
            r#"
            [daemon]
            scan_interval_secs = 60

            [discovery]
            subnet = "10.0.0.0/24"
            "#,
        )
        .unwrap();
        assert_eq!(config.daemon.scan_interval_secs, 60);
        assert_eq!(config.daemon.bind, "127.0.0.1:5050");

        let orch = config.to_orchestrator_config();
        assert_eq!(orch.scan_interval, Duration::from_secs(60));
        assert_eq!(orch.range_override.as_deref(), Some("10.0.0.0/24"));
    }
}
