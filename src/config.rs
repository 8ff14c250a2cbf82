// Dynafire - Configuration
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Daemon configuration stored as a local JSON file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Default configuration file location.
pub const CONFIG_PATH: &str = "/etc/dynafire/config.json";

/// Daemon settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Log verbosity: "DEBUG", "INFO" or "ERROR".
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Target policy of the dynafire zone: "ACCEPT", "REJECT" or "DROP".
    #[serde(default = "default_zone_target_policy")]
    pub zone_target_policy: String,
}

fn default_log_level() -> String { "INFO".to_string() }
fn default_zone_target_policy() -> String { "ACCEPT".to_string() }

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            zone_target_policy: default_zone_target_policy(),
        }
    }
}

impl Config {
    /// Load the configuration, writing the defaults if the file is missing.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.save(path)?;
            info!("Created new configuration file at {}", path.display());
            return Ok(config);
        }

        let content = fs::read_to_string(path)
            .context(format!("Failed to read configuration file {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .context(format!("Failed to parse configuration file {}", path.display()))?;

        Ok(config)
    }

    /// Save the configuration as 4-space indented JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create {}", parent.display()))?;
        }

        let mut content = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut serializer = serde_json::Serializer::with_formatter(&mut content, formatter);
        self.serialize(&mut serializer)
            .context("Failed to serialize configuration")?;

        fs::write(path, content)
            .context(format!("Failed to write configuration file {}", path.display()))?;
        Ok(())
    }

    /// Tracing filter directive for the configured log level.
    pub fn log_filter(&self) -> &'static str {
        match self.log_level.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => "debug",
            "INFO" => "info",
            "ERROR" => "error",
            other => {
                warn!("Unknown log level {:?}, using INFO", other);
                "info"
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dynafire").join("config.json");

        let config = Config::load_or_create(&path).unwrap();
        assert_eq!(config, Config::default());

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(
            written,
            "{\n    \"log_level\": \"INFO\",\n    \"zone_target_policy\": \"ACCEPT\"\n}"
        );
    }

    #[test]
    fn test_partial_file_takes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"zone_target_policy": "DROP"}"#).unwrap();

        let config = Config::load_or_create(&path).unwrap();
        assert_eq!(config.log_level, "INFO");
        assert_eq!(config.zone_target_policy, "DROP");
    }

    #[test]
    fn test_unparsable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "log_level = DEBUG").unwrap();

        assert!(Config::load_or_create(&path).is_err());
    }

    #[test]
    fn test_log_filter() {
        let mut config = Config::default();
        assert_eq!(config.log_filter(), "info");

        config.log_level = "debug".to_string();
        assert_eq!(config.log_filter(), "debug");

        config.log_level = "ERROR".to_string();
        assert_eq!(config.log_filter(), "error");

        config.log_level = "VERBOSE".to_string();
        assert_eq!(config.log_filter(), "info");
    }
}
