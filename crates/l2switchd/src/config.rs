//! Configuration file support for l2switchd
//!
//! Loads and validates the daemon configuration from a TOML file.
//! Default location: /etc/l2switchd/l2switchd.toml

use crate::error::{ControllerError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_CONFIG_PATH: &str = "/etc/l2switchd/l2switchd.toml";

/// MAC learning behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningConfig {
    /// Seconds after which an unrefreshed entry is treated as unknown.
    /// 0 disables aging (pure learning switch).
    #[serde(default)]
    pub aging_time_secs: u64,

    /// Initial capacity of a newly created per-switch table
    #[serde(default = "default_table_capacity")]
    pub table_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// tracing filter directive, e.g. "info" or "sdn_l2switchd=debug"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable logs
    #[serde(default)]
    pub json: bool,
}

/// Complete l2switchd configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct L2SwitchConfig {
    #[serde(default)]
    pub learning: LearningConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_table_capacity() -> usize {
    64
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            aging_time_secs: 0,
            table_capacity: default_table_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl LearningConfig {
    /// Aging time, or `None` when aging is disabled
    pub fn aging_time(&self) -> Option<Duration> {
        (self.aging_time_secs > 0).then(|| Duration::from_secs(self.aging_time_secs))
    }
}

impl L2SwitchConfig {
    /// Load configuration from file, falling back to defaults if file not found
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content).map_err(|e| {
                ControllerError::Config(format!(
                    "Failed to parse config file {}: {}",
                    path.display(),
                    e
                ))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                eprintln!(
                    "l2switchd: Config file {} not found, using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(e) => Err(ControllerError::Io(e)),
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ControllerError::Config(e.to_string()))
    }

    /// Save configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| {
            ControllerError::Config(format!("Failed to serialize config: {}", e))
        })?;

        fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.learning.table_capacity == 0 {
            return Err(ControllerError::Config(
                "learning.table_capacity must be > 0".to_string(),
            ));
        }

        if self.logging.level.trim().is_empty() {
            return Err(ControllerError::Config(
                "logging.level cannot be empty".to_string(),
            ));
        }

        EnvFilter::try_new(&self.logging.level).map_err(|e| {
            ControllerError::Config(format!(
                "Invalid logging.level '{}': {}",
                self.logging.level, e
            ))
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = L2SwitchConfig::default();
        assert_eq!(config.learning.aging_time_secs, 0);
        assert_eq!(config.learning.aging_time(), None);
        assert_eq!(config.learning.table_capacity, 64);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(L2SwitchConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_zero_capacity() {
        let mut config = L2SwitchConfig::default();
        config.learning.table_capacity = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_bad_log_level() {
        let mut config = L2SwitchConfig::default();
        config.logging.level = "   ".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "sdn_l2switchd=notalevel".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_aging_time_duration() {
        let config = LearningConfig {
            aging_time_secs: 300,
            ..Default::default()
        };
        assert_eq!(config.aging_time(), Some(Duration::from_secs(300)));
    }

    #[test]
    fn test_toml_deserialization() {
        let toml_str = r#"
[learning]
aging_time_secs = 120

[logging]
json = true
"#;
        let config = L2SwitchConfig::from_toml(toml_str).unwrap();
        assert_eq!(config.learning.aging_time_secs, 120);
        assert!(config.logging.json);
        // Unspecified values should use defaults
        assert_eq!(config.learning.table_capacity, 64);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_rejects_wrong_types() {
        assert!(L2SwitchConfig::from_toml("[learning]\naging_time_secs = \"soon\"").is_err());
    }

    #[test]
    fn test_load_nonexistent_file_defaults() {
        let config = L2SwitchConfig::load_or_default("/nonexistent/l2switchd.toml").unwrap();
        assert_eq!(config, L2SwitchConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("l2switchd.toml");

        let mut config = L2SwitchConfig::default();
        config.learning.aging_time_secs = 45;
        config.save(&path).unwrap();

        let loaded = L2SwitchConfig::load_or_default(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[learning\n").unwrap();

        let err = L2SwitchConfig::load_or_default(&path).unwrap_err();
        assert!(matches!(err, ControllerError::Config(_)));
    }
}
