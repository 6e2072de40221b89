//! CareCall configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CareError, Result};

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CareConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub departments: DepartmentConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

impl CareConfig {
    /// Load config from the default path (~/.carecall/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CareError::Config(format!("Failed to read config: {e}")))?;
        Self::parse(&content)
    }

    /// Parse config from TOML text.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| CareError::Config(format!("Failed to parse config: {e}")))
    }

    /// Save config to the given path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| CareError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the CareCall home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".carecall")
    }
}

/// Storage location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String { "~/.carecall/care.db".into() }

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Department codes the engine resolves at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DepartmentConfig {
    /// Customer-care department: owns `staff_id` scoping.
    #[serde(default = "default_care_code")]
    pub care_code: String,
    /// Academic department: owns `reporter_id` scoping for periodic reports.
    #[serde(default = "default_academic_code")]
    pub academic_code: String,
}

fn default_care_code() -> String { "CARE".into() }
fn default_academic_code() -> String { "ACADEMIC".into() }

impl Default for DepartmentConfig {
    fn default() -> Self {
        Self {
            care_code: default_care_code(),
            academic_code: default_academic_code(),
        }
    }
}

/// Notification hand-off configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Channels a request is emitted on: "email", "chat".
    #[serde(default = "default_channels")]
    pub channels: Vec<String>,
    #[serde(default = "default_upcoming_test_template")]
    pub upcoming_test_template: String,
    /// Ring buffer size of the in-process router history.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_channels() -> Vec<String> { vec!["email".into(), "chat".into()] }
fn default_upcoming_test_template() -> String { "UPCOMING_TEST_REMINDER".into() }
fn default_history_limit() -> usize { 100 }

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            channels: default_channels(),
            upcoming_test_template: default_upcoming_test_template(),
            history_limit: default_history_limit(),
        }
    }
}

/// Listing defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

fn default_page_size() -> u32 { 20 }
fn default_max_page_size() -> u32 { 100 }

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

/// Waiting-task reconciliation loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
}

fn default_interval_secs() -> u64 { 300 }

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config = CareConfig::parse("").unwrap();
        assert_eq!(config.query.default_page_size, 20);
        assert_eq!(config.departments.care_code, "CARE");
        assert_eq!(config.notify.channels, vec!["email", "chat"]);
    }

    #[test]
    fn test_partial_override() {
        let config = CareConfig::parse(
            r#"
            [departments]
            academic_code = "ACA"

            [query]
            default_page_size = 50
            "#,
        )
        .unwrap();
        assert_eq!(config.departments.academic_code, "ACA");
        assert_eq!(config.departments.care_code, "CARE");
        assert_eq!(config.query.default_page_size, 50);
        assert_eq!(config.query.max_page_size, 100);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = std::env::temp_dir().join("carecall-config-test");
        let path = dir.join("config.toml");
        let mut config = CareConfig::default();
        config.reconcile.interval_secs = 60;
        config.save_to(&path).unwrap();

        let loaded = CareConfig::load_from(&path).unwrap();
        assert_eq!(loaded.reconcile.interval_secs, 60);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err = CareConfig::parse("[query\n").unwrap_err();
        assert!(matches!(err, CareError::Config(_)));
    }
}
