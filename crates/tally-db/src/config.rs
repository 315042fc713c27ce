//! # Configuration
//!
//! Settings for the document store and the sales dashboard.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TALLY_DB_PATH=/srv/tally/tally.db                                  │
//! │     TALLY_DB_MAX_CONNECTIONS=8                                         │
//! │     TALLY_TOP_ITEMS=20   TALLY_TOP_REPS=10                             │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tally-erp/tally.toml (Linux)                             │
//! │     ~/Library/Application Support/com.tally.erp/tally.toml (macOS)     │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/srv/tally/tally.db"
//! max_connections = 5
//! run_migrations = true
//!
//! [reports]
//! top_items = 15
//! top_reps = 15
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::pool::DbConfig;
use tally_core::report::ReportOptions;
use tally_core::{TOP_ITEMS_LIMIT, TOP_REPS_LIMIT};

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file could not be read or written: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file is not valid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config could not be serialized: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Created on first connect.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_db_path() -> PathBuf {
    directories::ProjectDirs::from("com", "tally", "erp")
        .map(|dirs| dirs.data_dir().join("tally.db"))
        .unwrap_or_else(|| PathBuf::from("tally.db"))
}

fn default_max_connections() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            run_migrations: true,
        }
    }
}

/// `[reports]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSettings {
    /// Rows in the top-items chart.
    #[serde(default = "default_top_items")]
    pub top_items: usize,

    /// Rows in the top-sales-reps chart.
    #[serde(default = "default_top_reps")]
    pub top_reps: usize,
}

fn default_top_items() -> usize {
    TOP_ITEMS_LIMIT
}

fn default_top_reps() -> usize {
    TOP_REPS_LIMIT
}

impl Default for ReportSettings {
    fn default() -> Self {
        ReportSettings {
            top_items: default_top_items(),
            top_reps: default_top_reps(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete Tally configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TallyConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub reports: ReportSettings,
}

impl TallyConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (tally.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_overrides_from(|key| std::env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ConfigError::Invalid("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.reports.top_items == 0 || self.reports.top_reps == 0 {
            return Err(ConfigError::Invalid(
                "reports.top_items and reports.top_reps must be greater than 0".into(),
            ));
        }

        Ok(())
    }

    /// Applies overrides read through `var`.
    ///
    /// Unparseable numbers are logged and ignored.
    fn apply_overrides_from(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(path) = var("TALLY_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Some(max) = var("TALLY_DB_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(n) => self.database.max_connections = n,
                Err(_) => warn!(value = %max, "Ignoring invalid TALLY_DB_MAX_CONNECTIONS"),
            }
        }

        if let Some(top) = var("TALLY_TOP_ITEMS") {
            match top.parse::<usize>() {
                Ok(n) => self.reports.top_items = n,
                Err(_) => warn!(value = %top, "Ignoring invalid TALLY_TOP_ITEMS"),
            }
        }

        if let Some(top) = var("TALLY_TOP_REPS") {
            match top.parse::<usize>() {
                Ok(n) => self.reports.top_reps = n,
                Err(_) => warn!(value = %top, "Ignoring invalid TALLY_TOP_REPS"),
            }
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tally", "erp")
            .map(|dirs| dirs.config_dir().join("tally.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Pool settings for [`crate::Database::new`].
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone())
            .max_connections(self.database.max_connections)
            .run_migrations(self.database.run_migrations)
    }

    /// Dashboard options with the configured chart sizes and no date filter.
    pub fn report_options(&self) -> ReportOptions {
        ReportOptions {
            top_items: self.reports.top_items,
            top_reps: self.reports.top_reps,
            ..ReportOptions::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = TallyConfig::default();
        assert_eq!(config.database.max_connections, 5);
        assert!(config.database.run_migrations);
        assert_eq!(config.reports.top_items, 15);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: TallyConfig = toml::from_str(
            r#"
            [database]
            path = "/tmp/tally-test.db"
            "#,
        )
        .unwrap();

        assert_eq!(config.database.path, PathBuf::from("/tmp/tally-test.db"));
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.reports, ReportSettings::default());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TALLY_DB_PATH", "/data/erp.db"),
            ("TALLY_TOP_ITEMS", "20"),
            ("TALLY_TOP_REPS", "many"),
        ]
        .into_iter()
        .collect();

        let mut config = TallyConfig::default();
        config.apply_overrides_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/data/erp.db"));
        assert_eq!(config.reports.top_items, 20);
        assert_eq!(config.reports.top_reps, 15);
    }

    #[test]
    fn test_validation() {
        let mut config = TallyConfig::default();
        config.database.max_connections = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = TallyConfig::default();
        config.reports.top_reps = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("tally-config-{}.toml", uuid::Uuid::new_v4()));
        let mut config = TallyConfig::default();
        config.database.path = PathBuf::from("/tmp/saved.db");
        config.reports.top_items = 7;

        config.save(Some(path.clone())).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("[database]"));
        assert!(text.contains("[reports]"));

        let loaded: TallyConfig = toml::from_str(&text).unwrap();
        assert_eq!(loaded, config);
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_derived_settings() {
        let mut config = TallyConfig::default();
        config.database.max_connections = 3;
        config.reports.top_reps = 4;

        let db = config.db_config();
        assert_eq!(db.max_connections, 3);
        assert_eq!(config.report_options().top_reps, 4);
        assert_eq!(config.report_options().top_items, 15);
    }
}
