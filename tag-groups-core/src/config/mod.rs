//! Configuration system
//!
//! Configuration values are resolved in the following order (highest priority wins):
//!
//! 1. **Code** (builder methods on the section structs)
//! 2. **Environment Variables** (`TAG_GROUPS_*`)
//! 3. **Config File** (`tag-groups.toml`)
//! 4. **Defaults**
//!
//! # Example
//!
//! ```no_run
//! use tag_groups_core::config::TagGroupsConfig;
//!
//! let config = TagGroupsConfig::load()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod directory;
pub mod logging;
pub mod storage;

pub use directory::DirectoryConfig;
pub use logging::LoggingConfig;
pub use storage::StorageConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name
pub const CONFIG_FILE: &str = "tag-groups.toml";

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagGroupsConfig {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
    pub directory: DirectoryConfig,
}

impl TagGroupsConfig {
    /// Load configuration with full supersedence chain
    pub fn load() -> Result<Self> {
        Self::load_from(CONFIG_FILE)
    }

    /// Defaults, then `path` if it exists, then environment variables
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = Self::default();

        if path.exists() {
            let file_config = Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.merge(file_config);
        }

        config.apply_env_vars();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.as_ref().display()))
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.storage.merge(other.storage);
        self.logging.merge(other.logging);
        self.directory.merge(other.directory);
    }

    /// Apply process environment variables
    pub fn apply_env_vars(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    /// Apply variables from any lookup (the process environment in production)
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        self.storage.apply_env(&lookup);
        self.logging.apply_env(&lookup);
        self.directory.apply_env(&lookup);
    }

    pub fn validate(&self) -> Result<()> {
        self.storage.validate()?;
        self.logging.validate()?;
        self.directory.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = TagGroupsConfig::default();
        assert_eq!(config.storage.data_dir, None);
        assert!(config.storage.fsync);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.directory.everyone_group_id, 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config: TagGroupsConfig = toml::from_str(
            r#"
            [storage]
            data_dir = "/var/lib/tag-groups"

            [directory.groups]
            designers = 41
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.data_dir.as_deref(), Some("/var/lib/tag-groups"));
        assert!(config.storage.checksums);
        assert_eq!(config.directory.groups.get("designers"), Some(&41));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config: TagGroupsConfig = toml::from_str("[logging]\nlevel = \"warn\"\n").unwrap();
        let env: HashMap<&str, &str> = [
            ("TAG_GROUPS_LOG_LEVEL", "debug"),
            ("TAG_GROUPS_DATA_DIR", "/tmp/tg"),
            ("TAG_GROUPS_FSYNC", "false"),
            ("TAG_GROUPS_EVERYONE_GROUP_ID", "7"),
        ]
        .into();

        config.apply_env(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.storage.data_dir.as_deref(), Some("/tmp/tg"));
        assert!(!config.storage.fsync);
        assert_eq!(config.directory.everyone_group_id, 7);
    }

    #[test]
    fn test_invalid_level_rejected() {
        let mut config = TagGroupsConfig::default();
        config.logging.level = "loud".into();
        assert!(config.validate().is_err());
    }
}
