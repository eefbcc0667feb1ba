//! Logging configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

const LEVELS: &[&str] = &["off", "error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// env_logger filter level
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl LoggingConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        if let Some(level) = lookup("TAG_GROUPS_LOG_LEVEL") {
            self.level = level;
        }
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }

    pub fn validate(&self) -> Result<()> {
        if !LEVELS.iter().any(|level| level.eq_ignore_ascii_case(&self.level)) {
            bail!("logging.level must be one of {:?}, got '{}'", LEVELS, self.level);
        }
        Ok(())
    }
}
