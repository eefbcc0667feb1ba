//! Storage configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the event log; `None` keeps everything in memory
    pub data_dir: Option<String>,
    /// fsync after every committed event
    pub fsync: bool,
    /// CRC32 prefix on every log line
    pub checksums: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { data_dir: None, fsync: true, checksums: true }
    }
}

impl StorageConfig {
    /// Store events under `data_dir`
    pub fn persistent(data_dir: impl Into<String>) -> Self {
        Self { data_dir: Some(data_dir.into()), ..Self::default() }
    }

    pub fn with_fsync(mut self, fsync: bool) -> Self {
        self.fsync = fsync;
        self
    }

    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        if let Some(dir) = lookup("TAG_GROUPS_DATA_DIR") {
            self.data_dir = Some(dir);
        }
        if let Some(fsync) = lookup("TAG_GROUPS_FSYNC") {
            self.fsync = fsync == "1" || fsync.eq_ignore_ascii_case("true");
        }
    }

    pub fn validate(&self) -> Result<()> {
        if matches!(self.data_dir.as_deref(), Some(dir) if dir.trim().is_empty()) {
            bail!("storage.data_dir must not be empty");
        }
        Ok(())
    }
}
