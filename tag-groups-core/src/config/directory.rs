//! Actor group directory configuration

use std::collections::BTreeMap;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Id of the group every requester belongs to
    pub everyone_group_id: i64,
    /// Custom groups, name -> id, on top of the automatic ones
    pub groups: BTreeMap<String, i64>,
}

impl DirectoryConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env(&mut self, lookup: &dyn Fn(&str) -> Option<String>) {
        if let Some(id) = lookup("TAG_GROUPS_EVERYONE_GROUP_ID").and_then(|v| v.parse().ok()) {
            self.everyone_group_id = id;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(name) = self.groups.keys().find(|name| name.trim().is_empty()) {
            bail!("directory.groups has an empty group name: '{}'", name);
        }
        Ok(())
    }
}
