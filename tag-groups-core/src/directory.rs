//! Actor group directory
//!
//! Tag groups only store actor group ids. Callers may name a group by id or by
//! name; the directory turns either into a canonical [`ActorGroupId`] and knows
//! which id stands for "everyone".

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::DirectoryConfig;
use crate::model::ActorGroupId;
use crate::{Error, Result};

/// Automatic groups every installation has
pub const AUTO_GROUPS: &[(&str, i64)] = &[
    ("everyone", 0),
    ("admins", 1),
    ("moderators", 2),
    ("staff", 3),
    ("trust_level_0", 10),
    ("trust_level_1", 11),
    ("trust_level_2", 12),
    ("trust_level_3", 13),
    ("trust_level_4", 14),
];

pub const EVERYONE_GROUP_ID: ActorGroupId = ActorGroupId(0);

/// Raw actor group reference as supplied by a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActorGroupRef {
    Id(i64),
    Name(String),
}

impl fmt::Display for ActorGroupRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActorGroupRef::Id(id) => write!(f, "{}", id),
            ActorGroupRef::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<i64> for ActorGroupRef {
    fn from(id: i64) -> Self {
        ActorGroupRef::Id(id)
    }
}

impl From<ActorGroupId> for ActorGroupRef {
    fn from(id: ActorGroupId) -> Self {
        ActorGroupRef::Id(id.0)
    }
}

impl From<&str> for ActorGroupRef {
    fn from(name: &str) -> Self {
        ActorGroupRef::Name(name.to_string())
    }
}

impl From<String> for ActorGroupRef {
    fn from(name: String) -> Self {
        ActorGroupRef::Name(name)
    }
}

/// Directory lookup used by the permission resolver
pub trait GroupDirectory: Send + Sync {
    /// Translate a reference into a known group id.
    ///
    /// Fails with [`Error::UnknownGroup`] when no group matches.
    fn resolve_actor_group_id(&self, group: &ActorGroupRef) -> Result<ActorGroupId>;

    /// The group every requester belongs to
    fn everyone_group_id(&self) -> ActorGroupId;
}

/// In-process directory seeded with [`AUTO_GROUPS`] and any custom groups
#[derive(Debug, Clone)]
pub struct StaticGroupDirectory {
    everyone: ActorGroupId,
    by_name: HashMap<String, ActorGroupId>,
    ids: HashSet<ActorGroupId>,
}

impl Default for StaticGroupDirectory {
    fn default() -> Self {
        let mut directory =
            Self { everyone: EVERYONE_GROUP_ID, by_name: HashMap::new(), ids: HashSet::new() };
        for (name, id) in AUTO_GROUPS {
            directory.insert(name, ActorGroupId(*id));
        }
        directory
    }
}

impl StaticGroupDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from configuration: automatic groups, configured groups and the
    /// configured everyone id
    pub fn from_config(config: &DirectoryConfig) -> Self {
        let mut directory = Self::new();
        for (name, id) in &config.groups {
            directory.insert(name, ActorGroupId(*id));
        }
        directory.with_everyone(ActorGroupId(config.everyone_group_id))
    }

    /// Register a custom group
    pub fn with_group(mut self, name: &str, id: i64) -> Self {
        self.insert(name, ActorGroupId(id));
        self
    }

    /// Override the everyone id (the group is registered if unknown)
    pub fn with_everyone(mut self, id: ActorGroupId) -> Self {
        if self.everyone != id {
            let previous = self.everyone;
            self.by_name.insert("everyone".to_string(), id);
            self.ids.insert(id);
            self.everyone = id;
            if !self.by_name.values().any(|named| *named == previous) {
                self.ids.remove(&previous);
            }
        }
        self
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn insert(&mut self, name: &str, id: ActorGroupId) {
        self.by_name.insert(name.trim().to_lowercase(), id);
        self.ids.insert(id);
    }
}

impl GroupDirectory for StaticGroupDirectory {
    fn resolve_actor_group_id(&self, group: &ActorGroupRef) -> Result<ActorGroupId> {
        let resolved = match group {
            ActorGroupRef::Id(id) => Some(ActorGroupId(*id)).filter(|id| self.ids.contains(id)),
            ActorGroupRef::Name(name) => self.by_name.get(&name.trim().to_lowercase()).copied(),
        };
        resolved.ok_or_else(|| Error::UnknownGroup(group.to_string()))
    }

    fn everyone_group_id(&self) -> ActorGroupId {
        self.everyone
    }
}
