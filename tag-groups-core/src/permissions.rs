//! Permission levels and permission rows

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::{ActorGroupId, TagGroupId};

/// Degree of access a tag group restriction grants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionLevel {
    /// See and use the group's tags
    Full,
    /// Use the group's tags on new posts only
    CreatePost,
    /// See the group's tags without applying them
    Readonly,
}

/// Fixed symbolic name / code table
const PERMISSION_TYPES: &[(&str, i64, PermissionLevel)] = &[
    ("full", 1, PermissionLevel::Full),
    ("create_post", 2, PermissionLevel::CreatePost),
    ("readonly", 3, PermissionLevel::Readonly),
];

impl PermissionLevel {
    pub const FULL: PermissionLevel = PermissionLevel::Full;

    /// Look up a level by its symbolic name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        PERMISSION_TYPES
            .iter()
            .find(|(known, _, _)| known.eq_ignore_ascii_case(name))
            .map(|(_, _, level)| *level)
    }

    /// Look up a level by its stored integer code
    pub fn from_code(code: i64) -> Option<Self> {
        PERMISSION_TYPES.iter().find(|(_, known, _)| *known == code).map(|(_, _, level)| *level)
    }

    pub fn name(self) -> &'static str {
        self.entry().0
    }

    pub fn code(self) -> i64 {
        self.entry().1
    }

    fn entry(self) -> &'static (&'static str, i64, PermissionLevel) {
        // Every variant has exactly one row in the table.
        match self {
            PermissionLevel::Full => &PERMISSION_TYPES[0],
            PermissionLevel::CreatePost => &PERMISSION_TYPES[1],
            PermissionLevel::Readonly => &PERMISSION_TYPES[2],
        }
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw permission reference as supplied by a caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PermissionRef {
    Level(PermissionLevel),
    Code(i64),
    Name(String),
}

impl PermissionRef {
    /// Translate to a canonical level, `None` when unrecognized
    pub fn to_level(&self) -> Option<PermissionLevel> {
        match self {
            PermissionRef::Level(level) => Some(*level),
            PermissionRef::Code(code) => PermissionLevel::from_code(*code),
            PermissionRef::Name(name) => PermissionLevel::from_name(name),
        }
    }
}

impl fmt::Display for PermissionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PermissionRef::Level(level) => write!(f, "{}", level),
            PermissionRef::Code(code) => write!(f, "{}", code),
            PermissionRef::Name(name) => write!(f, "{}", name),
        }
    }
}

impl From<PermissionLevel> for PermissionRef {
    fn from(level: PermissionLevel) -> Self {
        PermissionRef::Level(level)
    }
}

impl From<i64> for PermissionRef {
    fn from(code: i64) -> Self {
        PermissionRef::Code(code)
    }
}

impl From<&str> for PermissionRef {
    fn from(name: &str) -> Self {
        PermissionRef::Name(name.to_string())
    }
}

/// A canonical (actor group, level) pair produced by the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub group_id: ActorGroupId,
    pub level: PermissionLevel,
}

impl PermissionGrant {
    pub fn new(group_id: ActorGroupId, level: PermissionLevel) -> Self {
        Self { group_id, level }
    }
}

/// Persisted permission row, owned by one tag group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PermissionEntry {
    pub tag_group_id: TagGroupId,
    pub group_id: ActorGroupId,
    pub level: PermissionLevel,
}

impl PermissionEntry {
    pub fn grant(&self) -> PermissionGrant {
        PermissionGrant::new(self.group_id, self.level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_table() {
        assert_eq!(PermissionLevel::from_name("full"), Some(PermissionLevel::Full));
        assert_eq!(PermissionLevel::from_name(" Readonly "), Some(PermissionLevel::Readonly));
        assert_eq!(PermissionLevel::from_name("create_post"), Some(PermissionLevel::CreatePost));
        assert_eq!(PermissionLevel::from_name("owner"), None);
    }

    #[test]
    fn test_code_table() {
        assert_eq!(PermissionLevel::from_code(1), Some(PermissionLevel::FULL));
        assert_eq!(PermissionLevel::from_code(3), Some(PermissionLevel::Readonly));
        assert_eq!(PermissionLevel::from_code(9), None);
        assert_eq!(PermissionLevel::CreatePost.code(), 2);
        assert_eq!(PermissionLevel::Readonly.name(), "readonly");
    }

    #[test]
    fn test_permission_ref_translation() {
        assert_eq!(PermissionRef::from("full").to_level(), Some(PermissionLevel::Full));
        assert_eq!(PermissionRef::from(3i64).to_level(), Some(PermissionLevel::Readonly));
        assert_eq!(PermissionRef::from(PermissionLevel::CreatePost).to_level(), Some(PermissionLevel::CreatePost));
        assert_eq!(PermissionRef::from(0i64).to_level(), None);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(serde_json::to_string(&PermissionLevel::CreatePost).unwrap(), "\"create_post\"");
        let parsed: PermissionRef = serde_json::from_str("\"readonly\"").unwrap();
        assert_eq!(parsed.to_level(), Some(PermissionLevel::Readonly));
    }
}
