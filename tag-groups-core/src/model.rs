//! Tag group entity, persisted record and identifiers

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::directory::ActorGroupRef;
use crate::permissions::{PermissionGrant, PermissionRef};
use crate::resolver::{PermissionResolver, ResolvedPermissions};
use crate::Result;

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub $inner);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(
    /// Tag group primary key, assigned by the store on first save
    TagGroupId(u64)
);
id_type!(TagId(u64));
id_type!(CategoryId(u64));
id_type!(
    /// Actor group id from the directory (signed: automatic groups start at 0)
    ActorGroupId(i64)
);

/// Resolved permissions waiting for the next save.
///
/// Never persisted and never part of a read path; the store clears it once
/// the rows it describes are committed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPermissions(ResolvedPermissions);

impl PendingPermissions {
    pub fn grants(&self) -> &[PermissionGrant] {
        self.0.grants()
    }

    pub fn is_open(&self) -> bool {
        self.0.is_open()
    }
}

/// The persisted form of a tag group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagGroupRecord {
    pub id: TagGroupId,
    pub name: String,
    pub parent_tag_id: Option<TagId>,
    pub one_per_topic: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A tag group being created or edited
#[derive(Debug, Clone)]
pub struct TagGroup {
    id: Option<TagGroupId>,
    name: String,
    parent_tag_id: Option<TagId>,
    one_per_topic: bool,
    pending: Option<PendingPermissions>,
}

impl TagGroup {
    /// A new, unsaved tag group
    pub fn new(name: impl Into<String>) -> Self {
        Self { id: None, name: name.into(), parent_tag_id: None, one_per_topic: false, pending: None }
    }

    /// Load a persisted record for editing
    pub fn from_record(record: &TagGroupRecord) -> Self {
        Self {
            id: Some(record.id),
            name: record.name.clone(),
            parent_tag_id: record.parent_tag_id,
            one_per_topic: record.one_per_topic,
            pending: None,
        }
    }

    pub fn id(&self) -> Option<TagGroupId> {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent_tag_id(&self) -> Option<TagId> {
        self.parent_tag_id
    }

    pub fn one_per_topic(&self) -> bool {
        self.one_per_topic
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Tags added to the group must be qualified by this tag; `None` clears it
    pub fn set_parent_tag(&mut self, parent_tag_id: Option<TagId>) {
        self.parent_tag_id = parent_tag_id;
    }

    pub fn set_one_per_topic(&mut self, one_per_topic: bool) {
        self.one_per_topic = one_per_topic;
    }

    /// Resolve raw permissions and stage them for the next save.
    ///
    /// Resolution errors propagate and leave any previously staged value
    /// untouched.
    pub fn set_permissions<G, P>(
        &mut self,
        resolver: &PermissionResolver,
        raw: impl IntoIterator<Item = (G, P)>,
    ) -> Result<()>
    where
        G: Into<ActorGroupRef>,
        P: Into<PermissionRef>,
    {
        let raw: Vec<(ActorGroupRef, PermissionRef)> =
            raw.into_iter().map(|(group, permission)| (group.into(), permission.into())).collect();
        let resolved = resolver.resolve(&raw)?;
        self.stage_permissions(resolved);
        Ok(())
    }

    /// Stage an already resolved permission set
    pub fn stage_permissions(&mut self, resolved: ResolvedPermissions) {
        self.pending = Some(PendingPermissions(resolved));
    }

    pub fn pending_permissions(&self) -> Option<&PendingPermissions> {
        self.pending.as_ref()
    }

    pub(crate) fn mark_saved(&mut self, id: TagGroupId, name: String) {
        self.id = Some(id);
        self.name = name;
        self.pending = None;
    }

    pub(crate) fn clear_pending(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::StaticGroupDirectory;
    use crate::permissions::PermissionLevel;
    use crate::Error;
    use std::sync::Arc;

    fn resolver() -> PermissionResolver {
        PermissionResolver::new(Arc::new(StaticGroupDirectory::new()))
    }

    #[test]
    fn test_new_group_defaults() {
        let group = TagGroup::new("Colors");
        assert_eq!(group.id(), None);
        assert_eq!(group.name(), "Colors");
        assert!(!group.one_per_topic());
        assert!(group.pending_permissions().is_none());
    }

    #[test]
    fn test_set_permissions_stages_resolved_grants() {
        let mut group = TagGroup::new("Colors");
        group.set_permissions(&resolver(), [("staff", "full")]).unwrap();

        let pending = group.pending_permissions().unwrap();
        assert_eq!(pending.grants(), &[PermissionGrant::new(ActorGroupId(3), PermissionLevel::Full)]);
    }

    #[test]
    fn test_failed_resolution_keeps_previous_pending() {
        let mut group = TagGroup::new("Colors");
        group.set_permissions(&resolver(), [("staff", "full")]).unwrap();

        let err = group.set_permissions(&resolver(), [("nobody", "full")]).unwrap_err();
        assert!(matches!(err, Error::UnknownGroup(_)));
        assert_eq!(group.pending_permissions().unwrap().grants().len(), 1);
    }

    #[test]
    fn test_from_record_has_no_pending() {
        let now = Utc::now();
        let record = TagGroupRecord {
            id: TagGroupId(4),
            name: "Sizes".into(),
            parent_tag_id: Some(TagId(9)),
            one_per_topic: true,
            created_at: now,
            updated_at: now,
        };
        let group = TagGroup::from_record(&record);
        assert_eq!(group.id(), Some(TagGroupId(4)));
        assert_eq!(group.parent_tag_id(), Some(TagId(9)));
        assert!(group.one_per_topic());
        assert!(group.pending_permissions().is_none());
    }
}
