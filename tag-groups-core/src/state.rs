//! In-memory tag group state
//!
//! Dependent rows are kept in ownership-indexed collections keyed by the
//! owning tag group, so cascading removal is a keyed delete per collection.
//! A key is present only while its set is non-empty.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::model::{CategoryId, TagGroupId, TagGroupRecord, TagId};
use crate::permissions::{PermissionEntry, PermissionGrant};
use crate::visibility::VisibilityIndex;

/// Lowercased key used for case-insensitive name uniqueness
pub fn name_key(name: &str) -> String {
    name.trim().to_lowercase()
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagGroupState {
    pub groups: BTreeMap<TagGroupId, TagGroupRecord>,
    /// name_key -> id
    pub names: HashMap<String, TagGroupId>,
    pub permissions: BTreeMap<TagGroupId, Vec<PermissionEntry>>,
    pub memberships: BTreeMap<TagGroupId, BTreeSet<TagId>>,
    pub category_links: BTreeMap<TagGroupId, BTreeSet<CategoryId>>,
    /// Reverse of `category_links`
    pub category_index: BTreeMap<CategoryId, BTreeSet<TagGroupId>>,
    next_id: u64,
}

impl TagGroupState {
    /// Id the next created group receives
    pub fn next_id(&self) -> TagGroupId {
        TagGroupId(self.next_id.max(1))
    }

    /// Id of a group whose name collides with `name`, ignoring `except`
    pub fn name_taken_by(&self, name: &str, except: Option<TagGroupId>) -> Option<TagGroupId> {
        self.names.get(&name_key(name)).copied().filter(|id| Some(*id) != except)
    }

    pub(crate) fn upsert_group(&mut self, record: TagGroupRecord) {
        if let Some(previous) = self.groups.get(&record.id) {
            self.names.remove(&name_key(&previous.name));
        }
        self.names.insert(name_key(&record.name), record.id);
        self.next_id = self.next_id.max(record.id.0 + 1);
        self.groups.insert(record.id, record);
    }

    /// Drop every row the group owns and create one per grant
    pub(crate) fn replace_permissions(&mut self, id: TagGroupId, grants: &[PermissionGrant]) {
        if grants.is_empty() {
            self.permissions.remove(&id);
            return;
        }
        let entries = grants
            .iter()
            .map(|grant| PermissionEntry { tag_group_id: id, group_id: grant.group_id, level: grant.level })
            .collect();
        self.permissions.insert(id, entries);
    }

    pub(crate) fn replace_tags(&mut self, id: TagGroupId, tags: &BTreeSet<TagId>) {
        if tags.is_empty() {
            self.memberships.remove(&id);
        } else {
            self.memberships.insert(id, tags.clone());
        }
    }

    pub(crate) fn replace_categories(&mut self, id: TagGroupId, categories: &BTreeSet<CategoryId>) {
        self.unlink_categories(id);
        if categories.is_empty() {
            return;
        }
        for category in categories {
            self.category_index.entry(*category).or_default().insert(id);
        }
        self.category_links.insert(id, categories.clone());
    }

    /// Remove the group and everything it owns
    pub(crate) fn remove_group(&mut self, id: TagGroupId) {
        if let Some(record) = self.groups.remove(&id) {
            self.names.remove(&name_key(&record.name));
        }
        self.permissions.remove(&id);
        self.memberships.remove(&id);
        self.unlink_categories(id);
    }

    fn unlink_categories(&mut self, id: TagGroupId) {
        let Some(previous) = self.category_links.remove(&id) else {
            return;
        };
        for category in previous {
            if let Some(groups) = self.category_index.get_mut(&category) {
                groups.remove(&id);
                if groups.is_empty() {
                    self.category_index.remove(&category);
                }
            }
        }
    }
}

impl VisibilityIndex for TagGroupState {
    fn tag_group_ids(&self) -> Vec<TagGroupId> {
        let mut ids: Vec<_> = self.groups.values().collect();
        ids.sort_by_cached_key(|record| (name_key(&record.name), record.id));
        ids.into_iter().map(|record| record.id).collect()
    }

    fn linked_to_any(&self, categories: &BTreeSet<CategoryId>) -> BTreeSet<TagGroupId> {
        categories
            .iter()
            .filter_map(|category| self.category_index.get(category))
            .flatten()
            .copied()
            .collect()
    }

    fn has_categories(&self, id: TagGroupId) -> bool {
        self.category_links.contains_key(&id)
    }

    fn has_permissions(&self, id: TagGroupId) -> bool {
        self.permissions.contains_key(&id)
    }
}
