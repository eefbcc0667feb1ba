//! Tag group events
//!
//! Every committed change is one of these. Validation happens before an event
//! is built, so applying one never fails.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::engine::Event;
use crate::model::{CategoryId, TagGroupId, TagGroupRecord, TagId};
use crate::permissions::PermissionGrant;
use crate::state::TagGroupState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TagGroupEvent {
    /// Record upserted; `permissions` replaces all rows when present
    Saved { record: TagGroupRecord, permissions: Option<Vec<PermissionGrant>> },
    PermissionsReplaced { id: TagGroupId, permissions: Vec<PermissionGrant> },
    TagsReplaced { id: TagGroupId, tags: BTreeSet<TagId> },
    CategoriesReplaced { id: TagGroupId, categories: BTreeSet<CategoryId> },
    /// Group and every row it owns removed
    Destroyed { id: TagGroupId },
}

impl TagGroupEvent {
    pub fn tag_group_id(&self) -> TagGroupId {
        match self {
            TagGroupEvent::Saved { record, .. } => record.id,
            TagGroupEvent::PermissionsReplaced { id, .. }
            | TagGroupEvent::TagsReplaced { id, .. }
            | TagGroupEvent::CategoriesReplaced { id, .. }
            | TagGroupEvent::Destroyed { id } => *id,
        }
    }
}

impl Event for TagGroupEvent {
    type State = TagGroupState;

    fn apply(&self, state: &mut TagGroupState) {
        match self {
            TagGroupEvent::Saved { record, permissions } => {
                state.upsert_group(record.clone());
                if let Some(grants) = permissions {
                    state.replace_permissions(record.id, grants);
                }
            }
            TagGroupEvent::PermissionsReplaced { id, permissions } => {
                state.replace_permissions(*id, permissions);
            }
            TagGroupEvent::TagsReplaced { id, tags } => state.replace_tags(*id, tags),
            TagGroupEvent::CategoriesReplaced { id, categories } => {
                state.replace_categories(*id, categories);
            }
            TagGroupEvent::Destroyed { id } => state.remove_group(*id),
        }
    }

    fn event_type(&self) -> &'static str {
        match self {
            TagGroupEvent::Saved { .. } => "tag_group.saved",
            TagGroupEvent::PermissionsReplaced { .. } => "tag_group.permissions_replaced",
            TagGroupEvent::TagsReplaced { .. } => "tag_group.tags_replaced",
            TagGroupEvent::CategoriesReplaced { .. } => "tag_group.categories_replaced",
            TagGroupEvent::Destroyed { .. } => "tag_group.destroyed",
        }
    }

    fn aggregate_id(&self) -> Option<String> {
        Some(self.tag_group_id().to_string())
    }
}
