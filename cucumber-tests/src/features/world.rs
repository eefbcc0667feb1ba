use std::collections::HashMap;
use std::sync::Arc;

use cucumber::World;
use tag_groups_core::config::StorageConfig;
use tag_groups_core::prelude::*;
use tag_groups_core::{ActorGroupRef, PermissionRef, ResolvedPermissions};
use tempfile::TempDir;

/// Shared state of one scenario
#[derive(World)]
#[world(init = Self::new)]
pub struct TagGroupWorld {
    pub store: TagGroupStore,
    /// Entities being edited, by the name they were created with
    pub groups: HashMap<String, TagGroup>,
    pub raw_input: Vec<(ActorGroupRef, PermissionRef)>,
    pub resolved: Option<ResolvedPermissions>,
    pub requester: RequesterContext,
    pub last_error: Option<String>,
    /// Set when the scenario runs against an on-disk log
    pub data_dir: Option<TempDir>,
}

impl std::fmt::Debug for TagGroupWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TagGroupWorld")
            .field("groups", &self.groups.keys().collect::<Vec<_>>())
            .field("raw_input", &self.raw_input)
            .field("requester", &self.requester)
            .field("last_error", &self.last_error)
            .finish()
    }
}

impl TagGroupWorld {
    pub fn new() -> Self {
        Self {
            store: TagGroupStore::in_memory(Self::directory()),
            groups: HashMap::new(),
            raw_input: Vec::new(),
            resolved: None,
            requester: RequesterContext::anonymous(),
            last_error: None,
            data_dir: None,
        }
    }

    pub fn directory() -> Arc<dyn GroupDirectory> {
        Arc::new(StaticGroupDirectory::new().with_group("designers", 41))
    }

    /// Switch to a store backed by a fresh temporary directory
    pub fn use_persistent_store(&mut self) {
        let dir = TempDir::new().expect("temp dir");
        self.data_dir = Some(dir);
        self.reopen_store();
    }

    /// Drop the current store and replay it from disk
    pub fn reopen_store(&mut self) {
        let dir = self.data_dir.as_ref().expect("scenario has no persistent store");
        let config = StorageConfig::persistent(dir.path().to_string_lossy()).with_fsync(false);
        self.store = TagGroupStore::open(&config, Self::directory()).expect("open store");
    }

    /// Numbers are ids, anything else is a group name
    pub fn parse_group(cell: &str) -> ActorGroupRef {
        match cell.trim().parse::<i64>() {
            Ok(id) => ActorGroupRef::Id(id),
            Err(_) => ActorGroupRef::Name(cell.trim().to_string()),
        }
    }

    /// Numbers are permission codes, anything else is a permission name
    pub fn parse_permission(cell: &str) -> PermissionRef {
        match cell.trim().parse::<i64>() {
            Ok(code) => PermissionRef::Code(code),
            Err(_) => PermissionRef::Name(cell.trim().to_string()),
        }
    }

    /// Create and save a group, remembering the entity even when saving fails
    pub fn create_group(&mut self, name: &str, permissions: &[(&str, &str)]) {
        let mut group = TagGroup::new(name);
        if !permissions.is_empty() {
            group
                .set_permissions(self.store.resolver(), permissions.iter().copied())
                .expect("resolvable permissions");
        }
        self.last_error = self.store.save(&mut group).err().map(|e| e.to_string());
        self.groups.insert(name.to_string(), group);
    }

    pub fn group_id(&self, name: &str) -> TagGroupId {
        self.store
            .find_by_name(name)
            .expect("store readable")
            .unwrap_or_else(|| panic!("no tag group named {}", name))
            .id
    }

    /// The entity for `name`, loading it from the store if not already held
    pub fn entity(&mut self, name: &str) -> &mut TagGroup {
        if !self.groups.contains_key(name) {
            let group = self.store.edit(self.group_id(name)).expect("editable group");
            self.groups.insert(name.to_string(), group);
        }
        self.groups.get_mut(name).expect("entity just inserted")
    }

    pub fn grant(&self, group: &str, permission: &str) -> PermissionGrant {
        self.store
            .resolver()
            .resolve_one(&Self::parse_group(group), &Self::parse_permission(permission))
            .expect("resolvable grant")
    }

    pub fn grants_of(&self, name: &str) -> Vec<PermissionGrant> {
        self.store
            .permissions_of(self.group_id(name))
            .expect("store readable")
            .iter()
            .map(|entry| entry.grant())
            .collect()
    }

    pub fn visible_names(&self) -> Vec<String> {
        self.store
            .allowed(&self.requester)
            .expect("store readable")
            .into_iter()
            .map(|record| record.name)
            .collect()
    }
}

impl Default for TagGroupWorld {
    fn default() -> Self {
        Self::new()
    }
}
