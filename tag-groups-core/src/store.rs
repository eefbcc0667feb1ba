//! Tag group store
//!
//! Owns the committed [`TagGroupState`] and the event journal. Every mutation
//! is one [`TagGroupEvent`] committed through the [`StateEngine`]: validated
//! against current state, appended to the log, then applied, all under the
//! write lock. A failure at any step leaves the state untouched.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::config::{StorageConfig, TagGroupsConfig};
use crate::directory::{GroupDirectory, StaticGroupDirectory};
use crate::engine::{
    EngineError, Event, EventEnvelope, EventJournal, EventLog, FileEventLog, MemoryEventLog,
    StateEngine,
};
use crate::events::TagGroupEvent;
use crate::model::{CategoryId, TagGroup, TagGroupId, TagGroupRecord, TagId};
use crate::permissions::PermissionEntry;
use crate::resolver::PermissionResolver;
use crate::state::TagGroupState;
use crate::visibility::{Guardian, VisibilityFilter, VisibilityIndex};
use crate::{Error, Result};

pub struct TagGroupStore {
    engine: StateEngine<TagGroupState>,
    journal: Mutex<EventJournal>,
    resolver: PermissionResolver,
}

impl TagGroupStore {
    /// Memory-only store with an empty history
    pub fn in_memory(directory: Arc<dyn GroupDirectory>) -> Self {
        Self {
            engine: StateEngine::new(TagGroupState::default()),
            journal: Mutex::new(EventJournal::new(Box::new(MemoryEventLog::new()))),
            resolver: PermissionResolver::new(directory),
        }
    }

    /// Store backed by `log`, rebuilt by replaying every stored event
    pub fn with_event_log(
        event_log: Box<dyn EventLog>,
        directory: Arc<dyn GroupDirectory>,
    ) -> Result<Self> {
        let mut journal = EventJournal::new(event_log);
        let envelopes = journal.load()?;

        let engine = StateEngine::new(TagGroupState::default());
        let replayed = engine.with_state_mut(|state| replay(state, &envelopes))??;
        if replayed > 0 {
            log::info!("Replayed {} tag group events", replayed);
        }

        Ok(Self { engine, journal: Mutex::new(journal), resolver: PermissionResolver::new(directory) })
    }

    /// File-backed store when `data_dir` is set, memory-only otherwise
    pub fn open(config: &StorageConfig, directory: Arc<dyn GroupDirectory>) -> Result<Self> {
        match &config.data_dir {
            Some(dir) => {
                let event_log = FileEventLog::open(dir)?
                    .with_fsync(config.fsync)
                    .with_checksums(config.checksums);
                log::info!("Opening tag group store at {}", event_log.path().display());
                Self::with_event_log(Box::new(event_log), directory)
            }
            None => Ok(Self::in_memory(directory)),
        }
    }

    pub fn from_config(config: &TagGroupsConfig) -> Result<Self> {
        let directory = Arc::new(StaticGroupDirectory::from_config(&config.directory));
        Self::open(&config.storage, directory)
    }

    /// Resolver bound to this store's group directory
    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    /// Create or update a tag group.
    ///
    /// Pending permissions, if any, replace the group's rows in the same
    /// commit and are cleared afterwards. On error nothing is written and the
    /// pending value stays staged.
    pub fn save(&self, group: &mut TagGroup) -> Result<TagGroupRecord> {
        let name = validate_name(group.name())?;
        let id = group.id();
        let parent_tag_id = group.parent_tag_id();
        let one_per_topic = group.one_per_topic();
        let permissions = group.pending_permissions().map(|pending| pending.grants().to_vec());
        let replaces_permissions = permissions.is_some();

        let record = self.commit(|state| {
            if state.name_taken_by(&name, id).is_some() {
                return Err(Error::DuplicateName(name.clone()));
            }
            let now = Utc::now();
            let (id, created_at) = match id {
                Some(id) => {
                    let current = state.groups.get(&id).ok_or(Error::NotFound(id))?;
                    (id, current.created_at)
                }
                None => (state.next_id(), now),
            };
            let record = TagGroupRecord {
                id,
                name: name.clone(),
                parent_tag_id,
                one_per_topic,
                created_at,
                updated_at: now,
            };
            Ok((TagGroupEvent::Saved { record: record.clone(), permissions }, record))
        })?;

        group.mark_saved(record.id, record.name.clone());
        log::info!(
            "Saved tag group {} '{}'{}",
            record.id,
            record.name,
            if replaces_permissions { " with new permissions" } else { "" }
        );
        Ok(record)
    }

    /// Commit staged permissions of an already saved group.
    ///
    /// No-op when nothing is staged, so calling it twice is harmless.
    pub fn apply_pending_permissions(&self, group: &mut TagGroup) -> Result<()> {
        let Some(pending) = group.pending_permissions() else {
            return Ok(());
        };
        let permissions = pending.grants().to_vec();
        let id = group.id().ok_or_else(|| Error::NotPersisted(group.name().to_string()))?;
        let count = permissions.len();

        self.commit(|state| {
            if !state.groups.contains_key(&id) {
                return Err(Error::NotFound(id));
            }
            Ok((TagGroupEvent::PermissionsReplaced { id, permissions }, ()))
        })?;

        group.clear_pending();
        log::info!("Replaced permissions of tag group {} ({} rows)", id, count);
        Ok(())
    }

    /// Remove a group with its permission rows, tag memberships and category links
    pub fn destroy(&self, id: TagGroupId) -> Result<TagGroupRecord> {
        let record = self.commit(|state| {
            let record = state.groups.get(&id).cloned().ok_or(Error::NotFound(id))?;
            Ok((TagGroupEvent::Destroyed { id }, record))
        })?;
        log::info!("Destroyed tag group {} '{}'", record.id, record.name);
        Ok(record)
    }

    /// Replace the group's member tags
    pub fn set_tags(&self, id: TagGroupId, tags: impl IntoIterator<Item = TagId>) -> Result<()> {
        let tags: BTreeSet<TagId> = tags.into_iter().collect();
        let count = tags.len();
        self.commit(|state| {
            if !state.groups.contains_key(&id) {
                return Err(Error::NotFound(id));
            }
            Ok((TagGroupEvent::TagsReplaced { id, tags }, ()))
        })?;
        log::debug!("Tag group {} now has {} tags", id, count);
        Ok(())
    }

    /// Replace the categories the group is linked to
    pub fn set_categories(
        &self,
        id: TagGroupId,
        categories: impl IntoIterator<Item = CategoryId>,
    ) -> Result<()> {
        let categories: BTreeSet<CategoryId> = categories.into_iter().collect();
        let count = categories.len();
        self.commit(|state| {
            if !state.groups.contains_key(&id) {
                return Err(Error::NotFound(id));
            }
            Ok((TagGroupEvent::CategoriesReplaced { id, categories }, ()))
        })?;
        log::debug!("Tag group {} now linked to {} categories", id, count);
        Ok(())
    }

    pub fn find(&self, id: TagGroupId) -> Result<Option<TagGroupRecord>> {
        self.read(|state| state.groups.get(&id).cloned())
    }

    /// Case-insensitive lookup
    pub fn find_by_name(&self, name: &str) -> Result<Option<TagGroupRecord>> {
        self.read(|state| {
            state.name_taken_by(name, None).and_then(|id| state.groups.get(&id).cloned())
        })
    }

    /// Load a group for editing
    pub fn edit(&self, id: TagGroupId) -> Result<TagGroup> {
        self.find(id)?.map(|record| TagGroup::from_record(&record)).ok_or(Error::NotFound(id))
    }

    /// Every group, ordered by name
    pub fn all(&self) -> Result<Vec<TagGroupRecord>> {
        self.read(|state| {
            state
                .tag_group_ids()
                .iter()
                .filter_map(|id| state.groups.get(id).cloned())
                .collect()
        })
    }

    pub fn permissions_of(&self, id: TagGroupId) -> Result<Vec<PermissionEntry>> {
        self.read(|state| state.permissions.get(&id).cloned().unwrap_or_default())
    }

    pub fn tags_of(&self, id: TagGroupId) -> Result<BTreeSet<TagId>> {
        self.read(|state| state.memberships.get(&id).cloned().unwrap_or_default())
    }

    pub fn categories_of(&self, id: TagGroupId) -> Result<BTreeSet<CategoryId>> {
        self.read(|state| state.category_links.get(&id).cloned().unwrap_or_default())
    }

    pub fn groups_for_category(&self, category: CategoryId) -> Result<BTreeSet<TagGroupId>> {
        self.read(|state| state.category_index.get(&category).cloned().unwrap_or_default())
    }

    /// Whether any permission rows restrict the group
    pub fn has_group_restriction(&self, id: TagGroupId) -> Result<bool> {
        self.read(|state| state.permissions.contains_key(&id))
    }

    /// Groups visible to `guardian`, ordered by name
    pub fn allowed(&self, guardian: &dyn Guardian) -> Result<Vec<TagGroupRecord>> {
        let predicate = VisibilityFilter::visible_to(guardian);
        self.read(|state| {
            predicate
                .select(state)
                .iter()
                .filter_map(|id| state.groups.get(id).cloned())
                .collect()
        })
    }

    pub fn is_visible(&self, id: TagGroupId, guardian: &dyn Guardian) -> Result<bool> {
        self.read(|state| {
            if !state.groups.contains_key(&id) {
                return Err(Error::NotFound(id));
            }
            Ok(VisibilityFilter::is_visible(
                guardian,
                state.category_links.get(&id).into_iter().flatten(),
                state.permissions.contains_key(&id),
            ))
        })?
    }

    pub fn len(&self) -> Result<usize> {
        self.read(|state| state.groups.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Copy of the committed state
    pub fn snapshot(&self) -> Result<TagGroupState> {
        Ok(self.engine.snapshot()?)
    }

    fn read<R>(&self, f: impl FnOnce(&TagGroupState) -> R) -> Result<R> {
        Ok(self.engine.with_state(f)?)
    }

    fn commit<R>(
        &self,
        prepare: impl FnOnce(&TagGroupState) -> Result<(TagGroupEvent, R)>,
    ) -> Result<R> {
        self.engine.commit(prepare, |event| {
            let mut journal = self.journal.lock().map_err(|e| {
                EngineError::ConcurrencyError(format!("Event journal poisoned: {}", e))
            })?;
            journal.record(event)?;
            Ok(())
        })
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidName("name must not be blank".to_string()));
    }
    Ok(name.to_string())
}

fn replay(state: &mut TagGroupState, envelopes: &[EventEnvelope]) -> Result<usize> {
    for envelope in envelopes {
        let event: TagGroupEvent = envelope.decode()?;
        event.apply(state);
    }
    Ok(envelopes.len())
}
