//! On-disk event log tests
//!
//! A store reopened from its data directory must reproduce the committed
//! state exactly, and any tampering with the log must stop it from opening.

use std::fs;
use std::sync::Arc;

use tag_groups_core::config::{StorageConfig, TagGroupsConfig};
use tag_groups_core::engine::persistence::EVENT_LOG_FILE;
use tag_groups_core::prelude::*;
use tag_groups_core::EngineError;
use tempfile::TempDir;

fn open(dir: &TempDir) -> TagGroupStore {
    let config = StorageConfig::persistent(dir.path().to_string_lossy()).with_fsync(false);
    TagGroupStore::open(&config, Arc::new(StaticGroupDirectory::new())).unwrap()
}

fn seed(store: &TagGroupStore) -> TagGroupId {
    let mut colors = TagGroup::new("Colors");
    colors.set_permissions(store.resolver(), [("staff", "full"), ("trust_level_2", "readonly")]).unwrap();
    let id = store.save(&mut colors).unwrap().id;
    store.set_tags(id, [TagId(1), TagId(2)]).unwrap();
    store.set_categories(id, [CategoryId(4)]).unwrap();
    id
}

#[test]
fn reopened_store_matches_committed_state() {
    let dir = TempDir::new().unwrap();
    let (id, before) = {
        let store = open(&dir);
        let id = seed(&store);
        let sizes = store.save(&mut TagGroup::new("Sizes")).unwrap().id;
        store.destroy(sizes).unwrap();
        (id, store.snapshot().unwrap())
    };

    let store = open(&dir);
    assert_eq!(store.snapshot().unwrap(), before);
    assert_eq!(store.tags_of(id).unwrap().len(), 2);
    assert!(store.has_group_restriction(id).unwrap());
    assert!(store.find_by_name("sizes").unwrap().is_none());
}

#[test]
fn reopened_store_keeps_appending_to_the_chain() {
    let dir = TempDir::new().unwrap();
    let id = seed(&open(&dir));

    {
        let store = open(&dir);
        let mut group = store.edit(id).unwrap();
        group.set_permissions(store.resolver(), [("everyone", "full")]).unwrap();
        store.save(&mut group).unwrap();
    }

    let store = open(&dir);
    assert!(store.permissions_of(id).unwrap().is_empty());
    assert_eq!(store.len().unwrap(), 1);
}

#[test]
fn corrupted_line_refuses_to_open() {
    let dir = TempDir::new().unwrap();
    seed(&open(&dir));

    let path = dir.path().join(EVENT_LOG_FILE);
    let content = fs::read_to_string(&path).unwrap();
    fs::write(&path, content.replacen("Colors", "Colorz", 1)).unwrap();

    let config = StorageConfig::persistent(dir.path().to_string_lossy());
    let err = TagGroupStore::open(&config, Arc::new(StaticGroupDirectory::new())).err().unwrap();
    assert!(matches!(err, Error::Engine(EngineError::Corrupted { line: 1, .. })));
}

#[test]
fn tampered_payload_without_checksums_breaks_chain() {
    let dir = TempDir::new().unwrap();
    let mut config = StorageConfig::persistent(dir.path().to_string_lossy()).with_fsync(false);
    config.checksums = false;
    seed(&TagGroupStore::open(&config, Arc::new(StaticGroupDirectory::new())).unwrap());

    let path = dir.path().join(EVENT_LOG_FILE);
    let content = fs::read_to_string(&path).unwrap();
    fs::write(&path, content.replacen("Colors", "Colorz", 1)).unwrap();

    let err = TagGroupStore::open(&config, Arc::new(StaticGroupDirectory::new())).err().unwrap();
    assert!(matches!(err, Error::Engine(EngineError::BrokenChain(_))));
}

#[test]
fn store_from_toml_config() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("tag-groups.toml");
    let data_dir = dir.path().join("data");
    fs::write(
        &config_path,
        format!(
            r#"
[storage]
data_dir = "{}"
fsync = false

[logging]
level = "debug"

[directory.groups]
designers = 41
"#,
            data_dir.display()
        ),
    )
    .unwrap();

    let config = TagGroupsConfig::from_file(&config_path).unwrap();
    init_logging(&config.logging).unwrap();
    let store = TagGroupStore::from_config(&config).unwrap();

    let mut group = TagGroup::new("Palettes");
    group.set_permissions(store.resolver(), [("designers", "create_post")]).unwrap();
    let id = store.save(&mut group).unwrap().id;

    let entries = store.permissions_of(id).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].group_id, ActorGroupId(41));
    assert_eq!(entries[0].level, PermissionLevel::CreatePost);
    assert!(data_dir.join(EVENT_LOG_FILE).exists());
}
