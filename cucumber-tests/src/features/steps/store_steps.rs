use cucumber::{given, then, when};
use tag_groups_core::CategoryId;

use crate::features::world::TagGroupWorld;

#[given(expr = "a persistent tag group store")]
async fn given_persistent_store(world: &mut TagGroupWorld) {
    world.use_persistent_store();
}

#[given(expr = "a tag group {string}")]
async fn given_group(world: &mut TagGroupWorld, name: String) {
    world.create_group(&name, &[]);
    assert_eq!(world.last_error, None);
}

#[given(expr = "a tag group {string} restricted to {string} with {string}")]
async fn given_restricted_group(
    world: &mut TagGroupWorld,
    name: String,
    group: String,
    permission: String,
) {
    world.create_group(&name, &[(group.as_str(), permission.as_str())]);
    assert_eq!(world.last_error, None);
}

#[when(expr = "I create a tag group {string}")]
async fn when_create_group(world: &mut TagGroupWorld, name: String) {
    world.create_group(&name, &[]);
}

#[when(expr = "I create a tag group {string} restricted to {string} with {string}")]
async fn when_create_restricted_group(
    world: &mut TagGroupWorld,
    name: String,
    group: String,
    permission: String,
) {
    world.create_group(&name, &[(group.as_str(), permission.as_str())]);
}

#[given(expr = "tag group {string} is linked to category {int}")]
async fn given_linked_to_category(world: &mut TagGroupWorld, name: String, category: u64) {
    let id = world.group_id(&name);
    world.store.set_categories(id, [CategoryId(category)]).expect("link category");
}

#[when(expr = "tag group {string} is saved")]
async fn when_group_saved(world: &mut TagGroupWorld, name: String) {
    let mut group = world.entity(&name).clone();
    world.last_error = world.store.save(&mut group).err().map(|e| e.to_string());
    world.groups.insert(name, group);
}

#[when(expr = "tag group {string} is destroyed")]
async fn when_group_destroyed(world: &mut TagGroupWorld, name: String) {
    let id = world.group_id(&name);
    world.store.destroy(id).expect("destroy");
    world.groups.remove(&name);
}

#[when(expr = "the store is reopened")]
async fn when_store_reopened(world: &mut TagGroupWorld) {
    world.reopen_store();
}

#[then(expr = "saving fails with {string}")]
async fn then_saving_fails(world: &mut TagGroupWorld, message: String) {
    assert_eq!(world.last_error.as_deref(), Some(message.as_str()));
}

#[then(regex = r"^there (?:is|are) (\d+) tag groups?$")]
async fn then_group_count(world: &mut TagGroupWorld, count: usize) {
    assert_eq!(world.store.len().expect("store readable"), count);
}

#[then(expr = "no permission rows exist")]
async fn then_no_permission_rows(world: &mut TagGroupWorld) {
    assert!(world.store.snapshot().expect("snapshot").permissions.is_empty());
}

#[then(expr = "category {int} has no tag groups")]
async fn then_category_empty(world: &mut TagGroupWorld, category: u64) {
    let groups = world.store.groups_for_category(CategoryId(category)).expect("store readable");
    assert!(groups.is_empty(), "category {} still linked to {:?}", category, groups);
}

#[then(expr = "tag group {string} still has its pending permissions")]
async fn then_pending_kept(world: &mut TagGroupWorld, name: String) {
    let group = world.groups.get(&name).expect("entity held by scenario");
    assert!(group.pending_permissions().is_some());
}
