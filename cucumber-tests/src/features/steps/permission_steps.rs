use cucumber::gherkin::Step;
use cucumber::{given, then, when};

use crate::features::world::TagGroupWorld;

// Resolution

#[given(expr = "the permission input:")]
async fn given_permission_input(world: &mut TagGroupWorld, step: &Step) {
    let table = step.table.as_ref().expect("permission table");
    world.raw_input = table
        .rows
        .iter()
        .skip(1)
        .map(|row| (TagGroupWorld::parse_group(&row[0]), TagGroupWorld::parse_permission(&row[1])))
        .collect();
}

#[when(expr = "the input is resolved")]
async fn when_input_resolved(world: &mut TagGroupWorld) {
    match world.store.resolver().resolve(&world.raw_input) {
        Ok(resolved) => world.resolved = Some(resolved),
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[then(expr = "the resolved set is empty")]
async fn then_resolved_empty(world: &mut TagGroupWorld) {
    let resolved = world.resolved.as_ref().expect("input was resolved");
    assert!(resolved.is_open(), "expected no restriction, got {:?}", resolved.grants());
}

#[then(expr = "the resolved set contains {int} grants")]
async fn then_resolved_count(world: &mut TagGroupWorld, count: usize) {
    let resolved = world.resolved.as_ref().expect("input was resolved");
    assert_eq!(resolved.len(), count);
}

#[then(expr = "the resolved set grants {string} {string}")]
async fn then_resolved_contains(world: &mut TagGroupWorld, group: String, permission: String) {
    let grant = world.grant(&group, &permission);
    let resolved = world.resolved.as_ref().expect("input was resolved");
    assert!(resolved.grants().contains(&grant), "{:?} missing from {:?}", grant, resolved.grants());
}

#[then(expr = "resolution fails with {string}")]
async fn then_resolution_fails(world: &mut TagGroupWorld, message: String) {
    assert!(world.resolved.is_none());
    assert_eq!(world.last_error.as_deref(), Some(message.as_str()));
}

// Staging and applying

#[when(expr = "permissions {string} {string} are staged on {string}")]
async fn when_permissions_staged(
    world: &mut TagGroupWorld,
    group: String,
    permission: String,
    name: String,
) {
    let resolver = world.store.resolver().clone();
    world
        .entity(&name)
        .set_permissions(&resolver, [(group.as_str(), permission.as_str())])
        .expect("resolvable permissions");
}

#[when(expr = "the pending permissions of {string} are applied twice")]
async fn when_pending_applied_twice(world: &mut TagGroupWorld, name: String) {
    let mut group = world.entity(&name).clone();
    world.store.apply_pending_permissions(&mut group).expect("first apply");
    let after_first = world.store.snapshot().expect("snapshot");
    world.store.apply_pending_permissions(&mut group).expect("second apply");
    assert_eq!(world.store.snapshot().expect("snapshot"), after_first);
    world.groups.insert(name, group);
}

#[then(expr = "tag group {string} has {int} permission row(s)")]
async fn then_permission_rows(world: &mut TagGroupWorld, name: String, count: usize) {
    assert_eq!(world.grants_of(&name).len(), count);
}

#[then(expr = "tag group {string} grants {string} {string}")]
async fn then_group_grants(world: &mut TagGroupWorld, name: String, group: String, permission: String) {
    let grant = world.grant(&group, &permission);
    assert!(world.grants_of(&name).contains(&grant));
}

#[then(expr = "tag group {string} has no pending permissions")]
async fn then_no_pending(world: &mut TagGroupWorld, name: String) {
    assert!(world.entity(&name).pending_permissions().is_none());
}
