use cucumber::{given, then};
use tag_groups_core::{CategoryId, RequesterContext};

use crate::features::world::TagGroupWorld;

#[given(expr = "an anonymous requester")]
async fn given_anonymous(world: &mut TagGroupWorld) {
    world.requester = RequesterContext::anonymous();
}

#[given(expr = "a requester who can see categories {string}")]
async fn given_requester_with_categories(world: &mut TagGroupWorld, categories: String) {
    let categories = categories
        .split(',')
        .map(|id| CategoryId(id.trim().parse().expect("numeric category id")));
    world.requester = RequesterContext::user("member", vec![]).with_categories(categories);
}

#[given(expr = "a requester with role {string}")]
async fn given_requester_with_role(world: &mut TagGroupWorld, role: String) {
    world.requester = RequesterContext::user("someone", vec![role]);
}

#[then(expr = "the visible tag groups are {string}")]
async fn then_visible_groups(world: &mut TagGroupWorld, expected: String) {
    let expected: Vec<String> = expected.split(',').map(|name| name.trim().to_string()).collect();
    assert_eq!(world.visible_names(), expected);
}

#[then(expr = "tag group {string} is hidden")]
async fn then_group_hidden(world: &mut TagGroupWorld, name: String) {
    let id = world.group_id(&name);
    assert!(!world.store.is_visible(id, &world.requester).expect("store readable"));
}

#[then(expr = "tag group {string} is visible")]
async fn then_group_visible(world: &mut TagGroupWorld, name: String) {
    let id = world.group_id(&name);
    assert!(world.store.is_visible(id, &world.requester).expect("store readable"));
}
