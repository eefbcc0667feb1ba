//! Tag Groups - Core
//!
//! Named groupings of tags, with access restrictions per actor group.
//!
//! # Overview
//!
//! A tag group carries a set of `(actor group, permission level)` restrictions.
//! Raw input is resolved into a canonical set before it is stored, and the
//! store later answers which groups a requester may see without loading every
//! group's rows.
//!
//! ```rust,ignore
//! use tag_groups_core::prelude::*;
//! use std::sync::Arc;
//!
//! let store = TagGroupStore::in_memory(Arc::new(StaticGroupDirectory::new()));
//!
//! let mut group = TagGroup::new("Colors");
//! group.set_permissions(store.resolver(), [("staff", "full")])?;
//! store.save(&mut group)?;
//!
//! let visible = store.allowed(&RequesterContext::anonymous())?;
//! assert!(visible.is_empty());
//! ```
//!
//! # Architecture
//!
//! - [`resolver`] - Raw permissions to canonical grants
//! - [`model`] - The tag group entity and its staged permissions
//! - [`visibility`] - Requester context and visibility predicates
//! - [`store`] - Atomic, event-sourced persistence of groups and their rows
//! - [`engine`] - Event journal, hash chain and the locked state container
//!
//! # Canonical permission sets
//!
//! Granting the `everyone` group full access is the same as no restriction at
//! all: any input containing that pair resolves to the empty set, and no
//! stored row ever pairs `everyone` with [`PermissionLevel::Full`].

pub mod config; // Configuration system with TOML support
pub mod directory;
pub mod engine;
pub mod events;
pub mod logging;
pub mod model;
pub mod permissions;
pub mod resolver;
pub mod state;
pub mod store;
pub mod visibility;

pub mod prelude;

pub use config::TagGroupsConfig;
pub use directory::{ActorGroupRef, GroupDirectory, StaticGroupDirectory};
pub use engine::EngineError;
pub use model::{ActorGroupId, CategoryId, TagGroup, TagGroupId, TagGroupRecord, TagId};
pub use permissions::{PermissionEntry, PermissionGrant, PermissionLevel, PermissionRef};
pub use resolver::{PermissionResolver, ResolvedPermissions};
pub use store::TagGroupStore;
pub use visibility::{Guardian, RequesterContext, VisibilityFilter, VisibilityPredicate};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown group: {0}")]
    UnknownGroup(String),

    #[error("Unknown permission: {0}")]
    UnknownPermission(String),

    #[error("Name has already been taken: {0}")]
    DuplicateName(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Tag group {0} not found")]
    NotFound(TagGroupId),

    /// Permissions can only be applied to a group that has been saved
    #[error("Tag group '{0}' has not been saved")]
    NotPersisted(String),

    #[error(transparent)]
    Engine(#[from] EngineError),
}
