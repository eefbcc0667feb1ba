//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use tag_groups_core::prelude::*;
//! ```

// === Configuration ===
pub use crate::config::TagGroupsConfig;
pub use crate::logging::init_logging;

// === Entities ===
pub use crate::model::{ActorGroupId, CategoryId, TagGroup, TagGroupId, TagGroupRecord, TagId};
pub use crate::permissions::{PermissionEntry, PermissionGrant, PermissionLevel};

// === Resolution and visibility ===
pub use crate::directory::{GroupDirectory, StaticGroupDirectory};
pub use crate::resolver::PermissionResolver;
pub use crate::visibility::{Guardian, RequesterContext, VisibilityFilter};

// === Store ===
pub use crate::store::TagGroupStore;
pub use crate::{Error, Result};
