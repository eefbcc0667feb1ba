//! Tag group visibility
//!
//! A privileged requester sees every tag group. Anyone else sees a group only
//! when both hold:
//!
//! - **category scope**: the group has no category links, or at least one link
//!   to a category the requester may view;
//! - **no restriction**: the group has no permission rows.
//!
//! [`VisibilityFilter::visible_to`] turns a requester into a declarative
//! [`VisibilityPredicate`]; [`VisibilityPredicate::select`] evaluates it against
//! a [`VisibilityIndex`] with set-membership lookups only.

use std::collections::{BTreeSet, HashMap};

use crate::model::{CategoryId, TagGroupId};

/// Roles treated as staff
pub const PRIVILEGED_ROLES: &[&str] = &["admin", "moderator", "staff"];

/// Authorization source for visibility checks
pub trait Guardian {
    /// Staff-equivalent requesters bypass filtering
    fn is_privileged(&self) -> bool;

    /// Categories the requester may view
    fn allowed_category_ids(&self) -> BTreeSet<CategoryId>;
}

/// Authorization-relevant state of whoever is asking
#[derive(Debug, Clone, Default)]
pub struct RequesterContext {
    /// User identifier (None for anonymous requesters)
    pub user_id: Option<String>,

    /// Application roles
    pub roles: Vec<String>,

    /// Categories this requester may view
    pub allowed_category_ids: BTreeSet<CategoryId>,

    /// Provider-specific metadata
    pub metadata: HashMap<String, String>,
}

impl RequesterContext {
    /// Anonymous requester
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Signed-in requester with roles
    pub fn user(user_id: impl Into<String>, roles: Vec<String>) -> Self {
        Self { user_id: Some(user_id.into()), roles, ..Self::default() }
    }

    /// Signed-in staff member
    pub fn staff(user_id: impl Into<String>) -> Self {
        Self::user(user_id, vec!["staff".to_string()])
    }

    pub fn with_categories(mut self, categories: impl IntoIterator<Item = CategoryId>) -> Self {
        self.allowed_category_ids.extend(categories);
        self
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }
}

impl Guardian for RequesterContext {
    fn is_privileged(&self) -> bool {
        PRIVILEGED_ROLES.iter().any(|role| self.has_role(role))
    }

    fn allowed_category_ids(&self) -> BTreeSet<CategoryId> {
        self.allowed_category_ids.clone()
    }
}

/// Committed facts the predicate is evaluated against
pub trait VisibilityIndex {
    /// Every tag group id, in the order results should come back
    fn tag_group_ids(&self) -> Vec<TagGroupId>;

    /// Groups linked to at least one of `categories`
    fn linked_to_any(&self, categories: &BTreeSet<CategoryId>) -> BTreeSet<TagGroupId>;

    /// Does the group have any category link?
    fn has_categories(&self, id: TagGroupId) -> bool;

    /// Does the group have any permission row?
    fn has_permissions(&self, id: TagGroupId) -> bool;
}

/// Which tag groups a requester may see
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibilityPredicate {
    /// Every group
    Unrestricted,
    /// Category-scope clause AND no-restriction clause
    Scoped { allowed_categories: BTreeSet<CategoryId> },
}

impl VisibilityPredicate {
    /// In-memory check for one group
    pub fn matches<'a>(
        &self,
        categories: impl IntoIterator<Item = &'a CategoryId>,
        has_permissions: bool,
    ) -> bool {
        match self {
            VisibilityPredicate::Unrestricted => true,
            VisibilityPredicate::Scoped { allowed_categories } => {
                let mut categories = categories.into_iter().peekable();
                let in_scope = categories.peek().is_none()
                    || categories.any(|category| allowed_categories.contains(category));
                in_scope && !has_permissions
            }
        }
    }

    /// Evaluate against an index, without fetching any group's rows
    pub fn select(&self, index: &impl VisibilityIndex) -> Vec<TagGroupId> {
        match self {
            VisibilityPredicate::Unrestricted => index.tag_group_ids(),
            VisibilityPredicate::Scoped { allowed_categories } => {
                let in_allowed_category = index.linked_to_any(allowed_categories);
                index
                    .tag_group_ids()
                    .into_iter()
                    .filter(|id| !index.has_categories(*id) || in_allowed_category.contains(id))
                    .filter(|id| !index.has_permissions(*id))
                    .collect()
            }
        }
    }
}

/// Builds visibility predicates from requester context
pub struct VisibilityFilter;

impl VisibilityFilter {
    pub fn visible_to(guardian: &dyn Guardian) -> VisibilityPredicate {
        if guardian.is_privileged() {
            VisibilityPredicate::Unrestricted
        } else {
            VisibilityPredicate::Scoped { allowed_categories: guardian.allowed_category_ids() }
        }
    }

    /// In-memory form: is a group with these facts visible to `guardian`?
    pub fn is_visible<'a>(
        guardian: &dyn Guardian,
        categories: impl IntoIterator<Item = &'a CategoryId>,
        has_permissions: bool,
    ) -> bool {
        Self::visible_to(guardian).matches(categories, has_permissions)
    }
}
