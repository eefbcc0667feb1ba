//! Permission resolution
//!
//! Turns raw `(group, permission)` input into the canonical set of grants a
//! tag group persists. Two rules define "canonical":
//!
//! - every reference is translated to an [`ActorGroupId`] / [`PermissionLevel`],
//!   and repeated pairs collapse to one grant;
//! - **open to everyone**: a set that grants [`PermissionLevel::FULL`] to the
//!   everyone group is stored as no grants at all, whatever else it contains.
//!   An empty set is how an unrestricted tag group is represented.

use std::collections::HashSet;
use std::sync::Arc;

use crate::directory::{ActorGroupRef, GroupDirectory};
use crate::model::ActorGroupId;
use crate::permissions::{PermissionGrant, PermissionLevel, PermissionRef};
use crate::{Error, Result};

/// Canonical result of a resolution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedPermissions {
    grants: Vec<PermissionGrant>,
}

impl ResolvedPermissions {
    /// No restriction: visible to everyone
    pub fn open() -> Self {
        Self::default()
    }

    pub fn grants(&self) -> &[PermissionGrant] {
        &self.grants
    }

    pub fn is_open(&self) -> bool {
        self.grants.is_empty()
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }

    pub fn into_grants(self) -> Vec<PermissionGrant> {
        self.grants
    }
}

/// The "open to everyone" rule: does this grant make the whole set redundant?
pub fn opens_to_everyone(grant: &PermissionGrant, everyone: ActorGroupId) -> bool {
    grant.group_id == everyone && grant.level == PermissionLevel::FULL
}

/// Resolves raw permission input against a [`GroupDirectory`]
#[derive(Clone)]
pub struct PermissionResolver {
    directory: Arc<dyn GroupDirectory>,
}

impl PermissionResolver {
    pub fn new(directory: Arc<dyn GroupDirectory>) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &dyn GroupDirectory {
        self.directory.as_ref()
    }

    /// Resolve one raw pair without applying the set-level rules
    pub fn resolve_one(&self, group: &ActorGroupRef, permission: &PermissionRef) -> Result<PermissionGrant> {
        let group_id = self.directory.resolve_actor_group_id(group)?;
        let level = permission
            .to_level()
            .ok_or_else(|| Error::UnknownPermission(permission.to_string()))?;
        Ok(PermissionGrant::new(group_id, level))
    }

    /// Resolve a whole permission set.
    ///
    /// Every entry is translated before any rule is applied, so an unknown
    /// reference anywhere fails the call and nothing partial is returned.
    pub fn resolve(&self, raw: &[(ActorGroupRef, PermissionRef)]) -> Result<ResolvedPermissions> {
        let translated = raw
            .iter()
            .map(|(group, permission)| self.resolve_one(group, permission))
            .collect::<Result<Vec<_>>>()?;

        let everyone = self.directory.everyone_group_id();
        if translated.iter().any(|grant| opens_to_everyone(grant, everyone)) {
            log::debug!(
                "Permission set grants full access to everyone ({} entries), resolving as open",
                translated.len()
            );
            return Ok(ResolvedPermissions::open());
        }

        let mut seen = HashSet::with_capacity(translated.len());
        let grants = translated.into_iter().filter(|grant| seen.insert(*grant)).collect();
        Ok(ResolvedPermissions { grants })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::StaticGroupDirectory;

    fn resolver() -> PermissionResolver {
        PermissionResolver::new(Arc::new(StaticGroupDirectory::new().with_group("designers", 41)))
    }

    fn raw<G: Into<ActorGroupRef>, P: Into<PermissionRef>>(
        entries: Vec<(G, P)>,
    ) -> Vec<(ActorGroupRef, PermissionRef)> {
        entries.into_iter().map(|(g, p)| (g.into(), p.into())).collect()
    }

    #[test]
    fn test_translates_names_and_ids() {
        let resolved = resolver()
            .resolve(&[
                ("staff".into(), "full".into()),
                (41i64.into(), PermissionLevel::Readonly.into()),
                ("trust_level_2".into(), 2i64.into()),
            ])
            .unwrap();

        assert_eq!(
            resolved.grants(),
            &[
                PermissionGrant::new(ActorGroupId(3), PermissionLevel::Full),
                PermissionGrant::new(ActorGroupId(41), PermissionLevel::Readonly),
                PermissionGrant::new(ActorGroupId(12), PermissionLevel::CreatePost),
            ]
        );
    }

    #[test]
    fn test_everyone_full_resolves_open_regardless_of_position() {
        let resolver = resolver();
        for input in [
            raw(vec![("everyone", "full"), ("staff", "full")]),
            raw(vec![("staff", "full"), ("everyone", "full")]),
            raw(vec![("designers", "readonly"), ("everyone", "full"), ("staff", "create_post")]),
            raw(vec![("everyone", "full")]),
        ] {
            let resolved = resolver.resolve(&input).unwrap();
            assert!(resolved.is_open(), "expected open for {:?}", input);
        }
    }

    #[test]
    fn test_everyone_full_by_id_and_code() {
        let resolved = resolver().resolve(&[(0i64.into(), 1i64.into()), (3i64.into(), 1i64.into())]).unwrap();
        assert!(resolved.is_open());
    }

    #[test]
    fn test_everyone_with_lesser_level_is_kept() {
        let resolved = resolver().resolve(&raw(vec![("everyone", "readonly")])).unwrap();
        assert_eq!(resolved.grants(), &[PermissionGrant::new(ActorGroupId(0), PermissionLevel::Readonly)]);
    }

    #[test]
    fn test_duplicates_collapse() {
        let resolved = resolver()
            .resolve(&raw(vec![("staff", "full"), ("Staff", "full"), ("staff", "readonly")]))
            .unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved.grants()[0], PermissionGrant::new(ActorGroupId(3), PermissionLevel::Full));
    }

    #[test]
    fn test_unknown_group_fails_whole_set() {
        let err = resolver()
            .resolve(&raw(vec![("everyone", "full"), ("nobody", "full")]))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownGroup(ref name) if name == "nobody"));
    }

    #[test]
    fn test_unknown_permission_fails() {
        let err = resolver().resolve(&raw(vec![("staff", "owner")])).unwrap_err();
        assert!(matches!(err, Error::UnknownPermission(ref name) if name == "owner"));

        let err = resolver().resolve(&[("staff".into(), 7i64.into())]).unwrap_err();
        assert!(matches!(err, Error::UnknownPermission(_)));
    }

    #[test]
    fn test_empty_input_is_open() {
        assert!(resolver().resolve(&[]).unwrap().is_open());
    }

    #[test]
    fn test_custom_everyone_id() {
        let directory = StaticGroupDirectory::new().with_everyone(ActorGroupId(100));
        let resolver = PermissionResolver::new(Arc::new(directory));

        assert!(resolver.resolve(&[(100i64.into(), "full".into())]).unwrap().is_open());
        assert!(!resolver.resolve(&raw(vec![("admins", "full")])).unwrap().is_open());
    }
}
