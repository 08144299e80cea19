// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Permission resolution from group memberships.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::permission::PermissionSet;
use crate::error::ApiResult;
use crate::store::{GroupId, GroupStore};

/// Computes the effective [`PermissionSet`] of a principal.
///
/// Every call reads the group store; nothing is cached between requests.
#[derive(Clone)]
pub struct PermissionResolver {
    store: Arc<dyn GroupStore>,
}

impl PermissionResolver {
    /// Creates a resolver reading from the given store.
    pub fn new(store: Arc<dyn GroupStore>) -> Self {
        Self { store }
    }

    /// Unions the view and edit lists of every known group in `group_ids`.
    ///
    /// Unknown IDs are skipped. An empty membership resolves to an empty set
    /// without touching the store.
    pub async fn resolve(&self, group_ids: &BTreeSet<GroupId>) -> ApiResult<PermissionSet> {
        if group_ids.is_empty() {
            return Ok(PermissionSet::new());
        }

        let ids: Vec<GroupId> = group_ids.iter().cloned().collect();
        let groups = self.store.get_groups_by_ids(&ids).await?;

        if groups.len() < ids.len() {
            tracing::debug!(
                requested = ids.len(),
                found = groups.len(),
                "Skipping unknown groups during permission resolution"
            );
        }

        Ok(PermissionSet::from_groups(
            groups.iter().map(|group| &group.permissions),
        ))
    }

    /// Returns the underlying group store.
    pub fn store(&self) -> &Arc<dyn GroupStore> {
        &self.store
    }
}

impl std::fmt::Debug for PermissionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionResolver").finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::permission::{AccessMode, GroupPermissions, WILDCARD};
    use crate::store::{Group, MemoryGroupStore};

    fn resolver() -> PermissionResolver {
        let store = MemoryGroupStore::with_groups([
            Group::new("dorm", "dorm", GroupPermissions::new(["laundry"], Vec::<String>::new())),
            Group::new("kitchen", "kitchen", GroupPermissions::new(["meal"], ["meal", "laundry"])),
            Group::new("admin", "admin", GroupPermissions::new([WILDCARD], [WILDCARD])),
            Group::new("empty", "empty", GroupPermissions::default()),
        ]);
        PermissionResolver::new(Arc::new(store))
    }

    fn ids(names: &[&str]) -> BTreeSet<GroupId> {
        names.iter().copied().map(GroupId::from).collect()
    }

    #[tokio::test]
    async fn test_union_of_groups() {
        let set = resolver().resolve(&ids(&["dorm", "kitchen"])).await.unwrap();

        assert!(set.allows("laundry", AccessMode::View));
        assert!(set.allows("meal", AccessMode::View));
        assert!(set.allows("laundry", AccessMode::Edit));
        assert!(!set.allows("wakeup", AccessMode::View));
    }

    #[tokio::test]
    async fn test_order_independent() {
        let resolver = resolver();

        let a = resolver.resolve(&ids(&["dorm", "kitchen"])).await.unwrap();
        let b = resolver.resolve(&ids(&["kitchen", "dorm", "dorm"])).await.unwrap();

        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_unknown_groups_skipped() {
        let set = resolver().resolve(&ids(&["dorm", "deleted"])).await.unwrap();

        assert!(set.allows("laundry", AccessMode::View));
        assert_eq!(set.grants(AccessMode::View).len(), 1);
    }

    #[tokio::test]
    async fn test_empty_group_contributes_nothing() {
        let set = resolver().resolve(&ids(&["empty"])).await.unwrap();
        assert!(set.is_empty());

        let set = resolver().resolve(&BTreeSet::new()).await.unwrap();
        assert!(set.is_empty());
    }

    #[tokio::test]
    async fn test_wildcard_group() {
        let set = resolver().resolve(&ids(&["admin"])).await.unwrap();

        assert!(set.is_unrestricted(AccessMode::View));
        assert!(set.is_unrestricted(AccessMode::Edit));
    }
}
