// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Mock Implementations
//!
//! Store implementations that record how often they are consulted and can be
//! told to fail.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use campus_api::store::{Group, GroupId, GroupPatch, GroupStore, MemoryGroupStore, NewGroup};
use campus_api::{ApiError, ApiResult};

// =============================================================================
// Counting Group Store
// =============================================================================

/// Group store wrapper counting permission lookups.
///
/// Delegates to a [`MemoryGroupStore`]. Only `get_groups_by_ids` is counted;
/// that is the call permission resolution makes.
#[derive(Debug, Default)]
pub struct CountingGroupStore {
    inner: MemoryGroupStore,
    lookups: AtomicUsize,
    last_lookup: RwLock<Vec<GroupId>>,
    fail_lookups: AtomicBool,
}

impl CountingGroupStore {
    /// Creates a store seeded with `groups`.
    pub fn with_groups(groups: impl IntoIterator<Item = Group>) -> Self {
        Self {
            inner: MemoryGroupStore::with_groups(groups),
            ..Default::default()
        }
    }

    /// Number of `get_groups_by_ids` calls so far.
    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }

    /// IDs passed to the most recent lookup.
    pub fn last_lookup(&self) -> Vec<GroupId> {
        self.last_lookup.read().clone()
    }

    /// Makes every subsequent lookup fail.
    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl GroupStore for CountingGroupStore {
    async fn get_groups_by_ids(&self, ids: &[GroupId]) -> ApiResult<Vec<Group>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        *self.last_lookup.write() = ids.to_vec();

        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(ApiError::internal("Group store unavailable"));
        }

        self.inner.get_groups_by_ids(ids).await
    }

    async fn list(&self) -> ApiResult<Vec<Group>> {
        self.inner.list().await
    }

    async fn get(&self, id: &GroupId) -> ApiResult<Option<Group>> {
        self.inner.get(id).await
    }

    async fn create(&self, group: NewGroup) -> ApiResult<Group> {
        self.inner.create(group).await
    }

    async fn update(&self, id: &GroupId, patch: GroupPatch) -> ApiResult<Group> {
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: &GroupId) -> ApiResult<()> {
        self.inner.delete(id).await
    }

    async fn health_check(&self) -> bool {
        !self.fail_lookups.load(Ordering::SeqCst)
    }
}
