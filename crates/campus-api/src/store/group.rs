// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Group storage.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use axum::http::StatusCode;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::permission::GroupPermissions;
use crate::error::{ApiError, ApiResult};

// =============================================================================
// GroupId
// =============================================================================

/// Identifier of a group.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(String);

impl GroupId {
    /// Creates a group ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh group ID.
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GroupId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for GroupId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&String> for GroupId {
    fn from(s: &String) -> Self {
        Self(s.clone())
    }
}

// =============================================================================
// Group
// =============================================================================

/// A named bundle of view/edit permission grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    /// Group ID.
    pub id: GroupId,
    /// Unique display name.
    pub name: String,
    /// Permission entries.
    #[serde(default)]
    pub permissions: GroupPermissions,
}

impl Group {
    /// Creates a group.
    pub fn new(id: impl Into<GroupId>, name: impl Into<String>, permissions: GroupPermissions) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            permissions,
        }
    }
}

/// Payload for creating a group.
#[derive(Debug, Clone, Deserialize)]
pub struct NewGroup {
    /// Display name.
    pub name: String,
    /// Permission entries.
    #[serde(default)]
    pub permissions: GroupPermissions,
}

/// Partial update of a group.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GroupPatch {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Replacement permission entries.
    #[serde(default)]
    pub permissions: Option<GroupPermissions>,
}

// =============================================================================
// GroupStore
// =============================================================================

/// Storage for groups.
///
/// `get_groups_by_ids` is what permission resolution reads; the remaining
/// operations back the group management endpoints.
#[async_trait]
pub trait GroupStore: Send + Sync {
    /// Returns the groups matching `ids`. Unknown IDs are skipped.
    async fn get_groups_by_ids(&self, ids: &[GroupId]) -> ApiResult<Vec<Group>>;

    /// Returns every group.
    async fn list(&self) -> ApiResult<Vec<Group>>;

    /// Returns a single group.
    async fn get(&self, id: &GroupId) -> ApiResult<Option<Group>>;

    /// Creates a group. Names are unique.
    async fn create(&self, group: NewGroup) -> ApiResult<Group>;

    /// Applies a partial update.
    async fn update(&self, id: &GroupId, patch: GroupPatch) -> ApiResult<Group>;

    /// Deletes a group.
    async fn delete(&self, id: &GroupId) -> ApiResult<()>;

    /// Returns `true` if the store is operational.
    async fn health_check(&self) -> bool {
        true
    }
}

// =============================================================================
// MemoryGroupStore
// =============================================================================

/// In-memory group store.
#[derive(Debug, Default)]
pub struct MemoryGroupStore {
    groups: RwLock<BTreeMap<GroupId, Group>>,
}

impl MemoryGroupStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with groups.
    pub fn with_groups(groups: impl IntoIterator<Item = Group>) -> Self {
        let groups = groups.into_iter().map(|g| (g.id.clone(), g)).collect();
        Self {
            groups: RwLock::new(groups),
        }
    }

    /// Returns the number of stored groups.
    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    /// Returns `true` if the store is empty.
    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }

    fn name_taken(groups: &BTreeMap<GroupId, Group>, name: &str, except: Option<&GroupId>) -> bool {
        groups
            .values()
            .any(|g| g.name == name && Some(&g.id) != except)
    }
}

fn name_taken_error(name: &str) -> ApiError {
    ApiError::coded(
        StatusCode::CONFLICT,
        "GROUP_NAME_TAKEN",
        format!("A group named '{}' already exists", name),
    )
}

#[async_trait]
impl GroupStore for MemoryGroupStore {
    async fn get_groups_by_ids(&self, ids: &[GroupId]) -> ApiResult<Vec<Group>> {
        let groups = self.groups.read();
        Ok(ids.iter().filter_map(|id| groups.get(id).cloned()).collect())
    }

    async fn list(&self) -> ApiResult<Vec<Group>> {
        Ok(self.groups.read().values().cloned().collect())
    }

    async fn get(&self, id: &GroupId) -> ApiResult<Option<Group>> {
        Ok(self.groups.read().get(id).cloned())
    }

    async fn create(&self, group: NewGroup) -> ApiResult<Group> {
        let mut groups = self.groups.write();
        if Self::name_taken(&groups, &group.name, None) {
            return Err(name_taken_error(&group.name));
        }

        let group = Group::new(GroupId::generate(), group.name, group.permissions);
        groups.insert(group.id.clone(), group.clone());
        Ok(group)
    }

    async fn update(&self, id: &GroupId, patch: GroupPatch) -> ApiResult<Group> {
        let mut groups = self.groups.write();

        if let Some(ref name) = patch.name {
            if Self::name_taken(&groups, name, Some(id)) {
                return Err(name_taken_error(name));
            }
        }

        let group = groups
            .get_mut(id)
            .ok_or_else(|| ApiError::not_found(format!("Group {}", id)))?;

        if let Some(name) = patch.name {
            group.name = name;
        }
        if let Some(permissions) = patch.permissions {
            group.permissions = permissions;
        }

        Ok(group.clone())
    }

    async fn delete(&self, id: &GroupId) -> ApiResult<()> {
        self.groups
            .write()
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| ApiError::not_found(format!("Group {}", id)))
    }
}

// =============================================================================
// Tests
// =============================================================================
