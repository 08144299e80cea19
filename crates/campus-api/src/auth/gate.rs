// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Authorization gates.
//!
//! The permission gate maps a request path onto a resource name (its first
//! non-empty segment) and checks it against the resolved [`PermissionSet`].
//! The teacher-only gate rejects students outright.

use super::permission::{AccessMode, PermissionSet};
use super::principal::Principal;
use crate::error::{ApiError, ApiResult};

/// Returns the resource a path addresses: its first non-empty segment.
///
/// `/laundry/apply` addresses `laundry`. Query strings are ignored. `/` and
/// the empty path address nothing.
pub fn resource_name(path: &str) -> Option<&str> {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.split('/').find(|segment| !segment.is_empty())
}

/// Returns `true` if `set` grants `resource` (or the wildcard) for `mode`.
pub fn allow(set: &PermissionSet, resource: &str, mode: AccessMode) -> bool {
    set.allows(resource, mode)
}

/// Checks the resource addressed by `path` against `set`.
///
/// A path without a resource segment only passes with the wildcard.
pub fn authorize(set: &PermissionSet, path: &str, mode: AccessMode) -> ApiResult<()> {
    let granted = match resource_name(path) {
        Some(resource) => allow(set, resource, mode),
        None => set.is_unrestricted(mode),
    };

    if granted {
        Ok(())
    } else {
        Err(ApiError::forbidden(format!(
            "No {} permission for '{}'",
            mode,
            resource_name(path).unwrap_or("/")
        )))
    }
}

/// Rejects student principals.
pub fn require_teacher(principal: &Principal) -> ApiResult<()> {
    if principal.is_student() {
        return Err(ApiError::forbidden(format!(
            "Principal {} is a student",
            principal.id
        )));
    }
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
