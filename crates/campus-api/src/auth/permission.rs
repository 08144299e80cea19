// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Permission definitions for group-based access control.
//!
//! A group grants resources per [`AccessMode`]. Resources are top-level route
//! namespaces (`laundry`, `meal`, `group`, ...). The two modes are
//! independent: granting `edit` on a resource says nothing about `view`.

use std::collections::BTreeSet;
use std::fmt;

use axum::http::Method;
use serde::{Deserialize, Serialize};

/// Marker granting every resource within a mode.
pub const WILDCARD: &str = "@";

// =============================================================================
// AccessMode
// =============================================================================

/// Access mode a permission entry applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// Read access.
    View,
    /// Write access.
    Edit,
}

impl AccessMode {
    /// Returns the mode name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::View => "view",
            AccessMode::Edit => "edit",
        }
    }

    /// Parses a mode from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "view" | "read" => Some(AccessMode::View),
            "edit" | "write" => Some(AccessMode::Edit),
            _ => None,
        }
    }

    /// Safe methods view, everything else edits.
    pub fn from_method(method: &Method) -> Self {
        if method == Method::GET || method == Method::HEAD || method == Method::OPTIONS {
            AccessMode::View
        } else {
            AccessMode::Edit
        }
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// GroupPermissions
// =============================================================================

/// Permission entries declared by a single group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPermissions {
    /// Resources granted for viewing.
    #[serde(default)]
    pub view: Vec<String>,
    /// Resources granted for editing.
    #[serde(default)]
    pub edit: Vec<String>,
}

impl GroupPermissions {
    /// Creates permissions from view and edit lists.
    pub fn new<V, E>(view: V, edit: E) -> Self
    where
        V: IntoIterator,
        V::Item: Into<String>,
        E: IntoIterator,
        E::Item: Into<String>,
    {
        Self {
            view: view.into_iter().map(Into::into).collect(),
            edit: edit.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns the entries for a mode.
    pub fn entries(&self, mode: AccessMode) -> &[String] {
        match mode {
            AccessMode::View => &self.view,
            AccessMode::Edit => &self.edit,
        }
    }

    /// Returns `true` if the group grants nothing.
    pub fn is_empty(&self) -> bool {
        self.view.is_empty() && self.edit.is_empty()
    }
}

// =============================================================================
// PermissionSet
// =============================================================================

/// Effective permissions of one request, resolved from the principal's groups.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionSet {
    view: BTreeSet<String>,
    edit: BTreeSet<String>,
}

impl PermissionSet {
    /// Creates an empty permission set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Unions the entries of every given group.
    pub fn from_groups<'a>(groups: impl IntoIterator<Item = &'a GroupPermissions>) -> Self {
        let mut set = Self::new();
        for permissions in groups {
            set.merge(permissions);
        }
        set
    }

    /// Adds a single grant.
    pub fn grant(&mut self, resource: impl Into<String>, mode: AccessMode) {
        self.grants_mut(mode).insert(resource.into());
    }

    /// Merges a group's entries into this set.
    pub fn merge(&mut self, permissions: &GroupPermissions) {
        self.view.extend(permissions.view.iter().cloned());
        self.edit.extend(permissions.edit.iter().cloned());
    }

    /// Returns the resources granted for a mode.
    pub fn grants(&self, mode: AccessMode) -> &BTreeSet<String> {
        match mode {
            AccessMode::View => &self.view,
            AccessMode::Edit => &self.edit,
        }
    }

    fn grants_mut(&mut self, mode: AccessMode) -> &mut BTreeSet<String> {
        match mode {
            AccessMode::View => &mut self.view,
            AccessMode::Edit => &mut self.edit,
        }
    }

    /// Returns `true` if `resource` (or the wildcard) is granted for `mode`.
    pub fn allows(&self, resource: &str, mode: AccessMode) -> bool {
        let grants = self.grants(mode);
        grants.contains(WILDCARD) || grants.contains(resource)
    }

    /// Returns `true` if the wildcard is granted for `mode`.
    pub fn is_unrestricted(&self, mode: AccessMode) -> bool {
        self.grants(mode).contains(WILDCARD)
    }

    /// Returns `true` if nothing is granted in either mode.
    pub fn is_empty(&self) -> bool {
        self.view.is_empty() && self.edit.is_empty()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_mode_parse() {
        assert_eq!(AccessMode::parse("view"), Some(AccessMode::View));
        assert_eq!(AccessMode::parse("EDIT"), Some(AccessMode::Edit));
        assert_eq!(AccessMode::parse("delete"), None);
    }

    #[test]
    fn test_access_mode_from_method() {
        assert_eq!(AccessMode::from_method(&Method::GET), AccessMode::View);
        assert_eq!(AccessMode::from_method(&Method::HEAD), AccessMode::View);
        assert_eq!(AccessMode::from_method(&Method::POST), AccessMode::Edit);
        assert_eq!(AccessMode::from_method(&Method::PATCH), AccessMode::Edit);
        assert_eq!(AccessMode::from_method(&Method::DELETE), AccessMode::Edit);
    }

    #[test]
    fn test_modes_are_independent() {
        let set = PermissionSet::from_groups([&GroupPermissions::new(
            Vec::<String>::new(),
            ["laundry"],
        )]);

        assert!(set.allows("laundry", AccessMode::Edit));
        assert!(!set.allows("laundry", AccessMode::View));
    }

    #[test]
    fn test_wildcard_is_per_mode() {
        let set = PermissionSet::from_groups([&GroupPermissions::new([WILDCARD], ["meal"])]);

        assert!(set.allows("anything", AccessMode::View));
        assert!(set.is_unrestricted(AccessMode::View));
        assert!(!set.allows("anything", AccessMode::Edit));
        assert!(set.allows("meal", AccessMode::Edit));
    }

    #[test]
    fn test_merge_deduplicates() {
        let a = GroupPermissions::new(["laundry", "meal"], ["laundry"]);
        let b = GroupPermissions::new(["meal"], ["laundry"]);

        let mut set = PermissionSet::from_groups([&a, &b]);
        set.merge(&a);
        set.merge(&b);

        assert_eq!(set.grants(AccessMode::View).len(), 2);
        assert_eq!(set.grants(AccessMode::Edit).len(), 1);
    }

    #[test]
    fn test_grant() {
        let mut set = PermissionSet::new();
        assert!(set.is_empty());

        set.grant("frigo", AccessMode::View);
        assert!(set.allows("frigo", AccessMode::View));
        assert!(!set.is_empty());
    }
}
