// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The authenticated actor of a request.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Claims;
use crate::store::GroupId;

// =============================================================================
// PrincipalKind
// =============================================================================

/// Whether the principal is a student or a teacher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PrincipalKind {
    /// A student, identified by grade, class and seat number.
    Student {
        /// School grade.
        grade: u8,
        /// Class within the grade.
        class: u8,
        /// Seat number within the class.
        number: u8,
    },
    /// Any non-student account.
    Teacher,
}

impl PrincipalKind {
    /// Decides the kind from token claims. A `grade` claim makes a student.
    pub fn from_claims(claims: &Claims) -> Self {
        match claims.grade {
            Some(grade) => PrincipalKind::Student {
                grade,
                class: claims.class.unwrap_or_default(),
                number: claims.number.unwrap_or_default(),
            },
            None => PrincipalKind::Teacher,
        }
    }

    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            PrincipalKind::Student { .. } => "student",
            PrincipalKind::Teacher => "teacher",
        }
    }
}

// =============================================================================
// PrincipalProfile
// =============================================================================

/// Base identity handed out by an identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrincipalProfile {
    /// Principal ID, becomes the token subject.
    pub id: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Student or teacher.
    pub kind: PrincipalKind,
    /// Group memberships.
    #[serde(default)]
    pub groups: Vec<String>,
}

// =============================================================================
// Principal
// =============================================================================

/// Authenticated actor for one request.
///
/// Built from verified access-token claims and attached to the request
/// extensions by the auth middleware. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    /// Principal ID.
    pub id: String,
    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Student or teacher.
    pub kind: PrincipalKind,
    /// Group memberships.
    pub groups: BTreeSet<GroupId>,
    /// Request ID for tracing.
    pub request_id: Uuid,
    /// Raw verified claims.
    #[serde(skip)]
    pub claims: Option<Claims>,
}

impl Principal {
    /// Creates a principal from verified claims.
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            id: claims.sub.clone(),
            name: claims.name.clone(),
            kind: PrincipalKind::from_claims(&claims),
            groups: claims.groups.iter().map(GroupId::from).collect(),
            request_id: Uuid::now_v7(),
            claims: Some(claims),
        }
    }

    /// Returns `true` if the principal is a student.
    pub fn is_student(&self) -> bool {
        matches!(self.kind, PrincipalKind::Student { .. })
    }

    /// Returns `true` if the principal is a teacher.
    pub fn is_teacher(&self) -> bool {
        !self.is_student()
    }

    /// Returns `true` if the principal belongs to the group.
    pub fn in_group(&self, group: &GroupId) -> bool {
        self.groups.contains(group)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grade_claim_makes_student() {
        let mut claims = Claims::new("s-2104", 3600);
        claims.grade = Some(2);
        claims.class = Some(1);
        claims.number = Some(4);

        let principal = Principal::from_claims(claims);

        assert!(principal.is_student());
        assert_eq!(
            principal.kind,
            PrincipalKind::Student {
                grade: 2,
                class: 1,
                number: 4
            }
        );
    }

    #[test]
    fn test_each_principal_gets_own_request_id() {
        let first = Principal::from_claims(Claims::new("t-001", 3600));
        let second = Principal::from_claims(Claims::new("t-001", 3600));

        assert_eq!(first.request_id.get_version_num(), 7);
        assert_ne!(first.request_id, second.request_id);
    }

    #[test]
    fn test_no_grade_makes_teacher() {
        let mut claims = Claims::new("t-001", 3600);
        claims.class = Some(3);

        let principal = Principal::from_claims(claims);

        assert!(principal.is_teacher());
        assert_eq!(principal.kind.as_str(), "teacher");
    }

    #[test]
    fn test_groups_collapse() {
        let mut claims = Claims::new("t-001", 3600);
        claims.groups = vec!["dorm".into(), "admin".into(), "dorm".into()];

        let principal = Principal::from_claims(claims);

        assert_eq!(principal.groups.len(), 2);
        assert!(principal.in_group(&GroupId::from("dorm")));
        assert!(!principal.in_group(&GroupId::from("meal")));
    }

    #[test]
    fn test_kind_serialization() {
        let kind = PrincipalKind::Student {
            grade: 1,
            class: 2,
            number: 3,
        };
        let json = serde_json::to_value(kind).unwrap();
        assert_eq!(json["type"], "student");
        assert_eq!(json["grade"], 1);

        let teacher: PrincipalKind =
            serde_json::from_value(serde_json::json!({ "type": "teacher" })).unwrap();
        assert_eq!(teacher, PrincipalKind::Teacher);
    }
}
