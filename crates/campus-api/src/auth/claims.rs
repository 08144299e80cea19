// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! JWT claims structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::principal::{PrincipalKind, PrincipalProfile};

// =============================================================================
// TokenKind
// =============================================================================

/// Kind of token being issued or expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    /// Short-lived credential authorizing requests.
    Access,
    /// Long-lived credential used only to mint new access tokens.
    Refresh,
}

impl TokenKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

// =============================================================================
// Claims
// =============================================================================

/// JWT claims for authentication.
///
/// Student identity travels flat on the wire (`grade`, `class`, `number`);
/// presence of `grade` is what marks a student.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    // =========================================================================
    // Standard JWT Claims (RFC 7519)
    // =========================================================================
    /// Subject - the principal ID.
    pub sub: String,

    /// Expiration time (Unix timestamp).
    pub exp: i64,

    /// Issued at time (Unix timestamp).
    pub iat: i64,

    /// Issuer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,

    /// JWT ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    // =========================================================================
    // Custom Claims
    // =========================================================================
    /// `true` on refresh tokens.
    #[serde(default)]
    pub refresh: bool,

    /// Display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Group memberships.
    #[serde(default)]
    pub groups: Vec<String>,

    /// School grade (students only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grade: Option<u8>,

    /// Class within the grade (students only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<u8>,

    /// Seat number within the class (students only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<u8>,
}

impl Claims {
    /// Creates bare claims for a subject.
    pub fn new(subject: impl Into<String>, expires_in_secs: i64) -> Self {
        let now = Utc::now().timestamp();

        Self {
            sub: subject.into(),
            exp: now + expires_in_secs,
            iat: now,
            iss: None,
            jti: Some(Uuid::now_v7().to_string()),
            refresh: false,
            name: None,
            groups: Vec::new(),
            grade: None,
            class: None,
            number: None,
        }
    }

    /// Creates access claims carrying a principal's profile.
    pub fn for_profile(profile: &PrincipalProfile, expires_in_secs: i64) -> Self {
        let mut claims = Self::new(&profile.id, expires_in_secs);
        claims.name = profile.name.clone();
        claims.groups = profile.groups.clone();

        if let PrincipalKind::Student {
            grade,
            class,
            number,
        } = profile.kind
        {
            claims.grade = Some(grade);
            claims.class = Some(class);
            claims.number = Some(number);
        }

        claims
    }

    /// Creates refresh claims; they carry only the subject.
    pub fn refresh(subject: impl Into<String>, expires_in_secs: i64) -> Self {
        let mut claims = Self::new(subject, expires_in_secs);
        claims.refresh = true;
        claims
    }

    /// Returns the principal ID.
    pub fn subject(&self) -> &str {
        &self.sub
    }

    /// Returns the kind of token these claims belong to.
    pub fn kind(&self) -> TokenKind {
        if self.refresh {
            TokenKind::Refresh
        } else {
            TokenKind::Access
        }
    }

    /// Returns `true` if the claims mark a student.
    pub fn is_student(&self) -> bool {
        self.grade.is_some()
    }

    /// Returns `true` if the token has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() > self.exp
    }

    /// Returns the expiration time as a DateTime.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }

    /// Sets the issuer.
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.iss = Some(issuer.into());
        self
    }
}

// =============================================================================
// Tests
// =============================================================================
