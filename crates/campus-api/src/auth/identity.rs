// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Identity providers.
//!
//! An identity provider exchanges a login credential for a
//! [`PrincipalProfile`], the base claims an access token is issued from.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use super::principal::PrincipalProfile;
use crate::error::{ApiError, ApiResult};

// =============================================================================
// LoginRequest
// =============================================================================

/// Login request body.
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    /// Login name.
    #[serde(alias = "username")]
    pub login: String,
    /// Password.
    pub password: String,
}

// =============================================================================
// IdentityProvider
// =============================================================================

/// Source of principal identities.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Authenticates a login request.
    ///
    /// Returns `Unauthorized` for unknown logins and wrong passwords alike.
    async fn authenticate(&self, request: &LoginRequest) -> ApiResult<PrincipalProfile>;

    /// Looks up the current profile of a principal.
    async fn profile(&self, id: &str) -> ApiResult<Option<PrincipalProfile>>;
}

// =============================================================================
// StaticIdentityProvider
// =============================================================================

/// An account known to [`StaticIdentityProvider`].
#[derive(Debug, Clone)]
pub struct Account {
    /// Login name.
    pub login: String,
    /// Password.
    pub password: String,
    /// Profile handed out on success.
    pub profile: PrincipalProfile,
}

/// Identity provider backed by a fixed account table.
#[derive(Debug, Default)]
pub struct StaticIdentityProvider {
    by_login: HashMap<String, Account>,
    login_of: HashMap<String, String>,
}

impl StaticIdentityProvider {
    /// Creates a provider from accounts. Later duplicates replace earlier ones.
    pub fn new(accounts: impl IntoIterator<Item = Account>) -> Self {
        let mut provider = Self::default();
        for account in accounts {
            provider
                .login_of
                .insert(account.profile.id.clone(), account.login.clone());
            provider.by_login.insert(account.login.clone(), account);
        }
        provider
    }

    /// Returns the number of accounts.
    pub fn len(&self) -> usize {
        self.by_login.len()
    }

    /// Returns `true` if there are no accounts.
    pub fn is_empty(&self) -> bool {
        self.by_login.is_empty()
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn authenticate(&self, request: &LoginRequest) -> ApiResult<PrincipalProfile> {
        match self.by_login.get(&request.login) {
            Some(account) if account.password == request.password => Ok(account.profile.clone()),
            Some(_) => Err(ApiError::unauthorized(format!(
                "Wrong password for '{}'",
                request.login
            ))),
            None => Err(ApiError::unauthorized(format!(
                "Unknown login '{}'",
                request.login
            ))),
        }
    }

    async fn profile(&self, id: &str) -> ApiResult<Option<PrincipalProfile>> {
        Ok(self
            .login_of
            .get(id)
            .and_then(|login| self.by_login.get(login))
            .map(|account| account.profile.clone()))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::PrincipalKind;
    use axum::http::StatusCode;

    fn provider() -> StaticIdentityProvider {
        StaticIdentityProvider::new([Account {
            login: "park".to_string(),
            password: "chalk".to_string(),
            profile: PrincipalProfile {
                id: "t-001".to_string(),
                name: Some("Park".to_string()),
                kind: PrincipalKind::Teacher,
                groups: vec!["admin".to_string()],
            },
        }])
    }

    fn login(login: &str, password: &str) -> LoginRequest {
        LoginRequest {
            login: login.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_authenticate() {
        let profile = provider().authenticate(&login("park", "chalk")).await.unwrap();
        assert_eq!(profile.id, "t-001");
    }

    #[tokio::test]
    async fn test_authenticate_failures_are_unauthorized() {
        let provider = provider();

        let wrong = provider.authenticate(&login("park", "eraser")).await.unwrap_err();
        let unknown = provider.authenticate(&login("kim", "chalk")).await.unwrap_err();

        assert_eq!(wrong.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(wrong.user_message(), unknown.user_message());
    }

    #[tokio::test]
    async fn test_profile_lookup() {
        let provider = provider();

        assert!(provider.profile("t-001").await.unwrap().is_some());
        assert!(provider.profile("t-999").await.unwrap().is_none());
    }

    #[test]
    fn test_login_request_accepts_username_alias() {
        let request: LoginRequest =
            serde_json::from_str(r#"{"username":"park","password":"chalk"}"#).unwrap();
        assert_eq!(request.login, "park");
    }
}
