// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Application state shared across handlers.

use std::sync::Arc;

use crate::auth::{IdentityProvider, JwtManager, PermissionResolver, StaticIdentityProvider};
use crate::config::ApiConfig;
use crate::store::{GroupStore, MemoryGroupStore, MemoryTokenStore, TokenStore};

// =============================================================================
// AppState
// =============================================================================

/// Application state shared across all handlers.
///
/// This is the central state container that is passed to all handlers via
/// Axum's state extraction mechanism.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: Arc<ApiConfig>,
    /// JWT manager for token operations.
    pub jwt_manager: Arc<JwtManager>,
    /// Permission resolver backed by the group store.
    pub resolver: PermissionResolver,
    /// Group store.
    pub groups: Arc<dyn GroupStore>,
    /// Outstanding refresh tokens.
    pub tokens: Arc<dyn TokenStore>,
    /// Identity provider used by login and refresh.
    pub identity: Arc<dyn IdentityProvider>,
}

impl AppState {
    /// Creates a new app state builder.
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }

    /// Returns the JWT manager.
    pub fn jwt(&self) -> &JwtManager {
        &self.jwt_manager
    }

    /// Returns the permission resolver.
    pub fn resolver(&self) -> &PermissionResolver {
        &self.resolver
    }

    /// Returns the group store.
    pub fn groups(&self) -> &Arc<dyn GroupStore> {
        &self.groups
    }

    /// Returns the refresh token store.
    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Returns the identity provider.
    pub fn identity(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("jwt_manager", &self.jwt_manager)
            .finish_non_exhaustive()
    }
}

// =============================================================================
// AppStateBuilder
// =============================================================================

/// Builder for constructing AppState.
///
/// Collaborators left unset fall back to empty in-memory implementations.
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<ApiConfig>,
    jwt_manager: Option<Arc<JwtManager>>,
    groups: Option<Arc<dyn GroupStore>>,
    tokens: Option<Arc<dyn TokenStore>>,
    identity: Option<Arc<dyn IdentityProvider>>,
}

impl AppStateBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration.
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the JWT manager.
    pub fn jwt_manager(mut self, manager: Arc<JwtManager>) -> Self {
        self.jwt_manager = Some(manager);
        self
    }

    /// Sets the group store.
    pub fn group_store(mut self, store: Arc<dyn GroupStore>) -> Self {
        self.groups = Some(store);
        self
    }

    /// Sets the refresh token store.
    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.tokens = Some(store);
        self
    }

    /// Sets the identity provider.
    pub fn identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(provider);
        self
    }

    /// Builds the AppState.
    ///
    /// Fails if no JWT manager was given and one cannot be built from the
    /// configuration.
    pub fn build(self) -> crate::error::ApiResult<AppState> {
        let config = self.config.unwrap_or_default();

        let jwt_manager = match self.jwt_manager {
            Some(manager) => manager,
            None => Arc::new(JwtManager::new(config.jwt.clone())?),
        };

        let groups = self
            .groups
            .unwrap_or_else(|| Arc::new(MemoryGroupStore::new()));
        let tokens = self
            .tokens
            .unwrap_or_else(|| Arc::new(MemoryTokenStore::new()));
        let identity = self
            .identity
            .unwrap_or_else(|| Arc::new(StaticIdentityProvider::default()));

        Ok(AppState {
            config: Arc::new(config),
            jwt_manager,
            resolver: PermissionResolver::new(groups.clone()),
            groups,
            tokens,
            identity,
        })
    }
}

// =============================================================================
// FromRef implementations for extracting parts of state
// =============================================================================

impl axum::extract::FromRef<AppState> for Arc<JwtManager> {
    fn from_ref(state: &AppState) -> Self {
        state.jwt_manager.clone()
    }
}

impl axum::extract::FromRef<AppState> for Arc<ApiConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl axum::extract::FromRef<AppState> for PermissionResolver {
    fn from_ref(state: &AppState) -> Self {
        state.resolver.clone()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_jwt_config;

    #[test]
    fn test_app_state_builder() {
        let config = ApiConfig::default().with_jwt(test_jwt_config());

        let state = AppState::builder().config(config).build().unwrap();

        assert_eq!(state.jwt().issuer(), "campus");
        assert_eq!(state.config.access_cookie, "access-token");
    }

    #[test]
    fn test_app_state_requires_keys() {
        assert!(AppState::builder().build().is_err());
    }

    #[tokio::test]
    async fn test_resolver_shares_group_store() {
        let store = Arc::new(MemoryGroupStore::new());
        let state = AppState::builder()
            .config(ApiConfig::default().with_jwt(test_jwt_config()))
            .group_store(store.clone())
            .build()
            .unwrap();

        state
            .groups()
            .create(crate::store::NewGroup {
                name: "dorm".to_string(),
                permissions: Default::default(),
            })
            .await
            .unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(state.resolver().store().list().await.unwrap().len(), 1);
    }
}
