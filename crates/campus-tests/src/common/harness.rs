// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Harness
//!
//! Builds the full router over fixture stores and drives it in-process.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use campus_api::auth::{Account, PrincipalProfile, StaticIdentityProvider};
use campus_api::store::{Group, GroupStore, MemoryTokenStore};
use campus_api::{ApiConfig, ApiServerBuilder, AppState};

use super::fixtures::{GroupFixtures, KeyFixtures, PrincipalFixtures};
use super::mocks::CountingGroupStore;

// =============================================================================
// TestResponse
// =============================================================================

/// A buffered response.
#[derive(Debug)]
pub struct TestResponse {
    /// Status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Parsed JSON body, `Value::Null` when empty or not JSON.
    pub body: Value,
}

impl TestResponse {
    /// Returns the `data` member of a success envelope.
    pub fn data(&self) -> &Value {
        &self.body["data"]
    }

    /// Returns the `error` member of a failure envelope.
    pub fn error(&self) -> Option<&str> {
        self.body["error"].as_str()
    }

    /// Returns the `code` member of a failure envelope.
    pub fn code(&self) -> Option<&str> {
        self.body["code"].as_str()
    }

    /// Returns the `Set-Cookie` header, if any.
    pub fn set_cookie(&self) -> Option<&str> {
        self.headers
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
    }
}

// =============================================================================
// TestApp
// =============================================================================

/// The full router over in-memory collaborators.
pub struct TestApp {
    router: Router,
    state: AppState,
    groups: Arc<CountingGroupStore>,
}

impl TestApp {
    /// Builds an app with the fixture groups and roster.
    pub fn new() -> Self {
        Self::with(GroupFixtures::all(), PrincipalFixtures::roster())
    }

    /// Builds an app with the given groups and accounts.
    pub fn with(groups: Vec<Group>, accounts: Vec<Account>) -> Self {
        let config = ApiConfig::new().with_jwt(KeyFixtures::jwt_config());
        Self::with_config(config, groups, accounts)
    }

    /// Builds an app with an explicit API config.
    pub fn with_config(config: ApiConfig, groups: Vec<Group>, accounts: Vec<Account>) -> Self {
        let store = Arc::new(CountingGroupStore::with_groups(groups));

        let server = ApiServerBuilder::new()
            .config(config)
            .group_store(store.clone() as Arc<dyn GroupStore>)
            .token_store(Arc::new(MemoryTokenStore::new()))
            .identity_provider(Arc::new(StaticIdentityProvider::new(accounts)))
            .build()
            .expect("server should build");

        Self {
            router: server.router(),
            state: server.state().clone(),
            groups: store,
        }
    }

    /// Shared state, for minting tokens directly.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// The instrumented group store.
    pub fn groups(&self) -> &CountingGroupStore {
        &self.groups
    }

    /// Mints an access token for a profile without logging in.
    pub fn token_for(&self, profile: &PrincipalProfile) -> String {
        self.state
            .jwt()
            .issue_access(profile)
            .expect("access token should issue")
            .token
    }

    /// Sends a request and buffers the response.
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should buffer");
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Sends a request with an optional bearer token and JSON body.
    pub async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request should build");

        self.send(request).await
    }

    /// GET with a bearer token.
    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.call(Method::GET, uri, Some(token), None).await
    }

    /// POST /auth/login.
    pub async fn login(&self, login: &str, password: &str) -> TestResponse {
        let body = serde_json::json!({ "login": login, "password": password });
        self.call(Method::POST, "/auth/login", None, Some(body)).await
    }

    /// POST /auth/refresh.
    pub async fn refresh(&self, refresh_token: &str) -> TestResponse {
        let body = serde_json::json!({ "refreshToken": refresh_token });
        self.call(Method::POST, "/auth/refresh", None, Some(body)).await
    }

    /// POST /auth/logout.
    pub async fn logout(&self, refresh_token: &str) -> TestResponse {
        let body = serde_json::json!({ "refreshToken": refresh_token });
        self.call(Method::POST, "/auth/logout", None, Some(body)).await
    }

    /// Logs in with the fixture password and returns `(access, refresh)`.
    pub async fn login_pair(&self, login: &str) -> (String, String) {
        let response = self.login(login, PrincipalFixtures::PASSWORD).await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {:?}", response.body);

        let access = response.data()["accessToken"]
            .as_str()
            .expect("access token")
            .to_string();
        let refresh = response.data()["refreshToken"]
            .as_str()
            .expect("refresh token")
            .to_string();
        (access, refresh)
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
