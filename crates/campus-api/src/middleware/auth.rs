// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! JWT authentication middleware.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::{header, Request},
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};

use crate::auth::{JwtManager, Principal};
use crate::config::DEFAULT_ACCESS_COOKIE;
use crate::error::ApiError;

// =============================================================================
// AuthLayer
// =============================================================================

/// Layer for JWT authentication.
///
/// Extracts the access token from the `Authorization: Bearer` header, falling
/// back to the access-token cookie, verifies it and attaches the resulting
/// [`Principal`] to the request extensions.
#[derive(Clone)]
pub struct AuthLayer {
    jwt_manager: Arc<JwtManager>,
    cookie_name: Arc<str>,
    public_paths: Arc<HashSet<String>>,
}

impl AuthLayer {
    /// Creates a new auth layer.
    pub fn new(jwt_manager: Arc<JwtManager>) -> Self {
        Self {
            jwt_manager,
            cookie_name: Arc::from(DEFAULT_ACCESS_COOKIE),
            public_paths: Arc::new(HashSet::new()),
        }
    }

    /// Sets the name of the cookie consulted when no bearer header is present.
    pub fn with_cookie_name(mut self, name: impl AsRef<str>) -> Self {
        self.cookie_name = Arc::from(name.as_ref());
        self
    }

    /// Adds public paths that don't require authentication.
    pub fn with_public_paths(mut self, paths: Vec<String>) -> Self {
        self.public_paths = Arc::new(paths.into_iter().collect());
        self
    }

    /// Creates with default public paths.
    pub fn with_default_public_paths(self) -> Self {
        self.with_public_paths(crate::config::default_public_paths())
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            jwt_manager: self.jwt_manager.clone(),
            cookie_name: self.cookie_name.clone(),
            public_paths: self.public_paths.clone(),
        }
    }
}

// =============================================================================
// AuthMiddleware
// =============================================================================

/// Middleware for JWT authentication.
#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    jwt_manager: Arc<JwtManager>,
    cookie_name: Arc<str>,
    public_paths: Arc<HashSet<String>>,
}

impl<S> AuthMiddleware<S> {
    /// Checks if a path is public.
    fn is_public_path(&self, path: &str) -> bool {
        // Check exact matches
        if self.public_paths.contains(path) {
            return true;
        }

        // Check prefix matches for paths with parameters
        self.public_paths.iter().any(|public_path| {
            public_path
                .strip_suffix('*')
                .is_some_and(|prefix| path.starts_with(prefix))
        })
    }
}

impl<S> Service<Request<Body>> for AuthMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let jwt_manager = self.jwt_manager.clone();
        let is_public = self.is_public_path(req.uri().path());
        let token = extract_token(&req, &self.cookie_name);
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if is_public {
                return inner.call(req).await;
            }

            let Some(token) = token else {
                tracing::debug!(path = %req.uri().path(), "No access token provided");
                return Ok(ApiError::unauthorized("No access token provided").into_response());
            };

            let claims = match jwt_manager.verify_access(&token) {
                Ok(claims) => claims,
                Err(e) => {
                    tracing::debug!(error = %e, "Access token rejected");
                    return Ok(e.into_response());
                }
            };

            let principal = Principal::from_claims(claims);
            tracing::debug!(
                principal = %principal.id,
                kind = principal.kind.as_str(),
                request_id = %principal.request_id,
                "Request authenticated"
            );

            req.extensions_mut().insert(principal);

            inner.call(req).await
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Extracts the access token: bearer header first, then the named cookie.
fn extract_token<B>(req: &Request<B>, cookie_name: &str) -> Option<String> {
    extract_bearer_token(req).or_else(|| extract_cookie(req, cookie_name))
}

/// Extracts the bearer token from the Authorization header.
///
/// The scheme name is matched case-insensitively.
fn extract_bearer_token<B>(req: &Request<B>) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim_start().split_once(' '))
        .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_string())
}

/// Extracts a cookie value by name from every Cookie header.
fn extract_cookie<B>(req: &Request<B>, name: &str) -> Option<String> {
    req.headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

// =============================================================================
// Tests
// =============================================================================
