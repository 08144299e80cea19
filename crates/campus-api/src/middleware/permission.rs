// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Group permission middleware.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    extract::OriginalUri,
    http::Request,
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};

use crate::auth::{gate, AccessMode, PermissionResolver, Principal};
use crate::error::ApiError;

/// How a [`PermissionLayer`] picks the access mode of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeRequirement {
    /// Always the given mode.
    Fixed(AccessMode),
    /// Derived from the HTTP method.
    ByMethod,
}

impl ModeRequirement {
    fn mode_for<B>(&self, req: &Request<B>) -> AccessMode {
        match self {
            ModeRequirement::Fixed(mode) => *mode,
            ModeRequirement::ByMethod => AccessMode::from_method(req.method()),
        }
    }
}

// =============================================================================
// PermissionLayer
// =============================================================================

/// Layer resolving the principal's permissions and gating the request.
///
/// The resource is the first segment of the request path.
#[derive(Clone)]
pub struct PermissionLayer {
    resolver: PermissionResolver,
    mode: ModeRequirement,
}

impl PermissionLayer {
    /// Creates a layer requiring a fixed mode.
    pub fn require(resolver: PermissionResolver, mode: AccessMode) -> Self {
        Self {
            resolver,
            mode: ModeRequirement::Fixed(mode),
        }
    }

    /// Creates a layer deriving the mode from the HTTP method.
    pub fn by_method(resolver: PermissionResolver) -> Self {
        Self {
            resolver,
            mode: ModeRequirement::ByMethod,
        }
    }
}

impl<S> Layer<S> for PermissionLayer {
    type Service = PermissionMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        PermissionMiddleware {
            inner,
            resolver: self.resolver.clone(),
            mode: self.mode,
        }
    }
}

// =============================================================================
// PermissionMiddleware
// =============================================================================

/// Middleware for group permission enforcement.
#[derive(Clone)]
pub struct PermissionMiddleware<S> {
    inner: S,
    resolver: PermissionResolver,
    mode: ModeRequirement,
}

impl<S> Service<Request<Body>> for PermissionMiddleware<S>
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

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let resolver = self.resolver.clone();
        let mode = self.mode.mode_for(&req);
        let path = req
            .extensions()
            .get::<OriginalUri>()
            .map(|uri| uri.0.path().to_string())
            .unwrap_or_else(|| req.uri().path().to_string());
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let Some(principal) = req.extensions().get::<Principal>().cloned() else {
                tracing::warn!("No principal found, denying access");
                return Ok(ApiError::unauthorized("Authentication required").into_response());
            };

            let permissions = match resolver.resolve(&principal.groups).await {
                Ok(permissions) => permissions,
                Err(e) => return Ok(e.into_response()),
            };

            if let Err(e) = gate::authorize(&permissions, &path, mode) {
                tracing::warn!(
                    principal = %principal.id,
                    path = %path,
                    mode = %mode,
                    groups = ?principal.groups,
                    "Permission denied"
                );
                return Ok(e.into_response());
            }

            inner.call(req).await
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Claims, GroupPermissions};
    use crate::store::{Group, MemoryGroupStore};
    use axum::http::{Method, StatusCode};
    use std::convert::Infallible;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn mock_service() -> impl Service<
        Request<Body>,
        Response = Response,
        Error = Infallible,
        Future = impl Future<Output = Result<Response, Infallible>> + Send,
    > + Clone
           + Send {
        tower::service_fn(|_req: Request<Body>| async move {
            Ok::<_, Infallible>(Response::new(Body::from("reached")))
        })
    }

    fn resolver() -> PermissionResolver {
        PermissionResolver::new(Arc::new(MemoryGroupStore::with_groups([Group::new(
            "dorm",
            "dorm",
            GroupPermissions::new(["laundry"], Vec::<String>::new()),
        )])))
    }

    fn request(method: Method, uri: &str, groups: &[&str]) -> Request<Body> {
        let mut claims = Claims::new("t-001", 3600);
        claims.groups = groups.iter().map(|g| g.to_string()).collect();

        let mut req = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        req.extensions_mut().insert(Principal::from_claims(claims));
        req
    }

    #[tokio::test]
    async fn test_view_granted() {
        let service = PermissionLayer::require(resolver(), AccessMode::View).layer(mock_service());

        let response = service
            .oneshot(request(Method::GET, "/laundry/apply", &["dorm"]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"reached");
    }

    #[tokio::test]
    async fn test_edit_denied() {
        let service = PermissionLayer::require(resolver(), AccessMode::Edit).layer(mock_service());

        let response = service
            .oneshot(request(Method::GET, "/laundry/apply", &["dorm"]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_mode_by_method() {
        let layer = PermissionLayer::by_method(resolver());

        let response = layer
            .layer(mock_service())
            .oneshot(request(Method::GET, "/laundry", &["dorm"]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = layer
            .layer(mock_service())
            .oneshot(request(Method::POST, "/laundry", &["dorm"]))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_other_resource_denied() {
        let service = PermissionLayer::require(resolver(), AccessMode::View).layer(mock_service());

        let response = service
            .oneshot(request(Method::GET, "/meal", &["dorm"]))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_no_principal() {
        let service = PermissionLayer::require(resolver(), AccessMode::View).layer(mock_service());

        let req = Request::builder()
            .uri("/laundry")
            .body(Body::empty())
            .unwrap();
        let response = service.oneshot(req).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
