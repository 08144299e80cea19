// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Teacher-only middleware.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};

use crate::auth::{gate, Principal};
use crate::error::ApiError;

/// Layer rejecting student principals regardless of their permissions.
///
/// Must sit outside any [`super::PermissionLayer`] on the same route so that
/// students are turned away before the group store is read.
#[derive(Debug, Clone, Copy, Default)]
pub struct TeacherOnlyLayer;

impl TeacherOnlyLayer {
    /// Creates the layer.
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for TeacherOnlyLayer {
    type Service = TeacherOnlyMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        TeacherOnlyMiddleware { inner }
    }
}

/// Middleware for the teacher-only gate.
#[derive(Debug, Clone)]
pub struct TeacherOnlyMiddleware<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for TeacherOnlyMiddleware<S>
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
        let verdict = match req.extensions().get::<Principal>() {
            Some(principal) => gate::require_teacher(principal).inspect_err(|_| {
                tracing::warn!(
                    principal = %principal.id,
                    path = %req.uri().path(),
                    "Student denied on teacher-only route"
                );
            }),
            None => Err(ApiError::unauthorized("Authentication required")),
        };
        let mut inner = self.inner.clone();

        Box::pin(async move {
            match verdict {
                Ok(()) => inner.call(req).await,
                Err(e) => Ok(e.into_response()),
            }
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
