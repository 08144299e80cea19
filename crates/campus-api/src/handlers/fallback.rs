// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Fallback handlers for unmatched routes and methods.

use axum::http::{Method, StatusCode, Uri};

use crate::error::ApiError;

/// Handler for paths no route matches.
pub async fn route_not_found(uri: Uri) -> ApiError {
    ApiError::not_found(format!("Route {}", uri.path()))
}

/// Handler for known paths requested with an unsupported method.
pub async fn method_not_allowed(method: Method, uri: Uri) -> ApiError {
    ApiError::coded(
        StatusCode::METHOD_NOT_ALLOWED,
        "METHOD_NOT_ALLOWED",
        format!("Method {} is not allowed on {}", method, uri.path()),
    )
}
