// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API error types and handling.
//!
//! Every failure raised while handling a request ends up here and is rendered
//! into the failure envelope:
//!
//! ```json
//! { "ok": false, "status": 403, "error": "Access denied" }
//! { "ok": false, "status": 409, "error": "Group name is taken", "code": "GROUP_NAME_TAKEN" }
//! ```
//!
//! `code` is only present for [`ApiError::Coded`], the variant carrying a
//! structured `[code, message]` pair.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// ApiError
// =============================================================================

/// API error type with HTTP status code mapping.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing, malformed, expired or revoked credentials (401).
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Internal reason. Logged, never sent to the client.
        message: String,
    },

    /// Wrong token kind, malformed body or query (400).
    #[error("Bad request: {message}")]
    BadRequest {
        /// Error message.
        message: String,
    },

    /// Authorization gate denial (403).
    #[error("Forbidden: {message}")]
    Forbidden {
        /// Internal reason. Logged, never sent to the client.
        message: String,
    },

    /// Resource not found (404).
    #[error("Resource not found: {resource}")]
    NotFound {
        /// The resource that was not found.
        resource: String,
    },

    /// Failure carrying a structured `[code, message]` pair.
    #[error("{code}: {message}")]
    Coded {
        /// HTTP status to respond with.
        status: StatusCode,
        /// Machine readable code.
        code: String,
        /// Human readable message.
        message: String,
    },

    /// Internal server error (500).
    #[error("Internal error: {message}")]
    Internal {
        /// Error message (for logging, not user-facing).
        message: String,
    },
}

impl ApiError {
    // =========================================================================
    // Constructors
    // =========================================================================

    /// Creates an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Creates a bad request error.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    /// Creates a forbidden error.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Creates an error carrying a structured code.
    pub fn coded(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Coded {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Forbidden { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Coded { status, .. } => *status,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the structured code, if this error carries one.
    pub fn code(&self) -> Option<&str> {
        match self {
            ApiError::Coded { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Returns the message that is safe to show to clients.
    ///
    /// Authentication failures collapse into one message so callers cannot
    /// tell a bad signature from an expired or revoked token.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Unauthorized { .. } => "Authentication required".to_string(),
            ApiError::BadRequest { message } => message.clone(),
            ApiError::Forbidden { .. } => "Access denied".to_string(),
            ApiError::NotFound { resource } => format!("{} not found", resource),
            ApiError::Coded { message, .. } => message.clone(),
            ApiError::Internal { .. } => "Internal server error".to_string(),
        }
    }

    /// Returns `true` if this error should be logged at error level.
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }
}

// =============================================================================
// IntoResponse Implementation
// =============================================================================

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if self.is_server_error() {
            tracing::error!(error = %self, status = %status, "Server error occurred");
        } else {
            tracing::debug!(error = %self, status = %status, "Client error occurred");
        }

        let body = ErrorEnvelope {
            ok: false,
            status: status.as_u16(),
            error: self.user_message(),
            code: self.code().map(str::to_string),
        };

        (status, Json(body)).into_response()
    }
}

// =============================================================================
// Error Envelope
// =============================================================================

/// Failure envelope sent to clients.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Always `false`.
    pub ok: bool,
    /// HTTP status code.
    pub status: u16,
    /// Human readable message.
    pub error: String,
    /// Structured code, when the failure carried one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

// =============================================================================
// From Implementations
// =============================================================================

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::bad_request(format!("Invalid JSON: {}", err))
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            ApiError::unauthorized("no token").status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::bad_request("invalid").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::forbidden("no access").status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::not_found("group").status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::coded(StatusCode::CONFLICT, "TAKEN", "taken").status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            ApiError::internal("crash").status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_unauthorized_reason_is_hidden() {
        let expired = ApiError::unauthorized("Token has expired");
        let forged = ApiError::unauthorized("Invalid token signature");

        assert_eq!(expired.user_message(), forged.user_message());
        assert!(!expired.user_message().contains("expired"));
    }

    #[test]
    fn test_code_only_on_coded() {
        assert_eq!(ApiError::bad_request("x").code(), None);
        assert_eq!(
            ApiError::coded(StatusCode::BAD_REQUEST, "INVALID_NAME", "x").code(),
            Some("INVALID_NAME")
        );
    }

    #[tokio::test]
    async fn test_error_envelope_shape() {
        let response =
            ApiError::coded(StatusCode::CONFLICT, "GROUP_NAME_TAKEN", "taken").into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["ok"], false);
        assert_eq!(json["status"], 409);
        assert_eq!(json["error"], "taken");
        assert_eq!(json["code"], "GROUP_NAME_TAKEN");
    }

    #[tokio::test]
    async fn test_error_envelope_without_code() {
        let response = ApiError::forbidden("gate").into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["status"], 403);
        assert!(json.get("code").is_none());
    }
}
