// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Health check handlers.

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::response::{ApiResponse, ComponentStatus, HealthResponse, ReadinessResponse};
use crate::state::AppState;

// =============================================================================
// Health Check
// =============================================================================

/// GET /health
///
/// Simple liveness check. Returns 200 OK if the service is running.
pub async fn health() -> impl IntoResponse {
    ApiResponse::ok(HealthResponse::healthy())
}

// =============================================================================
// Readiness Check
// =============================================================================

/// GET /ready
///
/// Readiness check that verifies the collaborators are operational.
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let groups_healthy = state.groups().health_check().await;

    let components = vec![
        ComponentStatus {
            name: "group_store".to_string(),
            healthy: groups_healthy,
            message: (!groups_healthy).then(|| "Group store unavailable".to_string()),
        },
        ComponentStatus {
            name: "token_codec".to_string(),
            healthy: true,
            message: Some(format!("issuer {}", state.jwt().issuer())),
        },
    ];

    let all_healthy = components.iter().all(|c| c.healthy);
    let status = if all_healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    ApiResponse::with_status(
        status,
        ReadinessResponse {
            ready: all_healthy,
            components,
        },
    )
}

// =============================================================================
// Tests
// =============================================================================
