// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Group management handlers.
//!
//! Routed behind the teacher-only and `group` permission layers; handlers
//! assume both have passed.

use axum::{extract::State, http::StatusCode, response::IntoResponse};

use crate::auth::GroupPermissions;
use crate::error::{ApiError, ApiResult};
use crate::extractors::{Auth, GroupIdPath, ValidatedJson};
use crate::response::ApiResponse;
use crate::state::AppState;
use crate::store::{GroupPatch, NewGroup};

/// GET /group
pub async fn list_groups(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let groups = state.groups().list().await?;
    Ok(ApiResponse::ok(groups))
}

/// GET /group/{id}
pub async fn get_group(
    State(state): State<AppState>,
    GroupIdPath(id): GroupIdPath,
) -> ApiResult<impl IntoResponse> {
    let group = state
        .groups()
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Group {}", id)))?;

    Ok(ApiResponse::ok(group))
}

/// POST /group
pub async fn create_group(
    State(state): State<AppState>,
    Auth(principal): Auth,
    ValidatedJson(mut request): ValidatedJson<NewGroup>,
) -> ApiResult<impl IntoResponse> {
    request.name = validate_name(&request.name)?;
    validate_permissions(&request.permissions)?;

    let group = state.groups().create(request).await?;

    tracing::info!(
        principal = %principal.id,
        group_id = %group.id,
        group = %group.name,
        "Group created"
    );

    Ok(ApiResponse::created(group))
}

/// PATCH /group/{id}
pub async fn update_group(
    State(state): State<AppState>,
    Auth(principal): Auth,
    GroupIdPath(id): GroupIdPath,
    ValidatedJson(mut patch): ValidatedJson<GroupPatch>,
) -> ApiResult<impl IntoResponse> {
    if let Some(ref name) = patch.name {
        patch.name = Some(validate_name(name)?);
    }
    if let Some(ref permissions) = patch.permissions {
        validate_permissions(permissions)?;
    }

    let group = state.groups().update(&id, patch).await?;

    tracing::info!(principal = %principal.id, group_id = %group.id, "Group updated");

    Ok(ApiResponse::ok(group))
}

/// DELETE /group/{id}
pub async fn delete_group(
    State(state): State<AppState>,
    Auth(principal): Auth,
    GroupIdPath(id): GroupIdPath,
) -> ApiResult<impl IntoResponse> {
    state.groups().delete(&id).await?;

    tracing::info!(principal = %principal.id, group_id = %id, "Group deleted");

    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// Validation
// =============================================================================

fn validate_name(name: &str) -> ApiResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::coded(
            StatusCode::BAD_REQUEST,
            "INVALID_GROUP_NAME",
            "Group name cannot be empty",
        ));
    }
    Ok(name.to_string())
}

/// Resource entries name a single path segment, or the wildcard.
fn validate_permissions(permissions: &GroupPermissions) -> ApiResult<()> {
    let invalid = permissions
        .view
        .iter()
        .chain(permissions.edit.iter())
        .find(|entry| entry.is_empty() || entry.contains('/') || entry.trim() != entry.as_str());

    match invalid {
        Some(entry) => Err(ApiError::coded(
            StatusCode::BAD_REQUEST,
            "INVALID_PERMISSION",
            format!("'{}' is not a resource name", entry),
        )),
        None => Ok(()),
    }
}

// =============================================================================
// Tests
// =============================================================================
