// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Authentication handlers.

use axum::{
    extract::State,
    http::{header, HeaderValue},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::auth::{LoginRequest, PrincipalProfile};
use crate::error::{ApiError, ApiResult};
use crate::extractors::{Auth, ValidatedJson};
use crate::response::{ApiResponse, TokenPairResponse};
use crate::state::AppState;

// =============================================================================
// Login
// =============================================================================

/// POST /auth/login
///
/// Authenticates a principal and returns an access/refresh token pair. The
/// access token is also set as a cookie.
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    if request.login.is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Login and password are required"));
    }

    let profile = state.identity().authenticate(&request).await?;
    let pair = issue_pair(&state, &profile).await?;

    let cookie = access_cookie(
        &state.config.access_cookie,
        &pair.access_token,
        pair.expires_in,
    )?;

    tracing::info!(principal = %profile.id, kind = profile.kind.as_str(), "Principal logged in");

    Ok(([(header::SET_COOKIE, cookie)], ApiResponse::ok(pair)))
}

// =============================================================================
// Refresh Token
// =============================================================================

/// Body of refresh and logout requests.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token.
    #[serde(alias = "refreshToken", alias = "refresh_token")]
    pub token: String,
}

/// POST /auth/refresh
///
/// Exchanges an outstanding refresh token for a new token pair. The presented
/// token is consumed first; a consumed or unknown token is `Unauthorized`.
pub async fn refresh_token(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RefreshRequest>,
) -> ApiResult<impl IntoResponse> {
    let claims = state.jwt().verify_refresh(&request.token)?;

    if !state.tokens().consume(&request.token).await? {
        return Err(ApiError::unauthorized("Refresh token is not outstanding"));
    }

    let profile = state
        .identity()
        .profile(claims.subject())
        .await?
        .ok_or_else(|| ApiError::unauthorized(format!("Unknown principal {}", claims.sub)))?;

    let pair = issue_pair(&state, &profile).await?;

    tracing::debug!(principal = %profile.id, "Token refreshed");

    Ok(ApiResponse::ok(pair))
}

// =============================================================================
// Logout
// =============================================================================

/// Logout response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutResponse {
    /// Always `true`.
    pub logged_out: bool,
}

/// POST /auth/logout
///
/// Consumes the presented refresh token and clears the access-token cookie.
pub async fn logout(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<RefreshRequest>,
) -> ApiResult<impl IntoResponse> {
    let claims = state.jwt().verify_refresh(&request.token)?;

    if !state.tokens().consume(&request.token).await? {
        return Err(ApiError::unauthorized("Refresh token is not outstanding"));
    }

    let cookie = access_cookie(&state.config.access_cookie, "", 0)?;

    tracing::info!(principal = %claims.sub, "Principal logged out");

    Ok((
        [(header::SET_COOKIE, cookie)],
        ApiResponse::ok(LogoutResponse { logged_out: true }),
    ))
}

// =============================================================================
// Current Principal
// =============================================================================

/// GET /auth/me
///
/// Returns the authenticated principal.
pub async fn current_principal(Auth(principal): Auth) -> ApiResult<impl IntoResponse> {
    Ok(ApiResponse::ok(principal))
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Issues an access/refresh pair and registers the refresh token.
async fn issue_pair(state: &AppState, profile: &PrincipalProfile) -> ApiResult<TokenPairResponse> {
    let access = state.jwt().issue_access(profile)?;
    let refresh = state.jwt().issue_refresh(&profile.id)?;

    state
        .tokens()
        .register(&refresh.token, refresh.expires_at)
        .await?;

    Ok(TokenPairResponse::new(
        access.token,
        refresh.token,
        state.jwt().access_ttl_secs(),
    ))
}

/// Builds the `Set-Cookie` value carrying the access token.
fn access_cookie(name: &str, token: &str, max_age: i64) -> ApiResult<HeaderValue> {
    HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        name, token, max_age
    ))
    .map_err(|e| ApiError::internal(format!("Invalid cookie value: {}", e)))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_cookie() {
        let cookie = access_cookie("access-token", "abc", 3600).unwrap();
        let cookie = cookie.to_str().unwrap();

        assert!(cookie.starts_with("access-token=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=3600"));
    }

    #[test]
    fn test_cleared_cookie() {
        let cookie = access_cookie("access-token", "", 0).unwrap();
        assert!(cookie.to_str().unwrap().starts_with("access-token=;"));
    }

    #[test]
    fn test_refresh_request_aliases() {
        let a: RefreshRequest = serde_json::from_str(r#"{"token":"r"}"#).unwrap();
        let b: RefreshRequest = serde_json::from_str(r#"{"refreshToken":"r"}"#).unwrap();
        assert_eq!(a.token, b.token);
    }
}
