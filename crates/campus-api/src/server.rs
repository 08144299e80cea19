// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API server implementation.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;

use crate::auth::{IdentityProvider, JwtManager};
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::handlers;
use crate::middleware::{AuthLayer, PermissionLayer, TeacherOnlyLayer};
use crate::state::AppState;
use crate::store::{GroupStore, TokenStore};

// =============================================================================
// ApiServer
// =============================================================================

/// The API server.
///
/// This is the main entry point for creating and running the HTTP server.
pub struct ApiServer {
    state: AppState,
    config: Arc<ApiConfig>,
}

impl ApiServer {
    /// Creates a new API server with the given state.
    pub fn new(state: AppState) -> Self {
        let config = state.config.clone();
        Self { state, config }
    }

    /// Creates the router with all routes and middleware.
    ///
    /// Group routes run auth, then the teacher-only gate, then the permission
    /// gate with the mode taken from the HTTP method.
    pub fn router(&self) -> Router {
        let cors = create_cors_layer(&self.config);
        let auth = AuthLayer::new(self.state.jwt_manager.clone())
            .with_cookie_name(&self.config.access_cookie)
            .with_public_paths(self.config.public_paths.clone());

        let middleware_stack = ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .map_response(envelope_timeout)
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                self.config.request_timeout,
            ))
            .layer(cors)
            .layer(auth);

        // Later route layers wrap earlier ones.
        let group_routes = Router::new()
            .route(
                "/group",
                get(handlers::list_groups).post(handlers::create_group),
            )
            .route(
                "/group/{id}",
                get(handlers::get_group)
                    .patch(handlers::update_group)
                    .delete(handlers::delete_group),
            )
            .route_layer(PermissionLayer::by_method(self.state.resolver.clone()))
            .route_layer(TeacherOnlyLayer::new());

        Router::new()
            // Health endpoints (public)
            .route("/health", get(handlers::health))
            .route("/ready", get(handlers::ready))
            // Auth endpoints
            .route("/auth/login", post(handlers::login))
            .route("/auth/refresh", post(handlers::refresh_token))
            .route("/auth/logout", post(handlers::logout))
            .route("/auth/me", get(handlers::current_principal))
            .merge(group_routes)
            // Must follow every route registration.
            .method_not_allowed_fallback(handlers::method_not_allowed)
            .fallback(handlers::route_not_found)
            // Apply middleware and state
            .layer(middleware_stack)
            .with_state(self.state.clone())
    }

    /// Runs the server.
    pub async fn run(self) -> ApiResult<()> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Runs the server with graceful shutdown.
    pub async fn run_with_shutdown(
        self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> ApiResult<()> {
        let addr = self.config.socket_addr();
        let router = self.router();

        info!("Starting API server on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| crate::error::ApiError::internal(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal)
            .await
            .map_err(|e| crate::error::ApiError::internal(format!("Server error: {}", e)))?;

        info!("API server shutdown complete");

        Ok(())
    }

    /// Returns the server address.
    pub fn addr(&self) -> SocketAddr {
        self.config.socket_addr()
    }

    /// Returns the shared state.
    pub fn state(&self) -> &AppState {
        &self.state
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Creates the CORS layer from configuration.
fn create_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = &config.cors;

    let mut layer = CorsLayer::new().max_age(Duration::from_secs(cors.max_age));

    // Origins
    let any_origin = cors.allowed_origins.iter().any(|o| o == "*");
    if any_origin {
        layer = layer.allow_origin(Any);
    } else {
        let origins: Vec<HeaderValue> = cors
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        layer = layer.allow_origin(AllowOrigin::list(origins));
    }

    // Methods
    let methods: Vec<Method> = cors
        .allowed_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();
    layer = layer.allow_methods(methods);

    // Headers
    let any_header = cors.allowed_headers.iter().any(|h| h == "*");
    if any_header {
        layer = layer.allow_headers(Any);
    } else {
        layer = layer.allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT]);
    }

    // Credentials cannot be combined with wildcards.
    if cors.allow_credentials {
        if any_origin || any_header {
            tracing::warn!("CORS credentials ignored with wildcard origins or headers");
        } else {
            layer = layer.allow_credentials(true);
        }
    }

    layer
}

/// Replaces the timeout layer's empty 408 with a failure envelope.
fn envelope_timeout(response: Response) -> Response {
    let bare = response.status() == StatusCode::REQUEST_TIMEOUT
        && !response.headers().contains_key(header::CONTENT_TYPE);
    if !bare {
        return response;
    }

    tracing::warn!("Request timed out");
    ApiError::coded(
        StatusCode::REQUEST_TIMEOUT,
        "REQUEST_TIMEOUT",
        "Request timed out",
    )
    .into_response()
}

// =============================================================================
// Server Builder
// =============================================================================

/// Builder for creating the API server.
pub struct ApiServerBuilder {
    state_builder: crate::state::AppStateBuilder,
}

impl ApiServerBuilder {
    /// Creates a new server builder.
    pub fn new() -> Self {
        Self {
            state_builder: AppState::builder(),
        }
    }

    /// Sets the configuration.
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.state_builder = self.state_builder.config(config);
        self
    }

    /// Sets the JWT manager.
    pub fn jwt_manager(mut self, manager: Arc<JwtManager>) -> Self {
        self.state_builder = self.state_builder.jwt_manager(manager);
        self
    }

    /// Sets the group store.
    pub fn group_store(mut self, store: Arc<dyn GroupStore>) -> Self {
        self.state_builder = self.state_builder.group_store(store);
        self
    }

    /// Sets the refresh token store.
    pub fn token_store(mut self, store: Arc<dyn TokenStore>) -> Self {
        self.state_builder = self.state_builder.token_store(store);
        self
    }

    /// Sets the identity provider.
    pub fn identity_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        self.state_builder = self.state_builder.identity_provider(provider);
        self
    }

    /// Builds the server.
    pub fn build(self) -> ApiResult<ApiServer> {
        let state = self.state_builder.build()?;
        Ok(ApiServer::new(state))
    }
}

impl Default for ApiServerBuilder {
    fn default() -> Self {
        Self::new()
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
    use crate::test_support::test_jwt_config;
    use axum::body::Body;
    use axum::http::Request;
    use std::convert::Infallible;
    use tower::{Layer, ServiceExt};

    fn test_config() -> ApiConfig {
        ApiConfig::default().with_jwt(test_jwt_config())
    }

    fn server() -> ApiServer {
        let groups = MemoryGroupStore::with_groups([Group::new(
            "office",
            "office",
            GroupPermissions::new(["group"], Vec::<String>::new()),
        )]);

        ApiServerBuilder::new()
            .config(test_config())
            .group_store(Arc::new(groups))
            .build()
            .unwrap()
    }

    fn bearer(server: &ApiServer, claims: Claims) -> String {
        let token = server
            .state()
            .jwt()
            .sign(&claims.with_issuer("campus"))
            .unwrap();
        format!("Bearer {}", token)
    }

    #[test]
    fn test_server_builder() {
        assert_eq!(server().addr().port(), 8080);
    }

    #[tokio::test]
    async fn test_health_is_public() {
        let response = server()
            .router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_group_routes_follow_method_mode() {
        let server = server();
        let mut claims = Claims::new("t-001", 3600);
        claims.groups = vec!["office".to_string()];
        let auth = bearer(&server, claims);

        let response = server
            .router()
            .oneshot(
                Request::get("/group")
                    .header(header::AUTHORIZATION, &auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = server
            .router()
            .oneshot(
                Request::post("/group")
                    .header(header::AUTHORIZATION, &auth)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"name":"dorm"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    fn preflight(origin: &str) -> Request<Body> {
        Request::options("/group")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_cors_credentials_dropped_with_wildcard_origin() {
        let mut config = test_config();
        config.cors.allow_credentials = true;

        let response = create_cors_layer(&config)
            .layer(tower::service_fn(|_req: Request<Body>| async {
                Ok::<_, Infallible>(Response::new(Body::empty()))
            }))
            .oneshot(preflight("https://school.example"))
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert!(!headers.contains_key(header::ACCESS_CONTROL_ALLOW_CREDENTIALS));
    }

    #[tokio::test]
    async fn test_cors_credentials_with_listed_origin() {
        let mut config = test_config();
        config.cors.allow_credentials = true;
        config.cors.allowed_origins = vec!["https://school.example".to_string()];

        let response = create_cors_layer(&config)
            .layer(tower::service_fn(|_req: Request<Body>| async {
                Ok::<_, Infallible>(Response::new(Body::empty()))
            }))
            .oneshot(preflight("https://school.example"))
            .await
            .unwrap();

        let headers = response.headers();
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://school.example"
        );
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
    }

    #[tokio::test]
    async fn test_unmatched_route_and_method_use_envelope() {
        let server = server();
        let mut claims = Claims::new("t-001", 3600);
        claims.groups = vec!["office".to_string()];
        let auth = bearer(&server, claims);

        let response = server
            .router()
            .oneshot(
                Request::get("/nope")
                    .header(header::AUTHORIZATION, &auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["ok"], false);
        assert_eq!(body["status"], 404);
        assert_eq!(body["error"], "Route /nope not found");

        let response = server
            .router()
            .oneshot(
                Request::put("/group")
                    .header(header::AUTHORIZATION, &auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = json_body(response).await;
        assert_eq!(body["ok"], false);
        assert_eq!(body["status"], 405);
        assert_eq!(body["code"], "METHOD_NOT_ALLOWED");
    }

    #[tokio::test]
    async fn test_unmatched_route_still_requires_auth() {
        let response = server()
            .router()
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_timeout_renders_envelope() {
        let service = ServiceBuilder::new()
            .map_response(envelope_timeout)
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_millis(10),
            ))
            .service_fn(|_req: Request<Body>| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok::<_, Infallible>(Response::new(Body::empty()))
            });

        let response = service
            .oneshot(Request::get("/group").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        let body = json_body(response).await;
        assert_eq!(body["ok"], false);
        assert_eq!(body["status"], 408);
        assert_eq!(body["code"], "REQUEST_TIMEOUT");
    }

    #[test]
    fn test_envelope_timeout_passes_other_responses() {
        let response = envelope_timeout(Response::new(Body::from("fine")));
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key(header::CONTENT_TYPE));
    }
}
