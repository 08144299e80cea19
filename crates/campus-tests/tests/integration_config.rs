// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Config Integration Tests
//!
//! Configuration files loaded from disk and turned into a running router.
//!
//! ## Test Categories
//!
//! - `test_config_*`: Loading, validation and overrides
//! - `test_runtime_*`: Config-to-server mapping end to end

use std::path::{Path, PathBuf};

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use tower::ServiceExt;

use campus_config::{ConfigError, ConfigLoader};
use campus_tests::common::*;

// =============================================================================
// Test Helpers
// =============================================================================

const CAMPUS_YAML: &str = r#"
api:
  port: 9100
  request_timeout: 5s
jwt:
  issuer: test-campus
  private_key_path: keys/private.pem
  public_key_path: keys/public.pem
  access_ttl: 15m
  refresh_ttl: 1d
groups:
  - id: dorm
    name: Dormitory
    view: [laundry]
  - id: office
    name: Office
    view: [group]
    edit: [group]
accounts:
  - id: t-001
    login: kim
    password: ${CAMPUS_ITEST_PASSWORD:letmein}
    name: Kim
    groups: [office]
  - id: s-001
    login: park
    password: hunter2
    grade: 2
    class: 3
    number: 14
    groups: [dorm, office]
logging:
  level: debug
  format: json
"#;

/// Writes keys and `campus.yaml` into `dir`, returning the config path.
fn write_campus(dir: &Path, yaml: &str) -> PathBuf {
    let keys = dir.join("keys");
    std::fs::create_dir_all(&keys).unwrap();
    std::fs::write(keys.join("private.pem"), KeyFixtures::PRIVATE_KEY).unwrap();
    std::fs::write(keys.join("public.pem"), KeyFixtures::PUBLIC_KEY).unwrap();

    let path = dir.join("campus.yaml");
    std::fs::write(&path, yaml).unwrap();
    path
}

async fn login(router: axum::Router, login: &str, password: &str) -> (StatusCode, serde_json::Value) {
    let body = serde_json::json!({ "login": login, "password": password });
    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or_default())
}

// =============================================================================
// Config Tests
// =============================================================================

#[test]
fn test_config_load_yaml_with_relative_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_campus(dir.path(), CAMPUS_YAML);

    let config = campus_config::load_config(&path).unwrap();

    assert_eq!(config.api.port, 9100);
    assert_eq!(config.jwt.issuer, "test-campus");
    assert_eq!(
        config.jwt.private_key_path.as_deref(),
        Some(dir.path().join("keys/private.pem").as_path())
    );
    assert_eq!(config.groups.len(), 2);
    assert!(config.get_account("park").unwrap().is_student());
    assert!(!config.get_account("kim").unwrap().is_student());
    assert!(config.warnings().is_empty());
}

#[test]
fn test_config_placeholder_default() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_campus(dir.path(), CAMPUS_YAML);

    let config = campus_config::load_config(&path).unwrap();
    assert_eq!(config.get_account("kim").unwrap().password.expose(), "letmein");
}

#[test]
fn test_config_env_overrides() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_campus(dir.path(), CAMPUS_YAML);
    let prefix = unique_test_id("CAMPUS_ITEST").to_uppercase();

    std::env::set_var(format!("{}_API_PORT", prefix), "9200");
    std::env::set_var(format!("{}_JWT_ISSUER", prefix), "override");

    let config = ConfigLoader::new()
        .with_env_prefix(&prefix)
        .load(&path)
        .unwrap();

    assert_eq!(config.api.port, 9200);
    assert_eq!(config.jwt.issuer, "override");

    std::env::remove_var(format!("{}_API_PORT", prefix));
    std::env::remove_var(format!("{}_JWT_ISSUER", prefix));
}

#[test]
fn test_config_bad_env_override() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_campus(dir.path(), CAMPUS_YAML);
    let prefix = unique_test_id("CAMPUS_ITEST").to_uppercase();

    std::env::set_var(format!("{}_API_PORT", prefix), "not-a-port");
    let err = ConfigLoader::new()
        .with_env_prefix(&prefix)
        .load(&path)
        .unwrap_err();
    std::env::remove_var(format!("{}_API_PORT", prefix));

    assert!(matches!(err, ConfigError::InvalidEnvVar { .. }));
}

#[test]
fn test_config_rejects_shared_secret_algorithm() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = CAMPUS_YAML.replace("issuer: test-campus", "issuer: test-campus\n  algorithm: HS256");
    let path = write_campus(dir.path(), &yaml);

    let err = campus_config::load_config(&path).unwrap_err();
    match err {
        ConfigError::Validation { field, .. } => assert_eq!(field, "jwt.algorithm"),
        other => panic!("Expected validation error, got {:?}", other),
    }
}

#[test]
fn test_config_rejects_duplicate_group() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = CAMPUS_YAML.replace("id: office", "id: dorm");
    let path = write_campus(dir.path(), &yaml);

    let err = campus_config::load_config(&path).unwrap_err();
    assert!(matches!(err, ConfigError::DuplicateGroupId { .. }));
}

#[test]
fn test_config_rejects_unknown_field() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = format!("{}\nmetrics:\n  enabled: true\n", CAMPUS_YAML);
    let path = write_campus(dir.path(), &yaml);

    let err = campus_config::load_config(&path).unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }));
}

#[test]
fn test_config_warns_on_unknown_membership() {
    let dir = tempfile::tempdir().unwrap();
    let yaml = CAMPUS_YAML.replace("groups: [office]", "groups: [office, library]");
    let path = write_campus(dir.path(), &yaml);

    let config = campus_config::load_config(&path).unwrap();
    let warnings = config.warnings();
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("library"));
}

// =============================================================================
// Runtime Tests
// =============================================================================

#[tokio::test]
async fn test_runtime_configured_accounts_can_log_in() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_campus(dir.path(), CAMPUS_YAML);
    let config = campus_config::load_config(&path).unwrap();

    let server = campus_bin::runtime::build_server(&config).unwrap();
    assert_eq!(server.addr().port(), 9100);

    let (status, body) = login(server.router(), "park", "hunter2").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["expiresIn"], 900);

    let access = body["data"]["accessToken"].as_str().unwrap();
    let claims = server.state().jwt().verify_access(access).unwrap();
    assert_eq!(claims.iss.as_deref(), Some("test-campus"));
    assert_eq!(claims.grade, Some(2));

    let (status, _) = login(server.router(), "park", "wrong").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_runtime_seeded_groups_gate_requests() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_campus(dir.path(), CAMPUS_YAML);
    let config = campus_config::load_config(&path).unwrap();
    let server = campus_bin::runtime::build_server(&config).unwrap();

    let (_, body) = login(server.router(), "kim", "letmein").await;
    let teacher = body["data"]["accessToken"].as_str().unwrap().to_string();
    let (_, body) = login(server.router(), "park", "hunter2").await;
    let student = body["data"]["accessToken"].as_str().unwrap().to_string();

    let list = |token: String| {
        Request::builder()
            .uri("/group")
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap()
    };

    let response = server.router().oneshot(list(teacher)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Same `office` membership, but a student.
    let response = server.router().oneshot(list(student)).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
