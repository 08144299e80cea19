// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Campus Integration Tests
//!
//! Integration tests for the campus administration backend, plus the
//! fixtures, mocks and harness they share.
//!
//! ## Module Structure
//!
//! - [`common`]: Shared test utilities
//!   - `fixtures`: Key pairs, groups and principals
//!   - `mocks`: Instrumented store implementations
//!   - `harness`: In-process router driven with `tower::ServiceExt::oneshot`
//!
//! ## Running Tests
//!
//! ```bash
//! # Run all integration tests
//! cargo test -p campus-tests
//!
//! # Run specific test suite
//! cargo test -p campus-tests --test integration_auth
//! cargo test -p campus-tests --test integration_permissions
//! cargo test -p campus-tests --test integration_config
//! ```
//!
//! ## Test Categories
//!
//! ### Auth Tests (`integration_auth.rs`)
//! - Login, refresh and logout flows
//! - Refresh token rotation and single use
//! - Expired, foreign and misplaced tokens
//! - Cookie and bearer credentials
//!
//! ### Permission Tests (`integration_permissions.rs`)
//! - Group union and wildcard resolution
//! - Resource gate decisions by path and method
//! - Teacher-only gate ordering
//! - Group management endpoints
//!
//! ### Config Tests (`integration_config.rs`)
//! - YAML loading with key files
//! - Environment overrides
//! - Config-to-server mapping end to end

pub mod common;
