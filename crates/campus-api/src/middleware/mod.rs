// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Middleware implementations for the API server.
//!
//! The request pipeline is assembled from three layers, evaluated in order:
//!
//! - [`AuthLayer`]: token extraction and verification, attaches the principal
//! - [`TeacherOnlyLayer`]: rejects students on teacher-only routes
//! - [`PermissionLayer`]: resolves group permissions and gates the resource

mod auth;
mod permission;
mod teacher;

pub use auth::{AuthLayer, AuthMiddleware};
pub use permission::{ModeRequirement, PermissionLayer, PermissionMiddleware};
pub use teacher::{TeacherOnlyLayer, TeacherOnlyMiddleware};
