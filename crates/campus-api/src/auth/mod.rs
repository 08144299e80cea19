// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Authentication and authorization module.
//!
//! This module provides:
//! - JWT access/refresh token issuance and verification
//! - The request principal and its student/teacher kind
//! - Group-based permission resolution
//! - The permission and teacher-only gates
//! - Identity providers for login

mod claims;
pub mod gate;
mod identity;
mod jwt;
pub mod permission;
mod principal;
mod resolver;

pub use claims::{Claims, TokenKind};
pub use gate::{allow, authorize, require_teacher, resource_name};
pub use identity::{Account, IdentityProvider, LoginRequest, StaticIdentityProvider};
pub use jwt::{parse_algorithm, IssuedToken, JwtConfig, JwtManager};
pub use permission::{AccessMode, GroupPermissions, PermissionSet, WILDCARD};
pub use principal::{Principal, PrincipalKind, PrincipalProfile};
pub use resolver::PermissionResolver;
