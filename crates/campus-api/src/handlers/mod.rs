// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API handlers for all endpoints.
//!
//! - [`health`]: Health check endpoints
//! - [`auth`]: Login, refresh, logout and current principal
//! - [`groups`]: Group management endpoints
//! - [`fallback`]: Envelopes for unmatched routes and methods

mod auth;
mod fallback;
mod groups;
mod health;

pub use auth::*;
pub use fallback::*;
pub use groups::*;
pub use health::*;
