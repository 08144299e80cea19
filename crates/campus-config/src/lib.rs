// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # campus-config
//!
//! Configuration management for the campus administration backend.
//!
//! ## Features
//!
//! - **Schema Definition**: API, JWT, seeded groups and accounts, logging
//! - **Multi-Format Support**: YAML, TOML, and JSON configuration files
//! - **Environment Overrides**: Override config values via environment variables
//!
//! ## Quick Start
//!
//! ```no_run
//! use campus_config::loader::load_config;
//!
//! let config = load_config("campus.yaml").unwrap();
//!
//! println!("Issuer: {}", config.jwt.issuer);
//! println!("Groups: {}", config.groups.len());
//! ```
//!
//! ## Configuration Schema
//!
//! - `api` - Bind address, timeouts, access cookie, public paths, CORS
//! - `jwt` - Algorithm, issuer, PEM key pair, token lifetimes
//! - `groups` - Groups and their view/edit resource lists
//! - `accounts` - Login accounts; a `grade` marks a student
//! - `logging` - Logging configuration
//!
//! ## Environment Variables
//!
//! ```text
//! CAMPUS_API_PORT=9090
//! CAMPUS_JWT_PRIVATE_KEY_PATH=/etc/campus/private.pem
//! CAMPUS_LOG_LEVEL=debug
//! ```
//!
//! Values in config files can reference environment variables:
//!
//! ```yaml
//! jwt:
//!   issuer: "${CAMPUS_ISSUER:campus}"
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// =============================================================================
// Modules
// =============================================================================

pub mod error;
pub mod loader;
pub mod schema;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{ConfigError, ConfigResult};
pub use schema::{
    // Top-level config
    CampusConfig,
    // Sections
    ApiSection,
    CorsSection,
    JwtSection,
    GroupSeed,
    AccountConfig,
    // Logging config
    LoggingConfig,
    LogLevel,
    LogFormat,
    // Secret value
    SecretValue,
};

pub use loader::{load_config, load_config_str, ConfigFormat, ConfigLoader, ConfigLoaderBuilder};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");

// =============================================================================
// Prelude
// =============================================================================

/// Convenience re-exports for common use cases.
pub mod prelude {
    pub use crate::error::{ConfigError, ConfigResult};
    pub use crate::loader::{load_config, ConfigLoader};
    pub use crate::schema::{AccountConfig, CampusConfig, GroupSeed, SecretValue};
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "campus-config");
    }
}
