// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema definitions for campus.
//!
//! This module defines every configuration structure of the campus backend:
//! the HTTP API, the JWT key pair and lifetimes, seeded groups, seeded
//! accounts and logging.

use std::collections::HashSet;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// Constants
// =============================================================================

/// Default API port.
pub const DEFAULT_API_PORT: u16 = 8080;

/// Default access token lifetime (1 hour).
pub const DEFAULT_ACCESS_TTL: Duration = Duration::from_secs(3600);

/// Default refresh token lifetime (7 days).
pub const DEFAULT_REFRESH_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Default name of the access token cookie.
pub const DEFAULT_ACCESS_COOKIE: &str = "access-token";

/// Permission entry granting every resource.
pub const WILDCARD: &str = "@";

/// Asymmetric algorithms accepted for token signing.
pub const SUPPORTED_ALGORITHMS: &[&str] = &[
    "EdDSA", "RS256", "RS384", "RS512", "PS256", "PS384", "PS512", "ES256", "ES384",
];

// =============================================================================
// Top-Level Configuration
// =============================================================================

/// The root configuration structure for campus.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CampusConfig {
    /// API server configuration.
    #[serde(default)]
    pub api: ApiSection,

    /// Token signing configuration.
    #[serde(default)]
    pub jwt: JwtSection,

    /// Groups loaded into the group store at start-up.
    #[serde(default)]
    pub groups: Vec<GroupSeed>,

    /// Accounts known to the static identity provider.
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl CampusConfig {
    /// Validates the entire configuration.
    ///
    /// Checks the API and JWT sections, then unique group IDs and names,
    /// then unique account IDs and logins.
    pub fn validate(&self) -> ConfigResult<()> {
        self.api.validate()?;
        self.jwt.validate()?;

        let mut group_ids = HashSet::new();
        let mut group_names = HashSet::new();
        for group in &self.groups {
            if !group_ids.insert(group.id.as_str()) {
                return Err(ConfigError::duplicate_group_id(&group.id));
            }
            if !group_names.insert(group.name.as_str()) {
                return Err(ConfigError::validation(
                    format!("groups.{}.name", group.id),
                    format!("name '{}' is already used", group.name),
                ));
            }
            group.validate()?;
        }

        let mut account_ids = HashSet::new();
        let mut logins = HashSet::new();
        for account in &self.accounts {
            if !account_ids.insert(account.id.as_str()) {
                return Err(ConfigError::duplicate_account(&account.id));
            }
            if !logins.insert(account.login.as_str()) {
                return Err(ConfigError::duplicate_account(&account.login));
            }
            account.validate()?;
        }

        self.logging.validate()?;

        Ok(())
    }

    /// Returns non-fatal findings that `validate --strict` treats as errors.
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.jwt.refresh_ttl <= self.jwt.access_ttl {
            warnings.push(format!(
                "jwt.refresh_ttl ({:?}) does not outlive jwt.access_ttl ({:?})",
                self.jwt.refresh_ttl, self.jwt.access_ttl,
            ));
        }

        let cors = &self.api.cors;
        if cors.allow_credentials && cors.allowed_origins.iter().any(|o| o == "*") {
            warnings.push("api.cors.allow_credentials is ignored with wildcard origins".to_string());
        }

        for group in &self.groups {
            if group.view.is_empty() && group.edit.is_empty() {
                warnings.push(format!("group '{}' grants no permissions", group.id));
            }
        }

        let known: HashSet<&str> = self.groups.iter().map(|g| g.id.as_str()).collect();
        for account in &self.accounts {
            for group in &account.groups {
                if !known.contains(group.as_str()) {
                    warnings.push(format!(
                        "account '{}' references unknown group '{}'",
                        account.login, group
                    ));
                }
            }
        }

        warnings
    }

    /// Returns a seeded group by ID.
    pub fn get_group(&self, group_id: &str) -> Option<&GroupSeed> {
        self.groups.iter().find(|g| g.id == group_id)
    }

    /// Returns an account by login.
    pub fn get_account(&self, login: &str) -> Option<&AccountConfig> {
        self.accounts.iter().find(|a| a.login == login)
    }
}

// =============================================================================
// API Configuration
// =============================================================================

/// HTTP API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiSection {
    /// Bind address.
    #[serde(default = "default_api_host")]
    pub host: IpAddr,

    /// Port.
    #[serde(default = "default_api_port")]
    pub port: u16,

    /// Request timeout.
    #[serde(default = "default_request_timeout", with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Graceful shutdown timeout.
    #[serde(default = "default_shutdown_timeout", with = "humantime_serde")]
    pub shutdown_timeout: Duration,

    /// Name of the cookie carrying the access token.
    #[serde(default = "default_access_cookie")]
    pub access_cookie: String,

    /// Paths served without authentication. Replaces the built-in list when set.
    #[serde(default)]
    pub public_paths: Option<Vec<String>>,

    /// CORS configuration.
    #[serde(default)]
    pub cors: CorsSection,
}

fn default_api_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0))
}

fn default_api_port() -> u16 {
    DEFAULT_API_PORT
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_shutdown_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_access_cookie() -> String {
    DEFAULT_ACCESS_COOKIE.to_string()
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            host: default_api_host(),
            port: default_api_port(),
            request_timeout: default_request_timeout(),
            shutdown_timeout: default_shutdown_timeout(),
            access_cookie: default_access_cookie(),
            public_paths: None,
            cors: CorsSection::default(),
        }
    }
}

impl ApiSection {
    /// Validates the API configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.request_timeout.is_zero() {
            return Err(ConfigError::validation(
                "api.request_timeout",
                "must be greater than zero",
            ));
        }
        if self.access_cookie.is_empty()
            || self
                .access_cookie
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, ';' | '=' | ','))
        {
            return Err(ConfigError::validation(
                "api.access_cookie",
                "must be a non-empty cookie name",
            ));
        }
        if let Some(paths) = &self.public_paths {
            if let Some(path) = paths.iter().find(|p| !p.starts_with('/')) {
                return Err(ConfigError::validation(
                    "api.public_paths",
                    format!("'{}' must start with '/'", path),
                ));
            }
        }
        Ok(())
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CorsSection {
    /// Allowed origins.
    #[serde(default = "default_cors_origins")]
    pub allowed_origins: Vec<String>,

    /// Allowed methods.
    #[serde(default = "default_cors_methods")]
    pub allowed_methods: Vec<String>,

    /// Allowed headers.
    #[serde(default = "default_cors_headers")]
    pub allowed_headers: Vec<String>,

    /// Whether to allow credentials.
    #[serde(default)]
    pub allow_credentials: bool,

    /// Max age for preflight cache (seconds).
    #[serde(default = "default_cors_max_age")]
    pub max_age: u64,
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_cors_methods() -> Vec<String> {
    ["GET", "POST", "PATCH", "DELETE", "OPTIONS"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_cors_headers() -> Vec<String> {
    vec!["Content-Type".to_string(), "Authorization".to_string()]
}

fn default_cors_max_age() -> u64 {
    3600
}

impl Default for CorsSection {
    fn default() -> Self {
        Self {
            allowed_origins: default_cors_origins(),
            allowed_methods: default_cors_methods(),
            allowed_headers: default_cors_headers(),
            allow_credentials: false,
            max_age: default_cors_max_age(),
        }
    }
}

// =============================================================================
// JWT Configuration
// =============================================================================

/// Token signing configuration.
///
/// Each key comes either from a PEM file or inline. Inline values win when
/// both are given.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JwtSection {
    /// Signing algorithm name, e.g. `EdDSA` or `RS256`.
    #[serde(default = "default_jwt_algorithm")]
    pub algorithm: String,

    /// Token issuer.
    #[serde(default = "default_jwt_issuer")]
    pub issuer: String,

    /// Path to the PEM private key.
    #[serde(default)]
    pub private_key_path: Option<PathBuf>,

    /// Path to the PEM public key.
    #[serde(default)]
    pub public_key_path: Option<PathBuf>,

    /// Inline PEM private key.
    #[serde(default)]
    pub private_key: Option<SecretValue>,

    /// Inline PEM public key.
    #[serde(default)]
    pub public_key: Option<String>,

    /// Access token lifetime.
    #[serde(default = "default_access_ttl", with = "humantime_serde")]
    pub access_ttl: Duration,

    /// Refresh token lifetime.
    #[serde(default = "default_refresh_ttl", with = "humantime_serde")]
    pub refresh_ttl: Duration,

    /// Clock skew tolerance in seconds.
    #[serde(default)]
    pub leeway_secs: u64,
}

fn default_jwt_algorithm() -> String {
    "EdDSA".to_string()
}

fn default_jwt_issuer() -> String {
    "campus".to_string()
}

fn default_access_ttl() -> Duration {
    DEFAULT_ACCESS_TTL
}

fn default_refresh_ttl() -> Duration {
    DEFAULT_REFRESH_TTL
}

impl Default for JwtSection {
    fn default() -> Self {
        Self {
            algorithm: default_jwt_algorithm(),
            issuer: default_jwt_issuer(),
            private_key_path: None,
            public_key_path: None,
            private_key: None,
            public_key: None,
            access_ttl: default_access_ttl(),
            refresh_ttl: default_refresh_ttl(),
            leeway_secs: 0,
        }
    }
}

impl JwtSection {
    /// Validates the JWT configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.algorithm.to_ascii_uppercase().starts_with("HS") {
            return Err(ConfigError::validation(
                "jwt.algorithm",
                format!(
                    "'{}' is symmetric; use an asymmetric algorithm",
                    self.algorithm
                ),
            ));
        }
        if !SUPPORTED_ALGORITHMS.contains(&self.algorithm.as_str()) {
            return Err(ConfigError::validation(
                "jwt.algorithm",
                format!(
                    "'{}' is not supported (expected one of {})",
                    self.algorithm,
                    SUPPORTED_ALGORITHMS.join(", ")
                ),
            ));
        }
        if self.issuer.is_empty() {
            return Err(ConfigError::validation("jwt.issuer", "cannot be empty"));
        }
        if self.private_key.is_none() && self.private_key_path.is_none() {
            return Err(ConfigError::missing_field("jwt.private_key_path"));
        }
        if self.public_key.is_none() && self.public_key_path.is_none() {
            return Err(ConfigError::missing_field("jwt.public_key_path"));
        }
        if self.access_ttl.is_zero() {
            return Err(ConfigError::validation(
                "jwt.access_ttl",
                "must be greater than zero",
            ));
        }
        if self.refresh_ttl.is_zero() {
            return Err(ConfigError::validation(
                "jwt.refresh_ttl",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Group Seeds
// =============================================================================

/// A group loaded into the group store at start-up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GroupSeed {
    /// Group ID referenced from accounts and tokens.
    pub id: String,

    /// Unique display name.
    pub name: String,

    /// Resources members may view.
    #[serde(default)]
    pub view: Vec<String>,

    /// Resources members may edit.
    #[serde(default)]
    pub edit: Vec<String>,
}

impl GroupSeed {
    /// Validates the group.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::validation("groups.id", "cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(ConfigError::validation(
                format!("groups.{}.name", self.id),
                "cannot be empty",
            ));
        }
        for (mode, entries) in [("view", &self.view), ("edit", &self.edit)] {
            if let Some(entry) = entries.iter().find(|e| !is_resource_entry(e)) {
                return Err(ConfigError::validation(
                    format!("groups.{}.{}", self.id, mode),
                    format!("'{}' is not a resource name", entry),
                ));
            }
        }
        Ok(())
    }
}

/// A resource entry is one path segment or the wildcard.
fn is_resource_entry(entry: &str) -> bool {
    entry == WILDCARD
        || (!entry.is_empty() && !entry.contains('/') && entry.trim() == entry)
}

// =============================================================================
// Accounts
// =============================================================================

/// An account known to the static identity provider.
///
/// Setting `grade` makes the account a student; `class` and `number` are
/// only meaningful together with it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AccountConfig {
    /// Principal ID, becomes the token subject.
    pub id: String,

    /// Login name.
    pub login: String,

    /// Password.
    pub password: SecretValue,

    /// Display name.
    #[serde(default)]
    pub name: Option<String>,

    /// School grade.
    #[serde(default)]
    pub grade: Option<u8>,

    /// Class within the grade.
    #[serde(default)]
    pub class: Option<u8>,

    /// Seat number within the class.
    #[serde(default)]
    pub number: Option<u8>,

    /// Group memberships.
    #[serde(default)]
    pub groups: Vec<String>,
}

impl AccountConfig {
    /// Returns `true` if the account belongs to a student.
    pub fn is_student(&self) -> bool {
        self.grade.is_some()
    }

    /// Validates the account.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.id.trim().is_empty() {
            return Err(ConfigError::validation("accounts.id", "cannot be empty"));
        }
        if self.login.trim().is_empty() {
            return Err(ConfigError::validation(
                format!("accounts.{}.login", self.id),
                "cannot be empty",
            ));
        }
        if self.password.expose().is_empty() {
            return Err(ConfigError::validation(
                format!("accounts.{}.password", self.id),
                "cannot be empty",
            ));
        }
        if self.grade.is_none() && (self.class.is_some() || self.number.is_some()) {
            return Err(ConfigError::validation(
                format!("accounts.{}.grade", self.id),
                "class and number require a grade",
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Logging Configuration
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,

    /// Extra filter directives, e.g. `tower_http=debug`.
    #[serde(default)]
    pub filter: Option<String>,
}

impl LoggingConfig {
    /// Validates the logging configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if let Some(filter) = &self.filter {
            if filter.trim().is_empty() {
                return Err(ConfigError::validation("logging.filter", "cannot be empty"));
            }
        }
        Ok(())
    }
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warn level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Converts to a tracing filter directive.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// Parses a level name, ignoring case.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Pretty format for development.
    #[default]
    Pretty,
    /// Compact format.
    Compact,
    /// JSON format for production.
    Json,
}

// =============================================================================
// Secret Value
// =============================================================================

/// A secret that never shows up in logs, `Debug` output or serialized config.
#[derive(Clone, Deserialize)]
#[serde(transparent)]
pub struct SecretValue(String);

impl SecretValue {
    /// Creates a new secret value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the plain value.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "***")
    }
}

impl Serialize for SecretValue {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str("***")
    }
}

impl std::fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretValue(***)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> CampusConfig {
        let mut config = CampusConfig::default();
        config.jwt.private_key_path = Some(PathBuf::from("keys/private.pem"));
        config.jwt.public_key_path = Some(PathBuf::from("keys/public.pem"));
        config.groups = vec![GroupSeed {
            id: "dorm".to_string(),
            name: "Dormitory".to_string(),
            view: vec!["laundry".to_string()],
            edit: vec!["laundry".to_string()],
        }];
        config.accounts = vec![teacher_account("t-001", "kim")];
        config
    }

    fn teacher_account(id: &str, login: &str) -> AccountConfig {
        AccountConfig {
            id: id.to_string(),
            login: login.to_string(),
            password: SecretValue::new("pw"),
            name: None,
            grade: None,
            class: None,
            number: None,
            groups: vec!["dorm".to_string()],
        }
    }

    #[test]
    fn test_campus_config_default() {
        let config = CampusConfig::default();
        assert_eq!(config.api.port, 8080);
        assert_eq!(config.api.access_cookie, "access-token");
        assert_eq!(config.jwt.algorithm, "EdDSA");
        assert_eq!(config.jwt.access_ttl, Duration::from_secs(3600));
        assert!(config.groups.is_empty());
    }

    #[test]
    fn test_valid_config_passes() {
        assert!(valid_config().validate().is_ok());
        assert!(valid_config().warnings().is_empty());
    }

    #[test]
    fn test_symmetric_algorithm_rejected() {
        let mut config = valid_config();
        config.jwt.algorithm = "HS256".to_string();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "jwt.algorithm"));
    }

    #[test]
    fn test_missing_keys_rejected() {
        let mut config = valid_config();
        config.jwt.public_key_path = None;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingField { .. })
        ));

        config.jwt.public_key = Some("inline".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duplicate_group_id() {
        let mut config = valid_config();
        let mut copy = config.groups[0].clone();
        copy.name = "Other".to_string();
        config.groups.push(copy);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateGroupId { .. })
        ));
    }

    #[test]
    fn test_duplicate_group_name() {
        let mut config = valid_config();
        let mut copy = config.groups[0].clone();
        copy.id = "dorm-2".to_string();
        config.groups.push(copy);
        assert!(matches!(config.validate(), Err(ConfigError::Validation { .. })));
    }

    #[test]
    fn test_duplicate_login() {
        let mut config = valid_config();
        config.accounts.push(teacher_account("t-002", "kim"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DuplicateAccount { .. })
        ));
    }

    #[test]
    fn test_invalid_resource_entry() {
        let mut config = valid_config();
        config.groups[0].view.push("laundry/apply".to_string());
        assert!(config.validate().is_err());

        config.groups[0].view = vec![WILDCARD.to_string()];
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_class_without_grade() {
        let mut config = valid_config();
        config.accounts[0].class = Some(2);
        assert!(config.validate().is_err());

        config.accounts[0].grade = Some(1);
        assert!(config.validate().is_ok());
        assert!(config.accounts[0].is_student());
    }

    #[test]
    fn test_warnings() {
        let mut config = valid_config();
        config.jwt.refresh_ttl = config.jwt.access_ttl;
        config.accounts[0].groups.push("ghost".to_string());
        config.groups[0].view.clear();
        config.groups[0].edit.clear();

        let warnings = config.warnings();
        assert_eq!(warnings.len(), 3);
        assert!(warnings.iter().any(|w| w.contains("ghost")));
    }

    #[test]
    fn test_secret_value_redacted() {
        let secret = SecretValue::new("hunter2");
        assert_eq!(secret.to_string(), "***");
        assert!(!format!("{:?}", secret).contains("hunter2"));
        assert_eq!(secret.expose(), "hunter2");
        assert_eq!(serde_json::to_string(&secret).unwrap(), r#""***""#);
    }

    #[test]
    fn test_log_level() {
        assert_eq!(LogLevel::Info.as_str(), "info");
        assert_eq!(LogLevel::parse("WARN"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("loud"), None);
    }
}
