// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration loading and processing for campus.
//!
//! # Loading Pipeline
//!
//! 1. Resolve `${VAR}` / `${VAR:default}` placeholders in the raw file
//! 2. Parse YAML, TOML or JSON by file extension
//! 3. Apply `CAMPUS_*` environment overrides
//! 4. Resolve key paths relative to the config file
//! 5. Validate
//!
//! # Environment Variable Override
//!
//! ```text
//! CAMPUS_API_HOST=127.0.0.1
//! CAMPUS_API_PORT=9090
//! CAMPUS_JWT_ISSUER=campus-prod
//! CAMPUS_JWT_PRIVATE_KEY_PATH=/etc/campus/private.pem
//! CAMPUS_JWT_PUBLIC_KEY_PATH=/etc/campus/public.pem
//! CAMPUS_LOG_LEVEL=debug
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{CampusConfig, LogLevel};

/// Default environment variable prefix.
pub const DEFAULT_ENV_PREFIX: &str = "CAMPUS";

// =============================================================================
// ConfigLoader
// =============================================================================

/// Configuration loader for campus.
///
/// # Examples
///
/// ```no_run
/// use campus_config::loader::ConfigLoader;
///
/// let loader = ConfigLoader::new();
/// let config = loader.load("campus.yaml").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Base directory for resolving relative paths.
    base_path: Option<PathBuf>,

    /// Environment variable prefix.
    env_prefix: String,

    /// Whether to resolve environment variables in values.
    resolve_env_vars: bool,

    /// Whether to resolve relative paths.
    resolve_paths: bool,
}

impl ConfigLoader {
    /// Creates a new configuration loader with default settings.
    pub fn new() -> Self {
        Self {
            base_path: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            resolve_env_vars: true,
            resolve_paths: true,
        }
    }

    /// Creates a builder for the loader.
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder::new()
    }

    /// Sets the base path for resolving relative paths.
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Sets the environment variable prefix.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Enables or disables environment variable resolution.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = enabled;
        self
    }

    /// Enables or disables relative path resolution.
    pub fn with_path_resolution(mut self, enabled: bool) -> Self {
        self.resolve_paths = enabled;
        self
    }

    /// Loads configuration from a file.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<CampusConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        let base_path = self.base_path.clone().unwrap_or_else(|| {
            path.parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."))
        });

        let content = self.read_file(path)?;

        let format = ConfigFormat::from_path(path)?;
        let mut config = self.parse_content(&content, format, path)?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }

        if self.resolve_paths {
            self.resolve_relative_paths(&mut config, &base_path);
        }

        config.validate()?;

        info!("Configuration loaded successfully");
        debug!(
            "Loaded {} groups and {} accounts",
            config.groups.len(),
            config.accounts.len()
        );

        Ok(config)
    }

    /// Loads configuration from a string.
    ///
    /// Relative key paths are resolved against the base path only when one
    /// was set.
    pub fn load_from_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<CampusConfig> {
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(content)
        } else {
            content.to_string()
        };
        let mut config = self.parse_str(&content, format)?;

        if self.resolve_env_vars {
            self.apply_env_overrides(&mut config)?;
        }

        if self.resolve_paths {
            if let Some(base_path) = &self.base_path {
                self.resolve_relative_paths(&mut config, base_path);
            }
        }

        config.validate()?;

        Ok(config)
    }

    /// Reads file content.
    fn read_file(&self, path: &Path) -> ConfigResult<String> {
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))
    }

    /// Parses content based on format.
    fn parse_content(
        &self,
        content: &str,
        format: ConfigFormat,
        path: &Path,
    ) -> ConfigResult<CampusConfig> {
        let content = if self.resolve_env_vars {
            self.resolve_env_placeholders(content)
        } else {
            content.to_string()
        };

        self.parse_str(&content, format).map_err(|e| match e {
            ConfigError::Serialization { message } => ConfigError::parse(path, message),
            other => other,
        })
    }

    /// Parses a string based on format.
    fn parse_str(&self, content: &str, format: ConfigFormat) -> ConfigResult<CampusConfig> {
        match format {
            ConfigFormat::Yaml => {
                serde_yaml::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
            }
            ConfigFormat::Toml => {
                toml::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
            }
            ConfigFormat::Json => {
                serde_json::from_str(content).map_err(|e| ConfigError::serialization(e.to_string()))
            }
        }
    }

    /// Resolves environment variable placeholders in content.
    ///
    /// Supports the format: `${VAR_NAME}` or `${VAR_NAME:default}`
    fn resolve_env_placeholders(&self, content: &str) -> String {
        let mut result = String::with_capacity(content.len());
        let mut chars = content.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' || chars.peek() != Some(&'{') {
                result.push(c);
                continue;
            }
            chars.next(); // consume '{'

            let mut var_content = String::new();
            let mut found_close = false;
            for c in chars.by_ref() {
                if c == '}' {
                    found_close = true;
                    break;
                }
                var_content.push(c);
            }

            if !found_close {
                result.push_str("${");
                result.push_str(&var_content);
                continue;
            }

            let (var_name, default_value) = match var_content.split_once(':') {
                Some((name, default)) => (name, Some(default)),
                None => (var_content.as_str(), None),
            };

            match (env::var(var_name), default_value) {
                (Ok(value), _) => result.push_str(&value),
                (Err(_), Some(default)) => result.push_str(default),
                (Err(_), None) => {
                    warn!("Environment variable '{}' not found", var_name);
                    result.push_str(&format!("${{{}}}", var_name));
                }
            }
        }

        result
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&self, config: &mut CampusConfig) -> ConfigResult<()> {
        if let Some(value) = self.env("API_HOST") {
            config.api.host = value.parse().map_err(|_| {
                ConfigError::invalid_env_var(self.env_name("API_HOST"), "expected an IP address")
            })?;
        }
        if let Some(value) = self.env("API_PORT") {
            config.api.port = value.parse().map_err(|_| {
                ConfigError::invalid_env_var(
                    self.env_name("API_PORT"),
                    "expected valid port number",
                )
            })?;
        }

        if let Some(value) = self.env("JWT_ISSUER") {
            config.jwt.issuer = value;
        }
        if let Some(value) = self.env("JWT_PRIVATE_KEY_PATH") {
            config.jwt.private_key_path = Some(PathBuf::from(value));
        }
        if let Some(value) = self.env("JWT_PUBLIC_KEY_PATH") {
            config.jwt.public_key_path = Some(PathBuf::from(value));
        }

        if let Some(value) = self.env("LOG_LEVEL") {
            match LogLevel::parse(&value) {
                Some(level) => config.logging.level = level,
                None => warn!("Ignoring unknown log level '{}'", value),
            }
        }

        Ok(())
    }

    /// Resolves relative paths in configuration.
    fn resolve_relative_paths(&self, config: &mut CampusConfig, base_path: &Path) {
        for key_path in [
            &mut config.jwt.private_key_path,
            &mut config.jwt.public_key_path,
        ]
        .into_iter()
        .flatten()
        {
            if key_path.is_relative() {
                *key_path = base_path.join(&key_path);
            }
        }
    }

    fn env_name(&self, suffix: &str) -> String {
        format!("{}_{}", self.env_prefix, suffix)
    }

    fn env(&self, suffix: &str) -> Option<String> {
        env::var(self.env_name(suffix)).ok()
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ConfigLoaderBuilder
// =============================================================================

/// Builder for [`ConfigLoader`].
#[derive(Debug, Default)]
pub struct ConfigLoaderBuilder {
    base_path: Option<PathBuf>,
    env_prefix: Option<String>,
    resolve_env_vars: Option<bool>,
    resolve_paths: Option<bool>,
}

impl ConfigLoaderBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base path.
    pub fn base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Sets the environment variable prefix.
    pub fn env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = Some(prefix.into());
        self
    }

    /// Enables or disables environment variable resolution.
    pub fn resolve_env_vars(mut self, enabled: bool) -> Self {
        self.resolve_env_vars = Some(enabled);
        self
    }

    /// Enables or disables relative path resolution.
    pub fn resolve_paths(mut self, enabled: bool) -> Self {
        self.resolve_paths = Some(enabled);
        self
    }

    /// Builds the loader.
    pub fn build(self) -> ConfigLoader {
        let mut loader = ConfigLoader::new();

        if let Some(path) = self.base_path {
            loader.base_path = Some(path);
        }
        if let Some(prefix) = self.env_prefix {
            loader.env_prefix = prefix;
        }
        if let Some(resolve_env_vars) = self.resolve_env_vars {
            loader.resolve_env_vars = resolve_env_vars;
        }
        if let Some(resolve_paths) = self.resolve_paths {
            loader.resolve_paths = resolve_paths;
        }

        loader
    }
}

// =============================================================================
// ConfigFormat
// =============================================================================

/// Supported configuration file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// YAML format.
    Yaml,
    /// TOML format.
    Toml,
    /// JSON format.
    Json,
}

impl ConfigFormat {
    /// Determines the format from a file path.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        match ext.as_deref() {
            Some("yaml") | Some("yml") => Ok(ConfigFormat::Yaml),
            Some("toml") => Ok(ConfigFormat::Toml),
            Some("json") => Ok(ConfigFormat::Json),
            Some(other) => Err(ConfigError::unsupported_format(other)),
            None => Err(ConfigError::unsupported_format("(no extension)")),
        }
    }

    /// Returns the file extension for this format.
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Yaml => "yaml",
            ConfigFormat::Toml => "toml",
            ConfigFormat::Json => "json",
        }
    }
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Loads configuration from a file with default settings.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<CampusConfig> {
    ConfigLoader::new().load(path)
}

/// Loads configuration from a string with the specified format.
pub fn load_config_str(content: &str, format: ConfigFormat) -> ConfigResult<CampusConfig> {
    ConfigLoader::new().load_from_str(content, format)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    fn create_test_yaml() -> String {
        r#"
api:
  port: 8080
  request_timeout: 10s

jwt:
  algorithm: EdDSA
  issuer: test-campus
  private_key_path: keys/private.pem
  public_key_path: keys/public.pem
  access_ttl: 15m
  refresh_ttl: 14d

groups:
  - id: dorm
    name: Dormitory
    view: [laundry, meal]
    edit: [laundry]

accounts:
  - id: t-001
    login: kim
    password: secret
    name: Kim
    groups: [dorm]
  - id: s-001
    login: park
    password: secret
    grade: 2
    class: 3
    number: 14

logging:
  level: info
"#
        .to_string()
    }

    #[test]
    fn test_load_yaml() {
        let yaml = create_test_yaml();
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(yaml.as_bytes()).unwrap();

        let loader = ConfigLoader::new().with_env_prefix("CAMPUS_TEST_LOAD_YAML");
        let config = loader.load(file.path()).unwrap();

        assert_eq!(config.jwt.issuer, "test-campus");
        assert_eq!(config.jwt.access_ttl, Duration::from_secs(15 * 60));
        assert_eq!(config.api.request_timeout, Duration::from_secs(10));
        assert_eq!(config.groups.len(), 1);
        assert!(config.get_account("park").unwrap().is_student());
        assert!(!config.get_account("kim").unwrap().is_student());
    }

    #[test]
    fn test_key_paths_resolved_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("campus.yaml");
        fs::write(&path, create_test_yaml()).unwrap();

        let config = ConfigLoader::new()
            .with_env_prefix("CAMPUS_TEST_KEY_PATHS")
            .load(&path)
            .unwrap();

        assert_eq!(
            config.jwt.private_key_path.unwrap(),
            dir.path().join("keys/private.pem")
        );
        assert_eq!(
            config.jwt.public_key_path.unwrap(),
            dir.path().join("keys/public.pem")
        );
    }

    #[test]
    fn test_config_format_from_path() {
        assert_eq!(
            ConfigFormat::from_path(Path::new("campus.yaml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("campus.yml")).unwrap(),
            ConfigFormat::Yaml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("campus.toml")).unwrap(),
            ConfigFormat::Toml
        );
        assert_eq!(
            ConfigFormat::from_path(Path::new("campus.json")).unwrap(),
            ConfigFormat::Json
        );
        assert!(ConfigFormat::from_path(Path::new("campus.txt")).is_err());
    }

    #[test]
    fn test_env_placeholder_with_default() {
        let loader = ConfigLoader::new();
        let result = loader.resolve_env_placeholders("value: ${CAMPUS_TEST_NONEXISTENT_VAR:default}");
        assert_eq!(result, "value: default");
    }

    #[test]
    fn test_env_placeholder_missing_kept() {
        let loader = ConfigLoader::new();
        let result = loader.resolve_env_placeholders("value: ${CAMPUS_TEST_NONEXISTENT_VAR}");
        assert_eq!(result, "value: ${CAMPUS_TEST_NONEXISTENT_VAR}");

        let result = loader.resolve_env_placeholders("value: ${UNCLOSED");
        assert_eq!(result, "value: ${UNCLOSED");
    }

    #[test]
    fn test_env_placeholder_resolution() {
        env::set_var("CAMPUS_TEST_PLACEHOLDER_ISSUER", "from-env");
        let yaml = create_test_yaml().replace("test-campus", "${CAMPUS_TEST_PLACEHOLDER_ISSUER}");

        let config = ConfigLoader::new()
            .with_env_prefix("CAMPUS_TEST_PLACEHOLDER")
            .load_from_str(&yaml, ConfigFormat::Yaml)
            .unwrap();

        assert_eq!(config.jwt.issuer, "from-env");
    }

    #[test]
    fn test_env_overrides() {
        env::set_var("CAMPUS_TEST_OVERRIDE_API_PORT", "9191");
        env::set_var("CAMPUS_TEST_OVERRIDE_API_HOST", "127.0.0.1");
        env::set_var("CAMPUS_TEST_OVERRIDE_JWT_ISSUER", "override");
        env::set_var("CAMPUS_TEST_OVERRIDE_LOG_LEVEL", "debug");

        let config = ConfigLoader::new()
            .with_env_prefix("CAMPUS_TEST_OVERRIDE")
            .load_from_str(&create_test_yaml(), ConfigFormat::Yaml)
            .unwrap();

        assert_eq!(config.api.port, 9191);
        assert_eq!(config.api.host.to_string(), "127.0.0.1");
        assert_eq!(config.jwt.issuer, "override");
        assert_eq!(config.logging.level, LogLevel::Debug);
    }

    #[test]
    fn test_invalid_env_override() {
        env::set_var("CAMPUS_TEST_BAD_PORT_API_PORT", "not-a-port");

        let result = ConfigLoader::new()
            .with_env_prefix("CAMPUS_TEST_BAD_PORT")
            .load_from_str(&create_test_yaml(), ConfigFormat::Yaml);

        assert!(matches!(result, Err(ConfigError::InvalidEnvVar { .. })));
    }

    #[test]
    fn test_loader_builder() {
        let loader = ConfigLoader::builder()
            .env_prefix("MYAPP")
            .resolve_env_vars(false)
            .resolve_paths(true)
            .build();

        assert_eq!(loader.env_prefix, "MYAPP");
        assert!(!loader.resolve_env_vars);
        assert!(loader.resolve_paths);
    }

    #[test]
    fn test_load_toml() {
        let toml = r#"
[jwt]
private_key_path = "/keys/private.pem"
public_key_path = "/keys/public.pem"

[[groups]]
id = "office"
name = "Office"
view = ["@"]
"#;
        let config = ConfigLoader::new()
            .with_env_vars(false)
            .load_from_str(toml, ConfigFormat::Toml)
            .unwrap();

        assert_eq!(config.groups[0].view, vec!["@".to_string()]);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let yaml = format!("{}\nextra: true\n", create_test_yaml());
        let result = ConfigLoader::new()
            .with_env_vars(false)
            .load_from_str(&yaml, ConfigFormat::Yaml);

        assert!(matches!(result, Err(ConfigError::Serialization { .. })));
    }

    #[test]
    fn test_parse_error_carries_path() {
        let mut file = NamedTempFile::with_suffix(".yaml").unwrap();
        file.write_all(b"api: [unterminated").unwrap();

        let result = ConfigLoader::new().with_env_vars(false).load(file.path());
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_file_not_found() {
        let loader = ConfigLoader::new();
        let result = loader.load("/nonexistent/path/campus.yaml");
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }
}
