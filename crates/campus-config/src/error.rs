// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Errors raised while loading and validating a campus config file.

use std::path::PathBuf;
use thiserror::Error;

/// Why a campus configuration could not be loaded.
///
/// `field` values are dotted key paths into the file (`jwt.algorithm`,
/// `groups.dorm.view`), so they can be shown to operators as-is.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file is not valid YAML/TOML/JSON or does not match the schema.
    #[error("{}: cannot parse: {message}", path.display())]
    Parse {
        /// Config file.
        path: PathBuf,
        /// Parser diagnostic.
        message: String,
    },

    /// A value is present but not acceptable.
    #[error("{field}: {message}")]
    Validation {
        /// Dotted key path.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// A required key is absent.
    #[error("{field}: required")]
    MissingField {
        /// Dotted key path.
        field: String,
    },

    /// The config file exists but could not be read.
    #[error("{}: {source}", path.display())]
    Io {
        /// Config file.
        path: PathBuf,
        /// Read failure.
        #[source]
        source: std::io::Error,
    },

    /// Two seed groups share an ID.
    #[error("groups: ID '{group_id}' is declared twice")]
    DuplicateGroupId {
        /// Repeated group ID.
        group_id: String,
    },

    /// Two accounts share an ID or a login.
    #[error("accounts: '{account}' is declared twice")]
    DuplicateAccount {
        /// Repeated ID or login.
        account: String,
    },

    /// An override variable holds an unusable value.
    #[error("${name}: {message}")]
    InvalidEnvVar {
        /// Variable name, prefix included.
        name: String,
        /// Expected shape.
        message: String,
    },

    /// The config file does not exist.
    #[error("{}: no such config file", path.display())]
    FileNotFound {
        /// Requested path.
        path: PathBuf,
    },

    /// The file extension names no supported format.
    #[error("'{format}' is not a config format (use yaml, toml or json)")]
    UnsupportedFormat {
        /// Offending extension.
        format: String,
    },

    /// A document could not be (de)serialized outside of file loading.
    #[error("cannot (de)serialize config: {message}")]
    Serialization {
        /// Serializer diagnostic.
        message: String,
    },
}

impl ConfigError {
    /// Creates a parse error.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a validation error.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a missing field error.
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingField { field: field.into() }
    }

    /// Creates an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a duplicate group ID error.
    pub fn duplicate_group_id(group_id: impl Into<String>) -> Self {
        Self::DuplicateGroupId {
            group_id: group_id.into(),
        }
    }

    /// Creates a duplicate account error.
    pub fn duplicate_account(account: impl Into<String>) -> Self {
        Self::DuplicateAccount {
            account: account.into(),
        }
    }

    /// Creates an invalid environment variable error.
    pub fn invalid_env_var(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEnvVar {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a file not found error.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Creates an unsupported format error.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Returns a user-friendly error message in Korean.
    pub fn user_message(&self) -> String {
        match self {
            ConfigError::Parse { path, message } => {
                format!("설정 파일 파싱 실패 ({}): {}", path.display(), message)
            }
            ConfigError::Validation { field, message } => {
                format!("설정 검증 실패 ({}): {}", field, message)
            }
            ConfigError::MissingField { field } => {
                format!("필수 설정 누락: {}", field)
            }
            ConfigError::Io { path, .. } => {
                format!("설정 파일 읽기 실패: {}", path.display())
            }
            ConfigError::DuplicateGroupId { group_id } => {
                format!("중복된 그룹 ID: {}", group_id)
            }
            ConfigError::DuplicateAccount { account } => {
                format!("중복된 계정: {}", account)
            }
            ConfigError::InvalidEnvVar { name, message } => {
                format!("잘못된 환경 변수 값 ({}): {}", name, message)
            }
            ConfigError::FileNotFound { path } => {
                format!("파일을 찾을 수 없습니다: {}", path.display())
            }
            ConfigError::UnsupportedFormat { format } => {
                format!("지원하지 않는 설정 형식: {}", format)
            }
            ConfigError::Serialization { message } => {
                format!("직렬화 오류: {}", message)
            }
        }
    }

    /// Returns the config key or variable the error points at, if any.
    pub fn field(&self) -> Option<&str> {
        match self {
            ConfigError::Validation { field, .. } | ConfigError::MissingField { field } => {
                Some(field)
            }
            ConfigError::InvalidEnvVar { name, .. } => Some(name),
            ConfigError::DuplicateGroupId { .. } => Some("groups"),
            ConfigError::DuplicateAccount { .. } => Some("accounts"),
            _ => None,
        }
    }

    /// Returns `true` if the file itself could not be opened or read.
    pub fn is_io_error(&self) -> bool {
        matches!(
            self,
            ConfigError::Io { .. } | ConfigError::FileNotFound { .. }
        )
    }

    /// Short tag used as a structured log field.
    pub fn error_type(&self) -> &'static str {
        match self {
            ConfigError::Parse { .. } | ConfigError::Serialization { .. } => "parse",
            ConfigError::Validation { .. }
            | ConfigError::MissingField { .. }
            | ConfigError::DuplicateGroupId { .. }
            | ConfigError::DuplicateAccount { .. } => "invalid",
            ConfigError::InvalidEnvVar { .. } => "env",
            ConfigError::Io { .. }
            | ConfigError::FileNotFound { .. }
            | ConfigError::UnsupportedFormat { .. } => "file",
        }
    }
}

/// Result alias for config loading.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_points_at_key() {
        let error = ConfigError::validation("jwt.algorithm", "HS256 is a shared-secret algorithm");
        assert_eq!(
            error.to_string(),
            "jwt.algorithm: HS256 is a shared-secret algorithm"
        );
        assert_eq!(error.field(), Some("jwt.algorithm"));
        assert_eq!(error.error_type(), "invalid");

        let error = ConfigError::duplicate_group_id("dorm");
        assert_eq!(error.to_string(), "groups: ID 'dorm' is declared twice");
        assert_eq!(error.field(), Some("groups"));
    }

    #[test]
    fn test_env_var_error() {
        let error = ConfigError::invalid_env_var("CAMPUS_API_PORT", "expected valid port number");
        assert_eq!(error.to_string(), "$CAMPUS_API_PORT: expected valid port number");
        assert_eq!(error.field(), Some("CAMPUS_API_PORT"));
        assert_eq!(error.error_type(), "env");
    }

    #[test]
    fn test_user_message_is_localized() {
        let error = ConfigError::validation("api.port", "must be positive");
        let msg = error.user_message();
        assert!(msg.contains("설정 검증 실패"));
        assert!(msg.contains("api.port"));

        assert!(ConfigError::duplicate_account("park")
            .user_message()
            .contains("중복된 계정"));
    }

    #[test]
    fn test_io_errors() {
        let error = ConfigError::io(
            "campus.yaml",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(error.is_io_error());
        assert!(ConfigError::file_not_found("campus.yaml").is_io_error());
        assert!(!ConfigError::missing_field("jwt").is_io_error());
        assert_eq!(error.field(), None);
    }
}
