// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the campus binary.
//!
//! Exit codes:
//!
//! | code | cause                                   |
//! |------|-----------------------------------------|
//! | 1    | configuration, unknown account          |
//! | 2    | logger installation                     |
//! | 3    | server loop, output rendering           |
//! | 4    | key files and other I/O                 |
//! | 6    | API layer (key parsing, server build)   |

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for campus-bin operations.
pub type BinResult<T> = Result<T, BinError>;

/// Errors surfaced by the `campus` commands.
#[derive(Debug, Error)]
pub enum BinError {
    /// Configuration is missing or inconsistent.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No configured account has the requested login.
    #[error("No account with login '{login}'")]
    UnknownAccount {
        /// Requested login.
        login: String,
    },

    /// A signing or verification key could not be read.
    #[error("Cannot read key {}: {reason}", path.display())]
    KeyMaterial {
        /// Key file path.
        path: PathBuf,
        /// Underlying failure.
        reason: String,
    },

    /// The tracing subscriber could not be installed.
    #[error("Logging setup failed: {0}")]
    Logging(String),

    /// The server loop failed.
    #[error("Server error: {0}")]
    Server(String),

    /// Command output could not be rendered.
    #[error("Failed to render output: {0}")]
    Output(#[from] serde_json::Error),

    /// I/O failure outside key loading.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the API layer.
    #[error("API error: {0}")]
    Api(#[from] campus_api::ApiError),

    /// Error from the config loader.
    #[error("Config error: {0}")]
    Config(#[from] campus_config::ConfigError),

    /// Another error with a description of what was being attempted.
    #[error("{context}: {source}")]
    WithContext {
        /// What was being attempted.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<BinError>,
    },
}

impl BinError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates an unknown-account error.
    pub fn unknown_account(login: impl Into<String>) -> Self {
        Self::UnknownAccount {
            login: login.into(),
        }
    }

    /// Creates a key-material error.
    pub fn key(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::KeyMaterial {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a logging setup error.
    pub fn logging(msg: impl Into<String>) -> Self {
        Self::Logging(msg.into())
    }

    /// Wraps the error with what was being attempted.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns the process exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Configuration(_) | Self::Config(_) | Self::UnknownAccount { .. } => 1,
            Self::Logging(_) => 2,
            Self::Server(_) | Self::Output(_) => 3,
            Self::KeyMaterial { .. } | Self::Io(_) => 4,
            Self::Api(_) => 6,
            Self::WithContext { source, .. } => source.exit_code(),
        }
    }

    /// Returns the innermost error, skipping context wrappers.
    pub fn root(&self) -> &BinError {
        match self {
            Self::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<anyhow::Error> for BinError {
    fn from(err: anyhow::Error) -> Self {
        Self::Server(format!("{:#}", err))
    }
}

// =============================================================================
// Error Reporting
// =============================================================================

/// Prints the error, its cause chain, and the localized hint for config errors.
pub fn report_error(error: &BinError) {
    eprintln!("Error: {}", error);

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  Caused by: {}", cause);
        source = cause.source();
    }

    match error.root() {
        BinError::Config(config_error) => eprintln!("  {}", config_error.user_message()),
        BinError::Api(api_error) => eprintln!("  ({})", api_error.status_code()),
        _ => {}
    }
}

/// Reports an error and exits with its code.
pub fn report_error_and_exit(error: BinError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}

// =============================================================================
// Tests
// =============================================================================
