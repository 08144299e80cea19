// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Logging and tracing initialization.
//!
//! Level and format come from the CLI when given, otherwise from the
//! `logging` section of the config file. `RUST_LOG` overrides both.

use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::cli::{Cli, LogFormat};
use crate::error::{BinError, BinResult};

/// Directives appended to every filter.
const DEFAULT_DIRECTIVES: &[&str] = &["hyper=warn", "tower=warn", "axum=info", "tokio=info"];

// =============================================================================
// Logging Initialization
// =============================================================================

/// Initializes logging from CLI flags, falling back to the config file.
///
/// An unreadable or invalid config file is not an error here; the command
/// itself reports it once logging is up.
pub fn init_from_cli(cli: &Cli) -> BinResult<()> {
    let file_logging = campus_config::ConfigLoader::new()
        .load(&cli.config)
        .ok()
        .map(|config| config.logging)
        .unwrap_or_default();

    let level = cli.effective_log_level(file_logging.level.as_str());
    let format = cli.log_format.unwrap_or_else(|| file_logging.format.into());

    init_logging(level, format, file_logging.filter.as_deref())
}

/// Initializes the logging subsystem.
///
/// # Arguments
///
/// * `level` - Log level string (trace, debug, info, warn, error)
/// * `format` - Log output format (text, json, compact)
/// * `extra` - Additional comma-separated filter directives
pub fn init_logging(level: &str, format: LogFormat, extra: Option<&str>) -> BinResult<()> {
    let filter = build_filter(level, extra)?;

    let result = match format {
        LogFormat::Text => {
            let is_terminal = std::io::IsTerminal::is_terminal(&std::io::stdout());
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .with_ansi(is_terminal),
                )
                .try_init()
        }
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init(),
        LogFormat::Compact => {
            let is_terminal = std::io::IsTerminal::is_terminal(&std::io::stdout());
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false)
                        .with_ansi(is_terminal),
                )
                .try_init()
        }
    };

    result.map_err(|e| BinError::logging(e.to_string()))
}

/// Builds the filter: `RUST_LOG` if set, else `level`, plus default and
/// extra directives.
fn build_filter(level: &str, extra: Option<&str>) -> BinResult<EnvFilter> {
    let mut filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let extra = extra
        .into_iter()
        .flat_map(|s| s.split(','))
        .map(str::trim)
        .filter(|s| !s.is_empty());

    for directive in DEFAULT_DIRECTIVES.iter().copied().chain(extra) {
        let directive = directive
            .parse::<Directive>()
            .map_err(|e| BinError::config(format!("Invalid log directive '{}': {}", directive, e)))?;
        filter = filter.add_directive(directive);
    }

    Ok(filter)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_filter_with_extra_directives() {
        assert!(build_filter("info", Some("campus_api=debug, tower_http=trace")).is_ok());
        assert!(build_filter("debug", None).is_ok());
    }

    #[test]
    fn test_build_filter_rejects_bad_directive() {
        let err = build_filter("info", Some("campus_api=loudest")).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }
}
