// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! campus - school administration backend
//!
//! Main binary entry point.

use campus_bin::cli::Cli;
use campus_bin::error::report_error_and_exit;
use campus_bin::{commands, logging};

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();

    if let Err(e) = logging::init_from_cli(&cli) {
        report_error_and_exit(e);
    }

    if let Err(e) = commands::execute(cli).await {
        tracing::error!(error = %e, "Command failed");
        report_error_and_exit(e);
    }
}
