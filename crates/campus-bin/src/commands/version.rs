// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `version` command.

use crate::cli::Cli;
use crate::error::BinResult;

/// Executes the `version` command to display version information.
pub fn version(_cli: &Cli) -> BinResult<()> {
    println!("campus - school administration backend");
    println!();
    println!("Version Information:");
    println!("  campus-bin:    {}", crate::VERSION);
    println!("  campus-api:    {}", campus_api::VERSION);
    println!("  campus-config: {}", campus_config::VERSION);
    println!();
    println!("Tokens:");
    println!(
        "  Algorithms:   {}",
        campus_config::schema::SUPPORTED_ALGORITHMS.join(", ")
    );
    println!("  Wildcard:     \"{}\"", campus_api::auth::WILDCARD);
    println!();
    println!("Build Information:");
    println!("  Target:       {}", std::env::consts::ARCH);
    println!("  OS:           {}", std::env::consts::OS);
    println!();
    println!("License: PolyForm Noncommercial License 1.0.0");
    println!("Copyright (c) 2025 Sylvex. All rights reserved.");

    Ok(())
}
