//! Init command implementation.

use anyhow::{bail, Result};
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# archdoc configuration
#
# Components and relations are declared in doc comments:
#
#   /// Places orders.
#   ///
#   /// @component
#   /// - group: Business/Orders
#   ///
#   /// @relation PaymentService | Charges the customer
#   pub struct OrderService { payments: PaymentService }

[workspace]
# name = "My System"
description = ""
# Stop at the first extraction error instead of collecting all of them
strict = false

[[containers]]
name = "app"
root = "."
description = ""
technology = "Rust"
include = ["src/**/*.rs"]
exclude = ["**/generated/**"]

# "path": any slash-delimited group path (default)
# "allowlist": only the groups listed below
group_policy = "path"

# [[containers.groups]]
# name = "Business"
#
# [[containers.groups]]
# name = "Payment Processing"
# parent = "Business"

# External elements are trusted targets without usage checks
# [containers.external.metrics-service]
# type = "system"
# description = "Collects metrics"
# technology = "Prometheus"

# Relations between containers
# [[relations]]
# source = "app"
# target = "worker"
# description = "Enqueues jobs"
"#;

/// Runs the init command.
pub fn run(force: bool) -> Result<()> {
    let config_path = Path::new("archdoc.toml");

    if config_path.exists() && !force {
        bail!(
            "Configuration file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    std::fs::write(config_path, DEFAULT_CONFIG)?;

    println!("Created archdoc.toml");
    println!("\nNext steps:");
    println!("  1. Annotate components with @component and @relation doc tags");
    println!("  2. Run: archdoc validate");

    Ok(())
}
