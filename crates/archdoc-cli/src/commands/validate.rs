//! Validate command implementation.

use anyhow::Result;
use std::path::Path;

use crate::config_resolver::ConfigSource;
use crate::OutputFormat;

/// Runs the validate command.
///
/// Exits with status 1 when any validation result is a problem or any
/// finding is an error.
pub fn run(
    path: &Path,
    format: OutputFormat,
    all: bool,
    exclude: Vec<String>,
    strict: bool,
    source: &ConfigSource,
) -> Result<()> {
    let model = super::analyze(path, exclude, strict, source)?;

    super::output::print_validation(&model, format, all)?;

    if model.has_problems() {
        std::process::exit(1);
    }

    Ok(())
}
