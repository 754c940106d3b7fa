//! Extract command implementation.

use anyhow::Result;
use std::path::Path;

use crate::config_resolver::ConfigSource;
use crate::ModelFormat;

/// Runs the extract command.
pub fn run(
    path: &Path,
    format: ModelFormat,
    exclude: Vec<String>,
    strict: bool,
    source: &ConfigSource,
) -> Result<()> {
    let model = super::analyze(path, exclude, strict, source)?;
    super::output::print_model(&model, format)
}
