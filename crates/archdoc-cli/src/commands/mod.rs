//! Subcommand implementations.

pub mod extract;
pub mod init;
pub mod output;
pub mod validate;

use crate::config_resolver::ConfigSource;
use anyhow::{Context, Result};
use archdoc_core::{Analyzer, WorkspaceModel};
use std::path::Path;

/// Loads the configuration and runs the analyzer over `path`.
fn analyze(
    path: &Path,
    exclude: Vec<String>,
    strict: bool,
    source: &ConfigSource,
) -> Result<WorkspaceModel> {
    let config = source.load(path)?;

    let mut builder = Analyzer::builder().root(path).config(config).excludes(exclude);
    if strict {
        builder = builder.strict(true);
    }
    let analyzer = builder.build().context("failed to build analyzer")?;

    tracing::info!(
        "analyzing {} ({} container(s))",
        analyzer.root().display(),
        analyzer.config().containers.len()
    );

    analyzer.analyze().context("analysis failed")
}
