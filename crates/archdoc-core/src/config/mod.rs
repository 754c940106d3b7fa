//! Workspace configuration driven by `archdoc.toml`.
//!
//! ```text
//! TOML text
//!   ↓ serde (DTO layer)
//! dto types
//!   ↓ validate + convert (all issues collected)
//! WorkspaceConfig (validated model)
//! ```

pub mod dto;
pub mod loader;
pub mod model;

pub use model::{
    ConfigIssue, ContainerConfig, ExternalElement, InterScopeRelation, SourcePattern,
    WorkspaceConfig,
};

use std::path::{Path, PathBuf};

/// Configuration errors.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ConfigError {
    /// IO error reading the config file.
    #[error("failed to read config file {}: {source}", .path.display())]
    #[diagnostic(code(archdoc::config::io))]
    Io {
        /// Path that failed to read.
        path: PathBuf,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// TOML syntax or shape error.
    #[error("failed to parse config: {0}")]
    #[diagnostic(code(archdoc::config::parse))]
    Parse(#[from] toml::de::Error),

    /// The configuration parsed but is invalid.
    #[error("configuration validation errors:\n{}", format_issues(.0))]
    #[diagnostic(
        code(archdoc::config::invalid),
        help("fix every listed problem; all of them were collected")
    )]
    Invalid(Vec<ConfigIssue>),
}

fn format_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl WorkspaceConfig {
    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: &Path, fallback_name: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&content, fallback_name)
    }

    /// Parses configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or fails validation.
    pub fn parse(content: &str, fallback_name: &str) -> Result<Self, ConfigError> {
        let dto: dto::ConfigDto = toml::from_str(content)?;
        loader::load(dto, fallback_name).map_err(ConfigError::Invalid)
    }

    /// Single-container configuration derived from the analysed directory.
    #[must_use]
    pub fn default_for(root: &Path) -> Self {
        let name = default_name(root);
        match loader::load(dto::ConfigDto::default(), &name) {
            Ok(config) => config,
            Err(_) => Self {
                name,
                description: String::new(),
                strict: false,
                containers: Vec::new(),
                relations: Vec::new(),
            },
        }
    }
}

/// Workspace name derived from a directory: its final component with `.`
/// replaced by `-`, or `workspace` when there is none.
#[must_use]
pub fn default_name(root: &Path) -> String {
    let canonical = root.canonicalize().ok();
    canonical
        .as_deref()
        .unwrap_or(root)
        .file_name()
        .map(|n| n.to_string_lossy().replace('.', "-"))
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| "workspace".to_string())
}
