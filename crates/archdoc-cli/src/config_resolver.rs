//! Locating and loading `archdoc.toml`.
//!
//! Lookup order:
//!
//! 1. `--config <FILE>`
//! 2. `archdoc.toml`, then `.archdoc.toml`, in the analysed directory
//! 3. `config.toml` in `$ARCHDOC_CONFIG_DIR`, else in `~/.archdoc/`
//! 4. nothing found: one container derived from the analysed directory

use anyhow::{Context, Result};
use archdoc_core::config::default_name;
use archdoc_core::WorkspaceConfig;
use std::path::{Path, PathBuf};

const PROJECT_FILES: [&str; 2] = ["archdoc.toml", ".archdoc.toml"];
const GLOBAL_FILE: &str = "config.toml";
const GLOBAL_DIR_ENV: &str = "ARCHDOC_CONFIG_DIR";

/// Where the configuration comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Given with `--config`; not checked for existence.
    Explicit(PathBuf),
    /// Found in the analysed directory.
    Project(PathBuf),
    /// Found in the global config directory.
    Global(PathBuf),
    /// Nothing found.
    Derived,
}

impl ConfigSource {
    /// Returns the file to read, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Explicit(p) | Self::Project(p) | Self::Global(p) => Some(p),
            Self::Derived => None,
        }
    }

    /// Loads the workspace configuration for `project_dir`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be read, parsed or validated.
    pub fn load(&self, project_dir: &Path) -> Result<WorkspaceConfig> {
        let Some(path) = self.path() else {
            tracing::debug!("no config file found, deriving a single container");
            return Ok(WorkspaceConfig::default_for(project_dir));
        };
        if matches!(self, Self::Global(_)) {
            tracing::info!("using global config: {}", path.display());
        }
        WorkspaceConfig::from_file(path, &default_name(project_dir))
            .with_context(|| format!("failed to load config: {}", path.display()))
    }
}

/// Resolves the configuration source for a project directory.
#[must_use]
pub fn resolve(project_dir: &Path, explicit: Option<&Path>) -> ConfigSource {
    resolve_with(project_dir, explicit, global_config_dir())
}

fn resolve_with(project_dir: &Path, explicit: Option<&Path>, global_dir: Option<PathBuf>) -> ConfigSource {
    if let Some(path) = explicit {
        return ConfigSource::Explicit(path.to_path_buf());
    }
    if let Some(found) = PROJECT_FILES
        .iter()
        .map(|name| project_dir.join(name))
        .find(|p| p.is_file())
    {
        tracing::debug!("found project config: {}", found.display());
        return ConfigSource::Project(found);
    }
    global_dir
        .map(|dir| dir.join(GLOBAL_FILE))
        .filter(|p| p.is_file())
        .map_or(ConfigSource::Derived, ConfigSource::Global)
}

/// Returns the global config directory: `$ARCHDOC_CONFIG_DIR`, else
/// `~/.archdoc`.
#[must_use]
pub fn global_config_dir() -> Option<PathBuf> {
    std::env::var_os(GLOBAL_DIR_ENV)
        .map(PathBuf::from)
        .or_else(|| home::home_dir().map(|h| h.join(".archdoc")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn explicit_wins_and_is_not_checked() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("archdoc.toml"), "").unwrap();
        let explicit = Path::new("/nonexistent/archdoc.toml");
        assert_eq!(
            resolve_with(tmp.path(), Some(explicit), None),
            ConfigSource::Explicit(explicit.to_path_buf())
        );
    }

    #[test]
    fn plain_name_preferred_over_dot_prefix() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("archdoc.toml"), "").unwrap();
        fs::write(tmp.path().join(".archdoc.toml"), "").unwrap();
        assert_eq!(
            resolve_with(tmp.path(), None, None),
            ConfigSource::Project(tmp.path().join("archdoc.toml"))
        );
    }

    #[test]
    fn global_used_only_without_project_config() {
        let project = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();
        fs::write(global.path().join("config.toml"), "").unwrap();

        let found = resolve_with(project.path(), None, Some(global.path().to_path_buf()));
        assert_eq!(found, ConfigSource::Global(global.path().join("config.toml")));

        fs::write(project.path().join(".archdoc.toml"), "").unwrap();
        let found = resolve_with(project.path(), None, Some(global.path().to_path_buf()));
        assert!(matches!(found, ConfigSource::Project(_)));
    }

    #[test]
    fn derived_config_when_nothing_exists() {
        let project = TempDir::new().unwrap();
        let global = TempDir::new().unwrap();
        let source = resolve_with(project.path(), None, Some(global.path().to_path_buf()));
        assert_eq!(source, ConfigSource::Derived);

        let config = source.load(project.path()).unwrap();
        assert_eq!(config.containers.len(), 1);
    }

    #[test]
    fn invalid_file_reports_path() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("archdoc.toml");
        fs::write(&path, "[[containers]]\nname = \"\"\n").unwrap();
        let err = ConfigSource::Project(path).load(tmp.path()).unwrap_err();
        assert!(format!("{err:#}").contains("archdoc.toml"));
    }
}
