//! TOML deserialization types (DTO layer).
//!
//! These types exist solely for serde deserialization.
//! They are converted to the validated model by the loader.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Raw TOML representation of `archdoc.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigDto {
    /// `[workspace]` table.
    #[serde(default)]
    pub workspace: WorkspaceDto,

    /// `[[containers]]` entries.
    #[serde(default)]
    pub containers: Vec<ContainerDto>,

    /// `[[relations]]` entries between containers.
    #[serde(default)]
    pub relations: Vec<RelationDto>,
}

/// TOML representation of the `[workspace]` table.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkspaceDto {
    /// Workspace (system) name.
    #[serde(default)]
    pub name: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Stop on the first extraction error.
    #[serde(default)]
    pub strict: bool,
}

/// TOML representation of one container.
#[derive(Debug, Clone, Deserialize)]
pub struct ContainerDto {
    /// Container name.
    pub name: String,
    /// Directory relative to the workspace root.
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Technology.
    #[serde(default)]
    pub technology: Option<String>,
    /// Tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Source selection (default: `src/**/*.rs`).
    #[serde(default)]
    pub include: Vec<String>,
    /// Source exclusion.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// `"path"` (default) or `"allowlist"`.
    #[serde(default)]
    pub group_policy: Option<String>,
    /// Custom properties.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Configured groups.
    #[serde(default)]
    pub groups: Vec<GroupDto>,
    /// External elements keyed by name.
    #[serde(default)]
    pub external: BTreeMap<String, ExternalDto>,
}

/// TOML representation of a group.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupDto {
    /// Group name.
    pub name: String,
    /// Parent group name.
    #[serde(default)]
    pub parent: Option<String>,
}

/// TOML representation of an external element.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExternalDto {
    /// Element type (e.g. "system", "database").
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Technology.
    #[serde(default)]
    pub technology: Option<String>,
}

/// TOML representation of a container-to-container relation.
#[derive(Debug, Clone, Deserialize)]
pub struct RelationDto {
    /// Source container.
    pub source: String,
    /// Target container or `container.component`.
    pub target: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Technology.
    #[serde(default)]
    pub technology: Option<String>,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}
