//! Validated configuration model.
//!
//! This module contains no serde deserialization and no I/O. Values are
//! built by the loader, which enforces every invariant first.

use crate::groups::GroupConfig;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Default source selection of a container.
pub const DEFAULT_INCLUDE: &str = "src/**/*.rs";

/// Excludes applied to every container.
pub const DEFAULT_EXCLUDES: [&str; 2] = ["**/target/**", "**/vendor/**"];

/// A validated glob pattern relative to a container root.
///
/// The glob is compiled once at construction and reused for all match calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcePattern {
    raw: String,
    compiled: glob::Pattern,
}

impl SourcePattern {
    /// Creates a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigIssue::UnsafePattern`] for absolute patterns or `..`
    /// segments, and [`ConfigIssue::InvalidPattern`] for bad glob syntax.
    pub fn new(container: &str, pattern: &str) -> Result<Self, ConfigIssue> {
        if let Some(reason) = escape_reason(Path::new(pattern)) {
            return Err(ConfigIssue::UnsafePattern {
                container: container.to_string(),
                pattern: pattern.to_string(),
                reason,
            });
        }
        let compiled = glob::Pattern::new(pattern).map_err(|e| ConfigIssue::InvalidPattern {
            container: container.to_string(),
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            raw: pattern.to_string(),
            compiled,
        })
    }

    /// Tests whether a path relative to the container root matches.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();
        if self.compiled.matches(&path_str) {
            return true;
        }
        // `**/dir/**` also matches `dir/...` at the top level.
        self.raw
            .strip_prefix("**/")
            .and_then(|rest| glob::Pattern::new(rest).ok())
            .is_some_and(|p| p.matches(&path_str))
    }

    /// Returns the pattern text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for SourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Returns why a relative path would escape its base, if it would.
pub(crate) fn escape_reason(path: &Path) -> Option<String> {
    if path.is_absolute() || path.to_string_lossy().starts_with('/') {
        return Some("absolute paths are not allowed".to_string());
    }
    path.components()
        .any(|c| matches!(c, Component::ParentDir))
        .then(|| "`..` segments are not allowed".to_string())
}

/// A dependency outside every analysed scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExternalElement {
    /// Element type (e.g. "system").
    #[serde(rename = "type")]
    pub kind: String,
    /// Description.
    pub description: String,
    /// Technology.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
}

/// One analysed scope.
#[derive(Debug, Clone)]
pub struct ContainerConfig {
    /// Unique container name.
    pub name: String,
    /// Directory relative to the workspace root.
    pub root: PathBuf,
    /// Description.
    pub description: String,
    /// Technology.
    pub technology: Option<String>,
    /// Tags.
    pub tags: Vec<String>,
    /// Custom properties.
    pub properties: BTreeMap<String, String>,
    /// Source selection.
    pub include: Vec<SourcePattern>,
    /// Source exclusion.
    pub exclude: Vec<SourcePattern>,
    /// Group policy and configured groups.
    pub groups: GroupConfig,
    /// External elements keyed by name.
    pub externals: BTreeMap<String, ExternalElement>,
}

impl ContainerConfig {
    /// Returns true if a relative path is excluded.
    #[must_use]
    pub fn is_excluded(&self, relative: &Path) -> bool {
        self.exclude.iter().any(|p| p.matches(relative))
    }
}

/// A relation between containers declared in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterScopeRelation {
    /// Source container.
    pub source: String,
    /// Target container or `container.component`.
    pub target: String,
    /// Description.
    pub description: String,
    /// Technology.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
}

/// Validated workspace configuration.
///
/// Container names are unique and every cross-reference resolves.
#[derive(Debug, Clone)]
pub struct WorkspaceConfig {
    /// Workspace name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Stop on the first extraction error.
    pub strict: bool,
    /// Containers in declaration order.
    pub containers: Vec<ContainerConfig>,
    /// Container-to-container relations.
    pub relations: Vec<InterScopeRelation>,
}

impl WorkspaceConfig {
    /// Returns a container by name.
    #[must_use]
    pub fn container(&self, name: &str) -> Option<&ContainerConfig> {
        self.containers.iter().find(|c| c.name == name)
    }
}

/// One configuration problem. All problems are collected before reporting.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigIssue {
    /// A container name is empty or contains `.`.
    #[error("invalid container name `{name}`: must be non-empty and must not contain `.`")]
    InvalidContainerName {
        /// The invalid name.
        name: String,
    },

    /// Two containers share a name.
    #[error("duplicate container `{name}`")]
    DuplicateContainer {
        /// The shared name.
        name: String,
    },

    /// A source pattern or root escapes the workspace.
    #[error("{container}: unsafe source pattern `{pattern}`: {reason}")]
    UnsafePattern {
        /// Container name.
        container: String,
        /// The pattern.
        pattern: String,
        /// Why it is unsafe.
        reason: String,
    },

    /// A source pattern has invalid glob syntax.
    #[error("{container}: invalid glob pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// Container name.
        container: String,
        /// The pattern.
        pattern: String,
        /// Why it is invalid.
        reason: String,
    },

    /// Unknown `group_policy` value.
    #[error("{container}: unknown group policy `{value}`, expected: path, allowlist")]
    UnknownGroupPolicy {
        /// Container name.
        container: String,
        /// The invalid value.
        value: String,
    },

    /// Two groups of one container share a name.
    #[error("{container}: duplicate group `{group}`")]
    DuplicateGroup {
        /// Container name.
        container: String,
        /// The shared name.
        group: String,
    },

    /// A group names a parent that is not configured.
    #[error("{container}: group `{group}` has unknown parent `{parent}`")]
    UnknownGroupParent {
        /// Container name.
        container: String,
        /// The group.
        group: String,
        /// The missing parent.
        parent: String,
    },

    /// Group parents form a cycle.
    #[error("{container}: group `{group}` is part of a parent cycle")]
    CyclicGroup {
        /// Container name.
        container: String,
        /// A group on the cycle.
        group: String,
    },

    /// An external element name is empty, contains `.` or `/`, or equals a
    /// container name.
    #[error("{container}: reserved external element name `{name}`")]
    ReservedExternalName {
        /// Container name.
        container: String,
        /// The reserved name.
        name: String,
    },

    /// An inter-scope relation names an unknown container.
    #[error("relation {source_name} -> {target}: unknown container `{container}`")]
    UnknownRelationContainer {
        /// Relation source.
        source_name: String,
        /// Relation target.
        target: String,
        /// The unknown container.
        container: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_pattern_rejects_escapes() {
        assert!(matches!(
            SourcePattern::new("api", "../other/**/*.rs"),
            Err(ConfigIssue::UnsafePattern { .. })
        ));
        assert!(matches!(
            SourcePattern::new("api", "/etc/**"),
            Err(ConfigIssue::UnsafePattern { .. })
        ));
        assert!(matches!(
            SourcePattern::new("api", "src/[.rs"),
            Err(ConfigIssue::InvalidPattern { .. })
        ));
    }

    #[test]
    fn double_star_prefix_matches_top_level() {
        let p = SourcePattern::new("api", "**/generated/**").unwrap();
        assert!(p.matches(Path::new("generated/schema.rs")));
        assert!(p.matches(Path::new("src/generated/schema.rs")));
        assert!(!p.matches(Path::new("src/orders.rs")));
    }
}
