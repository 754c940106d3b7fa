//! Group hierarchy: validation of component group values and the tree
//! built from them.
//!
//! Two policies exist. [`GroupPolicy::PathPattern`] (the default) accepts any
//! slash-delimited path whose segments consist of letters, digits, spaces and
//! hyphens; every prefix of a used path becomes a node. [`GroupPolicy::Allowlist`]
//! accepts only groups present in the configured tree, looked up by name at
//! any depth or by full path.

use crate::extract::ExtractError;
use crate::model::{Component, GroupNode};
use serde::{Deserialize, Serialize};

/// Name of the node collecting components without a group.
pub const UNGROUPED: &str = "(no group)";

/// Separator between group path segments.
pub const GROUP_SEPARATOR: char = '/';

/// How component group values are validated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupPolicy {
    /// Any well-formed slash path.
    #[default]
    #[serde(rename = "path")]
    PathPattern,
    /// Only configured groups.
    Allowlist,
}

/// A configured group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupDef {
    /// Group name.
    pub name: String,
    /// Parent group name, for nested groups.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
}

impl GroupDef {
    /// Creates a group definition.
    #[must_use]
    pub fn new(name: impl Into<String>, parent: Option<&str>) -> Self {
        Self {
            name: name.into(),
            parent: parent.map(String::from),
        }
    }
}

/// Group policy plus the configured group tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupConfig {
    /// Validation policy.
    pub policy: GroupPolicy,
    /// Configured groups. Assumed acyclic; the configuration layer rejects
    /// cycles.
    pub groups: Vec<GroupDef>,
}

impl GroupConfig {
    /// Creates a group configuration.
    #[must_use]
    pub fn new(policy: GroupPolicy, groups: Vec<GroupDef>) -> Self {
        Self { policy, groups }
    }

    /// Validates a component's group value.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::UndeclaredGroup`] under the allowlist policy
    /// and [`ExtractError::InvalidGroupPath`] under the path policy.
    pub fn validate(&self, group: &str) -> Result<(), ExtractError> {
        match self.policy {
            GroupPolicy::Allowlist => {
                if self.resolve_configured(group).is_some() {
                    Ok(())
                } else {
                    Err(ExtractError::UndeclaredGroup {
                        group: group.to_string(),
                    })
                }
            }
            GroupPolicy::PathPattern => {
                for segment in group.split(GROUP_SEPARATOR) {
                    if !is_valid_segment(segment.trim()) {
                        return Err(ExtractError::InvalidGroupPath {
                            path: group.to_string(),
                            segment: segment.to_string(),
                        });
                    }
                }
                Ok(())
            }
        }
    }

    /// Builds the group tree.
    ///
    /// The ungrouped node comes first. Configured groups always appear, even
    /// when empty; pruning is left to renderers. A component attaches only
    /// to its own node, never to ancestors.
    #[must_use]
    pub fn build_tree(&self, components: &[Component]) -> Vec<GroupNode> {
        let mut roots = vec![GroupNode::new(UNGROUPED, "")];

        for def in &self.groups {
            let path = self.full_path(def);
            ensure(&mut roots, "", &segments(&path));
        }

        for component in components {
            let target = match component.group.as_deref() {
                None => None,
                Some(group) => {
                    let path = match self.policy {
                        GroupPolicy::Allowlist => self
                            .resolve_configured(group)
                            .unwrap_or_else(|| normalize(group)),
                        GroupPolicy::PathPattern => normalize(group),
                    };
                    ensure(&mut roots, "", &segments(&path))
                }
            };
            match target {
                Some(node) => node.components.push(component.name.clone()),
                None => roots[0].components.push(component.name.clone()),
            }
        }

        roots
    }

    /// Finds a configured group by full path or by name, returning its
    /// full path.
    fn resolve_configured(&self, group: &str) -> Option<String> {
        let wanted = normalize(group);
        let paths: Vec<String> = self.groups.iter().map(|g| self.full_path(g)).collect();
        if let Some(path) = paths.iter().find(|p| **p == wanted) {
            return Some(path.clone());
        }
        self.groups
            .iter()
            .zip(paths)
            .find(|(def, _)| def.name == wanted)
            .map(|(_, path)| path)
    }

    fn full_path(&self, def: &GroupDef) -> String {
        let mut parts = vec![def.name.as_str()];
        let mut parent = def.parent.as_deref();
        while let Some(name) = parent {
            if parts.len() > self.groups.len() {
                break;
            }
            parts.push(name);
            parent = self
                .groups
                .iter()
                .find(|g| g.name == name)
                .and_then(|g| g.parent.as_deref());
        }
        parts.reverse();
        parts.join("/")
    }
}

fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_alphanumeric() || c == ' ' || c == '-')
}

fn normalize(group: &str) -> String {
    segments(group).join("/")
}

fn segments(path: &str) -> Vec<&str> {
    path.split(GROUP_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

fn ensure<'n>(
    nodes: &'n mut Vec<GroupNode>,
    prefix: &str,
    segments: &[&str],
) -> Option<&'n mut GroupNode> {
    let (first, rest) = segments.split_first()?;
    let path = if prefix.is_empty() {
        (*first).to_string()
    } else {
        format!("{prefix}/{first}")
    };
    let idx = match nodes.iter().position(|n| n.path == path) {
        Some(idx) => idx,
        None => {
            nodes.push(GroupNode::new(*first, path.clone()));
            nodes.len() - 1
        }
    };
    let node = &mut nodes[idx];
    if rest.is_empty() {
        Some(node)
    } else {
        ensure(&mut node.subgroups, &path, rest)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Location;
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn component(name: &str, group: Option<&str>) -> Component {
        Component {
            name: name.to_string(),
            description: String::new(),
            technology: None,
            tags: Vec::new(),
            group: group.map(String::from),
            url: None,
            properties: BTreeMap::new(),
            perspectives: BTreeMap::new(),
            location: Location::new(PathBuf::from("src/lib.rs"), name, 1),
            declaration: format!("shop::{name}"),
            relations: Vec::new(),
        }
    }

    #[test]
    fn path_policy_builds_nested_tree_with_leaf_attachment() {
        let config = GroupConfig::default();
        let tree = config.build_tree(&[
            component("PaymentService", Some("Business/Payment Processing")),
            component("Logger", None),
        ]);

        assert_eq!(tree[0].name, UNGROUPED);
        assert_eq!(tree[0].components, vec!["Logger"]);

        let business = &tree[1];
        assert_eq!(business.name, "Business");
        assert!(business.components.is_empty());
        assert_eq!(business.subgroups.len(), 1);

        let leaf = &business.subgroups[0];
        assert_eq!(leaf.name, "Payment Processing");
        assert_eq!(leaf.path, "Business/Payment Processing");
        assert_eq!(leaf.components, vec!["PaymentService"]);
    }

    #[test]
    fn path_policy_rejects_bad_segments() {
        let config = GroupConfig::default();
        assert!(config.validate("Business/Payment Processing").is_ok());
        assert!(matches!(
            config.validate("Business//Payments"),
            Err(ExtractError::InvalidGroupPath { ref segment, .. }) if segment.is_empty()
        ));
        assert!(matches!(
            config.validate("Ops_Team"),
            Err(ExtractError::InvalidGroupPath { .. })
        ));
    }

    #[test]
    fn allowlist_accepts_names_at_any_depth() {
        let config = GroupConfig::new(
            GroupPolicy::Allowlist,
            vec![
                GroupDef::new("Business", None),
                GroupDef::new("Payment Processing", Some("Business")),
            ],
        );
        assert!(config.validate("Payment Processing").is_ok());
        assert!(config.validate("Business/Payment Processing").is_ok());
        assert!(matches!(
            config.validate("Shipping"),
            Err(ExtractError::UndeclaredGroup { .. })
        ));

        let tree = config.build_tree(&[component("PaymentService", Some("Payment Processing"))]);
        assert_eq!(tree[1].subgroups[0].components, vec!["PaymentService"]);
    }

    #[test]
    fn configured_empty_groups_are_kept() {
        let config = GroupConfig::new(GroupPolicy::Allowlist, vec![GroupDef::new("Infra", None)]);
        let tree = config.build_tree(&[]);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[1].name, "Infra");
        assert!(tree[1].is_empty());
    }
}
