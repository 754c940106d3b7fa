//! DTO → model conversion with validation.
//!
//! Unlike a fail-fast conversion, every problem is collected so the user
//! sees the whole list at once.

use super::dto::{ConfigDto, ContainerDto, ExternalDto, GroupDto, RelationDto};
use super::model::{
    escape_reason, ConfigIssue, ContainerConfig, ExternalElement, InterScopeRelation,
    SourcePattern, WorkspaceConfig, DEFAULT_EXCLUDES, DEFAULT_INCLUDE,
};
use crate::groups::{GroupConfig, GroupDef, GroupPolicy};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

/// Converts a [`ConfigDto`] into a validated [`WorkspaceConfig`].
///
/// `fallback_name` names the workspace when `[workspace]` does not. Without
/// `[[containers]]` a single container named after the workspace and rooted
/// at the workspace root is assumed.
///
/// # Errors
///
/// Returns every problem found.
pub fn load(dto: ConfigDto, fallback_name: &str) -> Result<WorkspaceConfig, Vec<ConfigIssue>> {
    let mut issues = Vec::new();
    let name = dto
        .workspace
        .name
        .unwrap_or_else(|| fallback_name.to_string());

    let container_dtos = if dto.containers.is_empty() {
        vec![default_container(&name)]
    } else {
        dto.containers
    };

    let mut seen = HashSet::new();
    for c in &container_dtos {
        if c.name.is_empty() || c.name.contains('.') {
            issues.push(ConfigIssue::InvalidContainerName {
                name: c.name.clone(),
            });
        } else if !seen.insert(c.name.clone()) {
            issues.push(ConfigIssue::DuplicateContainer {
                name: c.name.clone(),
            });
        }
    }

    let containers: Vec<ContainerConfig> = container_dtos
        .into_iter()
        .map(|c| convert_container(c, &seen, &mut issues))
        .collect();

    let relations = dto
        .relations
        .into_iter()
        .map(|r| convert_relation(r, &seen, &mut issues))
        .collect();

    if issues.is_empty() {
        Ok(WorkspaceConfig {
            name,
            description: dto.workspace.description,
            strict: dto.workspace.strict,
            containers,
            relations,
        })
    } else {
        Err(issues)
    }
}

/// The container assumed when the configuration lists none.
pub(crate) fn default_container(name: &str) -> ContainerDto {
    ContainerDto {
        name: name.to_string(),
        root: PathBuf::from("."),
        description: String::new(),
        technology: Some("Rust".to_string()),
        tags: Vec::new(),
        include: Vec::new(),
        exclude: Vec::new(),
        group_policy: None,
        properties: BTreeMap::new(),
        groups: Vec::new(),
        external: BTreeMap::new(),
    }
}

fn convert_container(
    dto: ContainerDto,
    containers: &HashSet<String>,
    issues: &mut Vec<ConfigIssue>,
) -> ContainerConfig {
    let name = dto.name;

    if let Some(reason) = escape_reason(&dto.root) {
        issues.push(ConfigIssue::UnsafePattern {
            container: name.clone(),
            pattern: dto.root.display().to_string(),
            reason,
        });
    }

    let include_raw = if dto.include.is_empty() {
        vec![DEFAULT_INCLUDE.to_string()]
    } else {
        dto.include
    };
    let mut exclude_raw = dto.exclude;
    exclude_raw.extend(DEFAULT_EXCLUDES.iter().map(ToString::to_string));
    let include = patterns(&name, &include_raw, issues);
    let exclude = patterns(&name, &exclude_raw, issues);

    let policy = match dto.group_policy.as_deref() {
        None | Some("path") => GroupPolicy::PathPattern,
        Some("allowlist") => GroupPolicy::Allowlist,
        Some(other) => {
            issues.push(ConfigIssue::UnknownGroupPolicy {
                container: name.clone(),
                value: other.to_string(),
            });
            GroupPolicy::default()
        }
    };
    let groups = convert_groups(&name, dto.groups, issues);

    let externals = dto
        .external
        .into_iter()
        .filter_map(|(ext_name, ext)| {
            if is_reserved(&ext_name, containers) {
                issues.push(ConfigIssue::ReservedExternalName {
                    container: name.clone(),
                    name: ext_name,
                });
                return None;
            }
            Some((ext_name, convert_external(ext)))
        })
        .collect();

    ContainerConfig {
        name,
        root: dto.root,
        description: dto.description,
        technology: dto.technology,
        tags: dto.tags,
        properties: dto.properties,
        include,
        exclude,
        groups: GroupConfig::new(policy, groups),
        externals,
    }
}

fn patterns(container: &str, raw: &[String], issues: &mut Vec<ConfigIssue>) -> Vec<SourcePattern> {
    raw.iter()
        .filter_map(|p| {
            SourcePattern::new(container, p)
                .map_err(|e| issues.push(e))
                .ok()
        })
        .collect()
}

fn convert_groups(
    container: &str,
    dtos: Vec<GroupDto>,
    issues: &mut Vec<ConfigIssue>,
) -> Vec<GroupDef> {
    let mut parents: HashMap<String, Option<String>> = HashMap::new();
    for g in &dtos {
        if parents.insert(g.name.clone(), g.parent.clone()).is_some() {
            issues.push(ConfigIssue::DuplicateGroup {
                container: container.to_string(),
                group: g.name.clone(),
            });
        }
    }

    for g in &dtos {
        let Some(parent) = &g.parent else {
            continue;
        };
        if !parents.contains_key(parent) {
            issues.push(ConfigIssue::UnknownGroupParent {
                container: container.to_string(),
                group: g.name.clone(),
                parent: parent.clone(),
            });
        } else if in_cycle(&g.name, &parents) {
            issues.push(ConfigIssue::CyclicGroup {
                container: container.to_string(),
                group: g.name.clone(),
            });
        }
    }

    dtos.into_iter()
        .map(|g| GroupDef::new(g.name, g.parent.as_deref()))
        .collect()
}

/// Returns true if following parents from `start` leads back to `start`.
fn in_cycle(start: &str, parents: &HashMap<String, Option<String>>) -> bool {
    let mut current = start;
    for _ in 0..parents.len() {
        match parents.get(current) {
            Some(Some(parent)) if parent == start => return true,
            Some(Some(parent)) => current = parent,
            _ => return false,
        }
    }
    false
}

fn is_reserved(name: &str, containers: &HashSet<String>) -> bool {
    name.trim().is_empty() || name.contains('.') || name.contains('/') || containers.contains(name)
}

fn convert_external(dto: ExternalDto) -> ExternalElement {
    ExternalElement {
        kind: if dto.kind.is_empty() {
            "system".to_string()
        } else {
            dto.kind
        },
        description: dto.description,
        technology: dto.technology,
    }
}

fn convert_relation(
    dto: RelationDto,
    containers: &HashSet<String>,
    issues: &mut Vec<ConfigIssue>,
) -> InterScopeRelation {
    let target_container = dto.target.split('.').next().unwrap_or_default();
    for container in [dto.source.as_str(), target_container] {
        if !containers.contains(container) {
            issues.push(ConfigIssue::UnknownRelationContainer {
                source_name: dto.source.clone(),
                target: dto.target.clone(),
                container: container.to_string(),
            });
        }
    }
    InterScopeRelation {
        source: dto.source,
        target: dto.target,
        description: dto.description,
        technology: dto.technology,
    }
}
