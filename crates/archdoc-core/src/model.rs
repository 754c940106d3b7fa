//! Architecture model: components and the relations declared between them.

use crate::types::Location;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tag marking a relation backed by a stored dependency.
pub const DIRECT_TAG: &str = "DirectRelation";

/// Tag marking a relation backed only by transient usage.
pub const INDIRECT_TAG: &str = "IndirectRelation";

/// A named viewpoint on a component (e.g. security, operations).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Perspective {
    /// What the component means from this viewpoint.
    pub description: String,
    /// Optional rating or value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Perspective {
    /// Parses `description | value` as written in annotation blocks.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.split_once('|') {
            Some((description, value)) => Self {
                description: description.trim().to_string(),
                value: Some(value.trim().to_string()).filter(|v| !v.is_empty()),
            },
            None => Self {
                description: raw.trim().to_string(),
                value: None,
            },
        }
    }
}

/// A documented unit of architecture backed by one source declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    /// Unique name within the scope.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// Implementation technology.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
    /// Tags in declaration order, without duplicates.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Group name or slash-delimited group path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Link to further documentation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Custom properties.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Named perspectives.
    #[serde(default)]
    pub perspectives: BTreeMap<String, Perspective>,
    /// Where the backing declaration lives.
    pub location: Location,
    /// Qualified path of the backing declaration (e.g. `shop::orders::OrderService`).
    pub declaration: String,
    /// Relations declared on this component, attached after reconciliation.
    #[serde(default)]
    pub relations: Vec<DeclaredRelation>,
}

impl Component {
    /// Adds a tag unless it is already present.
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        push_unique(&mut self.tags, tag.into());
    }
}

/// An author-asserted dependency from one component to another component,
/// an external element, or a component of another scope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeclaredRelation {
    /// Source component name.
    pub source: String,
    /// Target: component name, external element, or `container.component`.
    pub target: String,
    /// What the relation is for.
    pub description: String,
    /// Protocol or mechanism.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
    /// Tags in declaration order, without duplicates.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Link to further documentation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Custom properties.
    #[serde(default)]
    pub properties: BTreeMap<String, String>,
    /// Where the relation was declared; `method` is set for method-level tags.
    pub location: Location,
}

impl DeclaredRelation {
    /// Returns the `(source, target, description)` identity of this relation.
    #[must_use]
    pub fn key(&self) -> RelationKey {
        RelationKey {
            source: self.source.clone(),
            target: self.target.clone(),
            description: self.description.clone(),
        }
    }

    /// Adds a tag unless it is already present.
    pub fn add_tag(&mut self, tag: impl Into<String>) {
        push_unique(&mut self.tags, tag.into());
    }

    /// Returns true if the relation is tagged as direct.
    #[must_use]
    pub fn claims_direct(&self) -> bool {
        self.direct_tag().is_some()
    }

    /// Returns true if the relation is tagged as indirect.
    #[must_use]
    pub fn claims_indirect(&self) -> bool {
        self.indirect_tag().is_some()
    }

    /// Returns the direct tag as written, alias included.
    #[must_use]
    pub fn direct_tag(&self) -> Option<&str> {
        self.tags.iter().map(String::as_str).find(|t| is_direct_tag(t))
    }

    /// Returns the indirect tag as written, alias included.
    #[must_use]
    pub fn indirect_tag(&self) -> Option<&str> {
        self.tags.iter().map(String::as_str).find(|t| is_indirect_tag(t))
    }

    /// Returns true if the target names a component of another scope.
    #[must_use]
    pub fn is_cross_scope(&self) -> bool {
        self.target.contains('.')
    }
}

/// Identity of a relation within a scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationKey {
    /// Source component name.
    pub source: String,
    /// Target name.
    pub target: String,
    /// Relation description.
    pub description: String,
}

impl std::fmt::Display for RelationKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)?;
        if !self.description.is_empty() {
            write!(f, " ({})", self.description)?;
        }
        Ok(())
    }
}

/// A node of the group hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupNode {
    /// Display name (last path segment).
    pub name: String,
    /// Full slash-delimited path; empty for the ungrouped node.
    pub path: String,
    /// Names of components attached directly to this node.
    pub components: Vec<String>,
    /// Child groups.
    pub subgroups: Vec<GroupNode>,
}

impl GroupNode {
    /// Creates an empty node.
    #[must_use]
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            components: Vec::new(),
            subgroups: Vec::new(),
        }
    }

    /// Returns true if neither this node nor any descendant holds a component.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.subgroups.iter().all(GroupNode::is_empty)
    }
}

fn is_direct_tag(tag: &str) -> bool {
    tag.eq_ignore_ascii_case(DIRECT_TAG) || tag.eq_ignore_ascii_case("Direct")
}

fn is_indirect_tag(tag: &str) -> bool {
    tag.eq_ignore_ascii_case(INDIRECT_TAG) || tag.eq_ignore_ascii_case("Indirect")
}

fn push_unique(tags: &mut Vec<String>, tag: String) {
    if !tags.iter().any(|t| *t == tag) {
        tags.push(tag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn relation(tags: &[&str]) -> DeclaredRelation {
        DeclaredRelation {
            source: "OrderService".to_string(),
            target: "PaymentService".to_string(),
            description: "Charges".to_string(),
            technology: None,
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
            url: None,
            properties: BTreeMap::new(),
            location: Location::new(PathBuf::from("src/orders.rs"), "OrderService", 1),
        }
    }

    #[test]
    fn perspective_with_value() {
        let p = Perspective::parse("Handles PII | high");
        assert_eq!(p.description, "Handles PII");
        assert_eq!(p.value.as_deref(), Some("high"));
    }

    #[test]
    fn perspective_without_value() {
        let p = Perspective::parse(" Stateless ");
        assert_eq!(p.description, "Stateless");
        assert!(p.value.is_none());
    }

    #[test]
    fn tag_aliases_are_recognised() {
        assert!(relation(&["Direct"]).claims_direct());
        assert!(relation(&["directrelation"]).claims_direct());
        assert!(relation(&["IndirectRelation"]).claims_indirect());
        assert!(!relation(&["Async"]).claims_direct());
    }

    #[test]
    fn add_tag_keeps_order_and_uniqueness() {
        let mut r = relation(&["Async"]);
        r.add_tag(DIRECT_TAG);
        r.add_tag(DIRECT_TAG);
        assert_eq!(r.tags, vec!["Async", DIRECT_TAG]);
    }

    #[test]
    fn cross_scope_target_detection() {
        let mut r = relation(&[]);
        assert!(!r.is_cross_scope());
        r.target = "billing.InvoiceService".to_string();
        assert!(r.is_cross_scope());
    }
}
