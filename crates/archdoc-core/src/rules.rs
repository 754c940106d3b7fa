//! Business rules over the components and relations of one scope.
//!
//! All violations are collected; offending entries are dropped from the
//! extraction so later phases see a consistent model.

use crate::extract::Extraction;
use crate::model::RelationKey;
use crate::types::{codes, Finding, Location, Severity};
use std::collections::HashMap;

/// A business-rule violation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleViolation {
    /// A later component reuses an existing name.
    #[error("duplicate component name '{name}' (first declared at {first})")]
    DuplicateComponent {
        /// Shared name.
        name: String,
        /// Where the kept component is declared.
        first: Location,
        /// Where the dropped component is declared.
        duplicate: Location,
    },

    /// A later relation reuses an existing `(source, target, description)`.
    #[error("duplicate relation {key} (first declared at {first})")]
    DuplicateRelation {
        /// Shared identity.
        key: RelationKey,
        /// Where the kept relation is declared.
        first: Location,
        /// Where the dropped relation is declared.
        duplicate: Location,
    },

    /// A relation targets its own source.
    #[error("component '{name}' declares a relation to itself")]
    SelfRelation {
        /// Component name.
        name: String,
        /// Where the relation is declared.
        location: Location,
    },
}

impl RuleViolation {
    /// Where the dropped entry is declared.
    #[must_use]
    pub fn location(&self) -> &Location {
        match self {
            Self::DuplicateComponent { duplicate, .. }
            | Self::DuplicateRelation { duplicate, .. } => duplicate,
            Self::SelfRelation { location, .. } => location,
        }
    }

    /// Converts the violation into a finding.
    #[must_use]
    pub fn to_finding(&self) -> Finding {
        let code = match self {
            Self::DuplicateComponent { .. } => codes::DUPLICATE_COMPONENT,
            Self::DuplicateRelation { .. } => codes::DUPLICATE_RELATION,
            Self::SelfRelation { .. } => codes::SELF_RELATION,
        };
        Finding::coded(code, Severity::Error, self.location().clone(), self.to_string())
    }
}

/// Applies every rule to an extraction, dropping offending entries and
/// recording one finding per violation.
pub fn apply(extraction: &mut Extraction) -> Vec<RuleViolation> {
    let mut violations = Vec::new();

    let mut names: HashMap<String, Location> = HashMap::new();
    extraction.components.retain(|c| {
        match names.get(&c.component.name) {
            Some(first) => {
                violations.push(RuleViolation::DuplicateComponent {
                    name: c.component.name.clone(),
                    first: first.clone(),
                    duplicate: c.component.location.clone(),
                });
                false
            }
            None => {
                names.insert(c.component.name.clone(), c.component.location.clone());
                true
            }
        }
    });

    let mut keys: HashMap<RelationKey, Location> = HashMap::new();
    extraction.relations.retain(|r| {
        if r.source == r.target {
            violations.push(RuleViolation::SelfRelation {
                name: r.source.clone(),
                location: r.location.clone(),
            });
            return false;
        }
        let key = r.key();
        if let Some(first) = keys.get(&key) {
            violations.push(RuleViolation::DuplicateRelation {
                key,
                first: first.clone(),
                duplicate: r.location.clone(),
            });
            return false;
        }
        keys.insert(key, r.location.clone());
        true
    });

    extraction
        .findings
        .extend(violations.iter().map(RuleViolation::to_finding));
    violations
}
