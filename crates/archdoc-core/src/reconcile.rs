//! Reconciliation of declared relations against usage evidence.
//!
//! Every declared relation of a scope yields one [`ValidationResult`]; every
//! ordered component pair with evidence but no declaration yields one
//! synthetic result describing the undeclared coupling.

use crate::model::{DeclaredRelation, DIRECT_TAG, INDIRECT_TAG};
use crate::resolver::{NameMatch, NameResolver};
use crate::types::Location;
use crate::usage::{CallVia, EvidenceSource, UsageEvidence, UsageKind};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::debug;

/// Direct/indirect nature of observed usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Backed by a stored dependency: constructor injection, a field, or a
    /// call through a field.
    Direct,
    /// Only transient usage: fresh instances, parameters, return values,
    /// static calls.
    Indirect,
}

impl Classification {
    /// Tag documenting this classification on a relation.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Direct => DIRECT_TAG,
            Self::Indirect => INDIRECT_TAG,
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Indirect => write!(f, "indirect"),
        }
    }
}

/// Classifies the evidence of one source/target pair.
///
/// Returns `None` when there is no evidence.
#[must_use]
pub fn classify(evidence: &[&UsageEvidence]) -> Option<Classification> {
    if evidence.is_empty() {
        return None;
    }
    let direct = evidence.iter().any(|e| match e.kind {
        UsageKind::Constructor | UsageKind::Field => true,
        UsageKind::MethodCall => e.via == Some(CallVia::Field),
        UsageKind::MethodParam | UsageKind::MethodReturn => false,
    });
    Some(if direct {
        Classification::Direct
    } else {
        Classification::Indirect
    })
}

/// Outcome of checking one declared or undeclared relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// Source component name.
    pub source: String,
    /// Target name.
    pub target: String,
    /// Relation description; empty for undeclared usage.
    pub description: String,
    /// Index into the scope's declared relations, `None` for undeclared usage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation_index: Option<usize>,
    /// Whether the target names anything known.
    pub target_exists: bool,
    /// Whether usage backs the relation (trusted for external targets).
    pub is_used: bool,
    /// First usage evidence location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_location: Option<Location>,
    /// Classification of the observed usage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<Classification>,
    /// Tag the relation lacks and should carry, if it claims neither.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inferred_tag: Option<String>,
    /// Violations.
    #[serde(default)]
    pub errors: Vec<String>,
    /// True for undeclared usage.
    #[serde(default)]
    pub synthetic: bool,
}

impl ValidationResult {
    fn declared(relation: &DeclaredRelation, index: usize) -> Self {
        Self {
            source: relation.source.clone(),
            target: relation.target.clone(),
            description: relation.description.clone(),
            relation_index: Some(index),
            target_exists: false,
            is_used: false,
            usage_location: None,
            classification: None,
            inferred_tag: None,
            errors: Vec::new(),
            synthetic: false,
        }
    }

    /// Returns true if the target is unknown, unused, or anything was violated.
    #[must_use]
    pub fn is_problem(&self) -> bool {
        !self.target_exists || !self.is_used || !self.errors.is_empty()
    }
}

/// Checks declared relations of one scope against its usage evidence.
///
/// Components of the scope are compared by name here; identity has already
/// been settled by the usage matcher that produced the evidence.
pub struct Reconciler<'a, E: EvidenceSource> {
    evidence: &'a E,
    components: HashSet<&'a str>,
    externals: HashSet<&'a str>,
    declared_targets: HashSet<&'a str>,
}

impl<'a, E: EvidenceSource> Reconciler<'a, E> {
    /// Creates a reconciler over the component names of one scope.
    pub fn new(evidence: &'a E, components: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            evidence,
            components: components.into_iter().collect(),
            externals: HashSet::new(),
            declared_targets: HashSet::new(),
        }
    }

    /// Registers configured external elements.
    #[must_use]
    pub fn with_externals(mut self, externals: impl IntoIterator<Item = &'a str>) -> Self {
        self.externals.extend(externals);
        self
    }

    /// Registers targets of separately declared inter-scope relations.
    #[must_use]
    pub fn with_declared_targets(mut self, targets: impl IntoIterator<Item = &'a str>) -> Self {
        self.declared_targets.extend(targets);
        self
    }

    /// Validates every declared relation, then appends one result per
    /// undeclared component pair.
    #[must_use]
    pub fn reconcile(&self, relations: &[DeclaredRelation]) -> Vec<ValidationResult> {
        let mut results: Vec<ValidationResult> = relations
            .iter()
            .enumerate()
            .map(|(index, relation)| self.check(relation, index))
            .collect();
        results.extend(self.undeclared(relations));
        debug!(
            relations = relations.len(),
            results = results.len(),
            "reconciled relations"
        );
        results
    }

    fn is_trusted(&self, target: &str) -> bool {
        self.externals.contains(target) || self.declared_targets.contains(target)
    }

    fn check(&self, relation: &DeclaredRelation, index: usize) -> ValidationResult {
        let mut result = ValidationResult::declared(relation, index);
        let target = relation.target.as_str();

        if !self.components.contains(relation.source.as_str()) {
            result.target_exists = self.components.contains(target) || self.is_trusted(target);
            result
                .errors
                .push(format!("unknown source component '{}'", relation.source));
        } else if self.is_trusted(target) || relation.is_cross_scope() {
            result.target_exists = true;
            result.is_used = true;
        } else if !self.components.contains(target) {
            result
                .errors
                .push(format!("target '{target}' is not a component or external element"));
        } else {
            result.target_exists = true;
            self.check_usage(relation, &mut result);
        }

        if relation.claims_direct() && relation.claims_indirect() {
            result
                .errors
                .push("relation is tagged both direct and indirect".to_string());
        }
        result
    }

    fn check_usage(&self, relation: &DeclaredRelation, result: &mut ValidationResult) {
        let evidence = self.evidence.evidence_between(&relation.source, &relation.target);
        let Some(classification) = classify(&evidence) else {
            return;
        };
        result.is_used = true;
        result.classification = Some(classification);
        result.usage_location = evidence.first().map(|e| e.location.clone());

        let (claims_direct, claims_indirect) = (relation.claims_direct(), relation.claims_indirect());
        let conflict = match classification {
            Classification::Direct => claims_indirect && !claims_direct,
            Classification::Indirect => claims_direct && !claims_indirect,
        };
        if conflict {
            let declared = match classification {
                Classification::Direct => relation.indirect_tag().unwrap_or(INDIRECT_TAG),
                Classification::Indirect => relation.direct_tag().unwrap_or(DIRECT_TAG),
            };
            let at = result
                .usage_location
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default();
            result.errors.push(format!(
                "declared as {declared} but usage is {classification} at {at}"
            ));
        } else if !claims_direct && !claims_indirect {
            result.inferred_tag = Some(classification.tag().to_string());
        }
    }

    fn undeclared(&self, relations: &[DeclaredRelation]) -> Vec<ValidationResult> {
        let declared: HashSet<(&str, &str)> = relations
            .iter()
            .map(|r| (r.source.as_str(), r.target.as_str()))
            .collect();
        let mut seen: HashSet<(&str, &str)> = HashSet::new();
        let mut out = Vec::new();

        for evidence in self.evidence.all() {
            let pair = (evidence.source.as_str(), evidence.target.as_str());
            if declared.contains(&pair) || !seen.insert(pair) {
                continue;
            }
            let between = self.evidence.evidence_between(pair.0, pair.1);
            out.push(ValidationResult {
                source: pair.0.to_string(),
                target: pair.1.to_string(),
                description: String::new(),
                relation_index: None,
                target_exists: true,
                is_used: true,
                usage_location: Some(evidence.location.clone()),
                classification: classify(&between),
                inferred_tag: None,
                errors: vec![format!(
                    "undeclared relation: {} uses {} ({}) at {}",
                    pair.0, pair.1, evidence.kind, evidence.location
                )],
                synthetic: true,
            });
        }
        out
    }
}

/// Merges inferred tags into the relations they were computed for.
///
/// Relations already claiming either tag are left alone, so repeated calls
/// add each tag at most once.
pub fn apply_inferred_tags(relations: &mut [DeclaredRelation], results: &[ValidationResult]) {
    for result in results {
        let (Some(index), Some(tag)) = (result.relation_index, &result.inferred_tag) else {
            continue;
        };
        if let Some(relation) = relations.get_mut(index) {
            if !relation.claims_direct() && !relation.claims_indirect() {
                relation.add_tag(tag.as_str());
            }
        }
    }
}

/// Checks `container.component` targets against all scopes.
///
/// This compares names only, since scopes do not share symbol identities.
pub fn resolve_cross_scope(results: &mut [ValidationResult], names: &NameResolver) {
    for result in results.iter_mut().filter(|r| !r.synthetic && r.target.contains('.')) {
        if matches!(names.resolve(&result.target), NameMatch::Unknown) {
            result.target_exists = false;
            result.is_used = false;
            result
                .errors
                .push(format!("unknown cross-scope target '{}'", result.target));
        }
    }
}
