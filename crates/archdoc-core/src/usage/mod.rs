//! Usage matching: statically observed references between components.
//!
//! The matcher resolves every component to its backing [`SymbolId`](crate::symbols::SymbolId)
//! and then scans each component's constructors, fields, method signatures
//! and method bodies for references whose resolved identity is another
//! component. Method calls are followed transitively through other
//! components' methods with a worklist bounded by [`MAX_CALL_DEPTH`].

mod calls;
mod matcher;

pub use calls::{CallSite, CallSiteCollector};
pub use matcher::{UsageMatcher, MAX_CALL_DEPTH};

use crate::types::Location;
use serde::{Deserialize, Serialize};

/// How one component references another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UsageKind {
    /// Parameter of a constructor.
    Constructor,
    /// Stored field.
    Field,
    /// Parameter of a non-constructor method.
    MethodParam,
    /// Return type of a method.
    MethodReturn,
    /// Call of a method declared on the target.
    MethodCall,
}

impl std::fmt::Display for UsageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Constructor => write!(f, "constructor"),
            Self::Field => write!(f, "field"),
            Self::MethodParam => write!(f, "method-param"),
            Self::MethodReturn => write!(f, "method-return"),
            Self::MethodCall => write!(f, "method-call"),
        }
    }
}

/// How the receiver of a method call was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallVia {
    /// A stored field of the caller (`self.payments.charge()`).
    Field,
    /// A fresh instance built inside the method (`Mailer::new().send()`).
    Fresh,
    /// A method parameter.
    Param,
    /// An associated function call (`Mailer::send_all()`).
    Static,
    /// A local binding of otherwise unknown origin.
    Local,
}

/// A statically observed reference from one component to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageEvidence {
    /// Referencing component.
    pub source: String,
    /// Referenced component.
    pub target: String,
    /// Kind of reference.
    pub kind: UsageKind,
    /// Where the reference occurs.
    pub location: Location,
    /// Receiver origin, for method calls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub via: Option<CallVia>,
    /// `Component.method` hops from the originating method to this call.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub call_chain: Vec<String>,
}

/// Read access to usage evidence.
///
/// The reconciler only needs pairwise queries, so tests can substitute a
/// counting or canned source.
pub trait EvidenceSource {
    /// Returns evidence from `source` to `target`.
    fn evidence_between(&self, source: &str, target: &str) -> Vec<&UsageEvidence>;

    /// Returns all evidence.
    fn all(&self) -> &[UsageEvidence];
}

/// Evidence produced by one matcher run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageReport {
    /// All evidence, deduplicated.
    pub evidence: Vec<UsageEvidence>,
}

impl EvidenceSource for UsageReport {
    fn evidence_between(&self, source: &str, target: &str) -> Vec<&UsageEvidence> {
        self.evidence
            .iter()
            .filter(|e| e.source == source && e.target == target)
            .collect()
    }

    fn all(&self) -> &[UsageEvidence] {
        &self.evidence
    }
}
