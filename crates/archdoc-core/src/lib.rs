//! # archdoc-core
//!
//! Architecture model extraction for annotated Rust code, based on `syn`
//! AST analysis.
//!
//! Components and relations are declared in doc comments with `@component`
//! and `@relation` tags. The crate extracts them, finds how components
//! actually reference each other through symbol identity, and reconciles
//! the two:
//!
//! - [`grammar`] parses tag blocks against a schema
//! - [`extract`] builds [`Component`]s and [`DeclaredRelation`]s
//! - [`usage`] produces [`UsageEvidence`] from constructors, fields,
//!   signatures and call chains
//! - [`reconcile`] diffs declarations against evidence
//! - [`groups`] builds the group tree
//! - [`Analyzer`] runs all of it per container
//!
//! ## Example
//!
//! ```ignore
//! use archdoc_core::Analyzer;
//!
//! let model = Analyzer::builder().root(".").build()?.analyze()?;
//! for result in model.validation().filter(|r| r.is_problem()) {
//!     println!("{} -> {}: {:?}", result.source, result.target, result.errors);
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod analyzer;
mod rules;
mod types;

pub mod annotation;
pub mod config;
pub mod extract;
pub mod grammar;
pub mod groups;
pub mod model;
pub mod program;
pub mod reconcile;
pub mod resolver;
pub mod symbols;
pub mod usage;

/// Utility modules for AST inspection.
pub mod utils;

pub use analyzer::{Analyzer, AnalyzerBuilder, AnalyzerError, ContainerModel, WorkspaceModel};
pub use config::{ConfigError, WorkspaceConfig};
pub use model::{Component, DeclaredRelation, GroupNode, Perspective, RelationKey};
pub use reconcile::{Classification, ValidationResult};
pub use rules::RuleViolation;
pub use types::{codes, Finding, Location, Severity};
pub use usage::{CallVia, UsageEvidence, UsageKind};
