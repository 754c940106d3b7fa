//! Analyzer orchestrating extraction, matching and reconciliation.
//!
//! Each container is an independent scope with its own symbol table, so
//! containers are analysed in parallel. Cross-container references are
//! checked afterwards by name.

use crate::config::{ConfigError, ConfigIssue, ContainerConfig, SourcePattern, WorkspaceConfig};
use crate::extract::Extractor;
use crate::grammar::GrammarError;
use crate::model::{Component, DeclaredRelation, GroupNode};
use crate::program::{CodeIndex, LoadError, Program, SourceFile};
use crate::reconcile::{apply_inferred_tags, resolve_cross_scope, Reconciler, ValidationResult};
use crate::resolver::NameResolver;
use crate::rules;
use crate::types::{codes, Finding, Location, Severity};
use crate::usage::{UsageEvidence, UsageMatcher};

use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that stop an analysis run.
#[derive(Debug, Error, miette::Diagnostic)]
pub enum AnalyzerError {
    /// IO error reading files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The analysed directory does not exist.
    #[error("root directory {} does not exist", .0.display())]
    #[diagnostic(code(archdoc::analyzer::missing_root))]
    MissingRoot(PathBuf),

    /// Glob pattern error.
    #[error("invalid glob pattern: {0}")]
    Glob(#[from] glob::PatternError),

    /// Configuration error.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    /// A built-in tag schema is ill-formed.
    #[error("tag schema error: {0}")]
    Schema(#[from] GrammarError),

    /// Strict mode stopped at the first error finding.
    #[error("{container}: {finding}")]
    #[diagnostic(
        code(archdoc::analyzer::strict),
        help("run without strict mode to collect every finding")
    )]
    Strict {
        /// Container being analysed.
        container: String,
        /// The finding.
        finding: Box<Finding>,
    },
}

/// Builder for configuring an [`Analyzer`].
#[derive(Debug, Default)]
pub struct AnalyzerBuilder {
    root: Option<PathBuf>,
    config: Option<WorkspaceConfig>,
    exclude_patterns: Vec<String>,
    strict: Option<bool>,
}

impl AnalyzerBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the workspace root directory.
    #[must_use]
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: WorkspaceConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Adds an exclude glob pattern applied to every container.
    #[must_use]
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_patterns.push(pattern.into());
        self
    }

    /// Adds multiple exclude glob patterns.
    #[must_use]
    pub fn excludes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_patterns
            .extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Overrides the configured strict mode.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    /// Builds the analyzer.
    ///
    /// # Errors
    ///
    /// Returns an error if the root directory doesn't exist or an exclude
    /// pattern is invalid.
    pub fn build(self) -> Result<Analyzer, AnalyzerError> {
        let root = self.root.unwrap_or_else(|| PathBuf::from("."));
        let root = if root.is_absolute() {
            root
        } else {
            std::env::current_dir()?.join(&root)
        };
        if !root.is_dir() {
            return Err(AnalyzerError::MissingRoot(root));
        }

        let mut config = self
            .config
            .unwrap_or_else(|| WorkspaceConfig::default_for(&root));

        let mut issues: Vec<ConfigIssue> = Vec::new();
        for container in &mut config.containers {
            for pattern in &self.exclude_patterns {
                match SourcePattern::new(&container.name, pattern) {
                    Ok(p) => container.exclude.push(p),
                    Err(issue) => issues.push(issue),
                }
            }
        }
        if !issues.is_empty() {
            return Err(ConfigError::Invalid(issues).into());
        }

        let strict = self.strict.unwrap_or(config.strict);
        Ok(Analyzer {
            root,
            config,
            strict,
        })
    }
}

/// Architecture model of one container.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerModel {
    /// Container name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Technology.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub technology: Option<String>,
    /// Tags.
    pub tags: Vec<String>,
    /// Custom properties.
    pub properties: BTreeMap<String, String>,
    /// Components with their declared relations attached.
    pub components: Vec<Component>,
    /// Relations whose source is not a component.
    pub unattached_relations: Vec<DeclaredRelation>,
    /// Group tree.
    pub groups: Vec<GroupNode>,
    /// Usage evidence between components.
    pub evidence: Vec<UsageEvidence>,
    /// One result per declared relation, then one per undeclared pair.
    /// `relation_index` refers to declaration order across all components.
    pub validation: Vec<ValidationResult>,
    /// Recovered problems.
    pub findings: Vec<Finding>,
    /// Number of parsed source files.
    pub files_checked: usize,
}

impl ContainerModel {
    /// Returns true if any finding has error severity.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }
}

/// Architecture model of the whole workspace.
#[derive(Debug, Clone, Serialize)]
pub struct WorkspaceModel {
    /// Workspace name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Containers in configuration order.
    pub containers: Vec<ContainerModel>,
    /// Results for container-to-container relations from configuration.
    pub relations: Vec<ValidationResult>,
}

impl WorkspaceModel {
    /// Iterates over every validation result of the workspace.
    pub fn validation(&self) -> impl Iterator<Item = &ValidationResult> {
        self.containers
            .iter()
            .flat_map(|c| c.validation.iter())
            .chain(self.relations.iter())
    }

    /// Returns true if any validation result is a problem or any finding is
    /// an error.
    #[must_use]
    pub fn has_problems(&self) -> bool {
        self.validation().any(ValidationResult::is_problem)
            || self.containers.iter().any(ContainerModel::has_errors)
    }
}

/// The analyzer for one workspace.
///
/// Use [`Analyzer::builder()`] to construct an instance.
#[derive(Debug)]
pub struct Analyzer {
    root: PathBuf,
    config: WorkspaceConfig,
    strict: bool,
}

impl Analyzer {
    /// Creates a new builder for configuring an analyzer.
    #[must_use]
    pub fn builder() -> AnalyzerBuilder {
        AnalyzerBuilder::new()
    }

    /// Returns the workspace root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the effective configuration.
    #[must_use]
    pub fn config(&self) -> &WorkspaceConfig {
        &self.config
    }

    /// Analyzes every container and checks cross-container references.
    ///
    /// # Errors
    ///
    /// Returns an error if file discovery fails, or on the first error
    /// finding in strict mode.
    pub fn analyze(&self) -> Result<WorkspaceModel, AnalyzerError> {
        info!(root = %self.root.display(), containers = self.config.containers.len(), "starting analysis");

        let mut containers = self
            .config
            .containers
            .par_iter()
            .map(|c| self.analyze_container(c))
            .collect::<Result<Vec<_>, _>>()?;

        let mut names = NameResolver::new();
        for (model, config) in containers.iter().zip(&self.config.containers) {
            names.add_scope(
                &model.name,
                model.components.iter().map(|c| c.name.as_str()),
                config.externals.keys().map(String::as_str),
            );
        }
        for model in &mut containers {
            resolve_cross_scope(&mut model.validation, &names);
        }

        let relations = self
            .config
            .relations
            .iter()
            .map(|r| {
                let exists = names.exists(&r.target);
                let mut errors = Vec::new();
                if !exists {
                    errors.push(format!("unknown target '{}'", r.target));
                }
                ValidationResult {
                    source: r.source.clone(),
                    target: r.target.clone(),
                    description: r.description.clone(),
                    relation_index: None,
                    target_exists: exists,
                    is_used: exists,
                    usage_location: None,
                    classification: None,
                    inferred_tag: None,
                    errors,
                    synthetic: false,
                }
            })
            .collect();

        let model = WorkspaceModel {
            name: self.config.name.clone(),
            description: self.config.description.clone(),
            containers,
            relations,
        };
        info!(
            problems = model.validation().filter(|r| r.is_problem()).count(),
            "analysis complete"
        );
        Ok(model)
    }

    fn analyze_container(&self, config: &ContainerConfig) -> Result<ContainerModel, AnalyzerError> {
        let root = self.root.join(&config.root);
        let label = config.name.replace('-', "_");
        let mut findings = Vec::new();
        let mut sources = Vec::new();

        for path in discover_files(config, &root)? {
            match SourceFile::load(&path, &root, &label) {
                Ok(file) => sources.push(file),
                Err(e) => {
                    warn!(container = %config.name, error = %e, "skipping unreadable file");
                    let finding = load_finding(&e, &root);
                    if self.strict {
                        return Err(self.stop(config, finding));
                    }
                    findings.push(finding);
                }
            }
        }
        let files_checked = sources.len();
        debug!(container = %config.name, files = files_checked, "parsed sources");

        let program = Program::new(sources);
        let mut extraction = Extractor::new(&program, &config.groups)?.run();
        rules::apply(&mut extraction);
        findings.append(&mut extraction.findings);
        if self.strict {
            if let Some(first) = findings.iter().find(|f| f.severity == Severity::Error) {
                return Err(self.stop(config, first.clone()));
            }
        }

        let index = CodeIndex::build(&program);
        let report = UsageMatcher::new(&index, &extraction.components).run();

        let component_names: Vec<&str> = extraction
            .components
            .iter()
            .map(|c| c.component.name.as_str())
            .collect();
        let declared_targets = self
            .config
            .relations
            .iter()
            .filter(|r| r.source == config.name)
            .map(|r| r.target.as_str());
        let validation = Reconciler::new(&report, component_names)
            .with_externals(config.externals.keys().map(String::as_str))
            .with_declared_targets(declared_targets)
            .reconcile(&extraction.relations);

        let mut relations = extraction.relations;
        apply_inferred_tags(&mut relations, &validation);

        let mut components: Vec<Component> = extraction
            .components
            .into_iter()
            .map(|c| c.component)
            .collect();
        let mut unattached_relations = Vec::new();
        for relation in relations {
            match components.iter_mut().find(|c| c.name == relation.source) {
                Some(component) => component.relations.push(relation),
                None => unattached_relations.push(relation),
            }
        }
        let groups = config.groups.build_tree(&components);

        info!(
            container = %config.name,
            components = components.len(),
            evidence = report.evidence.len(),
            findings = findings.len(),
            "container analysed"
        );

        Ok(ContainerModel {
            name: config.name.clone(),
            description: config.description.clone(),
            technology: config.technology.clone(),
            tags: config.tags.clone(),
            properties: config.properties.clone(),
            components,
            unattached_relations,
            groups,
            evidence: report.evidence,
            validation,
            findings,
            files_checked,
        })
    }

    fn stop(&self, config: &ContainerConfig, finding: Finding) -> AnalyzerError {
        warn!(container = %config.name, root = %self.root.display(), "strict mode: stopping");
        AnalyzerError::Strict {
            container: config.name.clone(),
            finding: Box::new(finding),
        }
    }
}

/// Discovers the source files of a container, sorted.
fn discover_files(config: &ContainerConfig, root: &Path) -> Result<Vec<PathBuf>, AnalyzerError> {
    let base = glob::Pattern::escape(&root.to_string_lossy());
    let mut files = BTreeSet::new();

    for include in &config.include {
        let pattern = format!("{base}/{}", include.as_str());
        for entry in glob::glob(&pattern)? {
            let path = entry.map_err(|e| AnalyzerError::Io(e.into_error()))?;
            let relative = path.strip_prefix(root).unwrap_or(&path);
            if config.is_excluded(relative) {
                debug!(path = %relative.display(), "excluding");
                continue;
            }
            if path.is_file() {
                files.insert(path);
            }
        }
    }

    Ok(files.into_iter().collect())
}

fn load_finding(error: &LoadError, root: &Path) -> Finding {
    let location = match error {
        LoadError::Io { path, .. } => {
            let relative = path.strip_prefix(root).unwrap_or(path);
            Location::new(relative.to_path_buf(), "", 1)
        }
        LoadError::Parse {
            path, line, column, ..
        } => Location {
            file: path.clone(),
            declaration: String::new(),
            line: *line,
            column: *column,
            method: None,
        },
    };
    Finding::coded(codes::PARSE_ERROR, Severity::Error, location, error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = Analyzer::builder()
            .root(dir.path().join("nope"))
            .build()
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::MissingRoot(_)));
    }

    #[test]
    fn unsafe_exclude_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Analyzer::builder()
            .root(dir.path())
            .exclude("../**")
            .build()
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::Config(ConfigError::Invalid(_))));
    }

    #[test]
    fn discovery_is_sorted_and_honours_excludes() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("generated")).unwrap();
        std::fs::write(src.join("b.rs"), "").unwrap();
        std::fs::write(src.join("a.rs"), "").unwrap();
        std::fs::write(src.join("generated/schema.rs"), "").unwrap();

        let analyzer = Analyzer::builder()
            .root(dir.path())
            .exclude("**/generated/**")
            .build()
            .unwrap();
        let files = discover_files(&analyzer.config().containers[0], analyzer.root()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(analyzer.root()).unwrap().to_path_buf())
            .collect();
        assert_eq!(names, vec![PathBuf::from("src/a.rs"), PathBuf::from("src/b.rs")]);
    }
}
