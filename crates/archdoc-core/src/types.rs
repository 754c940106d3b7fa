//! Core types for source locations and analysis findings.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Severity level for findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message.
    Info,
    /// Problem that should be addressed but does not invalidate the model.
    Warning,
    /// Problem that removed a declaration from the model.
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Source code location of a declaration or usage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    /// File path relative to the scope root.
    pub file: PathBuf,
    /// Name of the enclosing declaration (type name).
    pub declaration: String,
    /// Line number (1-indexed).
    pub line: usize,
    /// Column number (1-indexed).
    pub column: usize,
    /// Enclosing method, for method-level annotations and call sites.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl Location {
    /// Creates a new location from span information.
    #[must_use]
    pub fn from_span(
        file: PathBuf,
        declaration: impl Into<String>,
        span: proc_macro2::Span,
    ) -> Self {
        let start = span.start();
        Self {
            file,
            declaration: declaration.into(),
            line: start.line,
            column: start.column + 1,
            method: None,
        }
    }

    /// Creates a new location with explicit values.
    #[must_use]
    pub fn new(file: PathBuf, declaration: impl Into<String>, line: usize) -> Self {
        Self {
            file,
            declaration: declaration.into(),
            line,
            column: 1,
            method: None,
        }
    }

    /// Records the enclosing method.
    #[must_use]
    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.file.display(), self.line)?;
        match &self.method {
            Some(method) => write!(f, " ({}::{})", self.declaration, method),
            None => write!(f, " ({})", self.declaration),
        }
    }
}

/// A recoverable problem found while building the architecture model.
///
/// Findings are collected rather than raised so that one malformed
/// annotation does not stop the analysis of the rest of the scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    /// Finding code (e.g., "AD002").
    pub code: String,
    /// Short kebab-case name (e.g., "tag-grammar").
    pub rule: String,
    /// Severity of this finding.
    pub severity: Severity,
    /// Where the problem was found.
    pub location: Location,
    /// Human-readable message.
    pub message: String,
}

impl Finding {
    /// Creates a new finding.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        rule: impl Into<String>,
        severity: Severity,
        location: Location,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            rule: rule.into(),
            severity,
            location,
            message: message.into(),
        }
    }

    /// Creates a finding from a `(code, rule)` pair of [`codes`].
    #[must_use]
    pub fn coded(
        code: (&str, &str),
        severity: Severity,
        location: Location,
        message: impl Into<String>,
    ) -> Self {
        Self::new(code.0, code.1, severity, location, message)
    }

    /// Formats the finding for terminal output.
    #[must_use]
    pub fn format(&self) -> String {
        use std::fmt::Write;
        let mut output = format!(
            "{} {} at {}:{}:{}\n",
            self.code,
            self.rule,
            self.location.file.display(),
            self.location.line,
            self.location.column,
        );
        let _ = writeln!(output, "  {}: {}", self.severity, self.message);
        output
    }
}

impl std::fmt::Display for Finding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}: {} [{}] {}",
            self.location.file.display(),
            self.location.line,
            self.location.column,
            self.severity,
            self.code,
            self.message
        )
    }
}

/// Finding codes as `(code, rule)` pairs.
pub mod codes {
    /// A source file could not be read or parsed.
    pub const PARSE_ERROR: (&str, &str) = ("AD001", "parse-error");
    /// A tag block does not match its grammar.
    pub const TAG_GRAMMAR: (&str, &str) = ("AD002", "tag-grammar");
    /// A component name is empty or uses illegal characters.
    pub const INVALID_NAME: (&str, &str) = ("AD003", "invalid-name");
    /// A group value is undeclared or malformed.
    pub const INVALID_GROUP: (&str, &str) = ("AD004", "invalid-group");
    /// Two components share a name.
    pub const DUPLICATE_COMPONENT: (&str, &str) = ("AD005", "duplicate-component");
    /// Two relations share `(source, target, description)`.
    pub const DUPLICATE_RELATION: (&str, &str) = ("AD006", "duplicate-relation");
    /// A relation targets its own source.
    pub const SELF_RELATION: (&str, &str) = ("AD007", "self-relation");
    /// A declaration carries more than one `@component` tag.
    pub const MULTIPLE_COMPONENT_TAGS: (&str, &str) = ("AD008", "multiple-component-tags");
}
