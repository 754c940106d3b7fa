//! Component and relation extraction.
//!
//! A single pass per file reads every annotated declaration. Components come
//! from `@component` tags on `struct`, `enum` and `trait` items; relations
//! come from `@relation` tags on those items, on `impl` blocks and on
//! functions inside `impl` blocks.
//!
//! A malformed tag is reported as a [`Finding`] and skipped; extraction
//! continues with the next declaration.

mod component;
mod relation;

pub use component::{validate_name, ComponentExtractor};
pub use relation::RelationExtractor;

use crate::annotation::{DocBlock, COMPONENT_TAG, RELATION_TAG};
use crate::grammar::GrammarError;
use crate::groups::GroupConfig;
use crate::model::{Component, DeclaredRelation};
use crate::program::Program;
use crate::symbols::{for_each_item, ModulePath, SymbolId};
use crate::types::{codes, Finding, Location, Severity};
use std::collections::HashMap;
use std::path::Path;
use syn::{Attribute, Ident, ImplItem, Item, ItemImpl, Type};
use tracing::{debug, warn};

/// Errors raised while extracting a single declaration.
#[derive(Debug, thiserror::Error, miette::Diagnostic)]
pub enum ExtractError {
    /// The tag body does not match its grammar.
    #[error("invalid @{tag} tag: {source}")]
    #[diagnostic(code(archdoc::extract::grammar))]
    Grammar {
        /// Tag name.
        tag: &'static str,
        /// Grammar failure.
        #[source]
        source: GrammarError,
    },

    /// The component name is empty.
    #[error("component name is empty")]
    #[diagnostic(code(archdoc::extract::empty_name))]
    EmptyName,

    /// The component name contains illegal characters.
    #[error("invalid component name `{name}`: only letters, digits, spaces, `-` and `_` are allowed")]
    #[diagnostic(code(archdoc::extract::invalid_name))]
    InvalidName {
        /// Offending name.
        name: String,
    },

    /// The group is not present in the configured group tree.
    #[error("group `{group}` is not declared in the group configuration")]
    #[diagnostic(code(archdoc::extract::undeclared_group))]
    UndeclaredGroup {
        /// Offending group.
        group: String,
    },

    /// A group path segment contains illegal characters.
    #[error("invalid group path `{path}`: segment `{segment}` may only contain letters, digits, spaces and `-`")]
    #[diagnostic(code(archdoc::extract::invalid_group_path))]
    InvalidGroupPath {
        /// Full group path.
        path: String,
        /// Offending segment.
        segment: String,
    },
}

impl ExtractError {
    /// Returns the `(code, rule)` pair used when reporting this error.
    #[must_use]
    pub fn code(&self) -> (&'static str, &'static str) {
        match self {
            Self::Grammar { .. } => codes::TAG_GRAMMAR,
            Self::EmptyName | Self::InvalidName { .. } => codes::INVALID_NAME,
            Self::UndeclaredGroup { .. } | Self::InvalidGroupPath { .. } => codes::INVALID_GROUP,
        }
    }
}

/// A component together with the symbol backing it.
#[derive(Debug, Clone)]
pub struct ExtractedComponent {
    /// Backing declaration.
    pub symbol: SymbolId,
    /// The component.
    pub component: Component,
}

/// Everything found in one scope.
#[derive(Debug, Default)]
pub struct Extraction {
    /// Components in file and declaration order.
    pub components: Vec<ExtractedComponent>,
    /// Declared relations, sources resolved to component names.
    pub relations: Vec<DeclaredRelation>,
    /// Per-declaration problems.
    pub findings: Vec<Finding>,
}

impl Extraction {
    fn record(&mut self, error: &ExtractError, location: Location) {
        warn!(location = %location, error = %error, "skipping malformed annotation");
        self.findings.push(Finding::coded(
            error.code(),
            Severity::Error,
            location,
            error.to_string(),
        ));
    }
}

/// Relation waiting for its owner to be mapped to a component name.
struct PendingRelation {
    owner: Option<SymbolId>,
    relation: DeclaredRelation,
}

/// Runs both extractors over every file of a program.
#[derive(Debug)]
pub struct Extractor<'a> {
    program: &'a Program,
    groups: &'a GroupConfig,
    components: ComponentExtractor,
    relations: RelationExtractor,
}

impl<'a> Extractor<'a> {
    /// Creates an extractor for one scope.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::MalformedSchema`] if a built-in schema is
    /// ill-formed.
    pub fn new(program: &'a Program, groups: &'a GroupConfig) -> Result<Self, GrammarError> {
        Ok(Self {
            program,
            groups,
            components: ComponentExtractor::new()?,
            relations: RelationExtractor::new()?,
        })
    }

    /// Extracts components and relations from every file.
    #[must_use]
    pub fn run(&self) -> Extraction {
        let mut out = Extraction::default();
        let mut pending = Vec::new();

        for file in self.program.files() {
            debug!(file = %file.relative_path.display(), "extracting annotations");
            for_each_item(&file.ast.items, &file.module, &mut |item, module| {
                self.visit_item(item, module, &file.relative_path, &mut out, &mut pending);
            });
        }

        let names: HashMap<SymbolId, String> = out
            .components
            .iter()
            .map(|c| (c.symbol, c.component.name.clone()))
            .collect();
        for PendingRelation { owner, mut relation } in pending {
            if let Some(name) = owner.and_then(|id| names.get(&id)) {
                relation.source.clone_from(name);
            }
            out.relations.push(relation);
        }

        debug!(
            components = out.components.len(),
            relations = out.relations.len(),
            findings = out.findings.len(),
            "extraction finished"
        );
        out
    }

    fn visit_item(
        &self,
        item: &Item,
        module: &ModulePath,
        file: &Path,
        out: &mut Extraction,
        pending: &mut Vec<PendingRelation>,
    ) {
        match item {
            Item::Struct(s) => self.visit_type(&s.ident, &s.attrs, module, file, out, pending),
            Item::Enum(e) => self.visit_type(&e.ident, &e.attrs, module, file, out, pending),
            Item::Trait(t) => self.visit_type(&t.ident, &t.attrs, module, file, out, pending),
            Item::Impl(imp) => self.visit_impl(imp, module, file, out, pending),
            _ => {}
        }
    }

    fn visit_type(
        &self,
        ident: &Ident,
        attrs: &[Attribute],
        module: &ModulePath,
        file: &Path,
        out: &mut Extraction,
        pending: &mut Vec<PendingRelation>,
    ) {
        let doc = DocBlock::from_attrs(attrs);
        if doc.is_untagged() {
            return;
        }
        let name = ident.to_string();
        let symbols = self.program.symbols();
        let owner = symbols.declared_in(module, &name);

        if let (Some(symbol), Some(tag)) = (owner, doc.tags_named(COMPONENT_TAG).next()) {
            let location = Location::from_span(file.to_path_buf(), &name, ident.span());
            let declaration = symbols.get(symbol).qualified();
            match self
                .components
                .extract(&doc, &name, declaration, location, self.groups)
            {
                Ok(Some(component)) => {
                    debug!(component = %component.name, declaration = %component.declaration, "found component");
                    out.components.push(ExtractedComponent { symbol, component });
                }
                Ok(None) => {}
                Err(e) => out.record(&e, Location::new(file.to_path_buf(), &name, tag.line)),
            }

            if let Some(extra) = doc.tags_named(COMPONENT_TAG).nth(1) {
                out.findings.push(Finding::coded(
                    codes::MULTIPLE_COMPONENT_TAGS,
                    Severity::Warning,
                    Location::new(file.to_path_buf(), &name, extra.line),
                    format!("`{name}` carries more than one @component tag; only the first is used"),
                ));
            }
        }

        self.collect_relations(&doc, owner, &name, None, file, out, pending);
    }

    fn visit_impl(
        &self,
        imp: &ItemImpl,
        module: &ModulePath,
        file: &Path,
        out: &mut Extraction,
        pending: &mut Vec<PendingRelation>,
    ) {
        let symbols = self.program.symbols();
        let owner = symbols.resolve_type(&imp.self_ty, module, None).first().copied();
        let owner_name = owner.map_or_else(|| type_label(&imp.self_ty), |id| symbols.get(id).name.clone());

        let doc = DocBlock::from_attrs(&imp.attrs);
        self.collect_relations(&doc, owner, &owner_name, None, file, out, pending);

        for impl_item in &imp.items {
            if let ImplItem::Fn(f) = impl_item {
                let doc = DocBlock::from_attrs(&f.attrs);
                let method = f.sig.ident.to_string();
                self.collect_relations(&doc, owner, &owner_name, Some(&method), file, out, pending);
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn collect_relations(
        &self,
        doc: &DocBlock,
        owner: Option<SymbolId>,
        owner_name: &str,
        method: Option<&str>,
        file: &Path,
        out: &mut Extraction,
        pending: &mut Vec<PendingRelation>,
    ) {
        for tag in doc.tags_named(RELATION_TAG) {
            let mut location = Location::new(file.to_path_buf(), owner_name, tag.line);
            if let Some(method) = method {
                location = location.with_method(method);
            }
            match self.relations.extract(tag, owner_name, location.clone()) {
                Ok(relation) => pending.push(PendingRelation { owner, relation }),
                Err(e) => out.record(&e, location),
            }
        }
    }
}

/// Display name of an `impl` self type that is not a known symbol.
fn type_label(ty: &Type) -> String {
    match ty {
        Type::Path(p) => p
            .path
            .segments
            .last()
            .map_or_else(String::new, |s| s.ident.to_string()),
        other => quote::quote!(#other).to_string(),
    }
}
