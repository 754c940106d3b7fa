//! Whole-scope symbol table.
//!
//! Every `struct`, `enum`, `trait` and `type` alias in a scope gets a
//! [`SymbolId`]. Type references are resolved to ids through the module's
//! `use` map, same-module declarations, glob imports, `crate::`/`self::`/
//! `super::` prefixes, known crate labels and `pub use` re-exports.
//!
//! Ids are only comparable within the table that issued them.

use crate::utils::has_cfg_test;
use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use syn::{Item, Type, TypeParamBound, UseTree};

/// Bound on alias, re-export and glob hops during one resolution.
const MAX_RESOLVE_HOPS: usize = 8;

/// Opaque handle to a declaration within one scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(u32);

impl SymbolId {
    /// Returns the arena index of this id.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Kind of declaration behind a symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// `struct`
    Struct,
    /// `enum`
    Enum,
    /// `trait`
    Trait,
    /// `type` alias
    Alias,
}

/// Absolute module path: crate label followed by module segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModulePath(Vec<String>);

impl ModulePath {
    /// Creates the root module of a crate.
    #[must_use]
    pub fn root(crate_label: impl Into<String>) -> Self {
        Self(vec![crate_label.into()])
    }

    /// Creates a module path from a crate label and module segments.
    #[must_use]
    pub fn new(crate_label: impl Into<String>, segments: Vec<String>) -> Self {
        let mut parts = vec![crate_label.into()];
        parts.extend(segments);
        Self(parts)
    }

    /// Returns the crate label.
    #[must_use]
    pub fn crate_label(&self) -> &str {
        &self.0[0]
    }

    /// Returns all parts, crate label first.
    #[must_use]
    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// Returns the child module `name`.
    #[must_use]
    pub fn child(&self, name: &str) -> Self {
        let mut parts = self.0.clone();
        parts.push(name.to_string());
        Self(parts)
    }

    /// Returns the parent module, or the crate root for the root itself.
    #[must_use]
    pub fn parent(&self) -> Self {
        if self.0.len() <= 1 {
            return self.clone();
        }
        Self(self.0[..self.0.len() - 1].to_vec())
    }

    /// Appends path segments to this module.
    #[must_use]
    pub fn join(&self, segments: &[String]) -> Vec<String> {
        let mut parts = self.0.clone();
        parts.extend_from_slice(segments);
        parts
    }
}

impl std::fmt::Display for ModulePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join("::"))
    }
}

/// A declaration registered in the table.
#[derive(Debug, Clone)]
pub struct Symbol {
    /// Handle of this symbol.
    pub id: SymbolId,
    /// Declared identifier.
    pub name: String,
    /// Module containing the declaration.
    pub module: ModulePath,
    /// Kind of declaration.
    pub kind: SymbolKind,
    /// File path relative to the scope root.
    pub file: PathBuf,
    /// Line of the declaration's identifier.
    pub line: usize,
}

impl Symbol {
    /// Returns the qualified path, e.g. `shop::orders::OrderService`.
    #[must_use]
    pub fn qualified(&self) -> String {
        format!("{}::{}", self.module, self.name)
    }
}

#[derive(Debug, Default)]
struct ModuleScope {
    uses: HashMap<String, Vec<String>>,
    globs: Vec<Vec<String>>,
}

/// Symbols and import scopes of one analysis scope.
#[derive(Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_path: HashMap<Vec<String>, SymbolId>,
    alias_targets: HashMap<SymbolId, Type>,
    modules: HashMap<ModulePath, ModuleScope>,
    crate_labels: BTreeSet<String>,
}

impl std::fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolTable")
            .field("symbols", &self.symbols.len())
            .field("modules", &self.modules.len())
            .field("crate_labels", &self.crate_labels)
            .finish()
    }
}

impl SymbolTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the declarations and imports of one file.
    pub fn add_file(&mut self, file: &Path, module: &ModulePath, items: &[Item]) {
        self.crate_labels.insert(module.crate_label().to_string());
        self.modules.entry(module.clone()).or_default();

        for_each_item(items, module, &mut |item, module| {
            let (ident, kind) = match item {
                Item::Struct(s) => (&s.ident, SymbolKind::Struct),
                Item::Enum(e) => (&e.ident, SymbolKind::Enum),
                Item::Trait(t) => (&t.ident, SymbolKind::Trait),
                Item::Type(t) => (&t.ident, SymbolKind::Alias),
                Item::Use(u) => {
                    let scope = self.modules.entry(module.clone()).or_default();
                    collect_use(&u.tree, &mut Vec::new(), scope);
                    return;
                }
                Item::Mod(m) => {
                    self.modules.entry(module.child(&m.ident.to_string())).or_default();
                    return;
                }
                _ => return,
            };

            let id = SymbolId(u32::try_from(self.symbols.len()).unwrap_or(u32::MAX));
            let name = ident.to_string();
            self.by_path.insert(module.join(std::slice::from_ref(&name)), id);
            if let Item::Type(alias) = item {
                self.alias_targets.insert(id, (*alias.ty).clone());
            }
            self.symbols.push(Symbol {
                id,
                name,
                module: module.clone(),
                kind,
                file: file.to_path_buf(),
                line: ident.span().start().line,
            });
        });
    }

    /// Returns a symbol by id.
    ///
    /// # Panics
    ///
    /// Panics if the id was issued by another table.
    #[must_use]
    pub fn get(&self, id: SymbolId) -> &Symbol {
        &self.symbols[id.index()]
    }

    /// Returns all symbols in registration order.
    #[must_use]
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    /// Looks up a symbol by its qualified path (`label::module::Name`).
    #[cfg(test)]
    pub(crate) fn lookup_qualified(&self, qualified: &str) -> Option<SymbolId> {
        let parts: Vec<String> = qualified.split("::").map(String::from).collect();
        self.lookup(&parts, MAX_RESOLVE_HOPS)
    }

    /// Looks up the declaration `name` in exactly `module`.
    #[must_use]
    pub fn declared_in(&self, module: &ModulePath, name: &str) -> Option<SymbolId> {
        self.by_path
            .get(&module.join(&[name.to_string()]))
            .copied()
    }

    /// Resolves a written path as seen from `module`.
    ///
    /// `self_ty` is the symbol `Self` refers to, if any.
    #[must_use]
    pub fn resolve_segments(
        &self,
        segments: &[String],
        module: &ModulePath,
        self_ty: Option<SymbolId>,
    ) -> Option<SymbolId> {
        match segments {
            [] => None,
            [only] if only == "Self" => self_ty,
            [first, ..] if first == "Self" => None,
            _ => self
                .absolutize(segments, module, MAX_RESOLVE_HOPS)
                .into_iter()
                .find_map(|candidate| self.lookup(&candidate, MAX_RESOLVE_HOPS)),
        }
    }

    /// Resolves a `syn::Path` as seen from `module`.
    #[must_use]
    pub fn resolve_path(
        &self,
        path: &syn::Path,
        module: &ModulePath,
        self_ty: Option<SymbolId>,
    ) -> Option<SymbolId> {
        let segments: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();
        if path.leading_colon.is_some() {
            return self.lookup(&segments, MAX_RESOLVE_HOPS);
        }
        self.resolve_segments(&segments, module, self_ty)
    }

    /// Resolves a type without looking inside wrappers.
    ///
    /// References, parentheses and `dyn`/`impl` trait bounds are looked
    /// through; generic arguments are not.
    #[must_use]
    pub fn resolve_type(
        &self,
        ty: &Type,
        module: &ModulePath,
        self_ty: Option<SymbolId>,
    ) -> Vec<SymbolId> {
        let mut out = Vec::new();
        self.direct_ids(ty, module, self_ty, &mut out);
        out
    }

    /// Resolves a type, unwrapping one level of wrapper when the type
    /// itself is not a known symbol.
    ///
    /// `Arc<T>`, `Vec<T>`, `Option<T>`, `HashMap<K, V>`, `[T]`, `[T; N]`,
    /// `(A, B)`, `impl Future<Output = T>` and `Box<dyn T>` all yield `T`
    /// (and `K`, `V`, `A`, `B`).
    #[must_use]
    pub fn resolve_type_unwrapped(
        &self,
        ty: &Type,
        module: &ModulePath,
        self_ty: Option<SymbolId>,
    ) -> Vec<SymbolId> {
        let direct = self.resolve_type(ty, module, self_ty);
        if !direct.is_empty() {
            return direct;
        }

        let mut out = Vec::new();
        match ty {
            Type::Reference(r) => return self.resolve_type_unwrapped(&r.elem, module, self_ty),
            Type::Paren(p) => return self.resolve_type_unwrapped(&p.elem, module, self_ty),
            Type::Group(g) => return self.resolve_type_unwrapped(&g.elem, module, self_ty),
            Type::Path(p) => {
                if let Some(last) = p.path.segments.last() {
                    self.generic_arg_ids(&last.arguments, module, self_ty, &mut out);
                }
            }
            Type::Slice(s) => self.direct_ids(&s.elem, module, self_ty, &mut out),
            Type::Array(a) => self.direct_ids(&a.elem, module, self_ty, &mut out),
            Type::Ptr(p) => self.direct_ids(&p.elem, module, self_ty, &mut out),
            Type::Tuple(t) => {
                for elem in &t.elems {
                    self.direct_ids(elem, module, self_ty, &mut out);
                }
            }
            Type::TraitObject(t) => self.bound_arg_ids(t.bounds.iter(), module, self_ty, &mut out),
            Type::ImplTrait(t) => self.bound_arg_ids(t.bounds.iter(), module, self_ty, &mut out),
            _ => {}
        }
        out
    }

    fn direct_ids(
        &self,
        ty: &Type,
        module: &ModulePath,
        self_ty: Option<SymbolId>,
        out: &mut Vec<SymbolId>,
    ) {
        match ty {
            Type::Reference(r) => self.direct_ids(&r.elem, module, self_ty, out),
            Type::Paren(p) => self.direct_ids(&p.elem, module, self_ty, out),
            Type::Group(g) => self.direct_ids(&g.elem, module, self_ty, out),
            Type::Path(p) if p.qself.is_none() => {
                if let Some(id) = self.resolve_path(&p.path, module, self_ty) {
                    push_id(out, id);
                }
            }
            Type::TraitObject(t) => self.bound_ids(t.bounds.iter(), module, self_ty, out),
            Type::ImplTrait(t) => self.bound_ids(t.bounds.iter(), module, self_ty, out),
            _ => {}
        }
    }

    fn bound_ids<'b>(
        &self,
        bounds: impl Iterator<Item = &'b TypeParamBound>,
        module: &ModulePath,
        self_ty: Option<SymbolId>,
        out: &mut Vec<SymbolId>,
    ) {
        for bound in bounds {
            if let TypeParamBound::Trait(t) = bound {
                if let Some(id) = self.resolve_path(&t.path, module, self_ty) {
                    push_id(out, id);
                }
            }
        }
    }

    fn bound_arg_ids<'b>(
        &self,
        bounds: impl Iterator<Item = &'b TypeParamBound>,
        module: &ModulePath,
        self_ty: Option<SymbolId>,
        out: &mut Vec<SymbolId>,
    ) {
        for bound in bounds {
            if let TypeParamBound::Trait(t) = bound {
                if let Some(last) = t.path.segments.last() {
                    self.generic_arg_ids(&last.arguments, module, self_ty, out);
                }
            }
        }
    }

    fn generic_arg_ids(
        &self,
        arguments: &syn::PathArguments,
        module: &ModulePath,
        self_ty: Option<SymbolId>,
        out: &mut Vec<SymbolId>,
    ) {
        let syn::PathArguments::AngleBracketed(args) = arguments else {
            return;
        };
        for arg in &args.args {
            match arg {
                syn::GenericArgument::Type(ty) => self.direct_ids(ty, module, self_ty, out),
                syn::GenericArgument::AssocType(assoc) => {
                    self.direct_ids(&assoc.ty, module, self_ty, out);
                }
                _ => {}
            }
        }
    }

    /// Turns a written path into absolute candidate paths.
    fn absolutize(&self, segments: &[String], module: &ModulePath, hops: usize) -> Vec<Vec<String>> {
        let Some((first, rest)) = segments.split_first() else {
            return Vec::new();
        };
        if hops == 0 {
            return Vec::new();
        }

        match first.as_str() {
            "crate" => vec![ModulePath::root(module.crate_label()).join(rest)],
            "self" => vec![module.join(rest)],
            "super" => {
                let mut base = module.parent();
                let mut rest = rest;
                while let Some((next, tail)) = rest.split_first() {
                    if next != "super" {
                        break;
                    }
                    base = base.parent();
                    rest = tail;
                }
                vec![base.join(rest)]
            }
            _ => {
                let scope = self.modules.get(module);
                if let Some(target) = scope.and_then(|s| s.uses.get(first)) {
                    return self
                        .absolutize(target, module, hops - 1)
                        .into_iter()
                        .map(|mut candidate| {
                            candidate.extend_from_slice(rest);
                            candidate
                        })
                        .collect();
                }

                let mut candidates = vec![module.join(segments)];
                if self.crate_labels.contains(first) {
                    candidates.push(segments.to_vec());
                }
                if rest.is_empty() {
                    for glob in scope.map(|s| s.globs.as_slice()).unwrap_or_default() {
                        for mut base in self.absolutize(glob, module, hops - 1) {
                            base.push(first.clone());
                            candidates.push(base);
                        }
                    }
                }
                candidates
            }
        }
    }

    /// Looks up an absolute path, following aliases and re-exports.
    fn lookup(&self, path: &[String], hops: usize) -> Option<SymbolId> {
        if hops == 0 || path.len() < 2 {
            return None;
        }
        if let Some(&id) = self.by_path.get(path) {
            return self.follow_alias(id, hops);
        }

        // Longest known module prefix; its imports may re-export the rest.
        for split in (1..path.len()).rev() {
            let module = ModulePath(path[..split].to_vec());
            let Some(scope) = self.modules.get(&module) else {
                continue;
            };
            let (name, tail) = (&path[split], &path[split + 1..]);
            if let Some(target) = scope.uses.get(name) {
                for mut candidate in self.absolutize(target, &module, hops - 1) {
                    candidate.extend_from_slice(tail);
                    if let Some(id) = self.lookup(&candidate, hops - 1) {
                        return Some(id);
                    }
                }
            }
            if tail.is_empty() {
                for glob in &scope.globs {
                    for mut base in self.absolutize(glob, &module, hops - 1) {
                        base.push(name.clone());
                        if let Some(id) = self.lookup(&base, hops - 1) {
                            return Some(id);
                        }
                    }
                }
            }
            return None;
        }
        None
    }

    fn follow_alias(&self, id: SymbolId, hops: usize) -> Option<SymbolId> {
        let Some(target) = self.alias_targets.get(&id) else {
            return Some(id);
        };
        let module = &self.get(id).module;
        let resolved = alias_paths(target).into_iter().find_map(|segments| {
            self.absolutize(&segments, module, hops - 1)
                .into_iter()
                .find_map(|candidate| self.lookup(&candidate, hops - 1))
        });
        Some(resolved.unwrap_or(id))
    }
}

/// Paths an alias may stand for: the target itself, then its generic
/// arguments (`type Shared = Arc<Repo>` stands for `Repo`).
fn alias_paths(ty: &Type) -> Vec<Vec<String>> {
    let ty = match ty {
        Type::Reference(r) => &*r.elem,
        other => other,
    };
    let Type::Path(p) = ty else {
        return Vec::new();
    };
    let mut paths = vec![p.path.segments.iter().map(|s| s.ident.to_string()).collect()];
    if let Some(syn::PathArguments::AngleBracketed(args)) = p.path.segments.last().map(|s| &s.arguments) {
        for arg in &args.args {
            if let syn::GenericArgument::Type(Type::Path(inner)) = arg {
                paths.push(inner.path.segments.iter().map(|s| s.ident.to_string()).collect());
            }
        }
    }
    paths
}

fn push_id(out: &mut Vec<SymbolId>, id: SymbolId) {
    if !out.contains(&id) {
        out.push(id);
    }
}

fn collect_use(tree: &UseTree, prefix: &mut Vec<String>, scope: &mut ModuleScope) {
    match tree {
        UseTree::Path(p) => {
            prefix.push(p.ident.to_string());
            collect_use(&p.tree, prefix, scope);
            prefix.pop();
        }
        UseTree::Name(n) => {
            let name = n.ident.to_string();
            if name == "self" {
                if let Some(last) = prefix.last() {
                    scope.uses.insert(last.clone(), prefix.clone());
                }
            } else {
                let mut target = prefix.clone();
                target.push(name.clone());
                scope.uses.insert(name, target);
            }
        }
        UseTree::Rename(r) => {
            let alias = r.rename.to_string();
            if alias == "_" {
                return;
            }
            let mut target = prefix.clone();
            if r.ident != "self" {
                target.push(r.ident.to_string());
            }
            scope.uses.insert(alias, target);
        }
        UseTree::Glob(_) => scope.globs.push(prefix.clone()),
        UseTree::Group(g) => {
            for item in &g.items {
                collect_use(item, prefix, scope);
            }
        }
    }
}

/// Calls `f` for every item of a file, descending into inline modules.
///
/// Modules gated behind `#[cfg(test)]` are skipped.
pub fn for_each_item<'a, F>(items: &'a [Item], module: &ModulePath, f: &mut F)
where
    F: FnMut(&'a Item, &ModulePath),
{
    for item in items {
        f(item, module);
        if let Item::Mod(m) = item {
            if has_cfg_test(&m.attrs) {
                continue;
            }
            if let Some((_, content)) = &m.content {
                let child = module.child(&m.ident.to_string());
                for_each_item(content, &child, f);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(files: &[(&str, &str, &str)]) -> SymbolTable {
        let mut table = SymbolTable::new();
        for (label, modules, src) in files {
            let ast = syn::parse_file(src).unwrap();
            let segments = modules
                .split("::")
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            table.add_file(Path::new("src/lib.rs"), &ModulePath::new(*label, segments), &ast.items);
        }
        table
    }

    fn ty(src: &str) -> Type {
        syn::parse_str(src).unwrap()
    }

    fn module(parts: &[&str]) -> ModulePath {
        ModulePath(parts.iter().map(|s| (*s).to_string()).collect())
    }

    fn name_of(t: &SymbolTable, ids: &[SymbolId]) -> Vec<String> {
        ids.iter().map(|id| t.get(*id).qualified()).collect()
    }

    #[test]
    fn resolves_same_module_and_use_imports() {
        let t = table(&[
            ("shop", "payments", "pub struct PaymentService;"),
            ("shop", "orders", "use crate::payments::PaymentService; pub struct OrderService;"),
        ]);
        let m = module(&["shop", "orders"]);
        assert_eq!(name_of(&t, &t.resolve_type(&ty("OrderService"), &m, None)), ["shop::orders::OrderService"]);
        assert_eq!(
            name_of(&t, &t.resolve_type(&ty("&PaymentService"), &m, None)),
            ["shop::payments::PaymentService"]
        );
    }

    #[test]
    fn same_name_in_two_modules_gets_distinct_ids() {
        let t = table(&[
            ("shop", "a", "pub struct Client;"),
            ("shop", "b", "pub struct Client;"),
        ]);
        let a = t.lookup_qualified("shop::a::Client").unwrap();
        let b = t.lookup_qualified("shop::b::Client").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn resolves_super_self_and_crate_label_paths() {
        let t = table(&[
            ("shop", "", "pub mod payments { pub struct Gateway; }"),
            ("shop", "orders", ""),
        ]);
        let m = module(&["shop", "orders"]);
        let expected = t.lookup_qualified("shop::payments::Gateway");
        assert!(expected.is_some());
        for path in ["super::payments::Gateway", "crate::payments::Gateway", "shop::payments::Gateway"] {
            assert_eq!(t.resolve_type(&ty(path), &m, None).first().copied(), expected, "{path}");
        }
    }

    #[test]
    fn follows_glob_and_pub_use_reexports() {
        let t = table(&[
            ("shop", "payments::stripe", "pub struct StripeGateway;"),
            ("shop", "payments", "pub use self::stripe::StripeGateway as Gateway;"),
            ("shop", "orders", "use crate::payments::*;"),
        ]);
        let m = module(&["shop", "orders"]);
        let expected = t.lookup_qualified("shop::payments::stripe::StripeGateway");
        assert_eq!(t.resolve_type(&ty("Gateway"), &m, None).first().copied(), expected);
    }

    #[test]
    fn unwraps_one_level_of_wrappers() {
        let t = table(&[("shop", "", "pub struct Repo; pub trait Clock {}")]);
        let m = module(&["shop"]);
        for src in [
            "Arc<Repo>",
            "Vec<Repo>",
            "Option<&Repo>",
            "[Repo; 4]",
            "&[Repo]",
            "impl Future<Output = Repo>",
        ] {
            assert_eq!(name_of(&t, &t.resolve_type_unwrapped(&ty(src), &m, None)), ["shop::Repo"], "{src}");
        }
        assert_eq!(
            name_of(&t, &t.resolve_type_unwrapped(&ty("Box<dyn Clock>"), &m, None)),
            ["shop::Clock"]
        );
        assert!(t.resolve_type_unwrapped(&ty("Vec<Vec<Repo>>"), &m, None).is_empty());
        assert!(t.resolve_type(&ty("Arc<Repo>"), &m, None).is_empty());
    }

    #[test]
    fn type_alias_resolves_to_target() {
        let t = table(&[("shop", "", "pub struct Repo; pub type SharedRepo = std::sync::Arc<Repo>;")]);
        let m = module(&["shop"]);
        assert_eq!(name_of(&t, &t.resolve_type(&ty("SharedRepo"), &m, None)), ["shop::Repo"]);
    }

    #[test]
    fn self_resolves_to_given_type() {
        let t = table(&[("shop", "", "pub struct Repo;")]);
        let repo = t.lookup_qualified("shop::Repo");
        let m = module(&["shop"]);
        assert_eq!(t.resolve_type(&ty("Self"), &m, repo).first().copied(), repo);
    }

    #[test]
    fn cfg_test_modules_are_skipped() {
        let t = table(&[("shop", "", "#[cfg(test)] mod tests { struct Fixture; } pub struct Repo;")]);
        assert!(t.lookup_qualified("shop::tests::Fixture").is_none());
        assert!(t.lookup_qualified("shop::Repo").is_some());
    }

    #[test]
    fn std_types_do_not_resolve() {
        let t = table(&[("shop", "", "pub struct Repo;")]);
        assert!(t.resolve_type(&ty("String"), &module(&["shop"]), None).is_empty());
    }
}
