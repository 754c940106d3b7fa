//! Parsed program view of one scope.
//!
//! A [`Program`] owns every parsed file and the fully built [`SymbolTable`].
//! The table is complete before any query runs, so a declaration found late
//! in file order is visible to references found early.
//!
//! [`CodeIndex`] borrows the program and indexes fields and methods by the
//! symbol that owns them.

use crate::symbols::{for_each_item, ModulePath, SymbolId, SymbolTable};
use crate::utils::paths::module_segments;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use syn::spanned::Spanned;
use syn::{Block, Fields, FnArg, ImplItem, Item, ReturnType, Signature, TraitItem, Type};

/// Errors raised while loading a source file.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid Rust.
    #[error("failed to parse {}: {message}", .path.display())]
    Parse {
        /// File path relative to the scope root.
        path: PathBuf,
        /// Line of the syntax error.
        line: usize,
        /// Column of the syntax error.
        column: usize,
        /// Parser message.
        message: String,
    },
}

/// One parsed source file.
pub struct SourceFile {
    /// Path relative to the scope root.
    pub relative_path: PathBuf,
    /// Module the file defines.
    pub module: ModulePath,
    /// Parsed syntax tree.
    pub ast: syn::File,
}

impl std::fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceFile")
            .field("relative_path", &self.relative_path)
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}

impl SourceFile {
    /// Reads and parses a file below `root`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the file cannot be read or parsed.
    pub fn load(path: &Path, root: &Path, default_label: &str) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let relative = path
            .strip_prefix(root)
            .map_or_else(|_| path.to_path_buf(), Path::to_path_buf);
        Self::from_source(relative, &content, default_label)
    }

    /// Parses in-memory source as if it lived at `relative_path`.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Parse`] if the source is not valid Rust.
    pub fn from_source(
        relative_path: PathBuf,
        content: &str,
        default_label: &str,
    ) -> Result<Self, LoadError> {
        let ast = syn::parse_file(content).map_err(|e| {
            let start = e.span().start();
            LoadError::Parse {
                path: relative_path.clone(),
                line: start.line,
                column: start.column + 1,
                message: e.to_string(),
            }
        })?;
        let (label, segments) = module_segments(&relative_path, default_label);
        Ok(Self {
            module: ModulePath::new(label, segments),
            relative_path,
            ast,
        })
    }
}

/// All parsed files of a scope plus their symbol table.
#[derive(Debug)]
pub struct Program {
    files: Vec<SourceFile>,
    symbols: SymbolTable,
}

impl Program {
    /// Builds the symbol table over every file.
    #[must_use]
    pub fn new(files: Vec<SourceFile>) -> Self {
        let mut symbols = SymbolTable::new();
        for file in &files {
            symbols.add_file(&file.relative_path, &file.module, &file.ast.items);
        }
        Self { files, symbols }
    }

    /// Returns the parsed files.
    #[must_use]
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    /// Returns the symbol table.
    #[must_use]
    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }
}

/// Index of a method in the [`CodeIndex`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(usize);

/// A stored field of a struct or enum variant.
#[derive(Debug, Clone)]
pub struct FieldInfo<'p> {
    /// Field name; tuple fields use their index, variant fields are
    /// prefixed with the variant (`Variant.field`).
    pub name: String,
    /// Declared type.
    pub ty: &'p Type,
    /// Line of the field.
    pub line: usize,
}

/// Fields of one type declaration.
#[derive(Debug, Clone)]
pub struct TypeInfo<'p> {
    /// Stored fields in declaration order.
    pub fields: Vec<FieldInfo<'p>>,
    /// Module of the declaration.
    pub module: ModulePath,
    /// Index of the declaring file.
    pub file: usize,
}

/// A function associated with a type: inherent, trait impl, or trait
/// declaration.
#[derive(Debug, Clone)]
pub struct MethodNode<'p> {
    /// Arena id.
    pub id: MethodId,
    /// Owning type or trait.
    pub owner: SymbolId,
    /// Function name.
    pub name: String,
    /// Signature.
    pub sig: &'p Signature,
    /// Body, absent for required trait methods.
    pub body: Option<&'p Block>,
    /// Module of the enclosing `impl` or `trait`.
    pub module: ModulePath,
    /// Index of the declaring file.
    pub file: usize,
    /// Associated function without receiver returning the owner.
    pub is_constructor: bool,
    /// Line of the function name.
    pub line: usize,
}

impl MethodNode<'_> {
    /// Returns typed parameters, skipping the receiver.
    pub fn params(&self) -> impl Iterator<Item = &syn::PatType> {
        self.sig.inputs.iter().filter_map(|arg| match arg {
            FnArg::Typed(pat) => Some(pat),
            FnArg::Receiver(_) => None,
        })
    }

    /// Returns the declared return type, if any.
    #[must_use]
    pub fn return_type(&self) -> Option<&'_ Type> {
        match &self.sig.output {
            ReturnType::Type(_, ty) => Some(ty),
            ReturnType::Default => None,
        }
    }
}

/// Fields and methods of every declaration, keyed by symbol.
#[derive(Debug)]
pub struct CodeIndex<'p> {
    program: &'p Program,
    types: HashMap<SymbolId, TypeInfo<'p>>,
    methods: Vec<MethodNode<'p>>,
    by_owner: HashMap<SymbolId, Vec<MethodId>>,
}

impl<'p> CodeIndex<'p> {
    /// Indexes every struct, enum, impl block and trait of the program.
    #[must_use]
    pub fn build(program: &'p Program) -> Self {
        let mut index = Self {
            program,
            types: HashMap::new(),
            methods: Vec::new(),
            by_owner: HashMap::new(),
        };

        for (file_idx, file) in program.files().iter().enumerate() {
            for_each_item(&file.ast.items, &file.module, &mut |item, module| {
                index.add_item(item, module, file_idx);
            });
        }
        index
    }

    fn add_item(&mut self, item: &'p Item, module: &ModulePath, file: usize) {
        let program = self.program;
        let symbols = program.symbols();
        match item {
            Item::Struct(s) => {
                if let Some(id) = symbols.declared_in(module, &s.ident.to_string()) {
                    let fields = collect_fields(&s.fields, None);
                    self.types.insert(id, TypeInfo { fields, module: module.clone(), file });
                }
            }
            Item::Enum(e) => {
                if let Some(id) = symbols.declared_in(module, &e.ident.to_string()) {
                    let fields = e
                        .variants
                        .iter()
                        .flat_map(|v| collect_fields(&v.fields, Some(&v.ident.to_string())))
                        .collect();
                    self.types.insert(id, TypeInfo { fields, module: module.clone(), file });
                }
            }
            Item::Impl(imp) => {
                let Some(&owner) = symbols.resolve_type(&imp.self_ty, module, None).first() else {
                    return;
                };
                for impl_item in &imp.items {
                    if let ImplItem::Fn(f) = impl_item {
                        self.push_method(owner, &f.sig, Some(&f.block), module, file);
                    }
                }
            }
            Item::Trait(t) => {
                if let Some(owner) = symbols.declared_in(module, &t.ident.to_string()) {
                    for trait_item in &t.items {
                        if let TraitItem::Fn(f) = trait_item {
                            self.push_method(owner, &f.sig, f.default.as_ref(), module, file);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    fn push_method(
        &mut self,
        owner: SymbolId,
        sig: &'p Signature,
        body: Option<&'p Block>,
        module: &ModulePath,
        file: usize,
    ) {
        let id = MethodId(self.methods.len());
        let is_constructor = sig.receiver().is_none()
            && match &sig.output {
                ReturnType::Type(_, ty) => self
                    .program
                    .symbols()
                    .resolve_type_unwrapped(ty, module, Some(owner))
                    .contains(&owner),
                ReturnType::Default => false,
            };
        self.methods.push(MethodNode {
            id,
            owner,
            name: sig.ident.to_string(),
            sig,
            body,
            module: module.clone(),
            file,
            is_constructor,
            line: sig.ident.span().start().line,
        });
        self.by_owner.entry(owner).or_default().push(id);
    }

    /// Returns the program this index was built from.
    #[must_use]
    pub fn program(&self) -> &'p Program {
        self.program
    }

    /// Returns the fields of a type, if it is a struct or enum.
    #[must_use]
    pub fn type_info(&self, id: SymbolId) -> Option<&TypeInfo<'p>> {
        self.types.get(&id)
    }

    /// Returns a method by id.
    #[must_use]
    pub fn method(&self, id: MethodId) -> &MethodNode<'p> {
        &self.methods[id.0]
    }

    /// Returns the methods owned by a symbol in declaration order.
    pub fn methods_of(&self, owner: SymbolId) -> impl Iterator<Item = &MethodNode<'p>> {
        self.by_owner
            .get(&owner)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .map(|id| &self.methods[id.0])
    }

    /// Finds a method by name on a type or trait.
    ///
    /// Prefers a method with a body when an inherent or trait impl and a
    /// trait declaration share the name.
    #[must_use]
    pub fn method_named(&self, owner: SymbolId, name: &str) -> Option<&MethodNode<'p>> {
        let mut found = None;
        for method in self.methods_of(owner).filter(|m| m.name == name) {
            if method.body.is_some() {
                return Some(method);
            }
            found.get_or_insert(method);
        }
        found
    }

    /// Returns the relative path of the file at `idx`.
    #[must_use]
    pub fn file_path(&self, idx: usize) -> &'p Path {
        &self.program.files()[idx].relative_path
    }

    /// Resolves the type of a named field of `owner`, unwrapping one level.
    #[must_use]
    pub fn field_type(&self, owner: SymbolId, field: &str) -> Option<SymbolId> {
        let info = self.types.get(&owner)?;
        let field = info.fields.iter().find(|f| f.name == field)?;
        self.program
            .symbols()
            .resolve_type_unwrapped(field.ty, &info.module, Some(owner))
            .first()
            .copied()
    }
}

fn collect_fields<'p>(fields: &'p Fields, variant: Option<&str>) -> Vec<FieldInfo<'p>> {
    fields
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            let base = field
                .ident
                .as_ref()
                .map_or_else(|| idx.to_string(), ToString::to_string);
            FieldInfo {
                name: variant.map_or_else(|| base.clone(), |v| format!("{v}.{base}")),
                ty: &field.ty,
                line: field.span().start().line,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn program(files: &[(&str, &str)]) -> Program {
        Program::new(
            files
                .iter()
                .map(|(path, src)| SourceFile::from_source(PathBuf::from(path), src, "shop").unwrap())
                .collect(),
        )
    }

    #[test]
    fn module_path_comes_from_file_path() {
        let file = SourceFile::from_source(PathBuf::from("src/orders/mod.rs"), "", "shop").unwrap();
        assert_eq!(file.module.to_string(), "shop::orders");
    }

    #[test]
    fn parse_error_reports_position() {
        let err = SourceFile::from_source(PathBuf::from("src/lib.rs"), "struct {", "shop").unwrap_err();
        assert!(matches!(err, LoadError::Parse { line: 1, .. }));
    }

    #[test]
    fn indexes_fields_and_methods_across_files() {
        let p = program(&[
            (
                "src/orders.rs",
                "use crate::payments::PaymentService;
                 pub struct OrderService { payments: PaymentService }
                 impl OrderService {
                     pub fn new(payments: PaymentService) -> Self { Self { payments } }
                     pub fn place(&self) {}
                 }",
            ),
            ("src/payments.rs", "pub struct PaymentService;"),
        ]);
        let index = CodeIndex::build(&p);
        let orders = p.symbols().lookup_qualified("shop::orders::OrderService").unwrap();
        let payments = p.symbols().lookup_qualified("shop::payments::PaymentService").unwrap();

        assert_eq!(index.field_type(orders, "payments"), Some(payments));
        let names: Vec<&str> = index.methods_of(orders).map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["new", "place"]);
        assert!(index.method_named(orders, "new").unwrap().is_constructor);
        assert!(!index.method_named(orders, "place").unwrap().is_constructor);
    }

    #[test]
    fn fallible_constructor_is_recognised() {
        let p = program(&[(
            "src/lib.rs",
            "pub struct Repo; impl Repo { pub fn open(path: &str) -> Result<Self, String> { Ok(Repo) } }",
        )]);
        let index = CodeIndex::build(&p);
        let repo = p.symbols().lookup_qualified("shop::Repo").unwrap();
        assert!(index.method_named(repo, "open").unwrap().is_constructor);
    }

    #[test]
    fn trait_methods_and_impls_are_indexed() {
        let p = program(&[(
            "src/lib.rs",
            "pub trait Gateway { fn charge(&self); fn ping(&self) {} }
             pub struct Stripe;
             impl Gateway for Stripe { fn charge(&self) {} }",
        )]);
        let index = CodeIndex::build(&p);
        let gateway = p.symbols().lookup_qualified("shop::Gateway").unwrap();
        let stripe = p.symbols().lookup_qualified("shop::Stripe").unwrap();
        assert!(index.method_named(gateway, "charge").unwrap().body.is_none());
        assert!(index.method_named(gateway, "ping").unwrap().body.is_some());
        assert!(index.method_named(stripe, "charge").unwrap().body.is_some());
    }

    #[test]
    fn enum_variant_fields_are_prefixed() {
        let p = program(&[("src/lib.rs", "pub enum Job { Send { to: String }, Retry(u8) }")]);
        let index = CodeIndex::build(&p);
        let job = p.symbols().lookup_qualified("shop::Job").unwrap();
        let names: Vec<&str> = index
            .type_info(job)
            .unwrap()
            .fields
            .iter()
            .map(|f| f.name.as_str())
            .collect();
        assert_eq!(names, vec!["Send.to", "Retry.0"]);
    }
}
