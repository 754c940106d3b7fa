//! Call-site collection inside one method body.

use super::CallVia;
use crate::program::{CodeIndex, MethodNode};
use crate::symbols::{ModulePath, SymbolId};
use std::collections::HashMap;
use syn::visit::Visit;
use syn::{Expr, ExprCall, ExprMethodCall, Member, Pat, Type, UnOp};

/// Methods assumed to hand back (a view of) their receiver.
const PASS_THROUGH_METHODS: &[&str] = &[
    "as_deref",
    "as_mut",
    "as_ref",
    "borrow",
    "borrow_mut",
    "clone",
    "deref",
    "expect",
    "lock",
    "read",
    "to_owned",
    "unwrap",
    "write",
];

/// A call of a method declared on a known type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// Type or trait declaring the called method.
    pub target: SymbolId,
    /// Called method.
    pub method: String,
    /// How the receiver was obtained.
    pub via: CallVia,
    /// Line of the method name at the call.
    pub line: usize,
    /// Column of the method name at the call.
    pub column: usize,
}

/// Walks a method body and records calls whose receiver type resolves to a
/// known symbol declaring the called method.
///
/// Receiver types are tracked through `self` fields, typed parameters,
/// `let` bindings initialised from constructors, struct literals or fields,
/// and chained calls with resolvable return types.
pub struct CallSiteCollector<'i, 'p> {
    index: &'i CodeIndex<'p>,
    module: &'i ModulePath,
    owner: SymbolId,
    locals: HashMap<String, (SymbolId, CallVia)>,
    sites: Vec<CallSite>,
}

impl<'i, 'p> CallSiteCollector<'i, 'p> {
    /// Collects the call sites of one method in source order.
    #[must_use]
    pub fn collect(index: &'i CodeIndex<'p>, method: &'i MethodNode<'p>) -> Vec<CallSite> {
        let Some(body) = method.body else {
            return Vec::new();
        };
        let mut collector = Self {
            index,
            module: &method.module,
            owner: method.owner,
            locals: HashMap::new(),
            sites: Vec::new(),
        };
        for param in method.params() {
            if let Pat::Ident(pat) = &*param.pat {
                if let Some(id) = collector.resolve(&param.ty) {
                    collector
                        .locals
                        .insert(pat.ident.to_string(), (id, CallVia::Param));
                }
            }
        }
        collector.visit_block(body);
        collector.sites
    }

    fn resolve(&self, ty: &Type) -> Option<SymbolId> {
        self.index
            .program()
            .symbols()
            .resolve_type_unwrapped(ty, self.module, Some(self.owner))
            .first()
            .copied()
    }

    /// Splits `Type::method` into the resolved type and the method name.
    fn split_path_call(&self, path: &syn::Path) -> Option<(SymbolId, String)> {
        if path.segments.len() < 2 {
            return None;
        }
        let segments: Vec<String> = path.segments.iter().map(|s| s.ident.to_string()).collect();
        let (method, ty) = segments.split_last()?;
        let target = self
            .index
            .program()
            .symbols()
            .resolve_segments(ty, self.module, Some(self.owner))?;
        Some((target, method.clone()))
    }

    fn return_of(&self, method: &MethodNode<'_>) -> Option<SymbolId> {
        let ty = method.return_type()?;
        self.index
            .program()
            .symbols()
            .resolve_type_unwrapped(ty, &method.module, Some(method.owner))
            .first()
            .copied()
    }

    /// Infers the type of an expression and how it was obtained.
    fn infer(&self, expr: &Expr) -> Option<(SymbolId, CallVia)> {
        match expr {
            Expr::Path(p) if p.qself.is_none() => {
                let ident = p.path.get_ident()?;
                if ident == "self" {
                    return Some((self.owner, CallVia::Local));
                }
                self.locals.get(&ident.to_string()).copied()
            }
            Expr::Field(field) => {
                let member = match &field.member {
                    Member::Named(ident) => ident.to_string(),
                    Member::Unnamed(idx) => idx.index.to_string(),
                };
                let (base, base_via) = self.infer(&field.base)?;
                let target = self.index.field_type(base, &member)?;
                let via = if is_self(&field.base) {
                    CallVia::Field
                } else {
                    base_via
                };
                Some((target, via))
            }
            Expr::Call(call) => {
                let Expr::Path(p) = &*call.func else {
                    return None;
                };
                let (owner, name) = self.split_path_call(&p.path)?;
                let method = self.index.method_named(owner, &name)?;
                if method.is_constructor {
                    return Some((owner, CallVia::Fresh));
                }
                Some((self.return_of(method)?, CallVia::Static))
            }
            Expr::Struct(s) => {
                let id = self.index.program().symbols().resolve_path(
                    &s.path,
                    self.module,
                    Some(self.owner),
                )?;
                Some((id, CallVia::Fresh))
            }
            Expr::MethodCall(call) => {
                let (receiver, via) = self.infer(&call.receiver)?;
                let name = call.method.to_string();
                if let Some(method) = self.index.method_named(receiver, &name) {
                    return Some((self.return_of(method)?, CallVia::Local));
                }
                PASS_THROUGH_METHODS
                    .contains(&name.as_str())
                    .then_some((receiver, via))
            }
            Expr::Reference(r) => self.infer(&r.expr),
            Expr::Paren(p) => self.infer(&p.expr),
            Expr::Group(g) => self.infer(&g.expr),
            Expr::Try(t) => self.infer(&t.expr),
            Expr::Await(a) => self.infer(&a.base),
            Expr::Unary(u) if matches!(u.op, UnOp::Deref(_)) => self.infer(&u.expr),
            _ => None,
        }
    }

    fn record(&mut self, target: SymbolId, method: String, via: CallVia, span: proc_macro2::Span) {
        let start = span.start();
        self.sites.push(CallSite {
            target,
            method,
            via,
            line: start.line,
            column: start.column + 1,
        });
    }
}

fn is_self(expr: &Expr) -> bool {
    matches!(expr, Expr::Path(p) if p.path.is_ident("self"))
}

impl<'ast> Visit<'ast> for CallSiteCollector<'_, '_> {
    fn visit_block(&mut self, block: &'ast syn::Block) {
        let outer = self.locals.clone();
        syn::visit::visit_block(self, block);
        self.locals = outer;
    }

    fn visit_local(&mut self, local: &'ast syn::Local) {
        if let Some(init) = &local.init {
            self.visit_expr(&init.expr);
            if let Some((_, diverge)) = &init.diverge {
                self.visit_expr(diverge);
            }
        }

        let (pat, annotated) = match &local.pat {
            Pat::Type(typed) => (&*typed.pat, Some(&*typed.ty)),
            other => (other, None),
        };
        let Pat::Ident(binding) = pat else {
            return;
        };
        let name = binding.ident.to_string();

        let from_init = local.init.as_ref().and_then(|init| self.infer(&init.expr));
        let from_type = annotated.and_then(|ty| self.resolve(ty));
        let inferred = match (from_type, from_init) {
            (Some(id), Some((init_id, via))) if id == init_id => Some((id, via)),
            (Some(id), _) => Some((id, CallVia::Local)),
            (None, init) => init,
        };
        match inferred {
            Some(binding) => {
                self.locals.insert(name, binding);
            }
            None => {
                self.locals.remove(&name);
            }
        }
    }

    fn visit_expr_method_call(&mut self, call: &'ast ExprMethodCall) {
        if let Some((target, via)) = self.infer(&call.receiver) {
            let name = call.method.to_string();
            if self.index.method_named(target, &name).is_some() {
                self.record(target, name, via, call.method.span());
            }
        }
        syn::visit::visit_expr_method_call(self, call);
    }

    fn visit_expr_call(&mut self, call: &'ast ExprCall) {
        if let Expr::Path(p) = &*call.func {
            if let Some((target, name)) = self.split_path_call(&p.path) {
                if let Some(method) = self.index.method_named(target, &name) {
                    let via = if method.is_constructor {
                        CallVia::Fresh
                    } else {
                        CallVia::Static
                    };
                    let span = p
                        .path
                        .segments
                        .last()
                        .map_or_else(proc_macro2::Span::call_site, |s| s.ident.span());
                    self.record(target, name, via, span);
                }
            }
        }
        syn::visit::visit_expr_call(self, call);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::program::{Program, SourceFile};
    use std::path::PathBuf;

    const FIXTURE: &str = "
        pub struct Payments;
        impl Payments {
            pub fn new() -> Self { Payments }
            pub fn charge(&self) {}
            pub fn audit() {}
        }
        pub struct Mailer;
        impl Mailer { pub fn send(&self) {} }
        pub struct Orders { payments: Payments }
    ";

    fn sites(body: &str) -> Vec<(String, CallVia)> {
        let src = format!("{FIXTURE}\nimpl Orders {{ {body} }}");
        let program = Program::new(vec![
            SourceFile::from_source(PathBuf::from("src/lib.rs"), &src, "shop").unwrap(),
        ]);
        let index = CodeIndex::build(&program);
        let orders = program.symbols().lookup_qualified("shop::Orders").unwrap();
        let method = index.methods_of(orders).next().unwrap();
        CallSiteCollector::collect(&index, method)
            .into_iter()
            .map(|s| (s.method, s.via))
            .collect()
    }

    #[test]
    fn call_through_stored_field() {
        assert_eq!(
            sites("fn place(&self) { self.payments.charge(); }"),
            vec![("charge".to_string(), CallVia::Field)]
        );
    }

    #[test]
    fn call_on_fresh_instance() {
        assert_eq!(
            sites("fn place(&self) { let p = Payments::new(); p.charge(); }"),
            vec![("new".to_string(), CallVia::Fresh), ("charge".to_string(), CallVia::Fresh)]
        );
    }

    #[test]
    fn inner_block_binding_does_not_leak() {
        assert_eq!(
            sites("fn place(&self, p: &Payments) { { let p = Payments::new(); p.charge(); } p.charge(); }"),
            vec![
                ("new".to_string(), CallVia::Fresh),
                ("charge".to_string(), CallVia::Fresh),
                ("charge".to_string(), CallVia::Param)
            ]
        );
    }

    #[test]
    fn chained_constructor_call() {
        assert_eq!(
            sites("fn notify(&self) { Mailer {}.send(); }"),
            vec![("send".to_string(), CallVia::Fresh)]
        );
    }

    #[test]
    fn call_on_parameter_and_static_call() {
        assert_eq!(
            sites("fn notify(&self, mailer: &Mailer) { mailer.send(); Payments::audit(); }"),
            vec![("send".to_string(), CallVia::Param), ("audit".to_string(), CallVia::Static)]
        );
    }

    #[test]
    fn unknown_methods_and_types_are_ignored() {
        assert!(sites("fn place(&self) { let v: Vec<u8> = Vec::new(); v.len(); self.payments.refund(); }").is_empty());
    }

    #[test]
    fn clone_passes_receiver_through() {
        assert_eq!(
            sites("fn place(&self) { let p = self.payments.clone(); p.charge(); }"),
            vec![("charge".to_string(), CallVia::Field)]
        );
    }
}
