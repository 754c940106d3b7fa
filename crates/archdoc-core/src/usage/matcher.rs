use super::calls::{CallSite, CallSiteCollector};
use super::{UsageEvidence, UsageKind, UsageReport};
use crate::extract::ExtractedComponent;
use crate::program::{CodeIndex, MethodId, MethodNode};
use crate::resolver::IdentityResolver;
use crate::symbols::{ModulePath, SymbolId};
use crate::types::Location;
use std::collections::{HashMap, HashSet, VecDeque};
use syn::spanned::Spanned;
use syn::Type;
use tracing::debug;

/// Hard cap on call-chain length during transitive traversal.
pub const MAX_CALL_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy)]
struct Frame {
    method: MethodId,
    parent: Option<usize>,
    depth: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct EvidenceKey {
    source: String,
    target: String,
    kind: UsageKind,
    location: Location,
    origin: Option<MethodId>,
}

/// Deduplicating evidence sink.
///
/// Call evidence is keyed by the method its traversal started from as
/// well, so a hop reached from several origins keeps one chain per origin.
/// A repeated hop from the same origin keeps the shortest chain.
#[derive(Debug, Default)]
struct EvidenceSet {
    items: Vec<UsageEvidence>,
    seen: HashMap<EvidenceKey, usize>,
}

impl EvidenceSet {
    fn push(&mut self, evidence: UsageEvidence, origin: Option<MethodId>) {
        let key = EvidenceKey {
            source: evidence.source.clone(),
            target: evidence.target.clone(),
            kind: evidence.kind,
            location: evidence.location.clone(),
            origin,
        };
        match self.seen.get(&key) {
            Some(&idx) => {
                if evidence.call_chain.len() < self.items[idx].call_chain.len() {
                    self.items[idx].call_chain = evidence.call_chain;
                }
            }
            None => {
                self.seen.insert(key, self.items.len());
                self.items.push(evidence);
            }
        }
    }
}

/// Finds usage evidence between the components of one scope.
///
/// Components are compared by [`SymbolId`] through an [`IdentityResolver`],
/// never by name.
#[derive(Debug)]
pub struct UsageMatcher<'i, 'p> {
    index: &'i CodeIndex<'p>,
    identity: IdentityResolver,
    components: Vec<(SymbolId, String)>,
    call_sites: HashMap<MethodId, Vec<CallSite>>,
}

impl<'i, 'p> UsageMatcher<'i, 'p> {
    /// Resolves every component to its backing symbol and collects the call
    /// sites of the methods they own.
    #[must_use]
    pub fn new(index: &'i CodeIndex<'p>, components: &[ExtractedComponent]) -> Self {
        let components: Vec<(SymbolId, String)> = components
            .iter()
            .map(|c| (c.symbol, c.component.name.clone()))
            .collect();
        let identity =
            IdentityResolver::new(components.iter().map(|(id, name)| (*id, name.as_str())));

        let mut call_sites = HashMap::new();
        for (symbol, _) in &components {
            for method in index.methods_of(*symbol) {
                call_sites.insert(method.id, CallSiteCollector::collect(index, method));
            }
        }

        Self {
            index,
            identity,
            components,
            call_sites,
        }
    }

    /// Produces all evidence.
    ///
    /// Per component the order is constructor parameters, fields, then each
    /// method in declaration order with its parameters, return type and call
    /// sites.
    #[must_use]
    pub fn run(&self) -> UsageReport {
        let mut out = EvidenceSet::default();

        for (symbol, source) in &self.components {
            let before = out.items.len();
            let methods: Vec<&MethodNode<'p>> = self.index.methods_of(*symbol).collect();

            for ctor in methods.iter().filter(|m| m.is_constructor) {
                for param in ctor.params() {
                    self.match_type(&param.ty, ctor, UsageKind::Constructor, source, &mut out);
                }
            }

            if let Some(info) = self.index.type_info(*symbol) {
                let file = self.index.file_path(info.file);
                for field in &info.fields {
                    for target in self.components_in(field.ty, &info.module, *symbol) {
                        let evidence = UsageEvidence {
                            source: source.clone(),
                            target,
                            kind: UsageKind::Field,
                            location: Location::new(file.to_path_buf(), source.as_str(), field.line),
                            via: None,
                            call_chain: Vec::new(),
                        };
                        out.push(evidence, None);
                    }
                }
            }

            for method in &methods {
                if !method.is_constructor {
                    for param in method.params() {
                        self.match_type(&param.ty, method, UsageKind::MethodParam, source, &mut out);
                    }
                    if let Some(ret) = method.return_type() {
                        self.match_type(ret, method, UsageKind::MethodReturn, source, &mut out);
                    }
                }
                self.trace_calls(method, &mut out);
            }

            debug!(component = %source, evidence = out.items.len() - before, "matched usages");
        }

        UsageReport {
            evidence: out.items,
        }
    }

    /// Component names a type refers to, excluding `owner` itself.
    fn components_in(&self, ty: &Type, module: &ModulePath, owner: SymbolId) -> Vec<String> {
        self.index
            .program()
            .symbols()
            .resolve_type_unwrapped(ty, module, Some(owner))
            .into_iter()
            .filter(|id| *id != owner)
            .filter_map(|id| self.identity.component_of(id).map(String::from))
            .collect()
    }

    fn match_type(
        &self,
        ty: &Type,
        method: &MethodNode<'_>,
        kind: UsageKind,
        source: &str,
        out: &mut EvidenceSet,
    ) {
        let file = self.index.file_path(method.file);
        for target in self.components_in(ty, &method.module, method.owner) {
            let evidence = UsageEvidence {
                source: source.to_string(),
                target,
                kind,
                location: Location::from_span(file.to_path_buf(), source, ty.span())
                    .with_method(&method.name),
                via: None,
                call_chain: Vec::new(),
            };
            out.push(evidence, None);
        }
    }

    /// Follows calls from `origin` through other components' methods.
    ///
    /// Evidence is attributed to the component owning the calling method and
    /// carries the chain from `origin` down to the call. A call to a method
    /// already on the active chain is neither reported nor entered. Each
    /// method is entered at most once per origin; chains never exceed
    /// [`MAX_CALL_DEPTH`].
    fn trace_calls(&self, origin: &MethodNode<'p>, out: &mut EvidenceSet) {
        let mut frames = vec![Frame {
            method: origin.id,
            parent: None,
            depth: 0,
        }];
        let mut visited: HashSet<MethodId> = HashSet::from([origin.id]);
        let mut queue: VecDeque<usize> = VecDeque::from([0]);

        while let Some(current) = queue.pop_front() {
            let Frame { method, depth, .. } = frames[current];
            let caller = self.index.method(method);
            let Some(caller_name) = self.identity.component_of(caller.owner) else {
                continue;
            };
            let sites = self.call_sites.get(&method).map(Vec::as_slice).unwrap_or_default();

            for site in sites {
                if site.target == caller.owner {
                    continue;
                }
                let Some(target) = self.identity.component_of(site.target) else {
                    continue;
                };
                let Some(callee) = self.index.method_named(site.target, &site.method) else {
                    continue;
                };
                if on_chain(&frames, current, callee.id) {
                    continue;
                }

                let mut call_chain = self.chain(&frames, current);
                call_chain.push(format!("{target}.{}", site.method));
                let evidence = UsageEvidence {
                    source: caller_name.to_string(),
                    target: target.to_string(),
                    kind: UsageKind::MethodCall,
                    location: Location {
                        file: self.index.file_path(caller.file).to_path_buf(),
                        declaration: caller_name.to_string(),
                        line: site.line,
                        column: site.column,
                        method: Some(caller.name.clone()),
                    },
                    via: Some(site.via),
                    call_chain,
                };
                out.push(evidence, Some(origin.id));

                if depth + 1 < MAX_CALL_DEPTH && visited.insert(callee.id) {
                    frames.push(Frame {
                        method: callee.id,
                        parent: Some(current),
                        depth: depth + 1,
                    });
                    queue.push_back(frames.len() - 1);
                }
            }
        }
    }

    fn chain(&self, frames: &[Frame], mut current: usize) -> Vec<String> {
        let mut hops = Vec::new();
        loop {
            let frame = frames[current];
            let method = self.index.method(frame.method);
            let owner = self.identity.component_of(method.owner).unwrap_or_default();
            hops.push(format!("{owner}.{}", method.name));
            match frame.parent {
                Some(parent) => current = parent,
                None => break,
            }
        }
        hops.reverse();
        hops
    }
}

/// Returns true if `method` is on the chain ending at frame `current`.
fn on_chain(frames: &[Frame], mut current: usize, method: MethodId) -> bool {
    loop {
        let frame = frames[current];
        if frame.method == method {
            return true;
        }
        match frame.parent {
            Some(parent) => current = parent,
            None => return false,
        }
    }
}
