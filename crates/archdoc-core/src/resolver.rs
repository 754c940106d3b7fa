//! Component resolvers.
//!
//! [`IdentityResolver`] maps symbol ids to components inside one scope; two
//! references denote the same component only if their ids are equal.
//!
//! [`NameResolver`] works across scopes, where no shared symbol table
//! exists. It compares name strings only, so it cannot tell apart two
//! components that share a name in different modules of the target scope.
//! Call sites pick one of the two explicitly.

use crate::symbols::SymbolId;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Identity-based lookup between symbols and component names.
#[derive(Debug, Default, Clone)]
pub struct IdentityResolver {
    by_symbol: HashMap<SymbolId, String>,
}

impl IdentityResolver {
    /// Builds the reverse index `SymbolId -> component`.
    pub fn new<'a>(components: impl IntoIterator<Item = (SymbolId, &'a str)>) -> Self {
        let mut resolver = Self::default();
        for (id, name) in components {
            resolver.by_symbol.insert(id, name.to_string());
        }
        resolver
    }

    /// Returns the component backed by `id`.
    #[must_use]
    pub fn component_of(&self, id: SymbolId) -> Option<&str> {
        self.by_symbol.get(&id).map(String::as_str)
    }
}

/// Outcome of a name-based lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameMatch<'a> {
    /// A whole scope.
    Container(&'a str),
    /// A component of a scope.
    Component {
        /// Scope name.
        container: &'a str,
        /// Component name.
        component: &'a str,
    },
    /// An external element configured on a scope.
    External {
        /// Scope name.
        container: &'a str,
        /// External element name.
        name: &'a str,
    },
    /// Nothing matches.
    Unknown,
}

#[derive(Debug, Default, Clone)]
struct ScopeNames {
    components: BTreeSet<String>,
    externals: BTreeSet<String>,
}

/// Name-based lookup across scopes.
#[derive(Debug, Default, Clone)]
pub struct NameResolver {
    scopes: BTreeMap<String, ScopeNames>,
}

impl NameResolver {
    /// Creates an empty resolver.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the names of one scope.
    pub fn add_scope<'a>(
        &mut self,
        container: &str,
        components: impl IntoIterator<Item = &'a str>,
        externals: impl IntoIterator<Item = &'a str>,
    ) {
        let entry = self.scopes.entry(container.to_string()).or_default();
        entry.components.extend(components.into_iter().map(String::from));
        entry.externals.extend(externals.into_iter().map(String::from));
    }

    /// Resolves `container` or `container.name`.
    #[must_use]
    pub fn resolve<'a>(&'a self, target: &str) -> NameMatch<'a> {
        let (container, rest) = match target.split_once('.') {
            Some((c, r)) => (c, Some(r)),
            None => (target, None),
        };
        let Some((container, names)) = self.scopes.get_key_value(container) else {
            return NameMatch::Unknown;
        };
        let Some(rest) = rest else {
            return NameMatch::Container(container);
        };
        if let Some(component) = names.components.get(rest) {
            return NameMatch::Component {
                container,
                component,
            };
        }
        if let Some(name) = names.externals.get(rest) {
            return NameMatch::External { container, name };
        }
        NameMatch::Unknown
    }

    /// Returns true if `target` names anything known.
    #[must_use]
    pub fn exists(&self, target: &str) -> bool {
        !matches!(self.resolve(target), NameMatch::Unknown)
    }
}
