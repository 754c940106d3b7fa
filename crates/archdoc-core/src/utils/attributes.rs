//! Attribute parsing utilities.

use syn::spanned::Spanned;
use syn::{Attribute, Meta};

/// One line of a doc comment with its source line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocLine {
    /// Text with the single leading space of `/// ` removed.
    pub text: String,
    /// Line number (1-indexed).
    pub line: usize,
}

/// Checks if attributes contain a `#[cfg(test)]` attribute.
#[must_use]
pub fn has_cfg_test(attrs: &[Attribute]) -> bool {
    for attr in attrs {
        if !attr.path().is_ident("cfg") {
            continue;
        }

        let attr_str = quote::quote!(#attr).to_string();
        if attr_str.contains("test") {
            return true;
        }
    }

    false
}

/// Collects the lines of every `#[doc = "..."]` attribute, which is what
/// `///` comments desugar to.
///
/// A block doc comment (`/** ... */`) yields one attribute containing
/// several lines; they all report the attribute's starting line plus
/// their offset.
#[must_use]
pub fn doc_lines(attrs: &[Attribute]) -> Vec<DocLine> {
    let mut lines = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        let Meta::NameValue(nv) = &attr.meta else {
            continue;
        };
        let syn::Expr::Lit(lit) = &nv.value else {
            continue;
        };
        let syn::Lit::Str(s) = &lit.lit else {
            continue;
        };

        let start = attr.span().start().line;
        for (offset, text) in s.value().lines().enumerate() {
            lines.push(DocLine {
                text: text.strip_prefix(' ').unwrap_or(text).to_string(),
                line: start + offset,
            });
        }
    }
    lines
}
