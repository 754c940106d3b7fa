//! Path utilities for AST analysis.

use std::path::{Component, Path};

/// Splits a file path relative to a scope root into its crate label and
/// module segments.
///
/// The crate label is the directory owning `src` (with `-` mapped to `_`),
/// or `default_label` when the file sits directly under the root's `src`.
/// `lib.rs`, `main.rs` and `mod.rs` collapse into their parent module.
///
/// ```ignore
/// let (label, module) = module_segments(Path::new("crates/shop-api/src/orders/mod.rs"), "app");
/// assert_eq!(label, "shop_api");
/// assert_eq!(module, vec!["orders"]);
/// ```
#[must_use]
pub fn module_segments(relative: &Path, default_label: &str) -> (String, Vec<String>) {
    let parts: Vec<String> = relative
        .with_extension("")
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str().map(String::from),
            _ => None,
        })
        .collect();

    let src_idx = parts.iter().rposition(|p| p == "src");
    let (label, mut module) = match src_idx {
        Some(0) | None => (
            default_label.to_string(),
            parts.iter().skip(usize::from(src_idx.is_some())).cloned().collect::<Vec<_>>(),
        ),
        Some(idx) => (parts[idx - 1].replace('-', "_"), parts[idx + 1..].to_vec()),
    };

    if module
        .last()
        .is_some_and(|last| last == "mod" || last == "lib" || last == "main")
    {
        module.pop();
    }

    (label, module)
}
