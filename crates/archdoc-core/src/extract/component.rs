//! `@component` tag handling.

use super::ExtractError;
use crate::annotation::{DocBlock, COMPONENT_TAG};
use crate::grammar::{ArgSpec, GrammarError, ParamType, TagSchema};
use crate::groups::GroupConfig;
use crate::model::{Component, Perspective};
use crate::types::Location;

/// Builds components from `@component` tags.
#[derive(Debug, Clone)]
pub struct ComponentExtractor {
    schema: TagSchema,
}

impl ComponentExtractor {
    /// Creates the extractor.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::MalformedSchema`] if the built-in schema is
    /// ill-formed.
    pub fn new() -> Result<Self, GrammarError> {
        let schema = TagSchema::new(
            vec![ArgSpec::optional("name")],
            vec![
                ("description", ParamType::Text),
                ("technology", ParamType::Text),
                ("tags", ParamType::List),
                ("group", ParamType::Text),
                ("url", ParamType::Text),
                ("properties", ParamType::Map),
                ("perspectives", ParamType::Map),
            ],
        )?;
        Ok(Self { schema })
    }

    /// Builds a component from a doc block, or `Ok(None)` when the block
    /// carries no `@component` tag.
    ///
    /// `ident` is the declaration's identifier and the default name;
    /// `declaration` is its qualified path.
    ///
    /// # Errors
    ///
    /// Returns an [`ExtractError`] for grammar, naming or group problems.
    pub fn extract(
        &self,
        doc: &DocBlock,
        ident: &str,
        declaration: String,
        location: Location,
        groups: &GroupConfig,
    ) -> Result<Option<Component>, ExtractError> {
        let Some(tag) = doc.tags_named(COMPONENT_TAG).next() else {
            return Ok(None);
        };
        let parsed = self
            .schema
            .parse(&tag.body)
            .map_err(|source| ExtractError::Grammar {
                tag: COMPONENT_TAG,
                source,
            })?;

        let name = parsed.arg(0).unwrap_or(ident).trim().to_string();
        validate_name(&name)?;

        let group = parsed.text("group").map(str::trim).map(String::from);
        if let Some(group) = &group {
            groups.validate(group)?;
        }

        let description = parsed
            .text("description")
            .map_or_else(|| doc.description.clone(), String::from);

        let mut component = Component {
            name,
            description,
            technology: parsed.text("technology").map(String::from),
            tags: Vec::new(),
            group,
            url: parsed.text("url").map(String::from),
            properties: parsed.map("properties").cloned().unwrap_or_default(),
            perspectives: parsed
                .map("perspectives")
                .map(|m| {
                    m.iter()
                        .map(|(k, v)| (k.clone(), Perspective::parse(v)))
                        .collect()
                })
                .unwrap_or_default(),
            location,
            declaration,
            relations: Vec::new(),
        };
        for tag in parsed.list("tags") {
            component.add_tag(tag.as_str());
        }
        Ok(Some(component))
    }
}

/// Checks a component name: non-empty, letters, digits, spaces, `-`, `_`.
///
/// # Errors
///
/// Returns [`ExtractError::EmptyName`] or [`ExtractError::InvalidName`].
pub fn validate_name(name: &str) -> Result<(), ExtractError> {
    if name.is_empty() {
        return Err(ExtractError::EmptyName);
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == ' ' || c == '-' || c == '_')
    {
        return Err(ExtractError::InvalidName {
            name: name.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groups::{GroupDef, GroupPolicy};
    use std::path::PathBuf;

    fn extract(src: &str, groups: &GroupConfig) -> Result<Option<Component>, ExtractError> {
        let item: syn::ItemStruct = syn::parse_str(src).unwrap();
        let doc = DocBlock::from_attrs(&item.attrs);
        let ident = item.ident.to_string();
        ComponentExtractor::new().unwrap().extract(
            &doc,
            &ident,
            format!("shop::{ident}"),
            Location::new(PathBuf::from("src/lib.rs"), &ident, 1),
            groups,
        )
    }

    #[test]
    fn full_component_block() {
        let c = extract(
            r#"
            /// Places and tracks customer orders.
            ///
            /// @component
            /// - technology: Rust
            /// - tags: Core, Orders, Core
            /// - group: Business/Payment Processing
            /// - url: https://wiki.example.com/orders
            /// - properties:
            ///   owner: team-orders
            /// - perspectives:
            ///   security: Handles PII | high
            pub struct OrderService;
            "#,
            &GroupConfig::default(),
        )
        .unwrap()
        .unwrap();

        assert_eq!(c.name, "OrderService");
        assert_eq!(c.description, "Places and tracks customer orders.");
        assert_eq!(c.technology.as_deref(), Some("Rust"));
        assert_eq!(c.tags, vec!["Core", "Orders"]);
        assert_eq!(c.group.as_deref(), Some("Business/Payment Processing"));
        assert_eq!(c.properties.get("owner").map(String::as_str), Some("team-orders"));
        let security = &c.perspectives["security"];
        assert_eq!(security.value.as_deref(), Some("high"));
        assert_eq!(c.declaration, "shop::OrderService");
    }

    #[test]
    fn explicit_name_and_description_override_defaults() {
        let c = extract(
            "/// Ignored text.\n/// @component Order Service\n/// - description: Orders\nstruct OrderService;",
            &GroupConfig::default(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(c.name, "Order Service");
        assert_eq!(c.description, "Orders");
    }

    #[test]
    fn untagged_declaration_is_not_a_component() {
        let c = extract("/// Plain docs.\nstruct Helper;", &GroupConfig::default()).unwrap();
        assert!(c.is_none());
    }

    #[test]
    fn illegal_name_is_rejected() {
        let err = extract("/// @component orders.v2\nstruct A;", &GroupConfig::default()).unwrap_err();
        assert!(matches!(err, ExtractError::InvalidName { .. }));
    }

    #[test]
    fn undeclared_group_under_allowlist() {
        let groups = GroupConfig::new(GroupPolicy::Allowlist, vec![GroupDef::new("Business", None)]);
        let err = extract("/// @component\n/// - group: Shipping\nstruct A;", &groups).unwrap_err();
        assert!(matches!(err, ExtractError::UndeclaredGroup { .. }));
    }

    #[test]
    fn grammar_error_names_the_tag() {
        let err = extract("/// @component\n/// - colour: red\nstruct A;", &GroupConfig::default()).unwrap_err();
        assert!(err.to_string().contains("@component"));
    }

    #[test]
    fn name_rules() {
        assert!(validate_name("Order Service-v2_x").is_ok());
        assert!(matches!(validate_name(""), Err(ExtractError::EmptyName)));
        assert!(matches!(validate_name("a/b"), Err(ExtractError::InvalidName { .. })));
    }
}
