//! `@relation` tag handling.

use super::ExtractError;
use crate::annotation::{TagBlock, RELATION_TAG};
use crate::grammar::{ArgSpec, GrammarError, ParamType, TagSchema};
use crate::model::DeclaredRelation;
use crate::types::Location;

/// Builds declared relations from `@relation` tags.
#[derive(Debug, Clone)]
pub struct RelationExtractor {
    schema: TagSchema,
}

impl RelationExtractor {
    /// Creates the extractor.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::MalformedSchema`] if the built-in schema is
    /// ill-formed.
    pub fn new() -> Result<Self, GrammarError> {
        let schema = TagSchema::new(
            vec![
                ArgSpec::required("target"),
                ArgSpec::required("description"),
                ArgSpec::optional("technology"),
            ],
            vec![
                ("technology", ParamType::Text),
                ("tags", ParamType::List),
                ("url", ParamType::Text),
                ("properties", ParamType::Map),
            ],
        )?;
        Ok(Self { schema })
    }

    /// Builds one relation from a tag block.
    ///
    /// `source` is the name of the enclosing type; for method-level tags the
    /// method is recorded in `location.method` only.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractError::Grammar`] when `target` or `description` is
    /// missing or the block is otherwise malformed.
    pub fn extract(
        &self,
        tag: &TagBlock,
        source: &str,
        location: Location,
    ) -> Result<DeclaredRelation, ExtractError> {
        let parsed = self
            .schema
            .parse(&tag.body)
            .map_err(|source| ExtractError::Grammar {
                tag: RELATION_TAG,
                source,
            })?;

        let target = parsed.arg(0).unwrap_or_default().to_string();
        let description = parsed.arg(1).unwrap_or_default().to_string();
        let technology = parsed
            .text("technology")
            .or_else(|| parsed.arg(2))
            .map(String::from);

        let mut relation = DeclaredRelation {
            source: source.to_string(),
            target,
            description,
            technology,
            tags: Vec::new(),
            url: parsed.text("url").map(String::from),
            properties: parsed.map("properties").cloned().unwrap_or_default(),
            location,
        };
        for tag in parsed.list("tags") {
            relation.add_tag(tag.as_str());
        }
        Ok(relation)
    }
}
