//! Reads annotation blocks out of doc comments.
//!
//! Free text before the first tag line is the description. Each tag block
//! starts at a line beginning with `@name` and runs until the next tag line
//! or the end of the comment. Lines inside a `"""` value never start a tag.

use crate::utils::{doc_lines, DocLine};
use syn::Attribute;

/// Tag introducing a component declaration.
pub const COMPONENT_TAG: &str = "component";

/// Tag introducing a declared relation.
pub const RELATION_TAG: &str = "relation";

/// A single tag block inside a doc comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagBlock {
    /// Tag name without the `@`.
    pub name: String,
    /// Tag body: the rest of the tag line followed by the block's lines.
    pub body: String,
    /// Line of the tag line (1-indexed).
    pub line: usize,
}

/// A doc comment split into description and tag blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocBlock {
    /// Free text preceding the first tag, trimmed.
    pub description: String,
    /// Tag blocks in source order.
    pub tags: Vec<TagBlock>,
}

impl DocBlock {
    /// Reads the doc comment of an item.
    #[must_use]
    pub fn from_attrs(attrs: &[Attribute]) -> Self {
        Self::from_lines(&doc_lines(attrs))
    }

    /// Splits doc lines into description and tag blocks.
    #[must_use]
    pub fn from_lines(lines: &[DocLine]) -> Self {
        let mut description: Vec<&str> = Vec::new();
        let mut tags: Vec<TagBlock> = Vec::new();
        let mut in_block_quote = false;

        for line in lines {
            let trimmed = line.text.trim();
            if !in_block_quote {
                if let Some((name, rest)) = tag_line(trimmed) {
                    tags.push(TagBlock {
                        name: name.to_string(),
                        body: rest.to_string(),
                        line: line.line,
                    });
                    continue;
                }
            }
            if trimmed.matches("\"\"\"").count() % 2 == 1 {
                in_block_quote = !in_block_quote;
            }
            match tags.last_mut() {
                Some(tag) => {
                    tag.body.push('\n');
                    tag.body.push_str(&line.text);
                }
                None => description.push(trimmed),
            }
        }

        for tag in &mut tags {
            tag.body = tag.body.trim_end().to_string();
        }

        Self {
            description: description.join("\n").trim().to_string(),
            tags,
        }
    }

    /// Returns the tag blocks with the given name.
    pub fn tags_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a TagBlock> + 'a {
        self.tags.iter().filter(move |t| t.name == name)
    }

    /// Returns true if the comment carries no tag at all.
    #[must_use]
    pub fn is_untagged(&self) -> bool {
        self.tags.is_empty()
    }
}

/// Recognises `@name rest`, where `name` is an identifier.
fn tag_line(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix('@')?;
    let end = rest
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    let (name, tail) = rest.split_at(end);
    if !tail.is_empty() && !tail.starts_with(char::is_whitespace) {
        return None;
    }
    Some((name, tail.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(src: &str) -> DocBlock {
        let item: syn::ItemStruct = syn::parse_str(src).unwrap();
        DocBlock::from_attrs(&item.attrs)
    }

    #[test]
    fn description_precedes_tags() {
        let doc = block(
            "/// Places orders.\n///\n/// Second paragraph.\n/// @component\n/// - technology: Rust\nstruct A;",
        );
        assert_eq!(doc.description, "Places orders.\n\nSecond paragraph.");
        assert_eq!(doc.tags.len(), 1);
        assert_eq!(doc.tags[0].name, COMPONENT_TAG);
        assert_eq!(doc.tags[0].body, "\n- technology: Rust");
        assert_eq!(doc.tags[0].line, 4);
    }

    #[test]
    fn several_relation_tags() {
        let doc = block(
            "/// @relation Payments | Charges\n/// - tags: Direct\n/// @relation Audit | Logs\nstruct A;",
        );
        let bodies: Vec<&str> = doc.tags_named(RELATION_TAG).map(|t| t.body.as_str()).collect();
        assert_eq!(bodies, vec!["Payments | Charges\n- tags: Direct", "Audit | Logs"]);
    }

    #[test]
    fn tag_lines_inside_block_quotes_are_text() {
        let doc = block(
            "/// @component\n/// - description: \"\"\"\n///   @relation is not a tag here\n///   \"\"\"\nstruct A;",
        );
        assert_eq!(doc.tags.len(), 1);
        assert!(doc.tags[0].body.contains("@relation is not a tag here"));
    }

    #[test]
    fn email_like_text_is_not_a_tag() {
        assert!(tag_line("@ mention").is_none());
        assert!(tag_line("@foo.bar").is_none());
        assert_eq!(tag_line("@component Orders"), Some(("component", "Orders")));
    }

    #[test]
    fn plain_doc_comment_is_untagged() {
        let doc = block("/// Just docs.\nstruct A;");
        assert!(doc.is_untagged());
        assert_eq!(doc.description, "Just docs.");
    }
}
