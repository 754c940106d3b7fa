//! Structured tag grammar for annotation blocks.
//!
//! A tag body is an argument line followed by dash-prefixed parameters:
//!
//! ```text
//! PaymentService | Charges the customer | HTTPS
//! - tags: Core, Billing
//! - properties:
//!   owner: team-billing
//!   tier: 1
//! - description: """
//!   Spans
//!   several lines
//!   """
//! ```
//!
//! The grammar knows nothing about components or relations; callers pass a
//! [`TagSchema`] describing the expected arguments and parameters.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Delimiter opening and closing a multi-line value.
const BLOCK_QUOTE: &str = "\"\"\"";

/// Delimiter between positional arguments.
const ARG_SEPARATOR: char = '|';

/// Declared type of a named parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    /// Passed through as a string.
    Text,
    /// Comma-separated list, trimmed.
    List,
    /// Nested `key: value` block.
    Map,
}

impl std::fmt::Display for ParamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::List => write!(f, "list"),
            Self::Map => write!(f, "map"),
        }
    }
}

/// A positional argument slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArgSpec {
    /// Argument name, used in error messages.
    pub name: &'static str,
    /// Whether the argument may be omitted.
    pub optional: bool,
}

impl ArgSpec {
    /// A required argument.
    #[must_use]
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            optional: false,
        }
    }

    /// An optional argument.
    #[must_use]
    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            optional: true,
        }
    }
}

/// Errors raised while checking a schema or parsing a tag against it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, miette::Diagnostic)]
pub enum GrammarError {
    /// An optional argument precedes a required one.
    #[error("malformed schema: optional argument `{optional}` precedes required argument `{required}`")]
    #[diagnostic(code(archdoc::grammar::schema))]
    MalformedSchema {
        /// The optional argument.
        optional: &'static str,
        /// The required argument that follows it.
        required: &'static str,
    },

    /// A required argument is absent or empty.
    #[error("missing required argument `{name}`")]
    #[diagnostic(code(archdoc::grammar::missing_argument))]
    MissingArgument {
        /// Name of the argument.
        name: &'static str,
    },

    /// More arguments than the schema declares.
    #[error("too many arguments: expected at most {expected}, found {found}")]
    #[diagnostic(code(archdoc::grammar::too_many_arguments))]
    TooManyArguments {
        /// Number of declared argument slots.
        expected: usize,
        /// Number of arguments supplied.
        found: usize,
    },

    /// A parameter name the schema does not declare.
    #[error("unknown parameter `{name}` (expected one of: {known})")]
    #[diagnostic(code(archdoc::grammar::unknown_parameter))]
    UnknownParameter {
        /// The unknown name.
        name: String,
        /// Comma-separated list of declared names.
        known: String,
    },

    /// A parameter value does not fit its declared type.
    #[error("parameter `{name}` expects a {expected} value")]
    #[diagnostic(code(archdoc::grammar::type_mismatch))]
    TypeMismatch {
        /// Parameter name.
        name: String,
        /// Declared type.
        expected: ParamType,
    },

    /// A line that is neither an argument, a parameter nor a nested entry.
    #[error("malformed line `{line}`: expected `key: value`")]
    #[diagnostic(code(archdoc::grammar::malformed_line))]
    MalformedLine {
        /// The offending line.
        line: String,
    },

    /// A `"""` block that is never closed.
    #[error("unterminated multi-line value for parameter `{name}`")]
    #[diagnostic(code(archdoc::grammar::unterminated_block))]
    UnterminatedBlock {
        /// Parameter name.
        name: String,
    },
}

/// Expected shape of a tag: ordered arguments plus named parameters.
#[derive(Debug, Clone)]
pub struct TagSchema {
    args: Vec<ArgSpec>,
    params: Vec<(&'static str, ParamType)>,
}

impl TagSchema {
    /// Creates a schema, checking that no optional argument precedes a
    /// required one.
    ///
    /// # Errors
    ///
    /// Returns [`GrammarError::MalformedSchema`] for illegal argument orders.
    pub fn new(
        args: Vec<ArgSpec>,
        params: Vec<(&'static str, ParamType)>,
    ) -> Result<Self, GrammarError> {
        let mut first_optional: Option<&'static str> = None;
        for arg in &args {
            match (arg.optional, first_optional) {
                (true, None) => first_optional = Some(arg.name),
                (false, Some(optional)) => {
                    return Err(GrammarError::MalformedSchema {
                        optional,
                        required: arg.name,
                    });
                }
                _ => {}
            }
        }
        Ok(Self { args, params })
    }

    /// Returns the declared type of a parameter.
    #[must_use]
    pub fn param_type(&self, name: &str) -> Option<ParamType> {
        self.params
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, ty)| *ty)
    }

    /// Parses a tag body against this schema.
    ///
    /// # Errors
    ///
    /// Returns a [`GrammarError`] when arguments are missing or excessive,
    /// a parameter is unknown or mistyped, or a line is malformed.
    pub fn parse(&self, text: &str) -> Result<ParsedTag, GrammarError> {
        let lines: Vec<&str> = text.lines().collect();
        let mut i = 0;

        let mut arg_parts = Vec::new();
        while i < lines.len() && !is_param_line(lines[i]) {
            let line = lines[i].trim();
            if !line.is_empty() {
                arg_parts.push(line);
            }
            i += 1;
        }
        let args = self.split_args(&arg_parts.join(" "));
        self.check_arity(&args)?;

        let mut params = BTreeMap::new();
        while i < lines.len() {
            let line = lines[i].trim();
            i += 1;
            if line.is_empty() {
                continue;
            }
            let Some(entry) = line.strip_prefix('-') else {
                return Err(GrammarError::MalformedLine {
                    line: line.to_string(),
                });
            };
            let (key, value) = split_key_value(entry.trim()).ok_or_else(|| {
                GrammarError::MalformedLine {
                    line: line.to_string(),
                }
            })?;
            let ty = self
                .param_type(key)
                .ok_or_else(|| GrammarError::UnknownParameter {
                    name: key.to_string(),
                    known: self.known_params(),
                })?;

            let raw = if value.is_empty() {
                RawValue::Nested(read_nested(&lines, &mut i)?)
            } else if let Some(opening) = value.strip_prefix(BLOCK_QUOTE) {
                RawValue::Scalar(read_block(opening, &lines, &mut i, key)?)
            } else {
                RawValue::Scalar(value.to_string())
            };

            params.insert(key.to_string(), coerce(key, ty, raw)?);
        }

        Ok(ParsedTag { args, params })
    }

    fn split_args(&self, line: &str) -> Vec<String> {
        if line.is_empty() {
            return Vec::new();
        }
        if self.args.len() == 1 {
            return vec![line.to_string()];
        }
        let mut parts: Vec<String> = line
            .split(ARG_SEPARATOR)
            .map(|p| p.trim().to_string())
            .collect();
        while parts.last().is_some_and(String::is_empty) {
            parts.pop();
        }
        parts
    }

    fn check_arity(&self, args: &[String]) -> Result<(), GrammarError> {
        if args.len() > self.args.len() {
            return Err(GrammarError::TooManyArguments {
                expected: self.args.len(),
                found: args.len(),
            });
        }
        for (idx, slot) in self.args.iter().enumerate() {
            let present = args.get(idx).is_some_and(|a| !a.is_empty());
            if !slot.optional && !present {
                return Err(GrammarError::MissingArgument { name: slot.name });
            }
        }
        Ok(())
    }

    fn known_params(&self) -> String {
        self.params
            .iter()
            .map(|(n, _)| *n)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn is_param_line(line: &str) -> bool {
    line.trim_start().starts_with('-')
}

fn split_key_value(entry: &str) -> Option<(&str, &str)> {
    let (key, value) = entry.split_once(':')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim()))
}

enum RawValue {
    Scalar(String),
    Nested(BTreeMap<String, String>),
}

/// Reads `key: value` lines until the next dash-prefixed parameter.
fn read_nested(lines: &[&str], i: &mut usize) -> Result<BTreeMap<String, String>, GrammarError> {
    let mut map = BTreeMap::new();
    while *i < lines.len() && !is_param_line(lines[*i]) {
        let line = lines[*i].trim();
        *i += 1;
        if line.is_empty() {
            continue;
        }
        let (key, value) = split_key_value(line).ok_or_else(|| GrammarError::MalformedLine {
            line: line.to_string(),
        })?;
        map.insert(key.to_string(), value.to_string());
    }
    Ok(map)
}

/// Reads a `"""` block. `opening` is whatever followed the opening quotes.
fn read_block(
    opening: &str,
    lines: &[&str],
    i: &mut usize,
    key: &str,
) -> Result<String, GrammarError> {
    if let Some(inline) = opening.strip_suffix(BLOCK_QUOTE) {
        return Ok(inline.trim().to_string());
    }

    let mut collected: Vec<&str> = Vec::new();
    if !opening.trim().is_empty() {
        collected.push(opening.trim());
    }
    while *i < lines.len() {
        let line = lines[*i];
        *i += 1;
        if let Some(last) = line.trim_end().strip_suffix(BLOCK_QUOTE) {
            if !last.trim().is_empty() {
                collected.push(last);
            }
            return Ok(dedent(&collected));
        }
        collected.push(line);
    }
    Err(GrammarError::UnterminatedBlock {
        name: key.to_string(),
    })
}

fn dedent(lines: &[&str]) -> String {
    let indent = lines
        .iter()
        .filter(|l| !l.trim().is_empty())
        .map(|l| l.len() - l.trim_start().len())
        .min()
        .unwrap_or(0);
    lines
        .iter()
        .map(|l| l.get(indent..).unwrap_or_else(|| l.trim_start()).trim_end())
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}

fn coerce(key: &str, ty: ParamType, raw: RawValue) -> Result<ParamValue, GrammarError> {
    match (ty, raw) {
        (ParamType::Map, RawValue::Nested(map)) => Ok(ParamValue::Map(map)),
        (ParamType::Text, RawValue::Scalar(s)) => Ok(ParamValue::Text(s)),
        (ParamType::List, RawValue::Scalar(s)) => Ok(ParamValue::List(split_list(&s))),
        (expected, _) => Err(GrammarError::TypeMismatch {
            name: key.to_string(),
            expected,
        }),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split([',', '\n'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// A parsed parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Plain string.
    Text(String),
    /// Comma-separated list.
    List(Vec<String>),
    /// Nested key/value block.
    Map(BTreeMap<String, String>),
}

/// Result of parsing a tag body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedTag {
    /// Positional arguments in order.
    pub args: Vec<String>,
    /// Named parameters.
    pub params: BTreeMap<String, ParamValue>,
}

impl ParsedTag {
    /// Returns the positional argument at `idx`, if present and non-empty.
    #[must_use]
    pub fn arg(&self, idx: usize) -> Option<&str> {
        self.args
            .get(idx)
            .map(String::as_str)
            .filter(|a| !a.is_empty())
    }

    /// Returns a text parameter.
    #[must_use]
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.params.get(key) {
            Some(ParamValue::Text(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns a list parameter, or an empty slice.
    #[must_use]
    pub fn list(&self, key: &str) -> &[String] {
        match self.params.get(key) {
            Some(ParamValue::List(items)) => items,
            _ => &[],
        }
    }

    /// Returns a map parameter.
    #[must_use]
    pub fn map(&self, key: &str) -> Option<&BTreeMap<String, String>> {
        match self.params.get(key) {
            Some(ParamValue::Map(map)) => Some(map),
            _ => None,
        }
    }

    /// Renders the tag back into its textual body.
    ///
    /// Parsing the output with the same schema yields an equal value.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = self.args.join(" | ");
        for (key, value) in &self.params {
            out.push('\n');
            match value {
                ParamValue::Text(s) if s.contains('\n') => {
                    let _ = write!(out, "- {key}: {BLOCK_QUOTE}");
                    for line in s.lines() {
                        let _ = write!(out, "\n  {line}");
                    }
                    let _ = write!(out, "\n  {BLOCK_QUOTE}");
                }
                ParamValue::Text(s) if s.is_empty() => {
                    let _ = write!(out, "- {key}: {BLOCK_QUOTE}{BLOCK_QUOTE}");
                }
                ParamValue::Text(s) => {
                    let _ = write!(out, "- {key}: {s}");
                }
                ParamValue::List(items) if items.is_empty() => {
                    let _ = write!(out, "- {key}: {BLOCK_QUOTE}{BLOCK_QUOTE}");
                }
                ParamValue::List(items) => {
                    let _ = write!(out, "- {key}: {}", items.join(", "));
                }
                ParamValue::Map(map) => {
                    let _ = write!(out, "- {key}:");
                    for (k, v) in map {
                        let _ = write!(out, "\n  {k}: {v}");
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relation_schema() -> TagSchema {
        TagSchema::new(
            vec![
                ArgSpec::required("target"),
                ArgSpec::required("description"),
                ArgSpec::optional("technology"),
            ],
            vec![
                ("technology", ParamType::Text),
                ("tags", ParamType::List),
                ("properties", ParamType::Map),
                ("notes", ParamType::Text),
            ],
        )
        .unwrap()
    }

    fn single_arg_schema() -> TagSchema {
        TagSchema::new(
            vec![ArgSpec::optional("name")],
            vec![("description", ParamType::Text)],
        )
        .unwrap()
    }

    #[test]
    fn schema_rejects_optional_before_required() {
        let err = TagSchema::new(
            vec![ArgSpec::optional("a"), ArgSpec::required("b")],
            vec![],
        )
        .unwrap_err();
        assert_eq!(
            err,
            GrammarError::MalformedSchema {
                optional: "a",
                required: "b"
            }
        );
    }

    #[test]
    fn parses_pipe_separated_arguments() {
        let tag = relation_schema()
            .parse("PaymentService | Charges the customer | HTTPS")
            .unwrap();
        assert_eq!(tag.args, vec!["PaymentService", "Charges the customer", "HTTPS"]);
        assert!(tag.params.is_empty());
    }

    #[test]
    fn single_argument_schema_takes_whole_line() {
        let tag = single_arg_schema().parse("Order | Service").unwrap();
        assert_eq!(tag.args, vec!["Order | Service"]);
    }

    #[test]
    fn missing_required_argument_fails() {
        let err = relation_schema().parse("PaymentService").unwrap_err();
        assert_eq!(err, GrammarError::MissingArgument { name: "description" });
    }

    #[test]
    fn too_many_arguments_fail() {
        let err = relation_schema().parse("a | b | c | d").unwrap_err();
        assert_eq!(
            err,
            GrammarError::TooManyArguments {
                expected: 3,
                found: 4
            }
        );
    }

    #[test]
    fn unknown_parameter_fails() {
        let err = relation_schema()
            .parse("a | b\n- colour: red")
            .unwrap_err();
        assert!(matches!(err, GrammarError::UnknownParameter { ref name, .. } if name == "colour"));
    }

    #[test]
    fn list_values_are_split_and_trimmed() {
        let tag = relation_schema()
            .parse("a | b\n- tags: Core ,  Billing,,Async ")
            .unwrap();
        assert_eq!(tag.list("tags"), ["Core", "Billing", "Async"]);
    }

    #[test]
    fn nested_block_becomes_map() {
        let tag = relation_schema()
            .parse("a | b\n- properties:\n  owner: team-a\n  tier: 1\n- technology: gRPC")
            .unwrap();
        let props = tag.map("properties").unwrap();
        assert_eq!(props.get("owner").map(String::as_str), Some("team-a"));
        assert_eq!(props.get("tier").map(String::as_str), Some("1"));
        assert_eq!(tag.text("technology"), Some("gRPC"));
    }

    #[test]
    fn multi_line_block_is_dedented() {
        let tag = relation_schema()
            .parse("a | b\n- notes: \"\"\"\n    first line\n      indented\n    \"\"\"\n- tags: X")
            .unwrap();
        assert_eq!(tag.text("notes"), Some("first line\n  indented"));
        assert_eq!(tag.list("tags"), ["X"]);
    }

    #[test]
    fn inline_block_quotes_are_stripped() {
        let tag = relation_schema()
            .parse("a | b\n- notes: \"\"\"short\"\"\"")
            .unwrap();
        assert_eq!(tag.text("notes"), Some("short"));
    }

    #[test]
    fn unterminated_block_fails() {
        let err = relation_schema()
            .parse("a | b\n- notes: \"\"\"\n  never closed")
            .unwrap_err();
        assert!(matches!(err, GrammarError::UnterminatedBlock { .. }));
    }

    #[test]
    fn nested_block_for_text_parameter_is_a_type_mismatch() {
        let err = relation_schema()
            .parse("a | b\n- technology:\n  lang: rust")
            .unwrap_err();
        assert!(matches!(
            err,
            GrammarError::TypeMismatch {
                expected: ParamType::Text,
                ..
            }
        ));
    }

    #[test]
    fn render_then_parse_is_idempotent() {
        let schema = relation_schema();
        let original = schema
            .parse(
                "PaymentService | Charges | HTTPS\n- tags: A, B\n- properties:\n  k: v\n- notes: \"\"\"\n  one\n  two\n  \"\"\"",
            )
            .unwrap();
        let reparsed = schema.parse(&original.render()).unwrap();
        assert_eq!(reparsed, original);

        let empty = schema
            .parse("PaymentService | Charges\n- notes: \"\"\"\"\"\"\n- tags: ,")
            .unwrap();
        assert_eq!(empty.text("notes"), Some(""));
        assert!(empty.list("tags").is_empty());
        let reparsed = schema.parse(&empty.render()).unwrap();
        assert_eq!(reparsed, empty);
    }

    #[test]
    fn argument_line_may_wrap() {
        let tag = relation_schema()
            .parse("PaymentService |\n  Charges the customer")
            .unwrap();
        assert_eq!(tag.arg(1), Some("Charges the customer"));
    }
}
