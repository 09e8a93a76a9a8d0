//! Schema validation for configuration documents.
//!
//! Schemas are YAML documents whose nested mappings mirror the expected key
//! structure and whose leaves are validator expressions:
//!
//! | Expression      | Accepts                                  |
//! |-----------------|------------------------------------------|
//! | `str()`         | strings                                  |
//! | `num()`         | integers and floats                      |
//! | `int()`         | integers                                 |
//! | `bool()`        | booleans                                 |
//! | `null()`        | null                                     |
//! | `list(v, ...)`  | sequences whose items match any `v`      |
//! | `any(v, ...)`   | anything matching at least one `v`       |
//!
//! A trailing `required=False` argument makes a key optional. A nested
//! mapping is required iff at least one of its descendants is. Optional keys
//! may also be present with a null value.

use std::fmt;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use thiserror::Error;

use crate::error::{HarvestError, Violation};

/// Built-in schema for harvest configuration documents.
pub const BUILTIN_SCHEMA: &str = include_str!("../../data/schema.yaml");

/// Errors loading or parsing a schema. Document problems are reported as
/// [`Violation`]s instead.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema file could not be read.
    #[error("cannot read schema {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The schema is not valid YAML or not a mapping.
    #[error("invalid schema {origin}: {reason}")]
    Parse { origin: String, reason: String },

    /// A validator expression could not be parsed.
    #[error("invalid validator for '{key}': {reason} in `{expression}`\n  Suggestion: use str(), num(), int(), bool(), null(), list(...) or any(...)")]
    Expression {
        key: String,
        expression: String,
        reason: String,
    },
}

/// How unknown keys are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Strictness {
    /// Unknown keys are violations.
    Strict,
    /// Unknown keys are ignored.
    #[default]
    Lenient,
}

/// Every violation found in one document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Converts a failing report into [`HarvestError::SchemaValidation`].
    ///
    /// # Errors
    ///
    /// Returns the violations when there are any.
    pub fn into_result(self) -> Result<(), HarvestError> {
        if self.is_valid() {
            Ok(())
        } else {
            Err(HarvestError::SchemaValidation {
                violations: self.violations,
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Rule {
    Str,
    Num,
    Int,
    Bool,
    Null,
    List(Vec<Rule>),
    Any(Vec<Rule>),
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let join = |rules: &[Rule]| {
            rules
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        };
        match self {
            Self::Str => f.write_str("str()"),
            Self::Num => f.write_str("num()"),
            Self::Int => f.write_str("int()"),
            Self::Bool => f.write_str("bool()"),
            Self::Null => f.write_str("null()"),
            Self::List(items) => write!(f, "list({})", join(items)),
            Self::Any(options) => write!(f, "any({})", join(options)),
        }
    }
}

impl Rule {
    fn accepts_null(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Any(options) => options.is_empty() || options.iter().any(Rule::accepts_null),
            _ => false,
        }
    }

    /// Appends violations for `value` at `path`.
    fn check(&self, value: &Value, path: &str, out: &mut Vec<Violation>) {
        match self {
            Self::Str if value.is_string() => {}
            Self::Num if value.is_number() => {}
            Self::Int if value.is_i64() || value.is_u64() => {}
            Self::Bool if value.is_bool() => {}
            Self::Null if value.is_null() => {}
            Self::List(items) => {
                let Value::Sequence(elements) = value else {
                    out.push(mismatch(self, value, path));
                    return;
                };
                if items.is_empty() {
                    return;
                }
                for (i, element) in elements.iter().enumerate() {
                    if !items.iter().any(|rule| rule.matches(element)) {
                        let alternatives = Rule::Any(items.clone());
                        out.push(mismatch(&alternatives, element, &join_path(path, &i.to_string())));
                    }
                }
            }
            Self::Any(options) => {
                if !options.is_empty() && !options.iter().any(|rule| rule.matches(value)) {
                    out.push(mismatch(self, value, path));
                }
            }
            _ => out.push(mismatch(self, value, path)),
        }
    }

    fn matches(&self, value: &Value) -> bool {
        let mut scratch = Vec::new();
        self.check(value, "", &mut scratch);
        scratch.is_empty()
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "string",
        Value::Sequence(_) => "list",
        Value::Mapping(_) => "mapping",
        Value::Tagged(_) => "tagged value",
    }
}

fn mismatch(rule: &Rule, value: &Value, path: &str) -> Violation {
    Violation::new(path, format!("expected {rule}, got {}", type_name(value)))
}

fn join_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{parent}.{key}")
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Node {
    Leaf(Rule),
    Map(Vec<Field>),
}

#[derive(Debug, Clone, PartialEq)]
struct Field {
    key: String,
    node: Node,
    required: bool,
}

/// Validates documents against a parsed schema.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaValidator {
    fields: Vec<Field>,
    strictness: Strictness,
}

impl SchemaValidator {
    /// Validator for the built-in harvest schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the embedded schema is malformed.
    pub fn builtin(strictness: Strictness) -> Result<Self, SchemaError> {
        Self::from_yaml_str("<builtin schema>", BUILTIN_SCHEMA, strictness)
    }

    /// Loads a schema file.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the file cannot be read or parsed.
    pub fn from_path(path: &Path, strictness: Strictness) -> Result<Self, SchemaError> {
        let text = std::fs::read_to_string(path).map_err(|source| SchemaError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&path.display().to_string(), &text, strictness)
    }

    /// Parses schema text. `origin` names the schema in error messages.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] if the text is not a mapping of validators.
    pub fn from_yaml_str(origin: &str, text: &str, strictness: Strictness) -> Result<Self, SchemaError> {
        let value: Value = serde_yaml::from_str(text).map_err(|e| SchemaError::Parse {
            origin: origin.to_string(),
            reason: e.to_string(),
        })?;
        let Value::Mapping(mapping) = value else {
            return Err(SchemaError::Parse {
                origin: origin.to_string(),
                reason: "schema root must be a mapping".to_string(),
            });
        };
        Ok(Self {
            fields: parse_fields(&mapping, "")?,
            strictness,
        })
    }

    #[must_use]
    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    /// Validates a parsed document, collecting every violation.
    #[must_use]
    pub fn validate(&self, document: &Value) -> ValidationReport {
        let mut violations = Vec::new();
        self.check_map(&self.fields, document, "", &mut violations);
        ValidationReport { violations }
    }

    /// Reads and validates a document file.
    ///
    /// # Errors
    ///
    /// Returns [`HarvestError::ConfigRead`] if the file cannot be read or is
    /// not YAML. Schema violations are returned in the report, not as errors.
    pub fn validate_path(&self, path: &Path) -> Result<ValidationReport, HarvestError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| HarvestError::config_read(path.display().to_string(), e))?;
        let document: Value = serde_yaml::from_str(&text)
            .map_err(|e| HarvestError::config_read(path.display().to_string(), e))?;
        Ok(self.validate(&document))
    }

    fn check_map(&self, fields: &[Field], value: &Value, path: &str, out: &mut Vec<Violation>) {
        let Value::Mapping(mapping) = value else {
            out.push(Violation::new(
                path,
                format!("expected a mapping, got {}", type_name(value)),
            ));
            return;
        };

        for field in fields {
            let field_path = join_path(path, &field.key);
            match (mapping.get(field.key.as_str()), &field.node) {
                (None, _) => {
                    if field.required {
                        out.push(Violation::new(field_path, "required key is missing"));
                    }
                }
                (Some(Value::Null), Node::Leaf(rule)) if !field.required || rule.accepts_null() => {}
                (Some(Value::Null), Node::Map(_)) if !field.required => {}
                (Some(value), Node::Leaf(rule)) => rule.check(value, &field_path, out),
                (Some(value), Node::Map(children)) => self.check_map(children, value, &field_path, out),
            }
        }

        if self.strictness == Strictness::Strict {
            for key in mapping.keys() {
                let name = key.as_str().map_or_else(|| format!("{key:?}"), str::to_string);
                if !fields.iter().any(|field| field.key == name) {
                    out.push(Violation::new(join_path(path, &name), "unexpected key"));
                }
            }
        }
    }
}

fn parse_fields(mapping: &serde_yaml::Mapping, path: &str) -> Result<Vec<Field>, SchemaError> {
    let mut fields = Vec::with_capacity(mapping.len());
    for (key, value) in mapping {
        let Some(key) = key.as_str() else {
            return Err(SchemaError::Parse {
                origin: path.to_string(),
                reason: format!("schema keys must be strings, got {key:?}"),
            });
        };
        let key_path = join_path(path, key);
        let field = match value {
            Value::String(expression) => {
                let (rule, required) = parse_expression(&key_path, expression)?;
                Field {
                    key: key.to_string(),
                    node: Node::Leaf(rule),
                    required,
                }
            }
            Value::Mapping(children) => {
                let children = parse_fields(children, &key_path)?;
                let required = children.iter().any(|child| child.required);
                Field {
                    key: key.to_string(),
                    node: Node::Map(children),
                    required,
                }
            }
            other => {
                return Err(SchemaError::Expression {
                    key: key_path,
                    expression: format!("{other:?}"),
                    reason: "expected a validator string or a nested mapping".to_string(),
                });
            }
        };
        fields.push(field);
    }
    Ok(fields)
}

/// Parses one validator expression into a rule and its `required` flag.
fn parse_expression(key: &str, expression: &str) -> Result<(Rule, bool), SchemaError> {
    let mut parser = ExpressionParser {
        key,
        expression,
        chars: expression.char_indices().peekable(),
    };
    let (rule, required) = parser.call(true)?;
    parser.skip_whitespace();
    if let Some(&(pos, _)) = parser.chars.peek() {
        return Err(parser.error(format!("unexpected trailing input at {pos}")));
    }
    Ok((rule, required.unwrap_or(true)))
}

/// Validator names understood by the expression parser.
const VALIDATORS: &[&str] = &["str", "num", "int", "bool", "null", "list", "any"];

struct ExpressionParser<'a> {
    key: &'a str,
    expression: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl ExpressionParser<'_> {
    fn error(&self, reason: impl Into<String>) -> SchemaError {
        SchemaError::Expression {
            key: self.key.to_string(),
            expression: self.expression.to_string(),
            reason: reason.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        while self.chars.peek().is_some_and(|(_, c)| c.is_whitespace()) {
            self.chars.next();
        }
    }

    fn identifier(&mut self) -> String {
        self.skip_whitespace();
        let mut name = String::new();
        while let Some((_, c)) = self.chars.peek() {
            if c.is_alphanumeric() || *c == '_' {
                name.push(*c);
                self.chars.next();
            } else {
                break;
            }
        }
        name
    }

    fn expect(&mut self, wanted: char) -> Result<(), SchemaError> {
        self.skip_whitespace();
        match self.chars.next() {
            Some((_, c)) if c == wanted => Ok(()),
            Some((pos, c)) => Err(self.error(format!("expected '{wanted}' at {pos}, found '{c}'"))),
            None => Err(self.error(format!("expected '{wanted}', found end of input"))),
        }
    }

    /// Parses `name(args)`. Only the outermost call may carry `required=`.
    fn call(&mut self, top_level: bool) -> Result<(Rule, Option<bool>), SchemaError> {
        let name = self.identifier();
        if name.is_empty() {
            return Err(self.error("expected a validator name"));
        }
        if !VALIDATORS.contains(&name.as_str()) {
            return Err(self.error(format!(
                "unknown validator '{name}' (expected one of: {})",
                VALIDATORS.join(", ")
            )));
        }
        self.expect('(')?;

        let mut args = Vec::new();
        let mut required = None;
        loop {
            self.skip_whitespace();
            if self.chars.peek().is_some_and(|(_, c)| *c == ')') {
                self.chars.next();
                break;
            }
            let checkpoint = self.chars.clone();
            let word = self.identifier();
            self.skip_whitespace();
            if word == "required" && self.chars.peek().is_some_and(|(_, c)| *c == '=') {
                if !top_level {
                    return Err(self.error("required= is only allowed on the outermost validator"));
                }
                self.chars.next();
                let flag = self.identifier();
                required = Some(match flag.as_str() {
                    "True" | "true" => true,
                    "False" | "false" => false,
                    other => return Err(self.error(format!("required= expects True or False, got '{other}'"))),
                });
            } else {
                self.chars = checkpoint;
                args.push(self.call(false)?.0);
            }
            self.skip_whitespace();
            match self.chars.next() {
                Some((_, ',')) => {}
                Some((_, ')')) => break,
                Some((pos, c)) => return Err(self.error(format!("unexpected '{c}' at {pos}"))),
                None => return Err(self.error("unterminated argument list")),
            }
        }

        let scalar = |rule: Rule, args: &[Rule]| {
            if args.is_empty() {
                Ok(rule)
            } else {
                Err(self.error(format!("{name}() takes no validator arguments")))
            }
        };
        let rule = match name.as_str() {
            "str" => scalar(Rule::Str, &args)?,
            "num" => scalar(Rule::Num, &args)?,
            "int" => scalar(Rule::Int, &args)?,
            "bool" => scalar(Rule::Bool, &args)?,
            "null" => scalar(Rule::Null, &args)?,
            "list" => Rule::List(args),
            "any" => Rule::Any(args),
            other => return Err(self.error(format!("unknown validator '{other}'"))),
        };
        Ok((rule, required))
    }
}
