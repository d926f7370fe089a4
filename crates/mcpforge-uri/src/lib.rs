//! RFC 6570 URI templates, Levels 1-3, used to resolve resource requests to a
//! declared template and extract typed parameters (spec §4.B).

mod construct;
mod matcher;
mod parse;

pub use construct::construct;
pub use matcher::r#match;

use std::collections::HashMap;

/// RFC 6570 expression operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// `{v}` — Level 1.
    Simple,
    /// `{+v}` — Level 2, reserved-character passthrough.
    Reserved,
    /// `{#v}` — Level 2, fragment.
    Fragment,
    /// `{.v}` — Level 3, label with dot-prefix.
    Label,
    /// `{/v}` — Level 3, path-segment.
    PathSegment,
    /// `{;v}` — Level 3, path-style parameter.
    PathStyle,
    /// `{?v}` — Level 3, form-style query, first variable.
    Query,
    /// `{&v}` — Level 3, form-style query continuation.
    QueryContinuation,
}

impl Operator {
    pub(crate) fn from_prefix(c: char) -> Option<Self> {
        match c {
            '+' => Some(Self::Reserved),
            '#' => Some(Self::Fragment),
            '.' => Some(Self::Label),
            '/' => Some(Self::PathSegment),
            ';' => Some(Self::PathStyle),
            '?' => Some(Self::Query),
            '&' => Some(Self::QueryContinuation),
            _ => None,
        }
    }

    /// The character written before the first rendered variable.
    pub(crate) fn first_prefix(self) -> Option<char> {
        match self {
            Self::Simple | Self::Reserved => None,
            Self::Fragment => Some('#'),
            Self::Label => Some('.'),
            Self::PathSegment => Some('/'),
            Self::PathStyle => Some(';'),
            Self::Query => Some('?'),
            Self::QueryContinuation => Some('&'),
        }
    }

    /// The separator placed between multiple variables in one expression.
    pub(crate) fn separator(self) -> char {
        match self {
            Self::Simple | Self::Reserved | Self::Fragment => ',',
            Self::Label => '.',
            Self::PathSegment => '/',
            Self::PathStyle => ';',
            Self::Query | Self::QueryContinuation => '&',
        }
    }

    /// Whether this operator's expansion uses `name=value` pairs rather than
    /// bare values (path-style and query forms do).
    pub(crate) fn named(self) -> bool {
        matches!(self, Self::PathStyle | Self::Query | Self::QueryContinuation)
    }

    /// Whether reserved characters (`:/?#[]@!$&'()*+,;=`) pass through
    /// unescaped rather than being percent-encoded.
    pub(crate) fn allows_reserved(self) -> bool {
        matches!(self, Self::Reserved | Self::Fragment)
    }

    /// The minimum RFC 6570 level this operator requires.
    pub(crate) fn level(self) -> u8 {
        match self {
            Self::Simple => 1,
            Self::Reserved | Self::Fragment => 2,
            Self::Label | Self::PathSegment | Self::PathStyle | Self::Query | Self::QueryContinuation => 3,
        }
    }
}

/// A variable modifier: none, explode (`*`), or prefix length (`:N`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    None,
    Explode,
    Prefix(u16),
}

/// One variable reference inside an expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarSpec {
    pub name: String,
    pub modifier: Modifier,
}

/// One `{...}` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub operator: Operator,
    pub vars: Vec<VarSpec>,
}

/// One piece of a parsed template: literal text or a variable expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Literal(String),
    Expr(Expression),
}

/// A parsed URI template.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub raw: String,
    pub segments: Vec<Segment>,
}

impl Template {
    /// All variable names referenced anywhere in the template, in
    /// declaration order, deduplicated.
    pub fn variable_names(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for segment in &self.segments {
            if let Segment::Expr(expr) = segment {
                for v in &expr.vars {
                    if !seen.contains(&v.name.as_str()) {
                        seen.push(v.name.as_str());
                    }
                }
            }
        }
        seen
    }
}

/// A value bound to a template variable, for `construct`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Single(String),
    List(Vec<String>),
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Single(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Single(s)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Self::List(v)
    }
}

pub type VariableMap = HashMap<String, Value>;
/// A `match` result: variable name to its extracted, possibly multi-valued, binding.
pub type MatchMap = HashMap<String, String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UriTemplateError {
    EmptyTemplate,
    UnbalancedBraces,
    NestedExpression,
    InvalidVariableName(String),
    ReservedOperator(char),
    DisallowedLiteralCharacter(char),
    InvalidPrefixLength(String),
    MissingVariable(String),
    DisallowedValueCharacter { variable: String, character: char },
}

impl std::fmt::Display for UriTemplateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTemplate => write!(f, "URI template cannot be empty"),
            Self::UnbalancedBraces => write!(f, "unbalanced braces in URI template"),
            Self::NestedExpression => write!(f, "nested expression in URI template"),
            Self::InvalidVariableName(name) => write!(f, "invalid variable name: '{name}'"),
            Self::ReservedOperator(c) => write!(f, "reserved operator character: '{c}'"),
            Self::DisallowedLiteralCharacter(c) => write!(f, "disallowed literal character: '{c}'"),
            Self::InvalidPrefixLength(s) => write!(f, "invalid prefix length: '{s}'"),
            Self::MissingVariable(name) => write!(f, "missing required variable: '{name}'"),
            Self::DisallowedValueCharacter { variable, character } => write!(
                f,
                "value for variable '{variable}' contains disallowed character '{character}'"
            ),
        }
    }
}

impl std::error::Error for UriTemplateError {}

/// Parse and validate a template, returning the highest RFC 6570 level used.
pub fn validate(template: &str) -> Result<u8, UriTemplateError> {
    let parsed = parse::parse(template)?;
    let mut level = 1u8;
    for segment in &parsed.segments {
        if let Segment::Expr(expr) = segment {
            level = level.max(expr.operator.level());
            for v in &expr.vars {
                if matches!(v.modifier, Modifier::Explode | Modifier::Prefix(_)) {
                    level = level.max(3);
                }
            }
        }
    }
    Ok(level)
}

/// Parse a template string into its segment sequence.
pub fn parse_template(template: &str) -> Result<Template, UriTemplateError> {
    parse::parse(template)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_level_is_one() {
        assert_eq!(validate("users://{user_id}/greeting").unwrap(), 1);
    }

    #[test]
    fn reserved_operator_is_level_two() {
        assert_eq!(validate("{+path}/here").unwrap(), 2);
    }

    #[test]
    fn query_operator_is_level_three() {
        assert_eq!(validate("search{?q,limit}").unwrap(), 3);
    }

    #[test]
    fn empty_template_is_rejected() {
        assert_eq!(validate(""), Err(UriTemplateError::EmptyTemplate));
    }

    #[test]
    fn unbalanced_braces_rejected() {
        assert!(matches!(
            validate("users://{user_id/greeting"),
            Err(UriTemplateError::UnbalancedBraces)
        ));
    }

    #[test]
    fn variable_names_collected_in_order() {
        let t = parse_template("api://v1/users/{user_id}/posts/{post_id}").unwrap();
        assert_eq!(t.variable_names(), vec!["user_id", "post_id"]);
    }
}
