use crate::{parse, Modifier, Operator, Segment, UriTemplateError, Value, VariableMap};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

/// Characters escaped even for `{+v}`/`{#v}` reserved-passthrough expansions:
/// the set the RFC calls "unsafe", never the gen-delims/sub-delims.
const UNSAFE_CHARS: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'|')
    .add(b'\\')
    .add(b'^')
    .add(b'%');

/// Strict set used by simple/label/path-style/query expansions: everything
/// `UNSAFE_CHARS` escapes, plus the RFC 3986 reserved (gen-delims/sub-delims)
/// characters.
const UNRESERVED: &AsciiSet = &UNSAFE_CHARS
    .add(b':')
    .add(b'/')
    .add(b'?')
    .add(b'#')
    .add(b'[')
    .add(b']')
    .add(b'@')
    .add(b'!')
    .add(b'$')
    .add(b'&')
    .add(b'\'')
    .add(b'(')
    .add(b')')
    .add(b'*')
    .add(b'+')
    .add(b',')
    .add(b';')
    .add(b'=');

/// Lenient set used by `{+v}`/`{#v}`: reserved characters pass through
/// unescaped.
const RESERVED_PASSTHROUGH: &AsciiSet = UNSAFE_CHARS;

/// Deterministic inverse of `match`: renders a template with concrete
/// variable bindings. Every variable named anywhere in the template must be
/// present in `variables`; an expression whose variables are entirely
/// omitted has no partial-binding concept at this layer, so omission is
/// always an error rather than a silent skip.
pub fn construct(template: &str, variables: &VariableMap) -> Result<String, UriTemplateError> {
    let parsed = parse::parse(template)?;
    let mut out = String::new();

    for segment in &parsed.segments {
        match segment {
            Segment::Literal(lit) => out.push_str(lit),
            Segment::Expr(expr) => {
                let mut first = true;
                for var in &expr.vars {
                    let value = variables
                        .get(&var.name)
                        .ok_or_else(|| UriTemplateError::MissingVariable(var.name.clone()))?;

                    if first {
                        if let Some(prefix) = expr.operator.first_prefix() {
                            out.push(prefix);
                        }
                    } else {
                        out.push(expr.operator.separator());
                    }
                    first = false;

                    if expr.operator.named() {
                        out.push_str(&var.name);
                        out.push('=');
                    }

                    let rendered = render_value(value, var.modifier, expr.operator)?;
                    out.push_str(&rendered);
                }
            }
        }
    }

    Ok(out)
}

fn render_value(value: &Value, modifier: Modifier, operator: Operator) -> Result<String, UriTemplateError> {
    let encode = |s: &str| -> String {
        if operator.allows_reserved() {
            utf8_percent_encode(s, RESERVED_PASSTHROUGH).to_string()
        } else {
            utf8_percent_encode(s, UNRESERVED).to_string()
        }
    };

    match (value, modifier) {
        (Value::Single(s), Modifier::Prefix(n)) => {
            let truncated: String = s.chars().take(n as usize).collect();
            Ok(encode(&truncated))
        }
        (Value::Single(s), _) => Ok(encode(s)),
        (Value::List(items), _) => {
            let sep = if modifier == Modifier::Explode {
                operator.separator()
            } else {
                ','
            };
            Ok(items
                .iter()
                .map(|s| encode(s))
                .collect::<Vec<_>>()
                .join(&sep.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> VariableMap {
        pairs.iter().map(|(k, v)| (k.to_string(), Value::from(*v))).collect()
    }

    #[test]
    fn renders_simple_variable() {
        let uri = construct("users://{user_id}/greeting", &vars(&[("user_id", "42")])).unwrap();
        assert_eq!(uri, "users://42/greeting");
    }

    #[test]
    fn missing_variable_is_an_error() {
        let err = construct("users://{user_id}/greeting", &VariableMap::new()).unwrap_err();
        assert_eq!(err, UriTemplateError::MissingVariable("user_id".to_string()));
    }

    #[test]
    fn query_expression_renders_name_equals_value() {
        let uri = construct("search{?q}", &vars(&[("q", "rust crates")])).unwrap();
        assert_eq!(uri, "search?q=rust%20crates");
    }

    #[test]
    fn path_segment_explode_joins_with_slash() {
        let mut map = VariableMap::new();
        map.insert(
            "path".to_string(),
            Value::List(vec!["a".to_string(), "b".to_string(), "c".to_string()]),
        );
        let uri = construct("files://{/path*}", &map).unwrap();
        assert_eq!(uri, "files:///a/b/c");
    }

    #[test]
    fn round_trips_with_match() {
        let template = "api://v1/users/{user_id}/posts/{post_id}";
        let uri = construct(template, &vars(&[("user_id", "123"), ("post_id", "456")])).unwrap();
        let bound = crate::r#match(&uri, template).unwrap().unwrap();
        assert_eq!(bound.get("user_id"), Some(&"123".to_string()));
        assert_eq!(bound.get("post_id"), Some(&"456".to_string()));
    }
}
