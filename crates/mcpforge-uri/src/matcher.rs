use crate::{parse, Expression, MatchMap, Modifier, Operator, Segment, UriTemplateError};

/// Match a concrete URI against a template, extracting variable bindings.
///
/// Per spec §4.B: the fragment expression (if any) is matched first, then
/// query/query-continuation expressions, then the path is matched
/// left-to-right. Returns `None` (not an error) on any mismatch.
pub fn r#match(uri: &str, template: &str) -> Result<Option<MatchMap>, UriTemplateError> {
    let parsed = parse::parse(template)?;

    let (path_and_query, fragment) = match uri.split_once('#') {
        Some((rest, frag)) => (rest, Some(frag)),
        None => (uri, None),
    };
    let (path, query) = match path_and_query.split_once('?') {
        Some((p, q)) => (p, Some(q)),
        None => (path_and_query, None),
    };

    let mut bindings = MatchMap::new();

    let fragment_expr = find_expr(&parsed.segments, Operator::Fragment);
    match (fragment_expr, fragment) {
        (Some(expr), Some(frag_value)) => {
            if !bind_joined(expr, frag_value, false, &mut bindings) {
                return Ok(None);
            }
        }
        (Some(_), None) => return Ok(None),
        (None, _) => {}
    }

    let query_exprs: Vec<&Expression> = parsed
        .segments
        .iter()
        .filter_map(|s| match s {
            Segment::Expr(e) if matches!(e.operator, Operator::Query | Operator::QueryContinuation) => Some(e),
            _ => None,
        })
        .collect();
    if !query_exprs.is_empty() {
        let pairs = query.map(parse_query_pairs).unwrap_or_default();
        for expr in &query_exprs {
            for var in &expr.vars {
                match pairs.iter().find(|(k, _)| k == &var.name) {
                    Some((_, v)) => {
                        bindings.insert(var.name.clone(), percent_decode(v));
                    }
                    None => return Ok(None),
                }
            }
        }
    }

    let path_segments: Vec<&Segment> = parsed
        .segments
        .iter()
        .filter(|s| match s {
            Segment::Expr(e) => !matches!(
                e.operator,
                Operator::Query | Operator::QueryContinuation | Operator::Fragment
            ),
            Segment::Literal(_) => true,
        })
        .collect();

    let mut cursor = 0usize;
    for (i, segment) in path_segments.iter().enumerate() {
        match segment {
            Segment::Literal(lit) => {
                if !path[cursor..].starts_with(lit.as_str()) {
                    return Ok(None);
                }
                cursor += lit.len();
            }
            Segment::Expr(expr) => {
                let next_literal = path_segments[i + 1..].iter().find_map(|s| match s {
                    Segment::Literal(l) => Some(l.as_str()),
                    _ => None,
                });
                match expr.operator {
                    Operator::PathSegment => {
                        if !path[cursor..].starts_with('/') {
                            return Ok(None);
                        }
                        cursor += 1;
                        let explode = expr.vars.iter().any(|v| v.modifier == Modifier::Explode);
                        if explode {
                            let rest = &path[cursor..];
                            let joined = rest.replace('/', ",");
                            bindings.insert(expr.vars[0].name.clone(), joined);
                            cursor = path.len();
                        } else {
                            let end = path[cursor..].find('/').map_or(path.len(), |i| cursor + i);
                            let value = &path[cursor..end];
                            if !bind_joined(expr, value, true, &mut bindings) {
                                return Ok(None);
                            }
                            cursor = end;
                        }
                    }
                    Operator::Label => {
                        if !path[cursor..].starts_with('.') {
                            return Ok(None);
                        }
                        cursor += 1;
                        let end = boundary(&path[cursor..], next_literal, &['.', '/']);
                        let value = &path[cursor..cursor + end];
                        if !bind_joined(expr, value, true, &mut bindings) {
                            return Ok(None);
                        }
                        cursor += end;
                    }
                    Operator::PathStyle => {
                        if !path[cursor..].starts_with(';') {
                            return Ok(None);
                        }
                        cursor += 1;
                        let end = boundary(&path[cursor..], next_literal, &['/']);
                        let segment_str = &path[cursor..cursor + end];
                        for kv in segment_str.split(';') {
                            match kv.split_once('=') {
                                Some((k, v)) => {
                                    bindings.insert(k.to_string(), v.to_string());
                                }
                                None if !kv.is_empty() => {
                                    bindings.insert(kv.to_string(), String::new());
                                }
                                None => {}
                            }
                        }
                        cursor += end;
                    }
                    Operator::Simple | Operator::Reserved => {
                        let end = boundary(&path[cursor..], next_literal, &['/']);
                        let value = &path[cursor..cursor + end];
                        if !bind_joined(expr, value, expr.operator == Operator::Simple, &mut bindings) {
                            return Ok(None);
                        }
                        cursor += end;
                    }
                    Operator::Fragment | Operator::Query | Operator::QueryContinuation => {
                        unreachable!("filtered out above")
                    }
                }
            }
        }
    }

    if cursor != path.len() {
        return Ok(None);
    }

    Ok(Some(bindings))
}

fn find_expr(segments: &[Segment], op: Operator) -> Option<&Expression> {
    segments.iter().find_map(|s| match s {
        Segment::Expr(e) if e.operator == op => Some(e),
        _ => None,
    })
}

/// Bind a (possibly comma-joined, multi-variable) expression value into the
/// bindings map, splitting on the operator's separator when more than one
/// variable is declared. `decode` controls percent-decoding (path values are
/// left raw per spec §4.B).
fn bind_joined(expr: &Expression, value: &str, decode: bool, bindings: &mut MatchMap) -> bool {
    if expr.vars.len() == 1 {
        let v = if decode { percent_decode(value) } else { value.to_string() };
        bindings.insert(expr.vars[0].name.clone(), v);
        return true;
    }
    let sep = expr.operator.separator();
    let parts: Vec<&str> = value.split(sep).collect();
    if parts.len() != expr.vars.len() {
        return false;
    }
    for (var, part) in expr.vars.iter().zip(parts) {
        let v = if decode { percent_decode(part) } else { part.to_string() };
        bindings.insert(var.name.clone(), v);
    }
    true
}

/// Find the index in `s` at which the next fixed terminator begins: either
/// the given `next_literal`'s own first occurrence, or one of `stop_chars`,
/// whichever comes first. Defaults to end-of-string.
fn boundary(s: &str, next_literal: Option<&str>, stop_chars: &[char]) -> usize {
    let mut end = s.len();
    if let Some(lit) = next_literal {
        if !lit.is_empty() {
            if let Some(idx) = s.find(lit) {
                end = end.min(idx);
            }
        }
    }
    for &c in stop_chars {
        if let Some(idx) = s.find(c) {
            end = end.min(idx);
        }
    }
    end
}

fn parse_query_pairs(query: &str) -> Vec<(String, String)> {
    query
        .split('&')
        .filter(|s| !s.is_empty())
        .filter_map(|pair| pair.split_once('=').map(|(k, v)| (k.to_string(), v.to_string())))
        .collect()
}

fn percent_decode(s: &str) -> String {
    percent_encoding::percent_decode_str(s)
        .decode_utf8_lossy()
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_simple_path_variable() {
        let result = r#match("users://42/greeting", "users://{user_id}/greeting").unwrap().unwrap();
        assert_eq!(result.get("user_id"), Some(&"42".to_string()));
    }

    #[test]
    fn no_match_returns_none_not_error() {
        let result = r#match("users://42/profile", "users://{user_id}/greeting").unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn path_segment_explode_collects_remaining_segments() {
        let result = r#match("files:///a/b/c", "files://{/path*}").unwrap().unwrap();
        assert_eq!(result.get("path"), Some(&"a,b,c".to_string()));
    }

    #[test]
    fn query_values_are_percent_decoded() {
        let result = r#match("search?q=a%20b", "search{?q}").unwrap().unwrap();
        assert_eq!(result.get("q"), Some(&"a b".to_string()));
    }

    #[test]
    fn fragment_expression_matches_after_hash() {
        let result = r#match("doc#section-1", "doc{#section}").unwrap().unwrap();
        assert_eq!(result.get("section"), Some(&"section-1".to_string()));
    }

    #[test]
    fn multiple_variables_over_same_uri() {
        let result = r#match(
            "api://v1/users/123/posts/456",
            "api://v1/users/{user_id}/posts/{post_id}",
        )
        .unwrap()
        .unwrap();
        assert_eq!(result.get("user_id"), Some(&"123".to_string()));
        assert_eq!(result.get("post_id"), Some(&"456".to_string()));
    }
}
