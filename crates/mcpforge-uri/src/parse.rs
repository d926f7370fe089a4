use crate::{Expression, Modifier, Operator, Segment, Template, UriTemplateError, VarSpec};

/// Reserved operator characters the RFC disallows as variable-name starts in
/// an expression opener: `= , ! @ |` are never valid operator characters
/// here since this engine implements Levels 1-3 only.
const RESERVED_OPERATORS: &[char] = &['=', '!', '@', '|'];

/// Characters a bare literal segment may never contain (outside expressions).
const DISALLOWED_LITERAL_CHARS: &[char] = &['<', '>', '\\', '^', '`', '{', '}', '|'];

pub fn parse(template: &str) -> Result<Template, UriTemplateError> {
    if template.is_empty() {
        return Err(UriTemplateError::EmptyTemplate);
    }

    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                if !literal.is_empty() {
                    check_literal(&literal)?;
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                let mut body = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == '{' {
                        return Err(UriTemplateError::NestedExpression);
                    }
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    body.push(inner);
                }
                if !closed {
                    return Err(UriTemplateError::UnbalancedBraces);
                }
                segments.push(Segment::Expr(parse_expression(&body)?));
            }
            '}' => return Err(UriTemplateError::UnbalancedBraces),
            _ => literal.push(c),
        }
    }

    if !literal.is_empty() {
        check_literal(&literal)?;
        segments.push(Segment::Literal(literal));
    }

    Ok(Template {
        raw: template.to_string(),
        segments,
    })
}

fn check_literal(literal: &str) -> Result<(), UriTemplateError> {
    for c in literal.chars() {
        if DISALLOWED_LITERAL_CHARS.contains(&c) {
            return Err(UriTemplateError::DisallowedLiteralCharacter(c));
        }
    }
    Ok(())
}

fn parse_expression(body: &str) -> Result<Expression, UriTemplateError> {
    if body.is_empty() {
        return Err(UriTemplateError::InvalidVariableName(String::new()));
    }

    let mut rest = body;
    let first = body.chars().next().unwrap();
    let operator = if RESERVED_OPERATORS.contains(&first) {
        return Err(UriTemplateError::ReservedOperator(first));
    } else if let Some(op) = Operator::from_prefix(first) {
        rest = &body[first.len_utf8()..];
        op
    } else {
        Operator::Simple
    };

    let mut vars = Vec::new();
    for part in rest.split(',') {
        vars.push(parse_varspec(part)?);
    }
    if vars.is_empty() || vars.iter().any(|v| v.name.is_empty()) {
        return Err(UriTemplateError::InvalidVariableName(rest.to_string()));
    }

    Ok(Expression { operator, vars })
}

fn parse_varspec(part: &str) -> Result<VarSpec, UriTemplateError> {
    if let Some(name) = part.strip_suffix('*') {
        check_variable_name(name)?;
        return Ok(VarSpec {
            name: name.to_string(),
            modifier: Modifier::Explode,
        });
    }
    if let Some((name, len)) = part.split_once(':') {
        check_variable_name(name)?;
        let n: u16 = len
            .parse()
            .map_err(|_| UriTemplateError::InvalidPrefixLength(len.to_string()))?;
        if n == 0 || n >= 10000 {
            return Err(UriTemplateError::InvalidPrefixLength(len.to_string()));
        }
        return Ok(VarSpec {
            name: name.to_string(),
            modifier: Modifier::Prefix(n),
        });
    }
    check_variable_name(part)?;
    Ok(VarSpec {
        name: part.to_string(),
        modifier: Modifier::None,
    })
}

/// `^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$`
fn check_variable_name(name: &str) -> Result<(), UriTemplateError> {
    let valid = !name.is_empty()
        && name.split('.').all(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(c) if c.is_ascii_alphabetic() || c == '_' => {
                    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
                }
                _ => false,
            }
        });
    if valid {
        Ok(())
    } else {
        Err(UriTemplateError::InvalidVariableName(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_and_literal_segments() {
        let t = parse("users://{user_id}/greeting").unwrap();
        assert_eq!(t.segments.len(), 3);
    }

    #[test]
    fn dotted_variable_name_is_valid() {
        assert!(check_variable_name("user.id").is_ok());
    }

    #[test]
    fn leading_digit_variable_name_is_invalid() {
        assert!(check_variable_name("1id").is_err());
    }

    #[test]
    fn explode_modifier_parsed() {
        let e = parse_expression("list*").unwrap();
        assert_eq!(e.vars[0].modifier, Modifier::Explode);
    }

    #[test]
    fn prefix_modifier_parsed() {
        let e = parse_expression("name:4").unwrap();
        assert_eq!(e.vars[0].modifier, Modifier::Prefix(4));
    }

    #[test]
    fn zero_prefix_length_rejected() {
        assert!(parse_expression("name:0").is_err());
    }

    #[test]
    fn comma_separated_varlist_parsed() {
        let e = parse_expression("?q,limit").unwrap();
        assert_eq!(e.operator, Operator::Query);
        assert_eq!(e.vars.len(), 2);
    }
}
