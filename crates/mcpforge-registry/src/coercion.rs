//! Argument coercion (spec §4.D): loose JSON values into declared parameter
//! types, with `enrich` applying defaults before coercion runs.

use crate::descriptor::{ParameterDescriptor, RawArguments};
use mcpforge_types::McpError;
use serde_json::Value;

/// Fill in declared defaults for absent keys; error if a parameter is both
/// absent and has no default.
pub fn enrich(mut arguments: RawArguments, parameters: &[ParameterDescriptor]) -> Result<RawArguments, McpError> {
    for param in parameters {
        if !arguments.contains_key(&param.label) {
            match &param.default_value {
                Some(default) => {
                    arguments.insert(param.label.clone(), default.clone());
                }
                None => return Err(McpError::missing_required_parameter(&param.label)),
            }
        }
    }
    Ok(arguments)
}

pub fn coerce_integer(parameter: &str, value: &Value) -> Result<i64, McpError> {
    match value {
        Value::Bool(b) => Ok(if *b { 1 } else { 0 }),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i)
            } else if let Some(f) = n.as_f64() {
                if f.fract() == 0.0 {
                    Ok(f as i64)
                } else {
                    Err(type_error(parameter, "integer", value))
                }
            } else {
                Err(type_error(parameter, "integer", value))
            }
        }
        Value::String(s) => s.parse::<i64>().map_err(|_| type_error(parameter, "integer", value)),
        _ => Err(type_error(parameter, "integer", value)),
    }
}

pub fn coerce_float(parameter: &str, value: &Value) -> Result<f64, McpError> {
    match value {
        Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Number(n) => n.as_f64().ok_or_else(|| type_error(parameter, "float", value)),
        Value::String(s) => s.parse::<f64>().map_err(|_| type_error(parameter, "float", value)),
        _ => Err(type_error(parameter, "float", value)),
    }
}

pub fn coerce_boolean(parameter: &str, value: &Value) -> Result<bool, McpError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(type_error(parameter, "boolean", value)),
        },
        _ => Err(type_error(parameter, "boolean", value)),
    }
}

pub fn coerce_string(parameter: &str, value: &Value) -> Result<String, McpError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        _ => Err(type_error(parameter, "string", value)),
    }
}

pub fn coerce_url(parameter: &str, value: &Value) -> Result<url::Url, McpError> {
    let raw = coerce_string(parameter, value)?;
    url::Url::parse(&raw).map_err(|_| type_error(parameter, "URL", value))
}

pub fn coerce_date(parameter: &str, value: &Value) -> Result<chrono::DateTime<chrono::Utc>, McpError> {
    match value {
        Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|_| type_error(parameter, "date", value)),
        Value::Number(n) => {
            let secs = n.as_i64().ok_or_else(|| type_error(parameter, "date", value))?;
            chrono::DateTime::from_timestamp(secs, 0).ok_or_else(|| type_error(parameter, "date", value))
        }
        _ => Err(type_error(parameter, "date", value)),
    }
}

pub fn coerce_enum(parameter: &str, value: &Value, labels: &[String]) -> Result<String, McpError> {
    let raw = coerce_string(parameter, value)?;
    if labels.iter().any(|l| l == &raw) {
        Ok(raw)
    } else {
        Err(McpError::invalid_enum_value(parameter, labels, &raw))
    }
}

fn type_error(parameter: &str, expected: &str, actual: &Value) -> McpError {
    McpError::invalid_argument_type(parameter, expected, describe(actual))
}

fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mcpforge_schema::JsonSchema;
    use serde_json::json;

    #[test]
    fn enrich_fills_declared_defaults() {
        let params = vec![ParameterDescriptor {
            name: "b".into(),
            label: "b".into(),
            description: None,
            default_value: Some(json!(10)),
            schema: JsonSchema::number(),
        }];
        let filled = enrich(RawArguments::new(), &params).unwrap();
        assert_eq!(filled.get("b"), Some(&json!(10)));
    }

    #[test]
    fn enrich_errors_on_missing_required() {
        let params = vec![ParameterDescriptor {
            name: "a".into(),
            label: "a".into(),
            description: None,
            default_value: None,
            schema: JsonSchema::number(),
        }];
        let err = enrich(RawArguments::new(), &params).unwrap_err();
        assert_eq!(err.jsonrpc_code(), -32602);
    }

    #[test]
    fn integer_rejects_non_integral_float() {
        let err = coerce_integer("a", &json!(2.5)).unwrap_err();
        assert!(err.to_string().contains('a'));
    }

    #[test]
    fn integer_accepts_boolean_as_zero_or_one() {
        assert_eq!(coerce_integer("x", &json!(true)).unwrap(), 1);
    }

    #[test]
    fn enum_rejects_unknown_label() {
        let labels = vec!["red".to_string(), "green".to_string()];
        let err = coerce_enum("color", &json!("blue"), &labels).unwrap_err();
        assert!(err.to_string().contains("blue"));
    }

    #[test]
    fn boolean_from_string_is_case_insensitive() {
        assert_eq!(coerce_boolean("x", &json!("TRUE")).unwrap(), true);
    }
}
