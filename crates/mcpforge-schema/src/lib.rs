//! Algebraic JSON-Schema model.
//!
//! `JsonSchema` is a tagged union mirroring the subset of JSON Schema that
//! MCP tool/prompt/resource parameters need, plus the derivation helpers the
//! registry uses to build one from a declared parameter type.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON-Schema value: `string | number | boolean | array | object | enum | oneOf`.
///
/// Each variant carries the shared annotation fields (`title`, `description`,
/// `format`, `default`) via `SchemaMeta`, flattened into the serialized form
/// so the wire shape matches plain JSON Schema rather than an internal tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum JsonSchema {
    #[serde(rename = "string")]
    String {
        #[serde(flatten)]
        meta: SchemaMeta,
    },
    #[serde(rename = "number")]
    Number {
        #[serde(flatten)]
        meta: SchemaMeta,
    },
    #[serde(rename = "boolean")]
    Boolean {
        #[serde(flatten)]
        meta: SchemaMeta,
    },
    #[serde(rename = "array")]
    Array {
        items: Box<JsonSchema>,
        #[serde(flatten)]
        meta: SchemaMeta,
    },
    #[serde(rename = "object")]
    Object {
        /// Ordered property list: declaration order is preserved because it
        /// affects client presentation (spec §3 `JsonSchema`).
        properties: Vec<(String, JsonSchema)>,
        required: Vec<String>,
        #[serde(flatten)]
        meta: SchemaMeta,
    },
    #[serde(rename = "enum")]
    Enum {
        /// Canonical case labels (GLOSSARY: "Case label").
        values: Vec<String>,
        #[serde(flatten)]
        meta: SchemaMeta,
    },
    #[serde(rename = "oneOf")]
    OneOf {
        variants: Vec<JsonSchema>,
        #[serde(flatten)]
        meta: SchemaMeta,
    },
}

/// Annotation fields shared by every schema variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl SchemaMeta {
    pub fn described(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }
}

/// Discriminator carried by a declared parameter/return type, used to drive
/// `schema_for`'s derivation rules (spec §4.A).
#[derive(Debug, Clone, PartialEq)]
pub enum TypeHandle {
    Integer,
    UnsignedInteger,
    Float,
    Boolean,
    String,
    Bytes,
    /// A homogeneous collection; `elem` is the element's own handle.
    Array(Box<TypeHandle>),
    /// A record with a registered schema descriptor: ordered fields, each
    /// optionally defaulted (defaulted fields are omitted from `required`).
    Object {
        name: String,
        fields: Vec<(String, TypeHandle, bool)>,
    },
    /// A finite enumeration with its canonical case labels.
    Enum { name: String, labels: Vec<String> },
    /// A nullable/optional wrapper around another handle.
    Optional(Box<TypeHandle>),
    /// A type with no schema derivation rule; falls back to `string`.
    Unknown,
}

impl JsonSchema {
    pub fn string() -> Self {
        Self::String { meta: SchemaMeta::default() }
    }

    pub fn number() -> Self {
        Self::Number { meta: SchemaMeta::default() }
    }

    pub fn boolean() -> Self {
        Self::Boolean { meta: SchemaMeta::default() }
    }

    pub fn byte_string() -> Self {
        Self::String {
            meta: SchemaMeta {
                format: Some("byte".into()),
                ..SchemaMeta::default()
            },
        }
    }

    pub fn array(items: JsonSchema) -> Self {
        Self::Array {
            items: Box::new(items),
            meta: SchemaMeta::default(),
        }
    }

    pub fn object(properties: Vec<(String, JsonSchema)>, required: Vec<String>) -> Self {
        Self::Object {
            properties,
            required,
            meta: SchemaMeta::default(),
        }
    }

    pub fn enum_of(values: Vec<String>) -> Self {
        Self::Enum {
            values,
            meta: SchemaMeta::default(),
        }
    }

    pub fn one_of(variants: Vec<JsonSchema>) -> Self {
        Self::OneOf {
            variants,
            meta: SchemaMeta::default(),
        }
    }

    pub fn meta(&self) -> &SchemaMeta {
        match self {
            Self::String { meta }
            | Self::Number { meta }
            | Self::Boolean { meta }
            | Self::Array { meta, .. }
            | Self::Object { meta, .. }
            | Self::Enum { meta, .. }
            | Self::OneOf { meta, .. } => meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut SchemaMeta {
        match self {
            Self::String { meta }
            | Self::Number { meta }
            | Self::Boolean { meta }
            | Self::Array { meta, .. }
            | Self::Object { meta, .. }
            | Self::Enum { meta, .. }
            | Self::OneOf { meta, .. } => meta,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.meta_mut().description = Some(description.into());
        self
    }

    /// Validates the §3 invariants: an `object`'s `required` names are a
    /// subset of its property keys; an `enum`'s values are non-empty; a
    /// present `default` is type-compatible with its schema.
    pub fn validate_invariants(&self) -> Result<(), String> {
        match self {
            Self::Object { properties, required, .. } => {
                let keys: std::collections::HashSet<&str> =
                    properties.iter().map(|(k, _)| k.as_str()).collect();
                for r in required {
                    if !keys.contains(r.as_str()) {
                        return Err(format!("required field '{r}' is not a declared property"));
                    }
                }
                for (_, schema) in properties {
                    schema.validate_invariants()?;
                }
                Ok(())
            }
            Self::Enum { values, .. } => {
                if values.is_empty() {
                    return Err("enum schema must have at least one value".into());
                }
                Ok(())
            }
            Self::Array { items, .. } => items.validate_invariants(),
            Self::OneOf { variants, .. } => {
                for v in variants {
                    v.validate_invariants()?;
                }
                Ok(())
            }
            Self::String { .. } | Self::Number { .. } | Self::Boolean { .. } => Ok(()),
        }
    }
}

/// Derives a `JsonSchema` from a declared type handle, per spec §4.A's
/// derivation rules. `description`, if given, is attached to the top level.
pub fn schema_for(handle: &TypeHandle, description: Option<&str>) -> JsonSchema {
    let mut schema = match handle {
        TypeHandle::Integer | TypeHandle::UnsignedInteger | TypeHandle::Float => JsonSchema::number(),
        TypeHandle::Boolean => JsonSchema::boolean(),
        TypeHandle::String => JsonSchema::string(),
        TypeHandle::Bytes => JsonSchema::byte_string(),
        TypeHandle::Array(elem) => JsonSchema::array(schema_for(elem, None)),
        TypeHandle::Object { fields, .. } => {
            let required: Vec<String> = fields
                .iter()
                .filter(|(_, _, has_default)| !has_default)
                .map(|(name, _, _)| name.clone())
                .collect();
            let properties = fields
                .iter()
                .map(|(name, field_handle, _)| (name.clone(), schema_for(field_handle, None)))
                .collect();
            JsonSchema::object(properties, required)
        }
        TypeHandle::Enum { labels, .. } => JsonSchema::enum_of(labels.clone()),
        // Nullable/optional wrappers unwrap to the inner schema; the caller
        // (registry) is responsible for clearing the outer `required` flag.
        TypeHandle::Optional(inner) => schema_for(inner, None),
        TypeHandle::Unknown => JsonSchema::string(),
    };
    if let Some(description) = description {
        schema = schema.with_description(description);
    }
    schema
}

/// Merges a concrete default value into a schema's `default` field.
pub fn merge_default(mut schema: JsonSchema, value: Value) -> JsonSchema {
    schema.meta_mut().default = Some(value);
    schema
}

/// Strips `required` lists recursively, for "output schema" shapes where
/// every field is present on the wire but not contractually required.
pub fn without_required(schema: JsonSchema) -> JsonSchema {
    match schema {
        JsonSchema::Object { properties, meta, .. } => {
            let properties = properties
                .into_iter()
                .map(|(name, s)| (name, without_required(s)))
                .collect();
            JsonSchema::Object {
                properties,
                required: Vec::new(),
                meta,
            }
        }
        JsonSchema::Array { items, meta } => JsonSchema::Array {
            items: Box::new(without_required(*items)),
            meta,
        },
        JsonSchema::OneOf { variants, meta } => JsonSchema::OneOf {
            variants: variants.into_iter().map(without_required).collect(),
            meta,
        },
        other => other,
    }
}

/// §4.A return-type projection: an array of structured-object elements is
/// wrapped as `object{items: array}`; arrays of primitives and arrays of
/// content-block variants are left bare.
pub fn project_return_type(schema: JsonSchema, element_is_structured_object: bool) -> JsonSchema {
    match &schema {
        JsonSchema::Array { .. } if element_is_structured_object => {
            JsonSchema::object(vec![("items".to_string(), schema)], vec!["items".to_string()])
        }
        _ => schema,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_and_float_both_derive_number() {
        assert_eq!(schema_for(&TypeHandle::Integer, None), JsonSchema::number());
        assert_eq!(schema_for(&TypeHandle::Float, None), JsonSchema::number());
    }

    #[test]
    fn bytes_derive_base64_formatted_string() {
        let schema = schema_for(&TypeHandle::Bytes, None);
        assert_eq!(schema.meta().format.as_deref(), Some("byte"));
    }

    #[test]
    fn optional_unwraps_to_inner_schema() {
        let schema = schema_for(&TypeHandle::Optional(Box::new(TypeHandle::String)), None);
        assert_eq!(schema, JsonSchema::string());
    }

    #[test]
    fn unknown_falls_back_to_string() {
        assert_eq!(schema_for(&TypeHandle::Unknown, None), JsonSchema::string());
    }

    #[test]
    fn object_required_excludes_defaulted_fields() {
        let handle = TypeHandle::Object {
            name: "AddArgs".into(),
            fields: vec![
                ("a".into(), TypeHandle::Integer, false),
                ("b".into(), TypeHandle::Integer, true),
            ],
        };
        let schema = schema_for(&handle, None);
        match schema {
            JsonSchema::Object { required, .. } => assert_eq!(required, vec!["a".to_string()]),
            _ => panic!("expected object schema"),
        }
    }

    #[test]
    fn validate_rejects_required_name_not_in_properties() {
        let schema = JsonSchema::Object {
            properties: vec![("a".to_string(), JsonSchema::number())],
            required: vec!["b".to_string()],
            meta: SchemaMeta::default(),
        };
        assert!(schema.validate_invariants().is_err());
    }

    #[test]
    fn validate_rejects_empty_enum() {
        let schema = JsonSchema::enum_of(vec![]);
        assert!(schema.validate_invariants().is_err());
    }

    #[test]
    fn without_required_strips_nested_object_lists() {
        let schema = JsonSchema::object(
            vec![("a".to_string(), JsonSchema::number())],
            vec!["a".to_string()],
        );
        let stripped = without_required(schema);
        match stripped {
            JsonSchema::Object { required, .. } => assert!(required.is_empty()),
            _ => panic!("expected object schema"),
        }
    }

    #[test]
    fn schema_round_trips_through_json() {
        let schema = JsonSchema::object(
            vec![
                ("name".to_string(), JsonSchema::string().with_description("the name")),
                ("count".to_string(), JsonSchema::number()),
            ],
            vec!["name".to_string()],
        );
        let encoded = serde_json::to_string(&schema).unwrap();
        let decoded: JsonSchema = serde_json::from_str(&encoded).unwrap();
        assert_eq!(schema, decoded);
    }
}
