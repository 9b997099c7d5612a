//! JSON-schema fragments as a typed struct.
//!
//! Parameter and response schemas arrive as untyped JSON. Parsing them once into
//! [`SchemaFragment`] means every later traversal is a match over a closed set of
//! types instead of repeated `get().and_then()` chains. Parsing never fails:
//! missing or mistyped keys fall back to empty values.

use std::collections::BTreeMap;

use serde_json::Value;

/// Declared `type` of a schema fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
    Null,
    Other(String),
}

impl SchemaType {
    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "string" => Self::String,
            "integer" => Self::Integer,
            "number" => Self::Number,
            "boolean" => Self::Boolean,
            "object" => Self::Object,
            "array" => Self::Array,
            "null" => Self::Null,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
            Self::Null => "null",
            Self::Other(s) => s,
        }
    }
}

/// Numeric and length constraints declared on a fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
    pub min_items: Option<u64>,
    pub max_items: Option<u64>,
    pub multiple_of: Option<f64>,
}

impl Constraints {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A parsed schema fragment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaFragment {
    pub schema_type: Option<SchemaType>,
    pub format: Option<String>,
    pub enum_values: Option<Vec<Value>>,
    pub description: Option<String>,
    pub pattern: Option<String>,
    pub default: Option<Value>,
    pub constraints: Constraints,
    pub properties: BTreeMap<String, SchemaFragment>,
    pub items: Option<Box<SchemaFragment>>,
    /// Raw `$ref` target, e.g. `#/components/schemas/User`.
    pub reference: Option<String>,
}

impl SchemaFragment {
    /// Parse a fragment from raw JSON. Non-object input yields an empty fragment.
    pub fn from_value(value: &Value) -> Self {
        let Some(obj) = value.as_object() else {
            return Self::default();
        };

        let str_field = |key: &str| obj.get(key).and_then(|v| v.as_str()).map(str::to_string);
        let f64_field = |key: &str| obj.get(key).and_then(|v| v.as_f64());
        let u64_field = |key: &str| obj.get(key).and_then(|v| v.as_u64());

        // OpenAPI 3.1 allows `type: ["string", "null"]`; take the first non-null entry.
        let schema_type = match obj.get("type") {
            Some(Value::String(s)) => Some(SchemaType::parse(s)),
            Some(Value::Array(types)) => types
                .iter()
                .filter_map(|t| t.as_str())
                .map(SchemaType::parse)
                .find(|t| *t != SchemaType::Null),
            _ => None,
        };

        let properties = obj
            .get("properties")
            .and_then(|p| p.as_object())
            .map(|props| {
                props
                    .iter()
                    .map(|(name, schema)| (name.clone(), Self::from_value(schema)))
                    .collect()
            })
            .unwrap_or_default();

        Self {
            schema_type,
            format: str_field("format"),
            enum_values: obj.get("enum").and_then(|v| v.as_array()).cloned(),
            description: str_field("description"),
            pattern: str_field("pattern"),
            default: obj.get("default").cloned(),
            constraints: Constraints {
                minimum: f64_field("minimum"),
                maximum: f64_field("maximum"),
                min_length: u64_field("minLength"),
                max_length: u64_field("maxLength"),
                min_items: u64_field("minItems"),
                max_items: u64_field("maxItems"),
                multiple_of: f64_field("multipleOf"),
            },
            properties,
            items: obj
                .get("items")
                .filter(|v| v.is_object())
                .map(|v| Box::new(Self::from_value(v))),
            reference: str_field("$ref"),
        }
    }

    /// Shorthand for a fragment with only a declared type.
    pub fn of_type(schema_type: SchemaType) -> Self {
        Self {
            schema_type: Some(schema_type),
            ..Self::default()
        }
    }

    pub fn is_type(&self, schema_type: &SchemaType) -> bool {
        self.schema_type.as_ref() == Some(schema_type)
    }

    /// Last path segment of the `$ref`, i.e. the schema name in the registry.
    pub fn ref_name(&self) -> Option<&str> {
        self.reference
            .as_deref()
            .and_then(|r| r.rsplit('/').next())
            .filter(|name| !name.is_empty())
    }
}
