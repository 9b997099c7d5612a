//! Parameter classification
//!
//! Assigns each parameter a [`ParameterCategory`] from its name and schema so
//! the resolver knows whether to chase a provider endpoint, offer a choice, or
//! fill in a default.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::schema::{SchemaFragment, SchemaType};

/// Semantic category of a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterCategory {
    /// References another resource's identifier.
    ForeignKey { likely_provider: Option<String> },
    /// Constrained to the declared values.
    Enum { values: Vec<String> },
    Date,
    DateTime,
    Pagination,
    Filter,
    Sort,
    Search,
    Boolean,
    Numeric,
    String,
    Unknown,
}

impl ParameterCategory {
    /// Lower-case label, e.g. `foreign_key`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ForeignKey { .. } => "foreign_key",
            Self::Enum { .. } => "enum",
            Self::Date => "date",
            Self::DateTime => "datetime",
            Self::Pagination => "pagination",
            Self::Filter => "filter",
            Self::Sort => "sort",
            Self::Search => "search",
            Self::Boolean => "boolean",
            Self::Numeric => "numeric",
            Self::String => "string",
            Self::Unknown => "unknown",
        }
    }
}

/// A classified parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterInfo {
    pub name: String,
    pub category: ParameterCategory,
    pub schema_type: Option<SchemaType>,
    pub pattern: Option<String>,
}

/// Built-in parameter → resource mappings consulted before the naive
/// strip-and-pluralize fallback.
const REFERENCE_PATTERNS: &[(&str, &str)] = &[
    ("merchantId", "merchants"),
    ("merchantIds", "merchants"),
    ("locationId", "locations"),
    ("locationIds", "locations"),
    ("userId", "users"),
    ("userIds", "users"),
    ("groupId", "groups"),
    ("groupIds", "groups"),
    ("roleId", "roles"),
    ("channelId", "channels"),
    ("orderId", "orders"),
    ("incidentId", "incidents"),
    ("rewardId", "rewards"),
    ("surveyId", "surveys"),
    ("questionnaireId", "questionnaires"),
    ("snapshotId", "snapshots"),
    ("deliveryServiceId", "delivery-services"),
    ("partnerId", "partners"),
];

const PAGINATION_PARAMS: &[&str] = &[
    "page", "pagesize", "limit", "offset", "skip", "per_page", "perpage", "size", "start",
    "cursor",
];

static FOREIGN_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(ids?$|^uuid$)").expect("static regex"));
static ID_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)_?ids?$").expect("static regex"));
static DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([Dd]ate|[Tt]ime|[Aa]t|[Uu]tc)$|(?i:^(created|updated|modified|deleted)$)")
        .expect("static regex")
});
static FILTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(filter|search|query)|(filter|search|query)$").expect("static regex")
});
static SORT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^sort|^order_?by$").expect("static regex"));

/// Classifies parameters by name and schema.
///
/// Construct once per session and share by reference. The reference table can
/// be extended for APIs whose resource names don't follow the `fooId → foos`
/// convention.
#[derive(Debug, Clone)]
pub struct ParameterClassifier {
    references: BTreeMap<String, String>,
}

impl Default for ParameterClassifier {
    fn default() -> Self {
        Self {
            references: REFERENCE_PATTERNS
                .iter()
                .map(|(param, resource)| (param.to_string(), resource.to_string()))
                .collect(),
        }
    }
}

impl ParameterClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a parameter → provider resource mapping.
    pub fn with_reference(mut self, param: impl Into<String>, resource: impl Into<String>) -> Self {
        self.references.insert(param.into(), resource.into());
        self
    }

    /// Classify a parameter. First matching rule wins.
    pub fn classify(&self, name: &str, schema: &SchemaFragment) -> ParameterInfo {
        ParameterInfo {
            name: name.to_string(),
            category: self.category(name, schema),
            schema_type: schema.schema_type.clone(),
            pattern: schema.pattern.clone(),
        }
    }

    fn category(&self, name: &str, schema: &SchemaFragment) -> ParameterCategory {
        if let Some(values) = &schema.enum_values {
            return ParameterCategory::Enum {
                values: values.iter().map(enum_label).collect(),
            };
        }

        if is_foreign_key(name) {
            return ParameterCategory::ForeignKey {
                likely_provider: self.likely_provider(name),
            };
        }

        let lower = name.to_lowercase();
        if PAGINATION_PARAMS.contains(&lower.as_str()) {
            return ParameterCategory::Pagination;
        }

        if DATE.is_match(name) {
            return if schema.format.as_deref() == Some("date-time") || lower.contains("datetime")
            {
                ParameterCategory::DateTime
            } else {
                ParameterCategory::Date
            };
        }

        if FILTER.is_match(name) {
            return if lower.contains("search") {
                ParameterCategory::Search
            } else {
                ParameterCategory::Filter
            };
        }

        if SORT.is_match(name) {
            return ParameterCategory::Sort;
        }

        match &schema.schema_type {
            Some(SchemaType::Boolean) => ParameterCategory::Boolean,
            Some(SchemaType::Integer | SchemaType::Number) => ParameterCategory::Numeric,
            Some(SchemaType::String) => ParameterCategory::String,
            _ => ParameterCategory::Unknown,
        }
    }

    /// Guess the resource that provides a foreign-key parameter.
    ///
    /// Pluralization is a bare `s` suffix, so `categoryId` yields `categorys`.
    pub fn likely_provider(&self, name: &str) -> Option<String> {
        if let Some(resource) = self.references.get(name) {
            return Some(resource.clone());
        }
        let lower = name.to_lowercase();
        if let Some((_, resource)) = self
            .references
            .iter()
            .find(|(param, _)| param.to_lowercase() == lower)
        {
            return Some(resource.clone());
        }

        if !is_foreign_key(name) {
            return None;
        }
        let base = ID_SUFFIX.replace(name, "");
        if base.is_empty() {
            return None;
        }
        Some(format!("{}s", base.to_lowercase()))
    }
}

/// Whether a parameter name looks like a reference to another entity's id.
pub fn is_foreign_key(name: &str) -> bool {
    FOREIGN_KEY.is_match(name)
}

/// Default value for a pagination parameter, if it has a fixed one.
pub fn pagination_default(name: &str) -> Option<Value> {
    match name.to_lowercase().as_str() {
        "page" => Some(Value::from(1)),
        "pagesize" | "limit" | "per_page" | "perpage" | "size" => Some(Value::from(50)),
        "offset" | "skip" | "start" => Some(Value::from(0)),
        _ => None,
    }
}

/// Constraints, format, default and description of a schema, keyed by their
/// OpenAPI names. Absent fields are omitted.
pub fn parameter_metadata(schema: &SchemaFragment) -> Map<String, Value> {
    let mut metadata = Map::new();
    let c = &schema.constraints;

    let numeric = [
        ("minimum", c.minimum),
        ("maximum", c.maximum),
        ("multipleOf", c.multiple_of),
    ];
    for (key, value) in numeric {
        if let Some(v) = value {
            metadata.insert(key.to_string(), Value::from(v));
        }
    }
    let counts = [
        ("minLength", c.min_length),
        ("maxLength", c.max_length),
        ("minItems", c.min_items),
        ("maxItems", c.max_items),
    ];
    for (key, value) in counts {
        if let Some(v) = value {
            metadata.insert(key.to_string(), Value::from(v));
        }
    }

    if let Some(format) = &schema.format {
        metadata.insert("format".into(), Value::String(format.clone()));
    }
    if let Some(default) = &schema.default {
        metadata.insert("default".into(), default.clone());
    }
    if let Some(description) = &schema.description {
        metadata.insert("description".into(), Value::String(description.clone()));
    }
    metadata
}

fn enum_label(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
