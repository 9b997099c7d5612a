//! OpenAPI document → endpoint descriptors
//!
//! Walks a raw OpenAPI 3.x (or Swagger 2.0) JSON document and produces a flat,
//! immutable list of [`EndpointDescriptor`]s plus a registry of named schemas
//! that single-hop `$ref`s are resolved against.

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::SpecError;
use crate::schema::SchemaFragment;

/// Where a parameter is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParamLocation {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "path" => Some(Self::Path),
            "query" => Some(Self::Query),
            "header" => Some(Self::Header),
            "cookie" => Some(Self::Cookie),
            _ => None,
        }
    }
}

/// A single declared parameter.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ParameterDescriptor {
    pub name: String,
    pub location: ParamLocation,
    pub description: String,
    pub required: bool,
    pub schema: SchemaFragment,
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>, location: ParamLocation, required: bool) -> Self {
        Self {
            name: name.into(),
            location,
            description: String::new(),
            required,
            schema: SchemaFragment::default(),
        }
    }

    pub fn with_schema(mut self, schema: SchemaFragment) -> Self {
        self.schema = schema;
        self
    }
}

/// One operation of the API: a path plus an HTTP method.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct EndpointDescriptor {
    /// URL path template (e.g. "/merchants/{merchantId}")
    pub path: String,
    /// Upper-case HTTP method
    pub method: String,
    /// operationId, empty when the document omits it
    pub operation_id: String,
    pub summary: String,
    /// Declared parameters, in declaration order
    pub parameters: Vec<ParameterDescriptor>,
    /// Response schemas keyed by status code ("200", "2XX", "default", ...)
    pub responses: BTreeMap<String, SchemaFragment>,
}

impl EndpointDescriptor {
    pub fn new(method: &str, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method: method.to_uppercase(),
            operation_id: String::new(),
            summary: String::new(),
            parameters: Vec::new(),
            responses: BTreeMap::new(),
        }
    }

    pub fn with_param(mut self, param: ParameterDescriptor) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn with_response(mut self, status: &str, schema: SchemaFragment) -> Self {
        self.responses.insert(status.to_string(), schema);
        self
    }

    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    pub fn param(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required_params(&self) -> impl Iterator<Item = &ParameterDescriptor> {
        self.parameters.iter().filter(|p| p.required)
    }

    /// Response schemas for 2xx status codes.
    pub fn success_responses(&self) -> impl Iterator<Item = &SchemaFragment> {
        self.responses
            .iter()
            .filter(|(status, _)| status.starts_with('2'))
            .map(|(_, schema)| schema)
    }
}

/// Number of `{placeholder}` segments in a path template.
pub fn placeholder_count(path: &str) -> usize {
    path.split('/')
        .filter(|seg| seg.starts_with('{') && seg.ends_with('}'))
        .count()
}

/// Supplies endpoints and resolves schema references.
///
/// Implemented by whatever parsed the API description; the resolver only ever
/// sees this normalized view.
pub trait SpecificationSource {
    fn endpoints(&self) -> &[EndpointDescriptor];

    fn resolve_schema_ref(&self, reference: &str) -> Option<&SchemaFragment>;

    /// The GET operation for `path`, if any.
    fn get_endpoint(&self, path: &str) -> Option<&EndpointDescriptor> {
        self.endpoints()
            .iter()
            .find(|e| e.is_get() && e.path == path)
    }
}

/// [`SpecificationSource`] backed by a raw OpenAPI document.
#[derive(Debug, Clone, Default)]
pub struct OpenApiSource {
    endpoints: Vec<EndpointDescriptor>,
    schemas: BTreeMap<String, SchemaFragment>,
}

impl OpenApiSource {
    pub fn new(document: &Value) -> Self {
        let schemas = extract_schemas(document);
        let endpoints = extract_endpoints(document);
        debug!(
            endpoints = endpoints.len(),
            schemas = schemas.len(),
            "loaded specification"
        );
        Self { endpoints, schemas }
    }

    /// Build a source from already-normalized parts.
    pub fn from_parts(
        endpoints: Vec<EndpointDescriptor>,
        schemas: BTreeMap<String, SchemaFragment>,
    ) -> Self {
        Self { endpoints, schemas }
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, SpecError> {
        Ok(Self::new(&load_document(path)?))
    }
}

impl SpecificationSource for OpenApiSource {
    fn endpoints(&self) -> &[EndpointDescriptor] {
        &self.endpoints
    }

    fn resolve_schema_ref(&self, reference: &str) -> Option<&SchemaFragment> {
        let name = reference.rsplit('/').next()?;
        self.schemas.get(name)
    }
}

/// Read a specification document from disk, as JSON or YAML.
pub fn load_document(path: impl AsRef<Path>) -> Result<Value, SpecError> {
    let path = path.as_ref();
    let display = path.display().to_string();
    let text = std::fs::read_to_string(path).map_err(|source| SpecError::Read {
        path: display.clone(),
        source,
    })?;

    let value: Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(_) => serde_yaml::from_str(&text).map_err(|source| SpecError::Parse {
            path: display,
            source,
        })?,
    };

    if !value.is_object() {
        return Err(SpecError::NotAnObject);
    }
    Ok(value)
}

fn extract_schemas(document: &Value) -> BTreeMap<String, SchemaFragment> {
    let components = document
        .get("components")
        .and_then(|c| c.get("schemas"))
        .and_then(|s| s.as_object());
    let definitions = document.get("definitions").and_then(|d| d.as_object());

    [components, definitions]
        .into_iter()
        .flatten()
        .flat_map(|map| map.iter())
        .map(|(name, schema)| (name.clone(), SchemaFragment::from_value(schema)))
        .collect()
}

fn extract_endpoints(document: &Value) -> Vec<EndpointDescriptor> {
    let mut endpoints = Vec::new();

    let paths = match document.get("paths").and_then(|p| p.as_object()) {
        Some(p) => p,
        None => return endpoints,
    };
    let shared_params = document
        .get("components")
        .and_then(|c| c.get("parameters"))
        .or_else(|| document.get("parameters"));

    for (path, path_item) in paths {
        let path_level_params = path_item.get("parameters");

        for method in &[
            "get", "post", "put", "patch", "delete", "head", "options", "trace",
        ] {
            let operation = match path_item.get(*method) {
                Some(op) => op,
                None => continue,
            };

            endpoints.push(extract_single_endpoint(
                path,
                method,
                operation,
                path_level_params,
                shared_params,
            ));
        }
    }

    endpoints.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.method.cmp(&b.method)));
    endpoints
}

fn extract_single_endpoint(
    path: &str,
    method: &str,
    operation: &Value,
    path_level_params: Option<&Value>,
    shared_params: Option<&Value>,
) -> EndpointDescriptor {
    let operation_id = operation
        .get("operationId")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    let summary = operation
        .get("summary")
        .or_else(|| operation.get("description"))
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();

    EndpointDescriptor {
        path: path.to_string(),
        method: method.to_uppercase(),
        operation_id,
        summary,
        parameters: collect_params(
            path_level_params,
            operation.get("parameters"),
            shared_params,
        ),
        responses: extract_responses(operation),
    }
}

/// Merge path-level + operation-level parameters.
/// Operation-level overrides path-level by (name, location), keeping the
/// position of the first declaration.
fn collect_params(
    path_level: Option<&Value>,
    operation_level: Option<&Value>,
    shared: Option<&Value>,
) -> Vec<ParameterDescriptor> {
    let mut params: Vec<ParameterDescriptor> = Vec::new();

    for source in [path_level, operation_level].iter().flatten() {
        let Some(list) = source.as_array() else {
            continue;
        };
        for raw in list {
            let Some(p) = parse_param(deref_param(raw, shared)) else {
                continue;
            };
            match params
                .iter_mut()
                .find(|existing| existing.name == p.name && existing.location == p.location)
            {
                Some(existing) => *existing = p,
                None => params.push(p),
            }
        }
    }

    params
}

/// Follow a `#/components/parameters/X` reference one hop.
fn deref_param<'a>(param: &'a Value, shared: Option<&'a Value>) -> &'a Value {
    param
        .get("$ref")
        .and_then(|r| r.as_str())
        .and_then(|r| r.rsplit('/').next())
        .and_then(|name| shared.and_then(|s| s.get(name)))
        .unwrap_or(param)
}

/// Parse a single parameter from its JSON representation.
fn parse_param(param: &Value) -> Option<ParameterDescriptor> {
    let name = param.get("name")?.as_str()?.to_string();
    let location = ParamLocation::parse(param.get("in")?.as_str()?)?;
    let description = param
        .get("description")
        .and_then(|v| v.as_str())
        .unwrap_or("")
        .to_string();
    // Path parameters are always required, whatever the document says.
    let required = location == ParamLocation::Path
        || param
            .get("required")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);
    // Swagger 2.0 puts type/format/enum directly on the parameter.
    let schema = match param.get("schema") {
        Some(s) => SchemaFragment::from_value(s),
        None => SchemaFragment::from_value(param),
    };

    Some(ParameterDescriptor {
        name,
        location,
        description,
        required,
        schema,
    })
}

fn extract_responses(operation: &Value) -> BTreeMap<String, SchemaFragment> {
    let Some(responses) = operation.get("responses").and_then(|r| r.as_object()) else {
        return BTreeMap::new();
    };

    responses
        .iter()
        .filter_map(|(status, response)| {
            response_schema(response).map(|s| (status.clone(), SchemaFragment::from_value(s)))
        })
        .collect()
}

/// Pick the JSON schema of a response: `application/json` first, then any
/// JSON-ish media type, then the Swagger 2.0 `schema` field.
fn response_schema(response: &Value) -> Option<&Value> {
    if let Some(content) = response.get("content").and_then(|c| c.as_object()) {
        let media = content
            .get("application/json")
            .or_else(|| {
                content
                    .iter()
                    .find(|(media, _)| media.contains("json"))
                    .map(|(_, v)| v)
            })
            .or_else(|| content.values().next());
        return media.and_then(|m| m.get("schema"));
    }
    response.get("schema")
}
