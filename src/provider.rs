//! Provider index and dependency graph
//!
//! The provider index answers "which GET endpoints can hand me a value for
//! parameter `p`?". The dependency graph lifts that to endpoints: an endpoint
//! depends on every provider of each parameter it requires.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use tracing::debug;

use crate::classify::is_foreign_key;
use crate::schema::{SchemaFragment, SchemaType};
use crate::spec::{EndpointDescriptor, SpecificationSource};

/// Parameter name → endpoint paths whose GET response exposes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProviderIndex {
    providers: BTreeMap<String, Vec<String>>,
}

impl ProviderIndex {
    /// Scan every GET endpoint of `source`.
    ///
    /// An endpoint provides `p` when a success response exposes a property
    /// named `p` (top level, behind one `$ref`, or one level down in an object
    /// property or array items), or when the endpoint itself declares a
    /// foreign-key shaped parameter `p`.
    pub fn build<S: SpecificationSource + ?Sized>(source: &S) -> Self {
        let mut providers: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for endpoint in source.endpoints().iter().filter(|e| e.is_get()) {
            for name in provided_names(endpoint, source) {
                providers.entry(name).or_default().push(endpoint.path.clone());
            }
        }

        debug!(names = providers.len(), "built provider index");
        Self { providers }
    }

    /// Providers of `name`; empty when nothing is known to supply it.
    pub fn providers(&self, name: &str) -> &[String] {
        self.providers.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.providers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Every parameter name a single GET endpoint can provide.
fn provided_names<S: SpecificationSource + ?Sized>(
    endpoint: &EndpointDescriptor,
    source: &S,
) -> BTreeSet<String> {
    let mut names = BTreeSet::new();

    for schema in endpoint.success_responses() {
        let root = deref(schema, source);
        // A bare array response exposes its items' properties at the top.
        let root = match (&root.schema_type, &root.items) {
            (Some(SchemaType::Array), Some(items)) => deref(items, source),
            _ => root,
        };

        for (prop, prop_schema) in &root.properties {
            names.insert(prop.clone());
            names.extend(nested_names(prop_schema, source));
        }
    }

    names.extend(
        endpoint
            .parameters
            .iter()
            .filter(|p| is_foreign_key(&p.name))
            .map(|p| p.name.clone()),
    );
    names
}

/// Property names one level below an object property or inside array items.
fn nested_names<S: SpecificationSource + ?Sized>(
    schema: &SchemaFragment,
    source: &S,
) -> Vec<String> {
    let schema = deref(schema, source);
    let inner = match (&schema.schema_type, &schema.items) {
        (Some(SchemaType::Array), Some(items)) => deref(items, source),
        (Some(SchemaType::Object), _) => schema,
        _ => return Vec::new(),
    };
    inner.properties.keys().cloned().collect()
}

/// Follow a single `$ref` hop; unresolvable refs leave the fragment as-is.
fn deref<'a, S: SpecificationSource + ?Sized>(
    schema: &'a SchemaFragment,
    source: &'a S,
) -> &'a SchemaFragment {
    schema
        .reference
        .as_deref()
        .and_then(|r| source.resolve_schema_ref(r))
        .unwrap_or(schema)
}

/// Endpoint path → endpoints that must run first to obtain its required
/// parameters. Self-dependencies are never recorded; cycles between distinct
/// endpoints are.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DependencyGraph {
    edges: BTreeMap<String, BTreeSet<String>>,
    requirements: BTreeMap<String, Vec<String>>,
}

impl DependencyGraph {
    pub fn build(endpoints: &[EndpointDescriptor], index: &ProviderIndex) -> Self {
        let mut graph = Self::default();

        for endpoint in endpoints.iter().filter(|e| e.is_get()) {
            let required: Vec<String> = endpoint.required_params().map(|p| p.name.clone()).collect();
            let deps: BTreeSet<String> = required
                .iter()
                .flat_map(|name| index.providers(name))
                .filter(|provider| **provider != endpoint.path)
                .cloned()
                .collect();

            graph.edges.insert(endpoint.path.clone(), deps);
            graph.requirements.insert(endpoint.path.clone(), required);
        }

        debug!(endpoints = graph.edges.len(), "built dependency graph");
        graph
    }

    /// Endpoints `path` depends on; empty for unknown paths.
    pub fn dependencies(&self, path: &str) -> impl Iterator<Item = &str> {
        self.edges
            .get(path)
            .into_iter()
            .flat_map(|deps| deps.iter().map(String::as_str))
    }

    /// Required parameter names of the GET endpoint at `path`.
    pub fn required_params(&self, path: &str) -> &[String] {
        self.requirements.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, path: &str) -> bool {
        self.edges.contains_key(path)
    }

    pub fn endpoints(&self) -> impl Iterator<Item = &str> {
        self.edges.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }
}
