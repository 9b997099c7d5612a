//! Execution planning
//!
//! Orders the endpoint calls needed before a target endpoint can run: a
//! depth-first post-order walk over the dependency graph, starting from the
//! providers of each required parameter.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::classify::{is_foreign_key, ParameterClassifier};
use crate::provider::{DependencyGraph, ProviderIndex};
use crate::spec::placeholder_count;

/// Ordered, duplicate-free endpoint paths ending with the target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ExecutionPlan {
    steps: Vec<String>,
}

impl ExecutionPlan {
    pub fn steps(&self) -> &[String] {
        &self.steps
    }

    /// The endpoint this plan was computed for.
    pub fn target(&self) -> Option<&str> {
        self.steps.last().map(String::as_str)
    }

    /// Everything that runs before the target.
    pub fn prerequisites(&self) -> &[String] {
        match self.steps.split_last() {
            Some((_, rest)) => rest,
            None => &[],
        }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn into_steps(self) -> Vec<String> {
        self.steps
    }
}

/// Plans calls and ranks provider candidates over a built graph.
#[derive(Debug, Clone, Copy)]
pub struct Planner<'a> {
    graph: &'a DependencyGraph,
    index: &'a ProviderIndex,
    classifier: &'a ParameterClassifier,
}

impl<'a> Planner<'a> {
    pub fn new(
        graph: &'a DependencyGraph,
        index: &'a ProviderIndex,
        classifier: &'a ParameterClassifier,
    ) -> Self {
        Self {
            graph,
            index,
            classifier,
        }
    }

    /// Compute the call order for `target` given the names it requires.
    ///
    /// Each endpoint is emitted at most once, which also stops cycles in the
    /// graph from unrolling. The target is held back from the traversal and
    /// always emitted last, even when it provides one of its own parameters.
    pub fn plan<S: AsRef<str>>(&self, target: &str, required: &[S]) -> ExecutionPlan {
        let mut walk = Walk {
            graph: self.graph,
            target,
            visited: HashSet::new(),
            order: Vec::new(),
        };

        for name in required {
            let name = name.as_ref();
            for provider in self.rank(name, self.index.providers(name)) {
                walk.visit(provider);
            }
        }
        for dep in rank_endpoints(self.graph, self.graph.dependencies(target)) {
            walk.visit(dep);
        }
        walk.order.push(target.to_string());

        let mut seen = HashSet::new();
        let steps: Vec<String> = walk
            .order
            .into_iter()
            .filter(|ep| seen.insert(ep.clone()))
            .collect();

        debug!(endpoint = target, steps = ?steps, "planned execution");
        ExecutionPlan { steps }
    }

    /// Order provider candidates for `name`, best first.
    ///
    /// A literal collection endpoint matching the parameter's likely provider
    /// (`/merchants` for `merchantId`) always wins. The rest sort by fewer
    /// path placeholders, then fewer required parameters, then path.
    pub fn rank<'s>(&self, name: &str, candidates: &'s [String]) -> Vec<&'s str> {
        let preferred = is_foreign_key(name)
            .then(|| self.classifier.likely_provider(name))
            .flatten()
            .map(|resource| format!("/{resource}"));

        let mut ranked = rank_endpoints(self.graph, candidates.iter().map(String::as_str));
        if let Some(preferred) = preferred {
            if let Some(pos) = ranked.iter().position(|c| *c == preferred) {
                let literal = ranked.remove(pos);
                ranked.insert(0, literal);
            }
        }
        ranked
    }
}

/// Plan with the built-in classifier table.
pub fn plan_execution<S: AsRef<str>>(
    target: &str,
    required: &[S],
    graph: &DependencyGraph,
    index: &ProviderIndex,
) -> ExecutionPlan {
    let classifier = ParameterClassifier::default();
    Planner::new(graph, index, &classifier).plan(target, required)
}

/// Sort endpoints so the ones that are simplest to satisfy come first.
fn rank_endpoints<'s>(
    graph: &DependencyGraph,
    endpoints: impl Iterator<Item = &'s str>,
) -> Vec<&'s str> {
    let mut ranked: Vec<&str> = endpoints.collect();
    ranked.sort_by_key(|path| {
        (
            placeholder_count(path),
            graph.required_params(path).len(),
            *path,
        )
    });
    ranked.dedup();
    ranked
}

struct Walk<'g, 't> {
    graph: &'g DependencyGraph,
    target: &'t str,
    visited: HashSet<String>,
    order: Vec<String>,
}

impl Walk<'_, '_> {
    fn visit(&mut self, endpoint: &str) {
        if endpoint == self.target || !self.visited.insert(endpoint.to_string()) {
            return;
        }
        let graph = self.graph;
        for dep in rank_endpoints(graph, graph.dependencies(endpoint)) {
            self.visit(dep);
        }
        self.order.push(endpoint.to_string());
    }
}
