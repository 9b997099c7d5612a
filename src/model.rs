//! The analysed API: built once per session, shared by reference afterwards.

use crate::classify::ParameterClassifier;
use crate::plan::{ExecutionPlan, Planner};
use crate::provider::{DependencyGraph, ProviderIndex};
use crate::spec::{OpenApiSource, SpecificationSource};

/// A specification source together with everything derived from it.
#[derive(Debug, Clone)]
pub struct ApiModel<S = OpenApiSource> {
    source: S,
    classifier: ParameterClassifier,
    index: ProviderIndex,
    graph: DependencyGraph,
}

impl<S: SpecificationSource> ApiModel<S> {
    pub fn new(source: S) -> Self {
        Self::with_classifier(source, ParameterClassifier::default())
    }

    pub fn with_classifier(source: S, classifier: ParameterClassifier) -> Self {
        let index = ProviderIndex::build(&source);
        let graph = DependencyGraph::build(source.endpoints(), &index);
        Self {
            source,
            classifier,
            index,
            graph,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn classifier(&self) -> &ParameterClassifier {
        &self.classifier
    }

    pub fn index(&self) -> &ProviderIndex {
        &self.index
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn planner(&self) -> Planner<'_> {
        Planner::new(&self.graph, &self.index, &self.classifier)
    }

    /// Plan calls for `target` using its own required parameters.
    pub fn plan(&self, target: &str) -> ExecutionPlan {
        self.planner()
            .plan(target, self.graph.required_params(target))
    }
}
