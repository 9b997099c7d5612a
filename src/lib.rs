//! Resolve OpenAPI parameter dependencies by chaining calls.
//!
//! Reads an OpenAPI (or Swagger 2.0) document, classifies every parameter,
//! indexes which GET endpoints return which fields, and builds a dependency
//! graph between endpoints. The resolver then fills in the parameters an
//! endpoint needs: from remembered values, pagination defaults, provider
//! endpoint calls, or by asking the operator.
//!
//! # Usage
//!
//! ```no_run
//! use openapi_chain::{
//!     ApiModel, FileContext, HttpExecutor, OpenApiSource, Resolver, TerminalPrompt,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let model = ApiModel::new(OpenApiSource::load("openapi.yaml")?);
//! let mut context = FileContext::open(FileContext::default_path())?;
//! let executor = HttpExecutor::new("https://api.example.com").with_api_key("secret");
//! let mut prompt = TerminalPrompt::new();
//!
//! let mut resolver = Resolver::new(&model, &mut context, &executor, &mut prompt);
//! let response = resolver.execute_plan("/merchants/{merchantId}/locations")?;
//! println!("{response:#}");
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod classify;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod extract;
pub mod model;
pub mod plan;
pub mod prompt;
pub mod provider;
pub mod resolve;
pub mod schema;
pub mod spec;

pub use builder::{build_cli, find_endpoint, normalize_operation_id, CliConfig};
pub use classify::{
    is_foreign_key, pagination_default, parameter_metadata, ParameterCategory,
    ParameterClassifier, ParameterInfo,
};
pub use context::{ContextStore, FileContext, MemoryContext};
pub use dispatch::{ApiExecutor, HttpExecutor, Params, RegistryExecutor};
pub use error::{ContextError, DispatchError, PromptError, ResolveError, SpecError};
pub use extract::extract_value;
pub use model::ApiModel;
pub use plan::{plan_execution, ExecutionPlan, Planner};
pub use prompt::{NonInteractive, PromptSource, TerminalPrompt};
pub use provider::{DependencyGraph, ProviderIndex};
pub use resolve::{Resolver, ResolvingStack};
pub use schema::{SchemaFragment, SchemaType};
pub use spec::{
    load_document, EndpointDescriptor, OpenApiSource, ParamLocation, ParameterDescriptor,
    SpecificationSource,
};

// Re-export dependencies for downstream crates
pub use clap;
pub use reqwest;
