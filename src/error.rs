//! Error types for the openapi-chain crate.

use thiserror::Error;

/// Errors raised by an [`ApiExecutor`](crate::dispatch::ApiExecutor) call.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DispatchError {
    #[error("no executor registered for endpoint: {path}")]
    UnknownEndpoint { path: String },

    #[error("missing value for path parameter {name} in {path}")]
    MissingPathParam { path: String, name: String },

    #[error("HTTP request failed")]
    RequestFailed(#[source] reqwest::Error),

    #[error("failed to read response body")]
    ResponseRead(#[source] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpError {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("provider call failed: {0}")]
    Other(String),
}

/// Errors raised while loading a specification document.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SpecError {
    #[error("failed to read specification: {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("specification is neither valid JSON nor YAML: {path}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("specification root must be an object")]
    NotAnObject,
}

/// Errors raised by a [`ContextStore`](crate::context::ContextStore).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ContextError {
    #[error("failed to access context file: {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("context file is not a JSON object: {path}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors raised by a [`PromptSource`](crate::prompt::PromptSource).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PromptError {
    #[error("input aborted by operator")]
    Aborted,

    #[error("no input available for {label} in non-interactive mode")]
    Unavailable { label: String },

    #[error("terminal interaction failed")]
    Terminal(#[source] dialoguer::Error),
}

/// Errors that escape parameter resolution.
///
/// Provider failures and context write failures degrade to manual entry or a
/// warning and never surface here; only the operator can stop a resolution.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ResolveError {
    #[error("could not obtain a value for {name}")]
    Prompt {
        name: String,
        #[source]
        source: PromptError,
    },

    #[error("target endpoint call failed: {path}")]
    Target {
        path: String,
        #[source]
        source: DispatchError,
    },
}
