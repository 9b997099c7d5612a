//! clap Command tree for the `openapi-chain` binary
//!
//! Global options configure the specification, HTTP executor and context
//! store; subcommands expose each analysis stage plus the resolver.

use clap::{Arg, ArgAction, Command};

use crate::dispatch::DEFAULT_MAX_PAGES;
use crate::spec::EndpointDescriptor;

/// Configuration for building the CLI.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct CliConfig {
    /// Root command name
    pub name: String,
    /// Root command about/description
    pub about: String,
    /// Base URL used when neither `--base-url` nor `API_BASE_URL` is set
    pub default_base_url: String,
}

impl CliConfig {
    pub fn new(
        name: impl Into<String>,
        about: impl Into<String>,
        default_base_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            about: about.into(),
            default_base_url: default_base_url.into(),
        }
    }
}

/// Build the root command.
///
/// Structure: `<name> [--global options] <subcommand> [args]`
pub fn build_cli(config: &CliConfig) -> Command {
    Command::new(config.name.clone())
        .about(config.about.clone())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("spec")
                .long("spec")
                .short('s')
                .global(true)
                .env("OPENAPI_CHAIN_SPEC")
                .help("OpenAPI / Swagger document (JSON or YAML)"),
        )
        .arg(
            Arg::new("base-url")
                .long("base-url")
                .global(true)
                .env("API_BASE_URL")
                .default_value(config.default_base_url.clone())
                .help("API base URL"),
        )
        .arg(
            Arg::new("api-key")
                .long("api-key")
                .global(true)
                .env("API_KEY")
                .hide_env_values(true)
                .help("Bearer token sent with every request"),
        )
        .arg(
            Arg::new("context-file")
                .long("context-file")
                .global(true)
                .env("OPENAPI_CHAIN_CONTEXT")
                .help("Where resolved values persist [default: ~/.openapi-chain/context.json]"),
        )
        .arg(
            Arg::new("non-interactive")
                .long("non-interactive")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Never prompt; list selections take the first row"),
        )
        .arg(
            Arg::new("max-pages")
                .long("max-pages")
                .global(true)
                .value_parser(clap::value_parser!(usize))
                .default_value(DEFAULT_MAX_PAGES.to_string())
                .help("Upper bound on pages fetched per call"),
        )
        .subcommand(Command::new("endpoints").about("List GET endpoints and their required parameters"))
        .subcommand(
            Command::new("classify")
                .about("Classify a parameter name")
                .arg(Arg::new("name").required(true).help("Parameter name"))
                .arg(
                    Arg::new("schema")
                        .long("schema")
                        .help("Parameter schema as a JSON string"),
                ),
        )
        .subcommand(
            Command::new("providers")
                .about("List endpoints whose responses carry a parameter")
                .arg(Arg::new("name").required(true).help("Parameter name")),
        )
        .subcommand(Command::new("graph").about("Print the endpoint dependency graph"))
        .subcommand(
            Command::new("plan")
                .about("Show the call order needed before an endpoint")
                .arg(endpoint_arg()),
        )
        .subcommand(
            Command::new("query")
                .about("Resolve parameters interactively and call an endpoint")
                .arg(endpoint_arg()),
        )
        .subcommand(
            Command::new("context")
                .about("Inspect or edit remembered values")
                .subcommand_required(true)
                .arg_required_else_help(true)
                .subcommand(Command::new("show").about("Print all remembered values"))
                .subcommand(Command::new("clear").about("Forget all remembered values"))
                .subcommand(
                    Command::new("set")
                        .about("Remember a value (parsed as JSON, else kept as a string)")
                        .arg(Arg::new("key").required(true))
                        .arg(Arg::new("value").required(true)),
                ),
        )
}

fn endpoint_arg() -> Arg {
    Arg::new("endpoint")
        .required(true)
        .help("Endpoint path (e.g. /users/{userId}) or operation id (e.g. list-users)")
}

/// Find a GET endpoint by path, raw operation id or its kebab-case form.
pub fn find_endpoint<'a>(
    endpoints: &'a [EndpointDescriptor],
    name: &str,
) -> Option<&'a EndpointDescriptor> {
    let gets = || endpoints.iter().filter(|e| e.is_get());
    gets().find(|e| e.path == name).or_else(|| {
        gets().find(|e| {
            !e.operation_id.is_empty()
                && (e.operation_id == name || normalize_operation_id(&e.operation_id) == name)
        })
    })
}

pub fn normalize_operation_id(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut result = String::with_capacity(s.len() + 4);
    for i in 0..chars.len() {
        let c = chars[i];
        if c.is_uppercase() {
            if i > 0 {
                let prev = chars[i - 1];
                let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_lowercase());
                if prev.is_lowercase() || (prev.is_uppercase() && next_is_lower) {
                    result.push('-');
                }
            }
            result.push(c.to_ascii_lowercase());
        } else if c == '_' {
            result.push('-');
        } else {
            result.push(c);
        }
    }
    result
}
