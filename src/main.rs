use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::ArgMatches;
use serde_json::{json, Value};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use openapi_chain::{
    build_cli, find_endpoint, parameter_metadata, ApiModel, CliConfig, ContextStore, FileContext,
    HttpExecutor, NonInteractive, OpenApiSource, ParameterCategory, PromptSource, Resolver,
    SchemaFragment, SpecificationSource, TerminalPrompt,
};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = CliConfig::new(
        "openapi-chain",
        "Resolve OpenAPI parameter dependencies by chaining provider calls",
        "http://localhost:8080",
    );
    let matches = build_cli(&config).get_matches();

    let Some((command, sub)) = matches.subcommand() else {
        bail!("no subcommand given");
    };

    if command == "context" {
        return run_context(&matches, sub);
    }

    let model = load_model(&matches)?;
    let output = match command {
        "endpoints" => list_endpoints(&model),
        "classify" => classify(&model, sub)?,
        "providers" => {
            let name = required_str(sub, "name")?;
            json!(model.index().providers(name))
        }
        "graph" => serde_json::to_value(model.graph())?,
        "plan" => {
            let path = endpoint_path(&model, sub)?;
            serde_json::to_value(model.plan(&path))?
        }
        "query" => query(&model, &matches, sub)?,
        other => bail!("unknown subcommand: {other}"),
    };

    print_json(&output)
}

fn load_model(matches: &ArgMatches) -> Result<ApiModel> {
    let spec = matches
        .get_one::<String>("spec")
        .context("--spec (or OPENAPI_CHAIN_SPEC) is required")?;
    let source =
        OpenApiSource::load(spec).with_context(|| format!("failed to load specification {spec}"))?;
    debug!(endpoints = source.endpoints().len(), "specification loaded");
    Ok(ApiModel::new(source))
}

fn open_context(matches: &ArgMatches) -> Result<FileContext> {
    let path = matches
        .get_one::<String>("context-file")
        .map(PathBuf::from)
        .unwrap_or_else(FileContext::default_path);
    FileContext::open(&path).with_context(|| format!("failed to open context {}", path.display()))
}

fn list_endpoints(model: &ApiModel) -> Value {
    let endpoints: Vec<Value> = model
        .source()
        .endpoints()
        .iter()
        .filter(|e| e.is_get())
        .map(|e| {
            json!({
                "path": e.path,
                "operationId": e.operation_id,
                "summary": e.summary,
                "required": e.required_params().map(|p| p.name.as_str()).collect::<Vec<_>>(),
            })
        })
        .collect();
    Value::Array(endpoints)
}

fn classify(model: &ApiModel, sub: &ArgMatches) -> Result<Value> {
    let name = required_str(sub, "name")?;
    let schema = match sub.get_one::<String>("schema") {
        Some(raw) => {
            let value: Value = serde_json::from_str(raw).context("--schema must be valid JSON")?;
            SchemaFragment::from_value(&value)
        }
        None => SchemaFragment::default(),
    };

    let info = model.classifier().classify(name, &schema);
    let mut out = json!({
        "name": info.name,
        "category": info.category.as_str(),
        "schemaType": info.schema_type.as_ref().map(|t| t.as_str()),
        "pattern": info.pattern,
        "metadata": parameter_metadata(&schema),
        "providers": model.index().providers(name),
    });
    match &info.category {
        ParameterCategory::ForeignKey { likely_provider } => {
            out["likelyProvider"] = json!(likely_provider);
        }
        ParameterCategory::Enum { values } => out["values"] = json!(values),
        _ => {}
    }
    Ok(out)
}

fn query(model: &ApiModel, matches: &ArgMatches, sub: &ArgMatches) -> Result<Value> {
    let path = endpoint_path(model, sub)?;

    let base_url = required_str(matches, "base-url")?;
    let mut executor = HttpExecutor::new(base_url);
    if let Some(key) = matches.get_one::<String>("api-key") {
        executor = executor.with_api_key(key);
    }
    if let Some(max_pages) = matches.get_one::<usize>("max-pages") {
        executor = executor.with_max_pages(*max_pages);
    }

    let mut context = open_context(matches)?;
    let mut prompt: Box<dyn PromptSource> = if matches.get_flag("non-interactive") {
        Box::new(NonInteractive)
    } else {
        Box::new(TerminalPrompt::new())
    };

    let mut resolver = Resolver::new(model, &mut context, &executor, &mut *prompt);
    resolver
        .execute_plan(&path)
        .with_context(|| format!("query {path} failed"))
}

fn run_context(matches: &ArgMatches, sub: &ArgMatches) -> Result<()> {
    let mut context = open_context(matches)?;
    match sub.subcommand() {
        Some(("show", _)) => print_json(&json!(context.entries())),
        Some(("clear", _)) => {
            context.clear()?;
            eprintln!("Cleared {}", context.path().display());
            Ok(())
        }
        Some(("set", args)) => {
            let key = required_str(args, "key")?;
            let raw = required_str(args, "value")?;
            let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.into()));
            context.put(key, value)?;
            Ok(())
        }
        _ => bail!("expected one of: show, clear, set"),
    }
}

/// Accept a path or operation id; paths unknown to the document pass through.
fn endpoint_path(model: &ApiModel, sub: &ArgMatches) -> Result<String> {
    let name = required_str(sub, "endpoint")?;
    match find_endpoint(model.source().endpoints(), name) {
        Some(endpoint) => Ok(endpoint.path.clone()),
        None if name.starts_with('/') => Ok(name.to_string()),
        None => bail!("no GET endpoint matches {name}"),
    }
}

fn required_str<'m>(matches: &'m ArgMatches, id: &str) -> Result<&'m str> {
    matches
        .get_one::<String>(id)
        .map(String::as_str)
        .with_context(|| format!("missing argument: {id}"))
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
