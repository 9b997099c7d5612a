//! Endpoint execution
//!
//! The resolver calls endpoints through [`ApiExecutor`]. [`HttpExecutor`] does
//! real authenticated HTTP with `hasNextPage` pagination; [`RegistryExecutor`]
//! is a static path → callable table for embedding and tests.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::{debug, info};

use crate::error::DispatchError;
use crate::extract::display;

/// Call arguments: parameter name → value.
pub type Params = BTreeMap<String, Value>;

/// Performs endpoint calls for the resolver.
pub trait ApiExecutor {
    /// Call the GET endpoint at `path` (a template such as `/users/{userId}`).
    fn call(&self, path: &str, params: &Params) -> Result<Value, DispatchError>;
}

/// Default upper bound on pages fetched for a single call.
pub const DEFAULT_MAX_PAGES: usize = 20;

/// Blocking HTTP executor.
#[derive(Debug, Clone)]
pub struct HttpExecutor {
    client: Client,
    base_url: String,
    api_key: String,
    max_pages: usize,
}

impl HttpExecutor {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into(),
            api_key: String::new(),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Bearer token sent with every request; empty disables the header.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    fn fetch(&self, path: &str, params: &Params) -> Result<Value, DispatchError> {
        let (url, query_pairs) = build_url(&self.base_url, path, params)?;
        info!(%url, "calling endpoint");

        let mut req = self.client.get(&url);
        if !self.api_key.is_empty() {
            req = req.bearer_auth(&self.api_key);
        }
        if !query_pairs.is_empty() {
            req = req.query(&query_pairs);
        }

        send_request(req)
    }
}

impl ApiExecutor for HttpExecutor {
    fn call(&self, path: &str, params: &Params) -> Result<Value, DispatchError> {
        let mut merged = self.fetch(path, params)?;
        if !has_next_page(&merged) || !merged.get("data").is_some_and(Value::is_array) {
            return Ok(merged);
        }

        let page_key = params
            .keys()
            .find(|k| k.eq_ignore_ascii_case("page"))
            .cloned()
            .unwrap_or_else(|| "page".to_string());
        let mut page = params.get(&page_key).and_then(page_number).unwrap_or(1);
        let mut params = params.clone();

        for _ in 1..self.max_pages {
            page += 1;
            params.insert(page_key.clone(), Value::from(page));
            let next = self.fetch(path, &params)?;
            debug!(page, "fetched next page");

            let more = has_next_page(&next);
            if let (Some(Value::Array(rows)), Some(Value::Array(new_rows))) =
                (merged.get_mut("data"), next.get("data"))
            {
                rows.extend(new_rows.iter().cloned());
            }
            if let Some(flag) = merged.get_mut("hasNextPage") {
                *flag = Value::Bool(more);
            }
            if !more {
                break;
            }
        }

        Ok(merged)
    }
}

fn has_next_page(response: &Value) -> bool {
    response
        .get("hasNextPage")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn page_number(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

/// Fill path placeholders; everything not consumed by the path becomes a
/// query pair.
fn build_url(
    base_url: &str,
    path: &str,
    params: &Params,
) -> Result<(String, Vec<(String, String)>), DispatchError> {
    let mut filled = String::with_capacity(path.len());
    let mut consumed = Vec::new();
    let mut rest = path;

    while let Some((open, close)) = rest
        .find('{')
        .and_then(|open| rest[open..].find('}').map(|len| (open, open + len)))
    {
        let name = &rest[open + 1..close];
        let value = params
            .get(name)
            .ok_or_else(|| DispatchError::MissingPathParam {
                path: path.to_string(),
                name: name.to_string(),
            })?;
        filled.push_str(&rest[..open]);
        filled.push_str(&urlencoding::encode(&display(value)));
        consumed.push(name);
        rest = &rest[close + 1..];
    }
    filled.push_str(rest);

    let url = format!("{}{}", base_url.trim_end_matches('/'), filled);

    let query_pairs = params
        .iter()
        .filter(|(name, _)| !consumed.contains(&name.as_str()))
        .map(|(name, value)| (name.clone(), display(value)))
        .collect();
    Ok((url, query_pairs))
}

fn send_request(req: reqwest::blocking::RequestBuilder) -> Result<Value, DispatchError> {
    let resp = req.send().map_err(DispatchError::RequestFailed)?;
    let status = resp.status();
    let text = resp.text().map_err(DispatchError::ResponseRead)?;

    if !status.is_success() {
        return Err(DispatchError::HttpError { status, body: text });
    }

    let value: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));
    Ok(value)
}

type Handler = Box<dyn Fn(&Params) -> Result<Value, DispatchError>>;

/// Executor backed by a table of endpoint path → callable, built up front.
#[derive(Default)]
pub struct RegistryExecutor {
    handlers: HashMap<String, Handler>,
}

impl RegistryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(mut self, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Params) -> Result<Value, DispatchError> + 'static,
    {
        self.handlers.insert(path.into(), Box::new(handler));
        self
    }

    pub fn contains(&self, path: &str) -> bool {
        self.handlers.contains_key(path)
    }
}

impl fmt::Debug for RegistryExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut paths: Vec<&String> = self.handlers.keys().collect();
        paths.sort();
        f.debug_struct("RegistryExecutor")
            .field("paths", &paths)
            .finish()
    }
}

impl ApiExecutor for RegistryExecutor {
    fn call(&self, path: &str, params: &Params) -> Result<Value, DispatchError> {
        let handler = self
            .handlers
            .get(path)
            .ok_or_else(|| DispatchError::UnknownEndpoint {
                path: path.to_string(),
            })?;
        handler(params)
    }
}
