//! Interactive parameter resolution
//!
//! For every parameter an endpoint needs, the resolver tries, in order: the
//! context store, a category shortcut (pagination default, yes/no, enum
//! choice), a provider endpoint whose response carries the value, and finally
//! manual entry. Resolving a provider's own arguments recurses; a stack of
//! names currently being resolved breaks cycles by forcing manual entry.

use std::collections::BTreeSet;
use std::ops::{Deref, DerefMut};

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::classify::{is_foreign_key, pagination_default, parameter_metadata, ParameterCategory};
use crate::context::ContextStore;
use crate::dispatch::{ApiExecutor, Params};
use crate::error::{PromptError, ResolveError};
use crate::extract::{display, extract_value, own_field, row_label, rows_for};
use crate::model::ApiModel;
use crate::plan::ExecutionPlan;
use crate::prompt::PromptSource;
use crate::schema::{SchemaFragment, SchemaType};
use crate::spec::{OpenApiSource, SpecificationSource};

/// Names being resolved on the current call chain.
#[derive(Debug, Clone, Default)]
pub struct ResolvingStack {
    names: Vec<String>,
}

impl ResolvingStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Mark `name` as in progress until the returned guard drops.
    /// Returns `None` if it already is, i.e. resolving it again would loop.
    pub fn enter(&mut self, name: &str) -> Option<StackGuard<'_>> {
        if self.contains(name) {
            return None;
        }
        self.names.push(name.to_string());
        Some(StackGuard { stack: self })
    }

    pub fn depth(&self) -> usize {
        self.names.len()
    }
}

/// Pops its name from the [`ResolvingStack`] when dropped.
#[derive(Debug)]
pub struct StackGuard<'s> {
    stack: &'s mut ResolvingStack,
}

impl Deref for StackGuard<'_> {
    type Target = ResolvingStack;

    fn deref(&self) -> &ResolvingStack {
        &*self.stack
    }
}

impl DerefMut for StackGuard<'_> {
    fn deref_mut(&mut self) -> &mut ResolvingStack {
        &mut *self.stack
    }
}

impl Drop for StackGuard<'_> {
    fn drop(&mut self) {
        self.stack.names.pop();
    }
}

/// Drives resolution against a built [`ApiModel`].
pub struct Resolver<'a, S = OpenApiSource> {
    model: &'a ApiModel<S>,
    context: &'a mut dyn ContextStore,
    executor: &'a dyn ApiExecutor,
    prompt: &'a mut dyn PromptSource,
}

impl<'a, S: SpecificationSource> Resolver<'a, S> {
    pub fn new(
        model: &'a ApiModel<S>,
        context: &'a mut dyn ContextStore,
        executor: &'a dyn ApiExecutor,
        prompt: &'a mut dyn PromptSource,
    ) -> Self {
        Self {
            model,
            context,
            executor,
            prompt,
        }
    }

    /// Resolve one parameter needed by `endpoint`, starting a fresh cycle
    /// check.
    pub fn resolve_parameter(
        &mut self,
        name: &str,
        schema: &SchemaFragment,
        endpoint: &str,
    ) -> Result<Value, ResolveError> {
        let mut stack = ResolvingStack::new();
        self.resolve_with(name, schema, endpoint, &mut stack)
    }

    /// Resolve every required parameter of the GET endpoint at `path`.
    pub fn resolve_endpoint(&mut self, path: &str) -> Result<Params, ResolveError> {
        let model = self.model;
        let mut args = Params::new();
        let Some(endpoint) = model.source().get_endpoint(path) else {
            return Ok(args);
        };
        for param in endpoint.required_params() {
            let value = self.resolve_parameter(&param.name, &param.schema, path)?;
            args.insert(param.name.clone(), value);
        }
        Ok(args)
    }

    /// Plan, run the prerequisite calls that supply still-unknown values, then
    /// call `target` and return its response.
    pub fn execute_plan(&mut self, target: &str) -> Result<Value, ResolveError> {
        let model = self.model;
        let plan = model.plan(target);
        info!(endpoint = target, steps = plan.len(), "executing plan");
        self.run_prerequisites(&plan);

        let args = self.resolve_endpoint(target)?;
        self.executor
            .call(target, &args)
            .map_err(|source| ResolveError::Target {
                path: target.to_string(),
                source,
            })
    }

    /// Resolve `name` with the given in-progress stack.
    pub fn resolve_with(
        &mut self,
        name: &str,
        schema: &SchemaFragment,
        endpoint: &str,
        stack: &mut ResolvingStack,
    ) -> Result<Value, ResolveError> {
        let Some(mut guard) = stack.enter(name) else {
            warn!(name, endpoint, "circular dependency; falling back to manual entry");
            return self.manual(name, schema);
        };

        if let Some(value) = self.context.get(name) {
            debug!(name, "using cached value");
            return Ok(value);
        }

        let model = self.model;
        let info = model.classifier().classify(name, schema);
        match &info.category {
            ParameterCategory::Pagination => {
                if let Some(value) = pagination_default(name) {
                    return Ok(self.remember(name, value));
                }
            }
            ParameterCategory::Boolean => {
                let answer = self
                    .prompt
                    .ask_yes_no(&format!("Set {name}?"))
                    .map_err(|e| prompt_failed(name, e))?;
                return Ok(self.remember(name, Value::Bool(answer)));
            }
            ParameterCategory::Enum { values } if !values.is_empty() => {
                let choice = self
                    .prompt
                    .ask_choice(&format!("Choose {name}"), values)
                    .map_err(|e| prompt_failed(name, e))?;
                let value = schema
                    .enum_values
                    .iter()
                    .flatten()
                    .find(|v| display(v) == choice)
                    .cloned()
                    .unwrap_or(Value::String(choice));
                return Ok(self.remember(name, value));
            }
            _ => {}
        }

        if let Some(value) = self.from_provider(name, endpoint, &mut guard)? {
            return Ok(self.remember(name, value));
        }
        // A cycle further down may have asked the operator for this very name.
        if let Some(value) = self.context.get(name) {
            return Ok(value);
        }
        self.manual(name, schema)
    }

    /// Look up, satisfy and call the best provider of `name`, then extract the
    /// value from its response. `None` means the caller should ask a human.
    fn from_provider(
        &mut self,
        name: &str,
        endpoint: &str,
        stack: &mut ResolvingStack,
    ) -> Result<Option<Value>, ResolveError> {
        let model = self.model;
        let ranked = model.planner().rank(name, model.index().providers(name));
        let Some(provider) = ranked.into_iter().find(|p| *p != endpoint) else {
            debug!(name, "no provider endpoint");
            return Ok(None);
        };
        let Some(descriptor) = model.source().get_endpoint(provider) else {
            return Ok(None);
        };
        info!(name, provider, "resolving via provider");

        let mut args = Params::new();
        for param in descriptor.required_params() {
            let value = self.resolve_with(&param.name, &param.schema, provider, stack)?;
            args.insert(param.name.clone(), value);
        }

        let response = match self.executor.call(provider, &args) {
            Ok(Value::Null) => return Ok(None),
            Ok(response) => response,
            Err(e) => {
                warn!(name, provider, error = %e, "provider call failed");
                return Ok(None);
            }
        };
        self.pick_values(&[name], &response)
            .map(|mut found| found.pop().flatten())
    }

    /// Extract each of `names` from a response. Fields the response object
    /// carries itself win; the rest come from one row of a list response,
    /// chosen by the operator.
    fn pick_values(
        &mut self,
        names: &[&str],
        response: &Value,
    ) -> Result<Vec<Option<Value>>, ResolveError> {
        let mut found: Vec<Option<Value>> =
            names.iter().map(|name| own_field(response, name)).collect();
        let Some(first) = names
            .iter()
            .zip(&found)
            .find_map(|(name, value)| value.is_none().then_some(*name))
        else {
            return Ok(found);
        };

        let row = match rows_for(response, first) {
            Some([]) => return Ok(found),
            Some(rows) => {
                let labels: Vec<String> = rows.iter().map(|r| row_label(r, first)).collect();
                let idx = self
                    .prompt
                    .select_row(&format!("Select {first}"), &labels)
                    .map_err(|e| prompt_failed(first, e))?;
                rows.get(idx).unwrap_or(&rows[0])
            }
            None => response,
        };

        for (name, slot) in names.iter().zip(found.iter_mut()) {
            if slot.is_none() {
                *slot = extract_value(row, name, is_foreign_key(name));
            }
        }
        Ok(found)
    }

    fn run_prerequisites(&mut self, plan: &ExecutionPlan) {
        let model = self.model;
        let needed: BTreeSet<&str> = plan
            .steps()
            .iter()
            .flat_map(|step| model.graph().required_params(step))
            .map(String::as_str)
            .collect();

        for step in plan.prerequisites() {
            if let Err(e) = self.run_step(step, &needed) {
                warn!(step = %step, error = %e, "skipping plan step");
            }
        }
    }

    /// Call one prerequisite endpoint if it still supplies something unknown.
    fn run_step(&mut self, step: &str, needed: &BTreeSet<&str>) -> Result<(), ResolveError> {
        if self.unsupplied(step, needed).is_empty() {
            debug!(step, "nothing left to supply; skipping");
            return Ok(());
        }
        let args = self.resolve_endpoint(step)?;
        let provides = self.unsupplied(step, needed);
        if provides.is_empty() {
            return Ok(());
        }

        let response = match self.executor.call(step, &args) {
            Ok(response) => response,
            Err(e) => {
                warn!(step, error = %e, "plan step failed");
                return Ok(());
            }
        };
        let values = self.pick_values(&provides, &response)?;
        for (name, value) in provides.into_iter().zip(values) {
            if let Some(value) = value {
                self.remember(name, value);
            }
        }
        Ok(())
    }

    /// Names in `needed` that `step` provides and the context lacks.
    fn unsupplied<'n>(&self, step: &str, needed: &BTreeSet<&'n str>) -> Vec<&'n str> {
        let index = self.model.index();
        needed
            .iter()
            .copied()
            .filter(|name| self.context.get(name).is_none())
            .filter(|name| index.providers(name).iter().any(|p| p == step))
            .collect()
    }

    fn manual(&mut self, name: &str, schema: &SchemaFragment) -> Result<Value, ResolveError> {
        let raw = self
            .prompt
            .ask_value(&manual_label(name, schema))
            .map_err(|e| prompt_failed(name, e))?;
        Ok(self.remember(name, coerce(&raw, schema)))
    }

    /// Persist a resolved value; a failed write only costs a future re-prompt.
    fn remember(&mut self, name: &str, value: Value) -> Value {
        if let Err(e) = self.context.put(name, value.clone()) {
            warn!(name, error = %e, "could not persist resolved value");
        }
        value
    }
}

fn prompt_failed(name: &str, source: PromptError) -> ResolveError {
    ResolveError::Prompt {
        name: name.to_string(),
        source,
    }
}

fn manual_label(name: &str, schema: &SchemaFragment) -> String {
    let mut label = format!("Enter value for required param '{name}'");
    let metadata = parameter_metadata(schema);
    if let Some(Value::String(description)) = metadata.get("description") {
        label.push_str(&format!(" ({description})"));
    }
    if let Some(Value::String(format)) = metadata.get("format") {
        label.push_str(&format!(" [{format}]"));
    }
    label
}

/// Interpret manual input according to the declared type; unparseable input
/// stays a string.
fn coerce(raw: &str, schema: &SchemaFragment) -> Value {
    let trimmed = raw.trim();
    match schema.schema_type {
        Some(SchemaType::Integer) => trimmed
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| Value::String(raw.to_string())),
        Some(SchemaType::Number) => trimmed
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(raw.to_string())),
        Some(SchemaType::Boolean) => match trimmed.to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" => Value::Bool(true),
            "false" | "no" | "n" => Value::Bool(false),
            _ => Value::String(raw.to_string()),
        },
        _ => Value::String(raw.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::MemoryContext;
    use crate::dispatch::RegistryExecutor;
    use crate::error::DispatchError;
    use crate::prompt::NonInteractive;
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Prompt double: answers from queues, records every label it was shown.
    #[derive(Default)]
    struct Scripted {
        values: VecDeque<String>,
        yes_no: VecDeque<bool>,
        choices: VecDeque<String>,
        rows: VecDeque<usize>,
        asked: Vec<String>,
    }

    impl PromptSource for Scripted {
        fn ask_value(&mut self, label: &str) -> Result<String, PromptError> {
            self.asked.push(label.to_string());
            self.values.pop_front().ok_or(PromptError::Aborted)
        }

        fn ask_choice(&mut self, label: &str, _options: &[String]) -> Result<String, PromptError> {
            self.asked.push(label.to_string());
            self.choices.pop_front().ok_or(PromptError::Aborted)
        }

        fn ask_yes_no(&mut self, label: &str) -> Result<bool, PromptError> {
            self.asked.push(label.to_string());
            self.yes_no.pop_front().ok_or(PromptError::Aborted)
        }

        fn select_row(&mut self, label: &str, _rows: &[String]) -> Result<usize, PromptError> {
            self.asked.push(label.to_string());
            Ok(self.rows.pop_front().unwrap_or(0))
        }
    }

    type CallLog = Rc<RefCell<Vec<(String, Params)>>>;

    /// Registry executor that records calls and answers with fixed bodies.
    fn recording(responses: &[(&str, Value)]) -> (RegistryExecutor, CallLog) {
        let log: CallLog = Rc::default();
        let mut executor = RegistryExecutor::new();
        for (path, body) in responses {
            let log = Rc::clone(&log);
            let path_owned = path.to_string();
            let body = body.clone();
            executor = executor.register(*path, move |params: &Params| {
                log.borrow_mut().push((path_owned.clone(), params.clone()));
                Ok(body.clone())
            });
        }
        (executor, log)
    }

    fn ok(props: &[&str]) -> Value {
        let properties: serde_json::Map<String, Value> = props
            .iter()
            .map(|p| (p.to_string(), json!({ "type": "string" })))
            .collect();
        json!({ "200": { "content": { "application/json": { "schema": {
            "type": "object", "properties": properties
        } } } } })
    }

    fn list_of(props: &[&str]) -> Value {
        let properties: serde_json::Map<String, Value> = props
            .iter()
            .map(|p| (p.to_string(), json!({ "type": "string" })))
            .collect();
        json!({ "200": { "content": { "application/json": { "schema": {
            "type": "object",
            "properties": { "data": { "type": "array", "items": {
                "type": "object", "properties": properties
            } } }
        } } } } })
    }

    fn required(name: &str) -> Value {
        json!({ "name": name, "in": "query", "required": true, "schema": { "type": "string" } })
    }

    fn model(paths: Value) -> ApiModel {
        ApiModel::new(OpenApiSource::new(&json!({ "openapi": "3.0.0", "paths": paths })))
    }

    fn string_schema() -> SchemaFragment {
        SchemaFragment::of_type(SchemaType::String)
    }

    #[test]
    fn stack_guard_pops_on_drop() {
        let mut stack = ResolvingStack::new();
        {
            let mut outer = stack.enter("aId").unwrap();
            assert!(outer.enter("aId").is_none());
            {
                let inner = outer.enter("bId").unwrap();
                assert_eq!(inner.depth(), 2);
            }
            assert_eq!(outer.depth(), 1);
        }
        assert_eq!(stack.depth(), 0);
        assert!(!stack.contains("aId"));
    }

    #[test]
    fn pagination_resolves_without_prompt_or_call() {
        let model = model(json!({}));
        let mut ctx = MemoryContext::new();
        let (executor, log) = recording(&[]);
        let mut prompt = Scripted::default();

        let mut resolver = Resolver::new(&model, &mut ctx, &executor, &mut prompt);
        let value = resolver
            .resolve_parameter("page", &SchemaFragment::of_type(SchemaType::Integer), "/orders")
            .unwrap();
        let size = resolver
            .resolve_parameter("pageSize", &SchemaFragment::default(), "/orders")
            .unwrap();

        assert_eq!(value, json!(1));
        assert_eq!(size, json!(50));
        assert!(prompt.asked.is_empty());
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn cached_value_short_circuits_providers() {
        let model = model(json!({
            "/users": { "get": { "responses": ok(&["userId"]) } }
        }));
        let mut ctx: MemoryContext = [("userId".to_string(), json!("cached"))].into_iter().collect();
        let (executor, log) = recording(&[("/users", json!({ "userId": "fresh" }))]);
        let mut prompt = Scripted::default();

        let value = Resolver::new(&model, &mut ctx, &executor, &mut prompt)
            .resolve_parameter("userId", &string_schema(), "/posts")
            .unwrap();

        assert_eq!(value, json!("cached"));
        assert!(log.borrow().is_empty());
        assert!(prompt.asked.is_empty());
    }

    #[test]
    fn provider_list_uses_selected_row() {
        let model = model(json!({
            "/items": { "get": { "responses": list_of(&["itemId"]) } }
        }));
        let body = json!({ "data": [{ "itemId": "x1" }, { "itemId": "x2" }] });

        for (row, expected) in [(0, "x1"), (1, "x2")] {
            let mut ctx = MemoryContext::new();
            let (executor, log) = recording(&[("/items", body.clone())]);
            let mut prompt = Scripted {
                rows: VecDeque::from([row]),
                ..Scripted::default()
            };

            let value = Resolver::new(&model, &mut ctx, &executor, &mut prompt)
                .resolve_parameter("itemId", &string_schema(), "/orders")
                .unwrap();

            assert_eq!(value, json!(expected));
            assert_eq!(ctx.get("itemId"), Some(json!(expected)));
            assert_eq!(log.borrow().len(), 1);
        }
    }

    #[test]
    fn provider_object_response_extracts_directly() {
        let model = model(json!({
            "/me": { "get": { "responses": ok(&["accountId"]) } }
        }));
        let mut ctx = MemoryContext::new();
        let (executor, _log) = recording(&[("/me", json!({ "account_id": "acc-9" }))]);
        let mut prompt = Scripted::default();

        let value = Resolver::new(&model, &mut ctx, &executor, &mut prompt)
            .resolve_parameter("accountId", &string_schema(), "/invoices")
            .unwrap();
        assert_eq!(value, json!("acc-9"));
        assert!(prompt.asked.is_empty());
    }

    #[test]
    fn provider_object_field_wins_over_nested_list() {
        let model = model(json!({
            "/orders/current": { "get": { "responses": ok(&["orderId"]) } }
        }));
        let mut ctx = MemoryContext::new();
        let (executor, _log) = recording(&[(
            "/orders/current",
            json!({ "orderId": "o1", "items": [{ "productId": "p1" }] }),
        )]);
        let mut prompt = NonInteractive;

        let value = Resolver::new(&model, &mut ctx, &executor, &mut prompt)
            .resolve_parameter("orderId", &string_schema(), "/invoices")
            .unwrap();

        assert_eq!(value, json!("o1"));
        assert_eq!(ctx.get("orderId"), Some(json!("o1")));
    }

    #[test]
    fn plan_step_mixes_own_fields_and_selected_row() {
        let model = model(json!({
            "/stores/current": { "get": { "responses": {
                "200": { "content": { "application/json": { "schema": {
                    "type": "object",
                    "properties": {
                        "storeId": { "type": "string" },
                        "results": { "type": "array", "items": {
                            "type": "object", "properties": { "shelfId": { "type": "string" } }
                        } }
                    }
                } } } }
            } } },
            "/stock": { "get": {
                "parameters": [required("storeId"), required("shelfId")],
                "responses": {}
            } }
        }));
        let mut ctx = MemoryContext::new();
        let (executor, log) = recording(&[
            (
                "/stores/current",
                json!({ "storeId": "s1", "results": [{ "shelfId": "a" }, { "shelfId": "b" }] }),
            ),
            ("/stock", json!({ "count": 3 })),
        ]);
        let mut prompt = Scripted {
            rows: VecDeque::from([1]),
            ..Scripted::default()
        };

        Resolver::new(&model, &mut ctx, &executor, &mut prompt)
            .execute_plan("/stock")
            .unwrap();

        let calls = log.borrow();
        assert_eq!(calls[0].0, "/stores/current");
        let (path, args) = calls.last().unwrap();
        assert_eq!(path, "/stock");
        assert_eq!(args.get("storeId"), Some(&json!("s1")));
        assert_eq!(args.get("shelfId"), Some(&json!("b")));
        assert_eq!(prompt.asked, vec!["Select shelfId".to_string()]);
    }

    #[test]
    fn provider_arguments_are_resolved_recursively() {
        let model = model(json!({
            "/orgs": { "get": { "responses": list_of(&["orgId"]) } },
            "/teams": { "get": { "parameters": [required("orgId")], "responses": list_of(&["teamId"]) } }
        }));
        let mut ctx = MemoryContext::new();
        let (executor, log) = recording(&[
            ("/orgs", json!({ "data": [{ "orgId": "o1" }] })),
            ("/teams", json!({ "data": [{ "teamId": "t1" }] })),
        ]);
        let mut prompt = Scripted::default();

        let value = Resolver::new(&model, &mut ctx, &executor, &mut prompt)
            .resolve_parameter("teamId", &string_schema(), "/members")
            .unwrap();

        assert_eq!(value, json!("t1"));
        let calls = log.borrow();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].0, "/orgs");
        assert_eq!(calls[1].0, "/teams");
        assert_eq!(calls[1].1.get("orgId"), Some(&json!("o1")));
        assert_eq!(ctx.get("orgId"), Some(json!("o1")));
    }

    #[test]
    fn circular_providers_fall_back_to_manual_entry() {
        let model = model(json!({
            "/a": { "get": { "parameters": [required("bId")], "responses": ok(&["aId"]) } },
            "/b": { "get": { "parameters": [required("aId")], "responses": ok(&["bId"]) } }
        }));
        let mut ctx = MemoryContext::new();
        // No handlers: every provider call fails.
        let executor = RegistryExecutor::new();
        let mut prompt = Scripted {
            values: VecDeque::from(["manual-b".to_string(), "manual-a".to_string()]),
            ..Scripted::default()
        };

        let value = Resolver::new(&model, &mut ctx, &executor, &mut prompt)
            .resolve_parameter("bId", &string_schema(), "/a")
            .unwrap();

        assert_eq!(value, json!("manual-b"));
        assert_eq!(prompt.asked.len(), 2);
        assert!(prompt.asked[0].contains("bId"));
        assert!(prompt.asked[1].contains("aId"));
        assert_eq!(ctx.get("aId"), Some(json!("manual-a")));
    }

    #[test]
    fn circular_providers_still_use_working_calls() {
        let model = model(json!({
            "/a": { "get": { "parameters": [required("bId")], "responses": ok(&["aId"]) } },
            "/b": { "get": { "parameters": [required("aId")], "responses": ok(&["bId"]) } }
        }));
        let mut ctx = MemoryContext::new();
        let (executor, log) = recording(&[
            ("/a", json!({ "aId": "a1" })),
            ("/b", json!({ "bId": "b1" })),
        ]);
        let mut prompt = Scripted {
            values: VecDeque::from(["seed-b".to_string()]),
            ..Scripted::default()
        };

        let value = Resolver::new(&model, &mut ctx, &executor, &mut prompt)
            .resolve_parameter("bId", &string_schema(), "/a")
            .unwrap();

        assert_eq!(value, json!("b1"));
        assert_eq!(prompt.asked.len(), 1);
        let calls = log.borrow();
        assert_eq!(calls[0].0, "/a");
        assert_eq!(calls[0].1.get("bId"), Some(&json!("seed-b")));
        assert_eq!(calls[1].0, "/b");
        assert_eq!(calls[1].1.get("aId"), Some(&json!("a1")));
    }

    #[test]
    fn missing_provider_prompts_and_persists() {
        let model = model(json!({}));
        let mut ctx = MemoryContext::new();
        let executor = RegistryExecutor::new();
        let mut prompt = Scripted {
            values: VecDeque::from(["42".to_string()]),
            ..Scripted::default()
        };

        let value = Resolver::new(&model, &mut ctx, &executor, &mut prompt)
            .resolve_parameter("quantity", &SchemaFragment::of_type(SchemaType::Integer), "/x")
            .unwrap();

        assert_eq!(value, json!(42));
        assert_eq!(ctx.get("quantity"), Some(json!(42)));
    }

    #[test]
    fn failing_provider_degrades_to_manual_entry() {
        let model = model(json!({
            "/users": { "get": { "responses": ok(&["userId"]) } }
        }));
        let mut ctx = MemoryContext::new();
        let executor = RegistryExecutor::new().register("/users", |_: &Params| {
            Err(DispatchError::Other("connection reset".into()))
        });
        let mut prompt = Scripted {
            values: VecDeque::from(["u-manual".to_string()]),
            ..Scripted::default()
        };

        let value = Resolver::new(&model, &mut ctx, &executor, &mut prompt)
            .resolve_parameter("userId", &string_schema(), "/posts")
            .unwrap();
        assert_eq!(value, json!("u-manual"));
    }

    #[test]
    fn empty_list_degrades_to_manual_entry() {
        let model = model(json!({
            "/users": { "get": { "responses": list_of(&["userId"]) } }
        }));
        let mut ctx = MemoryContext::new();
        let (executor, _log) = recording(&[("/users", json!({ "data": [] }))]);
        let mut prompt = Scripted {
            values: VecDeque::from(["u-manual".to_string()]),
            ..Scripted::default()
        };

        let value = Resolver::new(&model, &mut ctx, &executor, &mut prompt)
            .resolve_parameter("userId", &string_schema(), "/posts")
            .unwrap();
        assert_eq!(value, json!("u-manual"));
    }

    #[test]
    fn boolean_and_enum_use_prompts() {
        let model = model(json!({}));
        let mut ctx = MemoryContext::new();
        let executor = RegistryExecutor::new();
        let mut prompt = Scripted {
            yes_no: VecDeque::from([true]),
            choices: VecDeque::from(["2".to_string()]),
            ..Scripted::default()
        };

        let mut resolver = Resolver::new(&model, &mut ctx, &executor, &mut prompt);
        let flag = resolver
            .resolve_parameter("archived", &SchemaFragment::of_type(SchemaType::Boolean), "/x")
            .unwrap();
        let level = resolver
            .resolve_parameter(
                "level",
                &SchemaFragment::from_value(&json!({ "type": "integer", "enum": [1, 2, 3] })),
                "/x",
            )
            .unwrap();

        assert_eq!(flag, json!(true));
        assert_eq!(level, json!(2), "choice maps back to the declared enum value");
    }

    #[test]
    fn operator_abort_surfaces_as_error() {
        let model = model(json!({}));
        let mut ctx = MemoryContext::new();
        let executor = RegistryExecutor::new();
        let mut prompt = Scripted::default();

        let err = Resolver::new(&model, &mut ctx, &executor, &mut prompt)
            .resolve_parameter("name", &string_schema(), "/x")
            .unwrap_err();
        assert!(matches!(err, ResolveError::Prompt { ref name, .. } if name == "name"));
    }

    #[test]
    fn execute_plan_runs_providers_then_target() {
        let model = model(json!({
            "/users": { "get": { "responses": list_of(&["userId"]) } },
            "/posts": { "get": { "parameters": [required("userId")], "responses": {} } }
        }));
        let mut ctx = MemoryContext::new();
        let (executor, log) = recording(&[
            ("/users", json!({ "data": [{ "userId": "u1" }, { "userId": "u2" }] })),
            ("/posts", json!({ "data": [{ "title": "hello" }] })),
        ]);
        let mut prompt = Scripted {
            rows: VecDeque::from([1]),
            ..Scripted::default()
        };

        let response = Resolver::new(&model, &mut ctx, &executor, &mut prompt)
            .execute_plan("/posts")
            .unwrap();

        assert_eq!(response["data"][0]["title"], "hello");
        let calls = log.borrow();
        let order: Vec<&str> = calls.iter().map(|(p, _)| p.as_str()).collect();
        assert_eq!(order, vec!["/users", "/posts"]);
        assert_eq!(calls[1].1.get("userId"), Some(&json!("u2")));
    }

    #[test]
    fn execute_plan_skips_steps_already_satisfied() {
        let model = model(json!({
            "/users": { "get": { "responses": list_of(&["userId"]) } },
            "/posts": { "get": { "parameters": [required("userId")], "responses": {} } }
        }));
        let mut ctx: MemoryContext = [("userId".to_string(), json!("known"))].into_iter().collect();
        let (executor, log) = recording(&[
            ("/users", json!({ "data": [] })),
            ("/posts", json!([])),
        ]);
        let mut prompt = Scripted::default();

        Resolver::new(&model, &mut ctx, &executor, &mut prompt)
            .execute_plan("/posts")
            .unwrap();

        let calls = log.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "/posts");
    }

    #[test]
    fn coerce_follows_schema_type() {
        let int = SchemaFragment::of_type(SchemaType::Integer);
        let num = SchemaFragment::of_type(SchemaType::Number);
        let boolean = SchemaFragment::of_type(SchemaType::Boolean);
        assert_eq!(coerce(" 7 ", &int), json!(7));
        assert_eq!(coerce("abc", &int), json!("abc"));
        assert_eq!(coerce("1.5", &num), json!(1.5));
        assert_eq!(coerce("yes", &boolean), json!(true));
        assert_eq!(coerce("x", &SchemaFragment::default()), json!("x"));
    }
}
