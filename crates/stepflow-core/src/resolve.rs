//! Missing-parameter resolution: the explicit phase between sanitization and
//! strict validation that fills remaining `MISSING` required values.
//!
//! Resolution strategies are injected (interactive prompt, config lookup, or
//! scripted callback) so the engine itself stays free of I/O and is testable
//! with a fake resolver. After bare value resolution, per-capability
//! parameter hooks run; hooks may derive or augment params beyond simple
//! key/value filling and must be idempotent.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::{Map, Value};
use thiserror::Error;

use stepflow_types::workflow::{WorkflowDefinition, is_missing};

use crate::registry::CapabilityRegistry;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised during the resolution phase.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The resolver cannot supply a value (user aborted, non-interactive
    /// mode, no config entry).
    #[error("no value for parameter '{param}' of '{step_type}'{}",
            .step_index.map(|i| format!(" (step {i})")).unwrap_or_default())]
    Unresolved {
        step_index: Option<usize>,
        step_type: String,
        param: String,
    },

    /// A parameter hook failed.
    #[error("parameter hook for '{key}' failed: {message}")]
    Hook { key: String, message: String },
}

// ---------------------------------------------------------------------------
// Resolver strategies
// ---------------------------------------------------------------------------

/// Pluggable strategy supplying values for parameters still carrying the
/// `MISSING` sentinel, keyed by `(step_index, step_type, param)`.
/// `step_index` is `None` for trigger parameters.
///
/// Object-safe: methods return boxed futures so implementations can be held
/// behind `&dyn` / `Arc<dyn>`.
pub trait MissingValueResolver: Send + Sync {
    fn resolve<'a>(
        &'a self,
        step_index: Option<usize>,
        step_type: &'a str,
        param: &'a str,
    ) -> BoxFuture<'a, Result<Value, ResolveError>>;
}

/// Scripted resolver backed by a map. Lookup order: `"<step_type>.<param>"`
/// first, then bare `"<param>"`. Used by tests and the CLI's `--set` flags.
#[derive(Debug, Default)]
pub struct MapResolver {
    values: HashMap<String, Value>,
}

impl MapResolver {
    pub fn new(values: HashMap<String, Value>) -> Self {
        Self { values }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }
}

impl MissingValueResolver for MapResolver {
    fn resolve<'a>(
        &'a self,
        step_index: Option<usize>,
        step_type: &'a str,
        param: &'a str,
    ) -> BoxFuture<'a, Result<Value, ResolveError>> {
        Box::pin(async move {
            let qualified = format!("{step_type}.{param}");
            self.values
                .get(&qualified)
                .or_else(|| self.values.get(param))
                .cloned()
                .ok_or(ResolveError::Unresolved {
                    step_index,
                    step_type: step_type.to_string(),
                    param: param.to_string(),
                })
        })
    }
}

/// Resolver for non-interactive contexts: every request fails, which turns
/// unresolved parameters into hard errors.
pub struct FailingResolver;

impl MissingValueResolver for FailingResolver {
    fn resolve<'a>(
        &'a self,
        step_index: Option<usize>,
        step_type: &'a str,
        param: &'a str,
    ) -> BoxFuture<'a, Result<Value, ResolveError>> {
        Box::pin(async move {
            Err(ResolveError::Unresolved {
                step_index,
                step_type: step_type.to_string(),
                param: param.to_string(),
            })
        })
    }
}

// ---------------------------------------------------------------------------
// Parameter hooks
// ---------------------------------------------------------------------------

/// Per-capability callback that can transform or augment a step's params
/// after bare value resolution.
///
/// Hooks must be idempotent: applying a hook to already-resolved params must
/// not change the result.
pub trait ParameterHook: Send + Sync {
    /// Capability key this hook applies to.
    fn key(&self) -> &str;

    fn apply<'a>(
        &'a self,
        step_index: usize,
        params: &'a mut Map<String, Value>,
        resolver: &'a dyn MissingValueResolver,
    ) -> BoxFuture<'a, Result<(), ResolveError>>;
}

/// Registry of parameter hooks keyed by capability key.
#[derive(Default, Clone)]
pub struct HookSet {
    hooks: HashMap<String, Arc<dyn ParameterHook>>,
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The hooks shipped with the built-in catalog.
    pub fn builtin() -> Self {
        Self::new().with_hook(Arc::new(NotionParentHook))
    }

    pub fn with_hook(mut self, hook: Arc<dyn ParameterHook>) -> Self {
        self.hooks.insert(hook.key().to_string(), hook);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Arc<dyn ParameterHook>> {
        self.hooks.get(key)
    }
}

/// `notion.create_page` needs to know whether `parent_id` names a database
/// or a page. When `parent_type` is absent, ask the resolver; anything other
/// than "database"/"page" falls back to "database".
pub struct NotionParentHook;

impl ParameterHook for NotionParentHook {
    fn key(&self) -> &str {
        "notion.create_page"
    }

    fn apply<'a>(
        &'a self,
        step_index: usize,
        params: &'a mut Map<String, Value>,
        resolver: &'a dyn MissingValueResolver,
    ) -> BoxFuture<'a, Result<(), ResolveError>> {
        Box::pin(async move {
            if params.contains_key("parent_type") {
                return Ok(());
            }

            let choice = match resolver
                .resolve(Some(step_index), self.key(), "parent_type")
                .await
            {
                Ok(Value::String(s)) => s.trim().to_lowercase(),
                _ => String::new(),
            };
            let parent_type = match choice.as_str() {
                "database" | "page" => choice,
                other => {
                    tracing::warn!(
                        step_index,
                        value = other,
                        "invalid notion parent type, defaulting to 'database'"
                    );
                    "database".to_string()
                }
            };
            params.insert("parent_type".to_string(), Value::String(parent_type));
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// Resolution phase
// ---------------------------------------------------------------------------

/// Fill every required parameter still carrying the `MISSING` sentinel, then
/// run parameter hooks.
pub async fn resolve_missing_params(
    workflow: &mut WorkflowDefinition,
    registry: &CapabilityRegistry,
    resolver: &dyn MissingValueResolver,
    hooks: &HookSet,
) -> Result<(), ResolveError> {
    let trigger_key = workflow.trigger.key();
    resolve_params_for(
        None,
        &trigger_key,
        &mut workflow.trigger.params,
        registry,
        resolver,
    )
    .await?;

    for (index, step) in workflow.steps.iter_mut().enumerate() {
        resolve_params_for(
            Some(index),
            &step.step_type.clone(),
            &mut step.params,
            registry,
            resolver,
        )
        .await?;

        if let Some(hook) = hooks.get(&step.step_type) {
            hook.apply(index, &mut step.params, resolver).await?;
        }
    }

    Ok(())
}

async fn resolve_params_for(
    step_index: Option<usize>,
    key: &str,
    params: &mut Map<String, Value>,
    registry: &CapabilityRegistry,
    resolver: &dyn MissingValueResolver,
) -> Result<(), ResolveError> {
    for param in registry.required_params(key) {
        let needs_value = params.get(param).map(is_missing).unwrap_or(true);
        if !needs_value {
            continue;
        }
        let value = resolver.resolve(step_index, key, param).await?;
        tracing::debug!(?step_index, key, param, "resolved missing parameter");
        params.insert(param.to_string(), value);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
