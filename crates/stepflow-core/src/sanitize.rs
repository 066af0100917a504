//! Sanitizer and validator: turn an untrusted workflow document into one
//! that satisfies every capability contract, or fail with a precise
//! diagnostic.
//!
//! Sanitization is a sequence of repair passes over loose JSON (order
//! matters -- later passes assume earlier normalization):
//!
//! 1. trigger key normalization (dotted-string triggers split, unknown
//!    triggers replaced by the configured fallback)
//! 2. trigger inference from step `suggested_trigger` declarations, with a
//!    caller-supplied chooser as the last resort
//! 3. required-param completion (catalog default where declared, else the
//!    `MISSING` sentinel)
//! 4. per-step normalization (unknown types rewritten to the fallback
//!    capability, family discriminator injection, cron syntax check)
//! 5. placeholder scrubbing (denylisted sample values replaced by `MISSING`)
//!
//! Strict validation is a separate, non-repairing pass: after sanitization
//! and missing-value resolution, every required parameter must be present
//! and not the sentinel.

use std::path::Path;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use stepflow_types::capability::CapabilitySpec;
use stepflow_types::diagnostic::Diagnostic;
use stepflow_types::workflow::{
    MISSING, STEP_TYPE_KEY, StepDefinition, TriggerDefinition, WorkflowDefinition, is_missing,
};

use crate::registry::CapabilityRegistry;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while loading or sanitizing a document.
#[derive(Debug, Error)]
pub enum SanitizeError {
    /// Document is not parseable as a workflow at all.
    #[error("parse error: {0}")]
    Parse(String),

    /// The sanitizer configuration references an unknown capability.
    #[error("sanitizer config references unknown capability '{0}'")]
    BadConfig(String),

    /// Filesystem I/O failure while loading a document.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Structural validation failures. Fatal: these abort before execution and
/// are never silently repaired.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Trigger key not present in the registry as a trigger.
    #[error("unknown trigger '{key}'")]
    UnknownTrigger { key: String },

    /// Step type not present in the registry as an action.
    #[error("step {index}: unknown step type '{key}'")]
    UnknownStepType { index: usize, key: String },

    /// A required parameter is absent or still the `MISSING` sentinel.
    #[error("required parameter '{param}' of '{step_type}' is missing{}",
            .step_index.map(|i| format!(" (step {i})")).unwrap_or_default())]
    MissingParam {
        /// `None` for the trigger.
        step_index: Option<usize>,
        step_type: String,
        param: String,
    },
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Sample values known to be emitted by upstream generators. Matched exactly
/// (case-insensitive) against string parameter values and replaced with the
/// `MISSING` sentinel so they never reach a live external system.
///
/// This is a policy table, not a heuristic: extend or replace it via
/// [`SanitizerConfig::placeholder_denylist`].
pub const DEFAULT_PLACEHOLDER_DENYLIST: &[&str] = &[
    "my-org/my-repo",
    "your-org/your-repo",
    "<owner>/<repo>",
    "you@example.com",
    "user@example.com",
    "https://example.com",
    "[MISSING_PAGE_ID]",
    "[DISCORD_WEBHOOK_URL]",
    "dummy-id",
];

/// Tunable sanitizer policy.
#[derive(Debug, Clone)]
pub struct SanitizerConfig {
    /// Trigger adopted when a document's trigger is unknown or cannot be
    /// inferred.
    pub fallback_trigger: String,
    /// Side-effect-free capability that unknown step types are rewritten to.
    pub fallback_step: String,
    /// Placeholder scrubbing policy table.
    pub placeholder_denylist: Vec<String>,
    /// Capability families routed through one shared connector; their steps
    /// get the `_step_type` discriminator injected for family dispatch.
    pub discriminator_families: Vec<String>,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            fallback_trigger: "scheduler.cron".to_string(),
            fallback_step: "doc.generate_summary".to_string(),
            placeholder_denylist: DEFAULT_PLACEHOLDER_DENYLIST
                .iter()
                .map(|s| s.to_string())
                .collect(),
            discriminator_families: vec!["github".to_string(), "notion".to_string()],
        }
    }
}

// ---------------------------------------------------------------------------
// Trigger chooser
// ---------------------------------------------------------------------------

/// Caller-supplied strategy for picking a trigger when a document has none
/// and no step suggests one. The CLI implements this with an interactive
/// select; tests script it.
pub trait TriggerChooser {
    /// Pick one of the registry's trigger keys, or `None` to accept the
    /// configured fallback.
    fn choose(&self, options: &[&str]) -> Option<String>;
}

/// Chooser that always defers to the configured fallback trigger.
pub struct NullTriggerChooser;

impl TriggerChooser for NullTriggerChooser {
    fn choose(&self, _options: &[&str]) -> Option<String> {
        None
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Result of a sanitization run: the repaired workflow plus everything that
/// was changed along the way.
#[derive(Debug, Clone)]
pub struct SanitizeOutcome {
    pub workflow: WorkflowDefinition,
    pub diagnostics: Vec<Diagnostic>,
}

// ---------------------------------------------------------------------------
// Sanitizer
// ---------------------------------------------------------------------------

/// Repairs raw workflow documents against a capability registry.
pub struct Sanitizer {
    registry: Arc<CapabilityRegistry>,
    config: SanitizerConfig,
}

impl Sanitizer {
    /// Create a sanitizer, verifying the configured fallbacks exist in the
    /// registry with the right kinds.
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        config: SanitizerConfig,
    ) -> Result<Self, SanitizeError> {
        if !registry.is_trigger(&config.fallback_trigger) {
            return Err(SanitizeError::BadConfig(config.fallback_trigger));
        }
        match registry.lookup(&config.fallback_step) {
            Some(_) if !registry.is_trigger(&config.fallback_step) => {}
            _ => return Err(SanitizeError::BadConfig(config.fallback_step)),
        }
        Ok(Self { registry, config })
    }

    /// Sanitize with the default (non-interactive) trigger chooser.
    pub fn sanitize(&self, raw: Value) -> Result<SanitizeOutcome, SanitizeError> {
        self.sanitize_with(raw, &NullTriggerChooser)
    }

    /// Sanitize a raw document, consulting `chooser` when no trigger can be
    /// inferred.
    pub fn sanitize_with(
        &self,
        raw: Value,
        chooser: &dyn TriggerChooser,
    ) -> Result<SanitizeOutcome, SanitizeError> {
        let doc = match raw {
            Value::Object(map) => map,
            other => {
                return Err(SanitizeError::Parse(format!(
                    "workflow document must be a JSON object, got {other}"
                )));
            }
        };

        let mut diagnostics = Vec::new();

        let name = match doc.get("name").and_then(Value::as_str) {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => {
                diagnostics.push(Diagnostic::warning(
                    "document has no name, defaulting to 'untitled-workflow'",
                ));
                "untitled-workflow".to_string()
            }
        };
        let version = doc
            .get("version")
            .and_then(Value::as_str)
            .unwrap_or("1.0")
            .to_string();

        let raw_steps = match doc.get("steps") {
            Some(Value::Array(items)) => items.clone(),
            Some(other) => {
                return Err(SanitizeError::Parse(format!(
                    "'steps' must be an array, got {other}"
                )));
            }
            None => Vec::new(),
        };

        let trigger =
            self.normalize_trigger(doc.get("trigger"), &raw_steps, chooser, &mut diagnostics);
        let steps = self.normalize_steps(raw_steps, &mut diagnostics);

        let mut workflow = WorkflowDefinition {
            name,
            version,
            trigger,
            steps,
        };
        self.scrub_placeholders(&mut workflow, &mut diagnostics);

        Ok(SanitizeOutcome {
            workflow,
            diagnostics,
        })
    }

    // -- Pass 1 + 2: trigger normalization and inference --

    fn normalize_trigger(
        &self,
        raw: Option<&Value>,
        raw_steps: &[Value],
        chooser: &dyn TriggerChooser,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TriggerDefinition {
        let parsed = match raw {
            // Single dotted string: "scheduler.cron"
            Some(Value::String(key)) => split_key(key).map(|(t, e)| (t, e, Map::new())),
            Some(Value::Object(map)) => {
                let trigger_type = map.get("type").and_then(Value::as_str).unwrap_or_default();
                let event = map.get("event").and_then(Value::as_str);
                let params = map
                    .get("params")
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                match event {
                    Some(event) if !trigger_type.is_empty() => {
                        Some((trigger_type.to_string(), event.to_string(), params))
                    }
                    // `type` holds the whole dotted key and `event` is absent.
                    None => split_key(trigger_type).map(|(t, e)| (t, e, params)),
                    _ => None,
                }
            }
            _ => None,
        };

        match parsed {
            Some((trigger_type, event, params)) => {
                let key = format!("{trigger_type}.{event}");
                match self.registry.lookup(&key) {
                    Some(spec) if self.registry.is_trigger(&key) => {
                        let mut trigger = TriggerDefinition {
                            trigger_type,
                            event,
                            params,
                        };
                        self.complete_required_params(spec, &mut trigger.params);
                        self.check_cron_expression(spec, &mut trigger.params, diagnostics);
                        trigger
                    }
                    _ => {
                        diagnostics.push(Diagnostic::warning(format!(
                            "unknown trigger '{key}', falling back to '{}'",
                            self.config.fallback_trigger
                        )));
                        self.adopted_trigger(&self.config.fallback_trigger)
                    }
                }
            }
            None => self.infer_trigger(raw_steps, chooser, diagnostics),
        }
    }

    fn infer_trigger(
        &self,
        raw_steps: &[Value],
        chooser: &dyn TriggerChooser,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> TriggerDefinition {
        // First step whose capability declares a suggested trigger wins.
        for step in raw_steps {
            let Some(step_type) = step.get("type").and_then(Value::as_str) else {
                continue;
            };
            if let Some(suggested) = self
                .registry
                .lookup(step_type)
                .and_then(|spec| spec.suggested_trigger.as_deref())
            {
                if self.registry.is_trigger(suggested) {
                    diagnostics.push(Diagnostic::info(format!(
                        "no trigger declared, adopting '{suggested}' suggested by '{step_type}'"
                    )));
                    return self.adopted_trigger(suggested);
                }
            }
        }

        // Last resort: ask the caller to pick from the closed set.
        let options = self.registry.trigger_keys();
        if let Some(choice) = chooser.choose(&options) {
            if self.registry.is_trigger(&choice) {
                diagnostics.push(Diagnostic::info(format!(
                    "no trigger declared, using caller-selected '{choice}'"
                )));
                return self.adopted_trigger(&choice);
            }
        }

        diagnostics.push(Diagnostic::warning(format!(
            "no trigger declared, falling back to '{}'",
            self.config.fallback_trigger
        )));
        self.adopted_trigger(&self.config.fallback_trigger)
    }

    /// Build a trigger the sanitizer introduced itself, populated with the
    /// capability's default params.
    fn adopted_trigger(&self, key: &str) -> TriggerDefinition {
        let spec = self
            .registry
            .lookup(key)
            .expect("adopted trigger keys are checked against the registry");
        let (trigger_type, event) =
            split_key(key).expect("trigger keys are dotted 'type.event' pairs");
        TriggerDefinition {
            trigger_type,
            event,
            params: default_params(spec),
        }
    }

    // -- Pass 3: required-param completion --

    /// Fill absent required params: catalog default where declared, `MISSING`
    /// otherwise. Defaults that are merely sample values are scrubbed back to
    /// `MISSING` by the denylist pass.
    fn complete_required_params(&self, spec: &CapabilitySpec, params: &mut Map<String, Value>) {
        for param in spec.params.iter().filter(|p| p.required) {
            if !params.contains_key(&param.name) {
                let value = param
                    .default
                    .clone()
                    .unwrap_or_else(|| Value::String(MISSING.to_string()));
                params.insert(param.name.clone(), value);
            }
        }
    }

    // -- Pass 4: per-step normalization --

    fn normalize_steps(
        &self,
        raw_steps: Vec<Value>,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> Vec<StepDefinition> {
        raw_steps
            .into_iter()
            .enumerate()
            .map(|(index, raw)| self.normalize_step(index, raw, diagnostics))
            .collect()
    }

    fn normalize_step(
        &self,
        index: usize,
        raw: Value,
        diagnostics: &mut Vec<Diagnostic>,
    ) -> StepDefinition {
        let map = raw.as_object().cloned().unwrap_or_default();
        let step_type = map
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let params = map
            .get("params")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let condition = map
            .get("condition")
            .and_then(Value::as_str)
            .map(str::to_string);

        let mut step = match self.registry.lookup(&step_type) {
            Some(spec) if !self.registry.is_trigger(&step_type) => {
                let mut step = StepDefinition {
                    step_type,
                    params,
                    condition,
                };
                self.complete_required_params(spec, &mut step.params);
                step
            }
            _ => {
                // Unrecognized instruction: rewrite to the safe fallback so it
                // can never reach execution with unknown semantics.
                let discarded = if step_type.is_empty() {
                    "<none>".to_string()
                } else {
                    step_type
                };
                diagnostics.push(
                    Diagnostic::warning(format!(
                        "unknown step type '{discarded}', rewritten to '{}'",
                        self.config.fallback_step
                    ))
                    .for_step(index),
                );
                let spec = self
                    .registry
                    .lookup(&self.config.fallback_step)
                    .expect("fallback step is checked against the registry");
                StepDefinition {
                    step_type: self.config.fallback_step.clone(),
                    params: default_params(spec),
                    condition,
                }
            }
        };

        if self
            .config
            .discriminator_families
            .iter()
            .any(|family| family == step.family())
        {
            step.params.insert(
                STEP_TYPE_KEY.to_string(),
                Value::String(step.step_type.clone()),
            );
        }

        step
    }

    /// Reject cron expressions that will never parse, forcing re-resolution.
    fn check_cron_expression(
        &self,
        spec: &CapabilitySpec,
        params: &mut Map<String, Value>,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        if spec.key != "scheduler.cron" {
            return;
        }
        let Some(Value::String(expression)) = params.get("expression") else {
            return;
        };
        if expression == MISSING || expression.contains("{{") {
            return;
        }
        if expression.parse::<croner::Cron>().is_err() {
            diagnostics.push(Diagnostic::warning(format!(
                "invalid cron expression '{expression}'"
            )));
            params.insert(
                "expression".to_string(),
                Value::String(MISSING.to_string()),
            );
        }
    }

    // -- Pass 5: placeholder scrubbing --

    fn scrub_placeholders(
        &self,
        workflow: &mut WorkflowDefinition,
        diagnostics: &mut Vec<Diagnostic>,
    ) {
        let scrubbed = self.scrub_map(&mut workflow.trigger.params);
        for param in scrubbed {
            diagnostics.push(Diagnostic::warning(format!(
                "placeholder value for trigger parameter '{param}' scrubbed"
            )));
        }
        for (index, step) in workflow.steps.iter_mut().enumerate() {
            let scrubbed = self.scrub_map(&mut step.params);
            for param in scrubbed {
                diagnostics.push(
                    Diagnostic::warning(format!("placeholder value for parameter '{param}' scrubbed"))
                        .for_step(index),
                );
            }
        }
    }

    fn scrub_map(&self, params: &mut Map<String, Value>) -> Vec<String> {
        let mut scrubbed = Vec::new();
        for (key, value) in params.iter_mut() {
            if key == STEP_TYPE_KEY {
                continue;
            }
            let Value::String(text) = value else { continue };
            if self
                .config
                .placeholder_denylist
                .iter()
                .any(|entry| entry.eq_ignore_ascii_case(text))
            {
                *value = Value::String(MISSING.to_string());
                scrubbed.push(key.clone());
            }
        }
        scrubbed
    }
}

// ---------------------------------------------------------------------------
// Strict validation
// ---------------------------------------------------------------------------

/// Verify every capability contract after sanitization and resolution.
///
/// Never repairs: any required parameter that is absent or still `MISSING`
/// is a hard failure naming the step index, type, and parameter.
pub fn validate_workflow(
    workflow: &WorkflowDefinition,
    registry: &CapabilityRegistry,
) -> Result<(), ValidationError> {
    let trigger_key = workflow.trigger.key();
    if !registry.is_trigger(&trigger_key) {
        return Err(ValidationError::UnknownTrigger { key: trigger_key });
    }
    check_params(
        registry,
        &trigger_key,
        &workflow.trigger.params,
        None,
    )?;

    for (index, step) in workflow.steps.iter().enumerate() {
        match registry.lookup(&step.step_type) {
            Some(_) if !registry.is_trigger(&step.step_type) => {}
            _ => {
                return Err(ValidationError::UnknownStepType {
                    index,
                    key: step.step_type.clone(),
                });
            }
        }
        check_params(registry, &step.step_type, &step.params, Some(index))?;
    }

    Ok(())
}

fn check_params(
    registry: &CapabilityRegistry,
    key: &str,
    params: &Map<String, Value>,
    step_index: Option<usize>,
) -> Result<(), ValidationError> {
    for param in registry.required_params(key) {
        let present = params.get(param).map(|v| !is_missing(v)).unwrap_or(false);
        if !present {
            return Err(ValidationError::MissingParam {
                step_index,
                step_type: key.to_string(),
                param: param.to_string(),
            });
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Document loading
// ---------------------------------------------------------------------------

/// Load a workflow document from a JSON or YAML file.
pub fn load_document(path: &Path) -> Result<Value, SanitizeError> {
    let content = std::fs::read_to_string(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("yaml") | Some("yml")
    );
    if is_yaml {
        serde_yaml_ng::from_str(&content).map_err(|e| SanitizeError::Parse(e.to_string()))
    } else {
        serde_json::from_str(&content).map_err(|e| SanitizeError::Parse(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Split a dotted capability key into `(type, event)` at the first dot.
fn split_key(key: &str) -> Option<(String, String)> {
    key.split_once('.')
        .filter(|(t, e)| !t.is_empty() && !e.is_empty())
        .map(|(t, e)| (t.to_string(), e.to_string()))
}

/// All declared defaults of a capability; required params without a default
/// get the `MISSING` sentinel.
fn default_params(spec: &CapabilitySpec) -> Map<String, Value> {
    let mut params = Map::new();
    for param in &spec.params {
        match (&param.default, param.required) {
            (Some(default), _) => {
                params.insert(param.name.clone(), default.clone());
            }
            (None, true) => {
                params.insert(param.name.clone(), Value::String(MISSING.to_string()));
            }
            (None, false) => {}
        }
    }
    params
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stepflow_types::diagnostic::Severity;

    fn sanitizer() -> Sanitizer {
        Sanitizer::new(
            Arc::new(CapabilityRegistry::builtin()),
            SanitizerConfig::default(),
        )
        .unwrap()
    }

    struct FixedChooser(&'static str);

    impl TriggerChooser for FixedChooser {
        fn choose(&self, _options: &[&str]) -> Option<String> {
            Some(self.0.to_string())
        }
    }

    // -----------------------------------------------------------------------
    // Trigger normalization
    // -----------------------------------------------------------------------

    #[test]
    fn test_dotted_string_trigger_normalized() {
        let outcome = sanitizer()
            .sanitize(json!({
                "name": "morning-digest",
                "trigger": "scheduler.cron",
                "steps": []
            }))
            .unwrap();
        let trigger = &outcome.workflow.trigger;
        assert_eq!(trigger.trigger_type, "scheduler");
        assert_eq!(trigger.event, "cron");
        assert_eq!(trigger.params["expression"], json!("0 9 * * *"));
    }

    #[test]
    fn test_dotted_type_field_without_event_normalized() {
        let outcome = sanitizer()
            .sanitize(json!({
                "name": "morning-digest",
                "trigger": { "type": "scheduler.cron" },
                "steps": []
            }))
            .unwrap();
        let trigger = &outcome.workflow.trigger;
        assert_eq!(trigger.trigger_type, "scheduler");
        assert_eq!(trigger.event, "cron");
        assert_eq!(trigger.params["expression"], json!("0 9 * * *"));
    }

    #[test]
    fn test_unknown_trigger_replaced_with_fallback() {
        let outcome = sanitizer()
            .sanitize(json!({
                "name": "wf",
                "trigger": { "type": "carrier", "event": "pigeon" },
                "steps": []
            }))
            .unwrap();
        assert_eq!(outcome.workflow.trigger.key(), "scheduler.cron");
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| d.severity == Severity::Warning
                && d.message.contains("unknown trigger 'carrier.pigeon'")));
    }

    #[test]
    fn test_trigger_inferred_from_suggested() {
        let outcome = sanitizer()
            .sanitize(json!({
                "name": "wf",
                "steps": [
                    { "type": "ai.summarize", "params": { "text": "hi" } },
                    { "type": "github.create_issue", "params": {} }
                ]
            }))
            .unwrap();
        assert_eq!(outcome.workflow.trigger.key(), "github.issue_created");
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| d.message.contains("suggested by 'github.create_issue'")));
    }

    #[test]
    fn test_trigger_chosen_by_caller() {
        let outcome = sanitizer()
            .sanitize_with(
                json!({
                    "name": "wf",
                    "steps": [{ "type": "ai.summarize", "params": { "text": "hi" } }]
                }),
                &FixedChooser("webhook.receive"),
            )
            .unwrap();
        assert_eq!(outcome.workflow.trigger.key(), "webhook.receive");
    }

    #[test]
    fn test_no_trigger_no_chooser_falls_back() {
        let outcome = sanitizer()
            .sanitize(json!({
                "name": "wf",
                "steps": [{ "type": "ai.summarize", "params": { "text": "hi" } }]
            }))
            .unwrap();
        assert_eq!(outcome.workflow.trigger.key(), "scheduler.cron");
    }

    // -----------------------------------------------------------------------
    // Required-param completion
    // -----------------------------------------------------------------------

    #[test]
    fn test_required_param_without_default_becomes_missing() {
        let outcome = sanitizer()
            .sanitize(json!({
                "name": "wf",
                "trigger": "webhook.receive",
                "steps": [{ "type": "notion.create_page", "params": {} }]
            }))
            .unwrap();
        assert!(is_missing(&outcome.workflow.steps[0].params["parent_id"]));
    }

    #[test]
    fn test_fake_default_scrubbed_back_to_missing() {
        // github.issue_created's default repo is a denylisted sample value:
        // the default fills the param, the scrub pass replaces it.
        let outcome = sanitizer()
            .sanitize(json!({
                "name": "wf",
                "trigger": "github.issue_created",
                "steps": []
            }))
            .unwrap();
        assert!(is_missing(&outcome.workflow.trigger.params["repo"]));
    }

    #[test]
    fn test_supplied_params_untouched() {
        let outcome = sanitizer()
            .sanitize(json!({
                "name": "wf",
                "trigger": {
                    "type": "github", "event": "issue_created",
                    "params": { "repo": "acme/widgets" }
                },
                "steps": []
            }))
            .unwrap();
        assert_eq!(
            outcome.workflow.trigger.params["repo"],
            json!("acme/widgets")
        );
    }

    // -----------------------------------------------------------------------
    // Step normalization
    // -----------------------------------------------------------------------

    #[test]
    fn test_unknown_step_rewritten_to_fallback() {
        let outcome = sanitizer()
            .sanitize(json!({
                "name": "wf",
                "trigger": "webhook.receive",
                "steps": [{ "type": "foo.bar", "params": { "anything": 1 } }]
            }))
            .unwrap();
        let step = &outcome.workflow.steps[0];
        assert_eq!(step.step_type, "doc.generate_summary");
        assert_eq!(step.params["text"], json!("Here's what happened today..."));
        assert!(!step.params.contains_key("anything"));
        assert!(outcome.diagnostics.iter().any(|d| {
            d.step_index == Some(0) && d.message.contains("unknown step type 'foo.bar'")
        }));
    }

    #[test]
    fn test_trigger_key_used_as_step_rewritten() {
        // A trigger capability cannot appear as a step.
        let outcome = sanitizer()
            .sanitize(json!({
                "name": "wf",
                "trigger": "webhook.receive",
                "steps": [{ "type": "scheduler.cron", "params": {} }]
            }))
            .unwrap();
        assert_eq!(outcome.workflow.steps[0].step_type, "doc.generate_summary");
    }

    #[test]
    fn test_discriminator_injected_for_family_steps() {
        let outcome = sanitizer()
            .sanitize(json!({
                "name": "wf",
                "trigger": "webhook.receive",
                "steps": [
                    { "type": "github.close_issue",
                      "params": { "repo": "acme/widgets", "issue_number": 7 } },
                    { "type": "ai.summarize", "params": { "text": "hi" } }
                ]
            }))
            .unwrap();
        assert_eq!(
            outcome.workflow.steps[0].params[STEP_TYPE_KEY],
            json!("github.close_issue")
        );
        assert!(!outcome.workflow.steps[1].params.contains_key(STEP_TYPE_KEY));
    }

    #[test]
    fn test_condition_preserved() {
        let outcome = sanitizer()
            .sanitize(json!({
                "name": "wf",
                "trigger": "webhook.receive",
                "steps": [{
                    "type": "ai.summarize",
                    "params": { "text": "hi" },
                    "condition": "trigger.urgent == true"
                }]
            }))
            .unwrap();
        assert_eq!(
            outcome.workflow.steps[0].condition.as_deref(),
            Some("trigger.urgent == true")
        );
    }

    // -----------------------------------------------------------------------
    // Cron expression check
    // -----------------------------------------------------------------------

    #[test]
    fn test_invalid_cron_expression_scrubbed() {
        let outcome = sanitizer()
            .sanitize(json!({
                "name": "wf",
                "trigger": {
                    "type": "scheduler", "event": "cron",
                    "params": { "expression": "every tuesday-ish" }
                },
                "steps": []
            }))
            .unwrap();
        assert!(is_missing(&outcome.workflow.trigger.params["expression"]));
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| d.message.contains("invalid cron expression")));
    }

    #[test]
    fn test_valid_cron_expression_kept() {
        let outcome = sanitizer()
            .sanitize(json!({
                "name": "wf",
                "trigger": {
                    "type": "scheduler", "event": "cron",
                    "params": { "expression": "*/15 * * * *" }
                },
                "steps": []
            }))
            .unwrap();
        assert_eq!(
            outcome.workflow.trigger.params["expression"],
            json!("*/15 * * * *")
        );
    }

    // -----------------------------------------------------------------------
    // Placeholder scrubbing
    // -----------------------------------------------------------------------

    #[test]
    fn test_denylisted_value_scrubbed_case_insensitively() {
        let outcome = sanitizer()
            .sanitize(json!({
                "name": "wf",
                "trigger": "webhook.receive",
                "steps": [{
                    "type": "github.create_issue",
                    "params": { "repo": "MY-ORG/MY-REPO", "title": "Real title" }
                }]
            }))
            .unwrap();
        let step = &outcome.workflow.steps[0];
        assert!(is_missing(&step.params["repo"]));
        assert_eq!(step.params["title"], json!("Real title"));
    }

    // -----------------------------------------------------------------------
    // Idempotence
    // -----------------------------------------------------------------------

    #[test]
    fn test_sanitize_is_idempotent() {
        let sanitizer = sanitizer();
        let doc = json!({
            "name": "wf",
            "trigger": "github.issue_created",
            "steps": [
                { "type": "foo.bar" },
                { "type": "github.create_issue", "params": { "repo": "my-org/my-repo" } },
                { "type": "ai.summarize", "params": { "text": "{{ trigger.body }}" } }
            ]
        });

        let first = sanitizer.sanitize(doc).unwrap();
        let second = sanitizer
            .sanitize(serde_json::to_value(&first.workflow).unwrap())
            .unwrap();

        assert_eq!(first.workflow, second.workflow);
        // Second pass has nothing left to repair.
        assert!(second
            .diagnostics
            .iter()
            .all(|d| d.severity != Severity::Warning));
    }

    // -----------------------------------------------------------------------
    // Strict validation
    // -----------------------------------------------------------------------

    #[test]
    fn test_validation_rejects_missing_sentinel() {
        let registry = CapabilityRegistry::builtin();
        let outcome = sanitizer()
            .sanitize(json!({
                "name": "wf",
                "trigger": "webhook.receive",
                "steps": [{ "type": "notion.create_page", "params": {} }]
            }))
            .unwrap();

        let err = validate_workflow(&outcome.workflow, &registry).unwrap_err();
        match err {
            ValidationError::MissingParam {
                step_index,
                step_type,
                param,
            } => {
                assert_eq!(step_index, Some(0));
                assert_eq!(step_type, "notion.create_page");
                assert_eq!(param, "parent_id");
            }
            other => panic!("expected MissingParam, got {other:?}"),
        }
    }

    #[test]
    fn test_validation_error_names_location() {
        let err = ValidationError::MissingParam {
            step_index: Some(2),
            step_type: "slack.send_message".to_string(),
            param: "channel".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("step 2"), "got: {msg}");
        assert!(msg.contains("slack.send_message"));
        assert!(msg.contains("channel"));
    }

    #[test]
    fn test_validation_accepts_complete_workflow() {
        let registry = CapabilityRegistry::builtin();
        let outcome = sanitizer()
            .sanitize(json!({
                "name": "issue-digest",
                "trigger": {
                    "type": "github", "event": "issue_created",
                    "params": { "repo": "acme/widgets" }
                },
                "steps": [
                    { "type": "ai.summarize", "params": { "text": "{{ trigger.body }}" } },
                    { "type": "slack.send_message",
                      "params": { "channel": "#eng", "message": "{{ steps.0.output }}" } }
                ]
            }))
            .unwrap();
        assert!(validate_workflow(&outcome.workflow, &registry).is_ok());
    }

    #[test]
    fn test_validation_rejects_unknown_trigger() {
        let registry = CapabilityRegistry::builtin();
        let workflow = WorkflowDefinition {
            name: "wf".to_string(),
            version: "1.0".to_string(),
            trigger: TriggerDefinition {
                trigger_type: "carrier".to_string(),
                event: "pigeon".to_string(),
                params: Map::new(),
            },
            steps: vec![],
        };
        assert!(matches!(
            validate_workflow(&workflow, &registry),
            Err(ValidationError::UnknownTrigger { key }) if key == "carrier.pigeon"
        ));
    }

    // -----------------------------------------------------------------------
    // Document loading
    // -----------------------------------------------------------------------

    #[test]
    fn test_load_json_and_yaml_documents() {
        let dir = tempfile::tempdir().unwrap();

        let json_path = dir.path().join("wf.json");
        std::fs::write(&json_path, r#"{"name":"wf","trigger":"scheduler.cron"}"#).unwrap();
        let doc = load_document(&json_path).unwrap();
        assert_eq!(doc["name"], json!("wf"));

        let yaml_path = dir.path().join("wf.yaml");
        std::fs::write(&yaml_path, "name: wf\ntrigger: scheduler.cron\n").unwrap();
        let doc = load_document(&yaml_path).unwrap();
        assert_eq!(doc["trigger"], json!("scheduler.cron"));
    }

    #[test]
    fn test_load_rejects_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(load_document(&path), Err(SanitizeError::Parse(_))));
    }

    #[test]
    fn test_bad_fallback_config_rejected() {
        let err = Sanitizer::new(
            Arc::new(CapabilityRegistry::builtin()),
            SanitizerConfig {
                fallback_trigger: "not.a.trigger".to_string(),
                ..SanitizerConfig::default()
            },
        );
        assert!(matches!(err, Err(SanitizeError::BadConfig(_))));
    }
}
