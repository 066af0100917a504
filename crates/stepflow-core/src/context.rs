//! Execution context: the accumulating record of one workflow run.
//!
//! Holds the trigger input and the outputs of completed steps. Built fresh
//! per run and append-only: the dispatcher records `steps.<i>.output` after
//! step `i` completes and before step `i + 1` resolves, which is what makes
//! the ordering guarantee (a step only sees strictly lower-indexed outputs)
//! hold by construction. Connectors receive `&ExecutionContext` and cannot
//! mutate it; all mutation goes through the dispatcher.

use std::collections::BTreeMap;

use serde_json::{Map, Value, json};

/// Per-run execution state visible to templates and condition expressions.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    trigger: Map<String, Value>,
    steps: BTreeMap<usize, Value>,
}

impl ExecutionContext {
    /// Create a fresh context from the trigger parameters.
    pub fn new(trigger: Map<String, Value>) -> Self {
        Self {
            trigger,
            steps: BTreeMap::new(),
        }
    }

    /// Trigger input for this run.
    pub fn trigger(&self) -> &Map<String, Value> {
        &self.trigger
    }

    /// Record the output of a completed step. Called by the dispatcher only.
    pub(crate) fn record_output(&mut self, index: usize, output: Value) {
        self.steps.insert(index, json!({ "output": output }));
    }

    /// Output of a completed step, if recorded.
    pub fn step_output(&self, index: usize) -> Option<&Value> {
        self.steps.get(&index).and_then(|slot| slot.get("output"))
    }

    /// Number of steps with recorded outputs.
    pub fn completed_steps(&self) -> usize {
        self.steps.len()
    }

    /// Render the context as the JSON object templates and conditions walk:
    ///
    /// ```json
    /// {
    ///   "trigger": { ... },
    ///   "steps": { "0": { "output": ... }, "1": { "output": ... } }
    /// }
    /// ```
    pub fn as_value(&self) -> Value {
        let mut steps = Map::new();
        for (index, slot) in &self.steps {
            steps.insert(index.to_string(), slot.clone());
        }
        json!({
            "trigger": Value::Object(self.trigger.clone()),
            "steps": Value::Object(steps),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger_params() -> Map<String, Value> {
        json!({ "repo": "acme/widgets", "title": "Crash on save" })
            .as_object()
            .unwrap()
            .clone()
    }

    #[test]
    fn test_record_and_read_output() {
        let mut ctx = ExecutionContext::new(trigger_params());
        assert!(ctx.step_output(0).is_none());

        ctx.record_output(0, json!("summary"));
        assert_eq!(ctx.step_output(0), Some(&json!("summary")));
        assert_eq!(ctx.completed_steps(), 1);
    }

    #[test]
    fn test_as_value_shape() {
        let mut ctx = ExecutionContext::new(trigger_params());
        ctx.record_output(0, json!("first"));
        ctx.record_output(1, json!({ "url": "https://example.org/1" }));

        let value = ctx.as_value();
        assert_eq!(value["trigger"]["repo"], json!("acme/widgets"));
        assert_eq!(value["steps"]["0"]["output"], json!("first"));
        assert_eq!(value["steps"]["1"]["output"]["url"], json!("https://example.org/1"));
    }

    #[test]
    fn test_empty_context_renders_empty_maps() {
        let ctx = ExecutionContext::new(Map::new());
        let value = ctx.as_value();
        assert_eq!(value, json!({ "trigger": {}, "steps": {} }));
    }
}
