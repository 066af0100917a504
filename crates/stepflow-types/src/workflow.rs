//! Workflow document model and execution trace records.
//!
//! `WorkflowDefinition` is the repaired, typed form of an incoming workflow
//! document. Raw documents are untrusted (often produced by an LLM) and are
//! handled as loose JSON by the sanitizer; only sanitized documents are
//! represented with these types. This module also contains the trace types
//! (`RunRecord`, `StepRecord`) that a dispatcher run produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Sentinels
// ---------------------------------------------------------------------------

/// Marker value for a required parameter that has not been supplied yet.
///
/// The sanitizer fills absent required parameters with this sentinel so that
/// structural validation can proceed and the resolution phase can target the
/// exact `(step, param)` pairs that still need values. A workflow carrying
/// this sentinel never passes strict validation.
pub const MISSING: &str = "[MISSING]";

/// Parameter key under which the sanitizer records the full capability key
/// for steps routed through a family connector (e.g. all `github.*` steps
/// share one GitHub connector that switches on this discriminator).
pub const STEP_TYPE_KEY: &str = "_step_type";

/// Check whether a parameter value is the `MISSING` sentinel.
pub fn is_missing(value: &Value) -> bool {
    matches!(value, Value::String(s) if s == MISSING)
}

// ---------------------------------------------------------------------------
// Workflow Definition
// ---------------------------------------------------------------------------

/// A sanitized workflow document.
///
/// Constructed once from validated input, immutable during execution, and
/// consumed by a single dispatcher run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowDefinition {
    /// Human-readable workflow name.
    pub name: String,
    /// Document version string.
    #[serde(default = "default_version")]
    pub version: String,
    /// What starts the workflow.
    pub trigger: TriggerDefinition,
    /// Ordered steps. May be empty; if non-empty, each step's required
    /// params must be populated before execution begins.
    #[serde(default)]
    pub steps: Vec<StepDefinition>,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Trigger block of a workflow document.
///
/// The composite key `type.event` must name a trigger capability in the
/// registry (e.g. `scheduler` + `cron` -> `scheduler.cron`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerDefinition {
    /// Trigger source (e.g. "scheduler", "github").
    #[serde(rename = "type")]
    pub trigger_type: String,
    /// Event within the source (e.g. "cron", "issue_created").
    pub event: String,
    /// Trigger parameters. Also serves as the `trigger` namespace visible
    /// to templates.
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl TriggerDefinition {
    /// The registry key for this trigger (`type.event`).
    pub fn key(&self) -> String {
        format!("{}.{}", self.trigger_type, self.event)
    }
}

/// A single step of a workflow document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Capability key (e.g. "ai.summarize"). Must name an action capability
    /// after sanitization.
    #[serde(rename = "type")]
    pub step_type: String,
    /// Step parameters. String values may contain `{{ ... }}` template
    /// references resolved against the execution context at dispatch time.
    #[serde(default)]
    pub params: Map<String, Value>,
    /// Optional JEXL expression; when it evaluates false the step is skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl StepDefinition {
    /// The capability family prefix (the part before the first dot).
    pub fn family(&self) -> &str {
        self.step_type
            .split_once('.')
            .map(|(family, _)| family)
            .unwrap_or(&self.step_type)
    }
}

// ---------------------------------------------------------------------------
// Execution trace
// ---------------------------------------------------------------------------

/// Overall status of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

/// Status of an individual step execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Failed,
    Skipped,
    TimedOut,
    Cancelled,
}

/// Trace entry for a single step within a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// Zero-based step index.
    pub index: usize,
    /// Capability key the step dispatched to.
    pub step_type: String,
    /// Final step status.
    pub status: StepStatus,
    /// The value recorded as `steps.<index>.output` in the context.
    pub output: Value,
    /// Error message when the step failed, timed out, or was cancelled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// When step execution started.
    pub started_at: DateTime<Utc>,
    /// Wall-clock duration of the step.
    pub duration_ms: u64,
}

/// The visible trace of one workflow run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// UUIDv7 run id.
    pub id: Uuid,
    /// Name of the executed workflow.
    pub workflow_name: String,
    /// Final run status.
    pub status: RunStatus,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// When the run finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Per-step trace entries in execution order.
    pub records: Vec<StepRecord>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_workflow() -> WorkflowDefinition {
        WorkflowDefinition {
            name: "issue_to_notion".to_string(),
            version: "1.0".to_string(),
            trigger: TriggerDefinition {
                trigger_type: "github".to_string(),
                event: "issue_created".to_string(),
                params: json!({ "repo": "acme/widgets" })
                    .as_object()
                    .unwrap()
                    .clone(),
            },
            steps: vec![
                StepDefinition {
                    step_type: "ai.summarize".to_string(),
                    params: json!({ "text": "{{ trigger.body }}" })
                        .as_object()
                        .unwrap()
                        .clone(),
                    condition: None,
                },
                StepDefinition {
                    step_type: "notion.create_task".to_string(),
                    params: json!({
                        "title": "{{ trigger.title }}",
                        "content": "{{ steps.0.output }}"
                    })
                    .as_object()
                    .unwrap()
                    .clone(),
                    condition: None,
                },
            ],
        }
    }

    #[test]
    fn test_workflow_json_roundtrip() {
        let original = sample_workflow();
        let text = serde_json::to_string_pretty(&original).unwrap();
        assert!(text.contains("\"type\": \"ai.summarize\""));

        let parsed: WorkflowDefinition = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_workflow_yaml_roundtrip() {
        let original = sample_workflow();
        let yaml = serde_yaml_ng::to_string(&original).unwrap();
        let parsed: WorkflowDefinition = serde_yaml_ng::from_str(&yaml).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_parse_document_with_defaults() {
        // version and condition omitted, params defaulted
        let doc = json!({
            "name": "minimal",
            "trigger": { "type": "webhook", "event": "receive" },
            "steps": [{ "type": "api.fetch_hacker_news" }]
        });
        let wf: WorkflowDefinition = serde_json::from_value(doc).unwrap();
        assert_eq!(wf.version, "1.0");
        assert!(wf.trigger.params.is_empty());
        assert!(wf.steps[0].params.is_empty());
        assert!(wf.steps[0].condition.is_none());
    }

    #[test]
    fn test_trigger_key() {
        let trigger = TriggerDefinition {
            trigger_type: "scheduler".to_string(),
            event: "cron".to_string(),
            params: Map::new(),
        };
        assert_eq!(trigger.key(), "scheduler.cron");
    }

    #[test]
    fn test_step_family() {
        let step = StepDefinition {
            step_type: "github.create_issue".to_string(),
            params: Map::new(),
            condition: None,
        };
        assert_eq!(step.family(), "github");

        let bare = StepDefinition {
            step_type: "nodots".to_string(),
            params: Map::new(),
            condition: None,
        };
        assert_eq!(bare.family(), "nodots");
    }

    #[test]
    fn test_is_missing() {
        assert!(is_missing(&json!(MISSING)));
        assert!(!is_missing(&json!("value")));
        assert!(!is_missing(&json!(null)));
        assert!(!is_missing(&json!(42)));
    }

    #[test]
    fn test_status_serde() {
        for status in [
            RunStatus::Pending,
            RunStatus::Running,
            RunStatus::Completed,
            RunStatus::Failed,
            RunStatus::Cancelled,
        ] {
            let text = serde_json::to_string(&status).unwrap();
            let parsed: RunStatus = serde_json::from_str(&text).unwrap();
            assert_eq!(parsed, status);
        }

        let text = serde_json::to_string(&StepStatus::TimedOut).unwrap();
        assert_eq!(text, "\"timed_out\"");
    }

    #[test]
    fn test_run_record_json_roundtrip() {
        let record = RunRecord {
            id: Uuid::now_v7(),
            workflow_name: "issue_to_notion".to_string(),
            status: RunStatus::Completed,
            started_at: Utc::now(),
            completed_at: Some(Utc::now()),
            records: vec![StepRecord {
                index: 0,
                step_type: "ai.summarize".to_string(),
                status: StepStatus::Completed,
                output: json!("summary text"),
                error: None,
                started_at: Utc::now(),
                duration_ms: 12,
            }],
        };
        let text = serde_json::to_string(&record).unwrap();
        let parsed: RunRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed.workflow_name, "issue_to_notion");
        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].status, StepStatus::Completed);
    }
}
