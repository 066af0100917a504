//! Step dispatcher: executes a validated workflow strictly sequentially,
//! threading the execution context between steps.
//!
//! Per step: evaluate the optional condition, resolve templates in params,
//! route to a connector (exact key first, then family by discriminator),
//! invoke it under the step timeout and cancellation token, and record the
//! output as `steps.<i>.output`. A single step's connector error does not
//! fail the run by default -- the step records an inline error marker that
//! downstream steps can observe -- but structural problems (validation,
//! unroutable step types) abort before any external side effect occurs.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use stepflow_types::workflow::{
    RunRecord, RunStatus, StepDefinition, StepRecord, StepStatus, WorkflowDefinition,
};

use crate::connector::ConnectorRegistry;
use crate::context::ExecutionContext;
use crate::expression::ConditionEvaluator;
use crate::registry::CapabilityRegistry;
use crate::sanitize::{ValidationError, validate_workflow};
use crate::template;

/// Default per-step timeout (5 minutes).
pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 300;

// ---------------------------------------------------------------------------
// Options and errors
// ---------------------------------------------------------------------------

/// Host policy for one run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Abort the run on the first failing step instead of recording the
    /// error and continuing.
    pub fail_fast: bool,
    /// Per-step timeout.
    pub step_timeout: Duration,
    /// Caller-supplied cancellation token.
    pub cancel: CancellationToken,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            fail_fast: false,
            step_timeout: Duration::from_secs(DEFAULT_STEP_TIMEOUT_SECS),
            cancel: CancellationToken::new(),
        }
    }
}

/// Structural failures detected before execution begins. Runtime connector
/// failures are not errors at this level; they live in the trace.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// No connector can serve a step's capability key.
    #[error("step {index}: no connector registered for '{step_type}'")]
    NoConnector { index: usize, step_type: String },
}

/// Result of a finished (or cancelled) run: the trace plus the final context.
#[derive(Debug)]
pub struct RunOutcome {
    pub record: RunRecord,
    pub context: ExecutionContext,
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Sequential workflow dispatcher.
///
/// Holds only shared read-only state; each `run` call builds a fresh
/// `ExecutionContext`, so one runner can serve many runs.
pub struct Runner {
    registry: Arc<CapabilityRegistry>,
    connectors: ConnectorRegistry,
    evaluator: ConditionEvaluator,
    options: RunOptions,
}

impl Runner {
    pub fn new(registry: Arc<CapabilityRegistry>, connectors: ConnectorRegistry) -> Self {
        Self {
            registry,
            connectors,
            evaluator: ConditionEvaluator::new(),
            options: RunOptions::default(),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    /// Execute a workflow. `trigger_payload` entries override the trigger's
    /// declared params (e.g. a webhook body standing in for live trigger
    /// data).
    pub async fn run(
        &self,
        workflow: &WorkflowDefinition,
        trigger_payload: Option<Map<String, Value>>,
    ) -> Result<RunOutcome, RunError> {
        // Pre-flight: both checks happen before any external side effect.
        validate_workflow(workflow, &self.registry)?;
        for (index, step) in workflow.steps.iter().enumerate() {
            if !self.connectors.can_route(&step.step_type) {
                return Err(RunError::NoConnector {
                    index,
                    step_type: step.step_type.clone(),
                });
            }
        }

        let run_id = Uuid::now_v7();
        let mut trigger_params = workflow.trigger.params.clone();
        if let Some(payload) = trigger_payload {
            for (key, value) in payload {
                trigger_params.insert(key, value);
            }
        }
        let mut ctx = ExecutionContext::new(trigger_params);

        tracing::info!(
            run_id = %run_id,
            workflow = workflow.name.as_str(),
            steps = workflow.steps.len(),
            "starting workflow run"
        );

        let started_at = Utc::now();
        let mut records = Vec::with_capacity(workflow.steps.len());
        let mut status = RunStatus::Completed;

        for (index, step) in workflow.steps.iter().enumerate() {
            if self.options.cancel.is_cancelled() {
                status = RunStatus::Cancelled;
                break;
            }

            let record = self.run_step(index, step, &mut ctx).await;
            let step_status = record.status;
            records.push(record);

            match step_status {
                StepStatus::Cancelled => {
                    status = RunStatus::Cancelled;
                    break;
                }
                StepStatus::Failed | StepStatus::TimedOut if self.options.fail_fast => {
                    status = RunStatus::Failed;
                    break;
                }
                _ => {}
            }
        }

        tracing::info!(
            run_id = %run_id,
            workflow = workflow.name.as_str(),
            status = ?status,
            "workflow run finished"
        );

        Ok(RunOutcome {
            record: RunRecord {
                id: run_id,
                workflow_name: workflow.name.clone(),
                status,
                started_at,
                completed_at: Some(Utc::now()),
                records,
            },
            context: ctx,
        })
    }

    async fn run_step(
        &self,
        index: usize,
        step: &StepDefinition,
        ctx: &mut ExecutionContext,
    ) -> StepRecord {
        let started_at = Utc::now();
        let start = std::time::Instant::now();

        // Condition gate. Evaluation failures are contained to this step,
        // like any other runtime error.
        if let Some(condition) = &step.condition {
            match self.evaluator.evaluate(condition, ctx) {
                Ok(true) => {}
                Ok(false) => {
                    tracing::debug!(index, step_type = step.step_type.as_str(), "step skipped");
                    ctx.record_output(index, Value::Null);
                    return StepRecord {
                        index,
                        step_type: step.step_type.clone(),
                        status: StepStatus::Skipped,
                        output: Value::Null,
                        error: None,
                        started_at,
                        duration_ms: elapsed_ms(start),
                    };
                }
                Err(e) => {
                    return self.record_failure(
                        index,
                        step,
                        ctx,
                        StepStatus::Failed,
                        format!("condition evaluation failed: {e}"),
                        started_at,
                        start,
                    );
                }
            }
        }

        let resolved = template::resolve_params(&step.params, ctx);
        let connector = self
            .connectors
            .route(&step.step_type)
            .expect("routes were checked before execution started");

        tracing::debug!(
            index,
            step_type = step.step_type.as_str(),
            connector = connector.name(),
            "dispatching step"
        );

        let invocation = tokio::time::timeout(self.options.step_timeout, async {
            tokio::select! {
                _ = self.options.cancel.cancelled() => None,
                result = connector.run(&resolved, &*ctx) => Some(result),
            }
        })
        .await;

        match invocation {
            Ok(Some(Ok(output))) => {
                ctx.record_output(index, output.clone());
                StepRecord {
                    index,
                    step_type: step.step_type.clone(),
                    status: StepStatus::Completed,
                    output,
                    error: None,
                    started_at,
                    duration_ms: elapsed_ms(start),
                }
            }
            Ok(Some(Err(e))) => self.record_failure(
                index,
                step,
                ctx,
                StepStatus::Failed,
                e.to_string(),
                started_at,
                start,
            ),
            Ok(None) => self.record_failure(
                index,
                step,
                ctx,
                StepStatus::Cancelled,
                "cancelled".to_string(),
                started_at,
                start,
            ),
            Err(_elapsed) => self.record_failure(
                index,
                step,
                ctx,
                StepStatus::TimedOut,
                format!(
                    "step timed out after {}s",
                    self.options.step_timeout.as_secs()
                ),
                started_at,
                start,
            ),
        }
    }

    /// Record a contained step failure: the context gets an inline error
    /// marker (never a partial output), downstream templates observe it.
    #[allow(clippy::too_many_arguments)]
    fn record_failure(
        &self,
        index: usize,
        step: &StepDefinition,
        ctx: &mut ExecutionContext,
        status: StepStatus,
        message: String,
        started_at: chrono::DateTime<Utc>,
        start: std::time::Instant,
    ) -> StepRecord {
        tracing::warn!(
            index,
            step_type = step.step_type.as_str(),
            error = message.as_str(),
            "step did not complete"
        );
        let marker = Value::String(format!("[ERROR: {message}]"));
        ctx.record_output(index, marker.clone());
        StepRecord {
            index,
            step_type: step.step_type.clone(),
            status,
            output: marker,
            error: Some(message),
            started_at,
            duration_ms: elapsed_ms(start),
        }
    }
}

fn elapsed_ms(start: std::time::Instant) -> u64 {
    start.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
