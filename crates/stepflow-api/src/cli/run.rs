//! `stepflow run` -- sanitize, resolve, validate, and execute a workflow.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use stepflow_core::registry::CapabilityRegistry;
use stepflow_core::resolve::{HookSet, resolve_missing_params};
use stepflow_core::runner::{RunOptions, Runner};
use stepflow_core::sanitize::{
    NullTriggerChooser, Sanitizer, SanitizerConfig, TriggerChooser, load_document,
};
use stepflow_infra::connectors::builtin_connectors;
use stepflow_infra::secret::SecretChain;
use stepflow_types::workflow::{RunRecord, RunStatus, StepStatus};

use super::RunArgs;
use super::prompt::{CliResolver, PromptTriggerChooser, parse_set_pairs};
use super::validate::print_diagnostics;

pub async fn handle_run(args: RunArgs, json: bool, quiet: bool) -> anyhow::Result<()> {
    let interactive = !args.non_interactive && !json;

    let registry = Arc::new(CapabilityRegistry::builtin());
    let sanitizer = Sanitizer::new(registry.clone(), SanitizerConfig::default())?;

    // Sanitize
    let raw = load_document(&args.file)
        .with_context(|| format!("failed to load '{}'", args.file.display()))?;
    let chooser: Box<dyn TriggerChooser> = if interactive {
        Box::new(PromptTriggerChooser)
    } else {
        Box::new(NullTriggerChooser)
    };
    let outcome = sanitizer.sanitize_with(raw, chooser.as_ref())?;
    if !json && !quiet {
        print_diagnostics(&outcome.diagnostics);
    }
    let mut workflow = outcome.workflow;

    // Resolve remaining MISSING values
    let overrides = parse_set_pairs(&args.set)?;
    let resolver = CliResolver::new(overrides, interactive);
    resolve_missing_params(&mut workflow, &registry, &resolver, &HookSet::builtin()).await?;

    // Wire connectors: one shared HTTP client, secrets from env + file.
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent("stepflow/0.1")
        .build()
        .context("failed to build HTTP client")?;
    let secrets = Arc::new(SecretChain::default_chain());
    let connectors = builtin_connectors(client, secrets);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let mut options = RunOptions {
        fail_fast: args.fail_fast,
        cancel,
        ..RunOptions::default()
    };
    if let Some(secs) = args.timeout_secs {
        options.step_timeout = Duration::from_secs(secs);
    }

    let payload = args
        .payload
        .as_deref()
        .map(parse_payload)
        .transpose()?;

    let runner = Runner::new(registry, connectors).with_options(options);

    let spinner = if json || quiet {
        ProgressBar::hidden()
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner} {msg}").expect("static template"),
        );
        spinner.set_message(format!("running '{}'", workflow.name));
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner
    };

    let result = runner.run(&workflow, payload).await;
    spinner.finish_and_clear();

    let outcome = result?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome.record)?);
    } else if !quiet {
        print_trace(&outcome.record);
    }

    match outcome.record.status {
        RunStatus::Completed => Ok(()),
        RunStatus::Cancelled => bail!("run cancelled"),
        status => bail!("run finished with status {status:?}"),
    }
}

fn parse_payload(raw: &str) -> anyhow::Result<Map<String, Value>> {
    let value: Value = serde_json::from_str(raw).context("--payload is not valid JSON")?;
    value
        .as_object()
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("--payload must be a JSON object"))
}

fn print_trace(record: &RunRecord) {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("#").fg(Color::Cyan),
            Cell::new("Step"),
            Cell::new("Status"),
            Cell::new("Duration"),
            Cell::new("Output"),
        ]);

    for step in &record.records {
        let output = match &step.error {
            Some(error) => error.clone(),
            None => value_preview(&step.output),
        };
        table.add_row(vec![
            Cell::new(step.index),
            Cell::new(&step.step_type),
            format_status(step.status),
            Cell::new(format!("{}ms", step.duration_ms)),
            Cell::new(truncate(&output, 60)),
        ]);
    }

    println!();
    println!(
        "  {} Workflow '{}' finished: {}",
        style("*").green().bold(),
        style(&record.workflow_name).cyan(),
        format!("{:?}", record.status).to_lowercase()
    );
    println!("  Run ID: {}", record.id);
    println!();
    println!("{table}");
    println!();
}

fn format_status(status: StepStatus) -> Cell {
    match status {
        StepStatus::Completed => Cell::new("completed").fg(Color::Green),
        StepStatus::Failed => Cell::new("failed").fg(Color::Red),
        StepStatus::Skipped => Cell::new("skipped").fg(Color::DarkGrey),
        StepStatus::TimedOut => Cell::new("timed out").fg(Color::Red),
        StepStatus::Cancelled => Cell::new("cancelled").fg(Color::DarkYellow),
    }
}

fn value_preview(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(text: &str, max: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= max {
        flat
    } else {
        let prefix: String = flat.chars().take(max).collect();
        format!("{prefix}…")
    }
}
