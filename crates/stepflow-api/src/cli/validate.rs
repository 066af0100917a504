//! `stepflow validate` -- sanitize and validate without executing.

use anyhow::{Context, bail};
use console::style;
use std::sync::Arc;

use stepflow_core::registry::CapabilityRegistry;
use stepflow_core::sanitize::{Sanitizer, SanitizerConfig, load_document, validate_workflow};
use stepflow_types::diagnostic::{Diagnostic, Severity};

use super::ValidateArgs;

pub async fn handle_validate(args: ValidateArgs, json: bool) -> anyhow::Result<()> {
    let registry = Arc::new(CapabilityRegistry::builtin());
    let sanitizer = Sanitizer::new(registry.clone(), SanitizerConfig::default())?;

    let raw = load_document(&args.file)
        .with_context(|| format!("failed to load '{}'", args.file.display()))?;
    let outcome = sanitizer.sanitize(raw)?;

    let validation = validate_workflow(&outcome.workflow, &registry);

    if json {
        let report = serde_json::json!({
            "valid": validation.is_ok(),
            "error": validation.as_ref().err().map(|e| e.to_string()),
            "diagnostics": outcome.diagnostics,
            "workflow": outcome.workflow,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_diagnostics(&outcome.diagnostics);
    }

    if let Some(path) = &args.write {
        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );
        let content = if is_yaml {
            serde_yaml_ng::to_string(&outcome.workflow)?
        } else {
            serde_json::to_string_pretty(&outcome.workflow)?
        };
        std::fs::write(path, content)
            .with_context(|| format!("failed to write '{}'", path.display()))?;
        if !json {
            println!(
                "  {} Sanitized document written to {}",
                style("*").green().bold(),
                style(path.display()).cyan()
            );
        }
    }

    match validation {
        Ok(()) => {
            if !json {
                println!(
                    "  {} Workflow '{}' is valid ({} steps)",
                    style("*").green().bold(),
                    style(&outcome.workflow.name).cyan(),
                    outcome.workflow.steps.len()
                );
                println!();
            }
            Ok(())
        }
        Err(e) => {
            if json {
                bail!("validation failed");
            }
            bail!("validation failed: {e}");
        }
    }
}

/// Shared diagnostic printer for `run` and `validate`.
pub fn print_diagnostics(diagnostics: &[Diagnostic]) {
    if diagnostics.is_empty() {
        return;
    }
    println!();
    for diag in diagnostics {
        let marker = match diag.severity {
            Severity::Info => style("i").blue().bold(),
            Severity::Warning => style("!").yellow().bold(),
        };
        println!("  {marker} {diag}");
    }
    println!();
}
