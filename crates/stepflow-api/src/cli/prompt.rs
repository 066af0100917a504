//! Interactive resolution strategies backed by dialoguer.
//!
//! `CliResolver` is the host-supplied `MissingValueResolver`: `--set`
//! overrides first, then (unless running non-interactively) a terminal
//! prompt. `PromptTriggerChooser` implements the sanitizer's trigger
//! selection over the closed set of registry trigger keys.

use std::collections::HashMap;

use console::style;
use dialoguer::{Input, Select, theme::ColorfulTheme};
use futures_util::future::BoxFuture;
use serde_json::Value;

use stepflow_core::resolve::{MissingValueResolver, ResolveError};
use stepflow_core::sanitize::TriggerChooser;

/// Resolver combining `--set` overrides with interactive prompts.
pub struct CliResolver {
    overrides: HashMap<String, Value>,
    interactive: bool,
}

impl CliResolver {
    pub fn new(overrides: HashMap<String, Value>, interactive: bool) -> Self {
        Self {
            overrides,
            interactive,
        }
    }

    fn prompt(
        &self,
        step_index: Option<usize>,
        step_type: &str,
        param: &str,
    ) -> Result<Value, ResolveError> {
        let location = match step_index {
            Some(index) => format!("step {index} ({step_type})"),
            None => format!("trigger ({step_type})"),
        };
        eprintln!();
        eprintln!(
            "  {} {} needs a value for '{}'",
            style("?").yellow().bold(),
            location,
            style(param).cyan()
        );

        let input: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt(param)
            .interact_text()
            .map_err(|_| ResolveError::Unresolved {
                step_index,
                step_type: step_type.to_string(),
                param: param.to_string(),
            })?;

        Ok(parse_value(&input))
    }
}

impl MissingValueResolver for CliResolver {
    fn resolve<'a>(
        &'a self,
        step_index: Option<usize>,
        step_type: &'a str,
        param: &'a str,
    ) -> BoxFuture<'a, Result<Value, ResolveError>> {
        Box::pin(async move {
            let qualified = format!("{step_type}.{param}");
            if let Some(value) = self
                .overrides
                .get(&qualified)
                .or_else(|| self.overrides.get(param))
            {
                return Ok(value.clone());
            }

            if !self.interactive {
                return Err(ResolveError::Unresolved {
                    step_index,
                    step_type: step_type.to_string(),
                    param: param.to_string(),
                });
            }

            self.prompt(step_index, step_type, param)
        })
    }
}

/// Trigger selection via an interactive list.
pub struct PromptTriggerChooser;

impl TriggerChooser for PromptTriggerChooser {
    fn choose(&self, options: &[&str]) -> Option<String> {
        eprintln!();
        eprintln!(
            "  {} The workflow declares no trigger.",
            style("?").yellow().bold()
        );
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("Pick a trigger")
            .items(options)
            .default(0)
            .interact()
            .ok()?;
        options.get(selection).map(|s| s.to_string())
    }
}

/// Interpret CLI-supplied text: JSON where it parses, bare string otherwise.
/// Lets `--set issue_number=7` arrive as a number and `--set labels=["bug"]`
/// as an array.
pub fn parse_value(input: &str) -> Value {
    serde_json::from_str(input).unwrap_or_else(|_| Value::String(input.to_string()))
}

/// Split repeated `--set PARAM=VALUE` flags into an override map.
pub fn parse_set_pairs(pairs: &[String]) -> anyhow::Result<HashMap<String, Value>> {
    let mut overrides = HashMap::new();
    for pair in pairs {
        let (key, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow::anyhow!("--set expects PARAM=VALUE, got '{pair}'"))?;
        overrides.insert(key.trim().to_string(), parse_value(value));
    }
    Ok(overrides)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_value_json_and_string() {
        assert_eq!(parse_value("7"), json!(7));
        assert_eq!(parse_value("true"), json!(true));
        assert_eq!(parse_value(r#"["bug","p1"]"#), json!(["bug", "p1"]));
        assert_eq!(parse_value("acme/widgets"), json!("acme/widgets"));
    }

    #[test]
    fn test_parse_set_pairs() {
        let overrides = parse_set_pairs(&[
            "repo=acme/widgets".to_string(),
            "github.create_issue.title=Crash".to_string(),
            "issue_number=7".to_string(),
        ])
        .unwrap();
        assert_eq!(overrides["repo"], json!("acme/widgets"));
        assert_eq!(overrides["github.create_issue.title"], json!("Crash"));
        assert_eq!(overrides["issue_number"], json!(7));
    }

    #[test]
    fn test_parse_set_pairs_rejects_bare_key() {
        assert!(parse_set_pairs(&["no-equals".to_string()]).is_err());
    }

    #[tokio::test]
    async fn test_non_interactive_resolver_uses_overrides_only() {
        let overrides = HashMap::from([("repo".to_string(), json!("acme/widgets"))]);
        let resolver = CliResolver::new(overrides, false);

        let value = resolver
            .resolve(Some(0), "github.create_issue", "repo")
            .await
            .unwrap();
        assert_eq!(value, json!("acme/widgets"));

        let err = resolver
            .resolve(Some(0), "github.create_issue", "title")
            .await
            .unwrap_err();
        assert!(matches!(err, ResolveError::Unresolved { .. }));
    }
}
