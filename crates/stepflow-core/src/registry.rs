//! Capability registry: the immutable catalog of trigger and action kinds.
//!
//! Loaded once at startup and shared read-only (wrap in `Arc` to hand to
//! multiple dispatcher instances). The built-in table mirrors the shipped
//! connectors; `from_json` loads a catalog from configuration instead.

use std::collections::HashMap;

use serde_json::{Value, json};
use stepflow_types::capability::{CapabilityKind, CapabilitySpec, ParamSpec};
use thiserror::Error;

/// Errors raised while constructing a registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two catalog entries share a key.
    #[error("duplicate capability key: '{0}'")]
    DuplicateKey(String),

    /// Catalog configuration failed to deserialize.
    #[error("invalid capability catalog: {0}")]
    InvalidCatalog(String),
}

/// Immutable, keyed capability catalog.
#[derive(Debug, Clone)]
pub struct CapabilityRegistry {
    specs: HashMap<String, CapabilitySpec>,
}

impl CapabilityRegistry {
    /// Build a registry from explicit specs, rejecting duplicate keys.
    pub fn from_specs(specs: Vec<CapabilitySpec>) -> Result<Self, RegistryError> {
        let mut map = HashMap::with_capacity(specs.len());
        for spec in specs {
            if map.contains_key(&spec.key) {
                return Err(RegistryError::DuplicateKey(spec.key));
            }
            map.insert(spec.key.clone(), spec);
        }
        Ok(Self { specs: map })
    }

    /// Load a catalog from a JSON array of capability specs.
    pub fn from_json(value: Value) -> Result<Self, RegistryError> {
        let specs: Vec<CapabilitySpec> = serde_json::from_value(value)
            .map_err(|e| RegistryError::InvalidCatalog(e.to_string()))?;
        Self::from_specs(specs)
    }

    /// Look up a capability by key.
    pub fn lookup(&self, key: &str) -> Option<&CapabilitySpec> {
        self.specs.get(key)
    }

    /// Whether `key` names a known capability.
    pub fn contains(&self, key: &str) -> bool {
        self.specs.contains_key(key)
    }

    /// Whether `key` names a trigger capability.
    pub fn is_trigger(&self, key: &str) -> bool {
        self.lookup(key)
            .map(|s| s.kind == CapabilityKind::Trigger)
            .unwrap_or(false)
    }

    /// Names of the required parameters for `key` (empty for unknown keys).
    pub fn required_params(&self, key: &str) -> Vec<&str> {
        self.lookup(key)
            .map(|s| s.required_params().collect())
            .unwrap_or_default()
    }

    /// All trigger keys, sorted.
    pub fn trigger_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = self
            .specs
            .values()
            .filter(|s| s.kind == CapabilityKind::Trigger)
            .map(|s| s.key.as_str())
            .collect();
        keys.sort_unstable();
        keys
    }

    /// Iterate all entries (unordered).
    pub fn iter(&self) -> impl Iterator<Item = &CapabilitySpec> {
        self.specs.values()
    }

    /// The built-in catalog covering the shipped connectors.
    pub fn builtin() -> Self {
        let specs = vec![
            // === Triggers ===
            CapabilitySpec {
                key: "scheduler.cron".into(),
                description: "Run the workflow on a recurring cron schedule.".into(),
                kind: CapabilityKind::Trigger,
                group: "trigger".into(),
                params: vec![ParamSpec::required_with_default(
                    "expression",
                    json!("0 9 * * *"),
                )],
                suggested_trigger: None,
            },
            CapabilitySpec {
                key: "webhook.receive".into(),
                description: "Trigger a workflow via incoming webhook.".into(),
                kind: CapabilityKind::Trigger,
                group: "trigger".into(),
                params: vec![],
                suggested_trigger: None,
            },
            CapabilitySpec {
                key: "github.issue_created".into(),
                description: "Trigger when a GitHub issue is created.".into(),
                kind: CapabilityKind::Trigger,
                group: "trigger".into(),
                params: vec![ParamSpec::required_with_default(
                    "repo",
                    json!("my-org/my-repo"),
                )],
                suggested_trigger: None,
            },
            // === Utility ===
            CapabilitySpec {
                key: "ai.summarize".into(),
                description: "Summarize text with an LLM.".into(),
                kind: CapabilityKind::Action,
                group: "utility".into(),
                params: vec![ParamSpec::required_with_default(
                    "text",
                    json!("Summarize this input."),
                )],
                suggested_trigger: None,
            },
            // === Communication ===
            CapabilitySpec {
                key: "email.send".into(),
                description: "Send an email to one or more recipients.".into(),
                kind: CapabilityKind::Action,
                group: "communication".into(),
                params: vec![
                    ParamSpec::required_with_default("to", json!("you@example.com")),
                    ParamSpec::required_with_default("subject", json!("No subject")),
                    ParamSpec::required_with_default("body", json!("Empty body")),
                ],
                suggested_trigger: None,
            },
            CapabilitySpec {
                key: "slack.send_message".into(),
                description: "Send a message to a Slack channel.".into(),
                kind: CapabilityKind::Action,
                group: "communication".into(),
                params: vec![
                    ParamSpec::required_with_default("channel", json!("#general")),
                    ParamSpec::required_with_default("message", json!("Hello from Stepflow!")),
                ],
                suggested_trigger: None,
            },
            CapabilitySpec {
                key: "discord.send_message".into(),
                description: "Send a message using a Discord webhook.".into(),
                kind: CapabilityKind::Action,
                group: "communication".into(),
                params: vec![
                    ParamSpec::required_with_default(
                        "webhook_url",
                        json!("[DISCORD_WEBHOOK_URL]"),
                    ),
                    ParamSpec::required_with_default("content", json!("Hello from Stepflow!")),
                ],
                suggested_trigger: None,
            },
            // === API fetching ===
            CapabilitySpec {
                key: "api.fetch_hacker_news".into(),
                description: "Fetch top stories from Hacker News.".into(),
                kind: CapabilityKind::Action,
                group: "api".into(),
                params: vec![ParamSpec::optional("limit", json!(3))],
                suggested_trigger: None,
            },
            CapabilitySpec {
                key: "api.http_get".into(),
                description: "Make a simple HTTP GET request.".into(),
                kind: CapabilityKind::Action,
                group: "api".into(),
                params: vec![
                    ParamSpec::required_with_default("url", json!("https://example.com")),
                    ParamSpec::optional("headers", json!({})),
                ],
                suggested_trigger: None,
            },
            CapabilitySpec {
                key: "weather.fetch_forecast".into(),
                description: "Get current weather for a location.".into(),
                kind: CapabilityKind::Action,
                group: "api".into(),
                params: vec![
                    ParamSpec::required_with_default("location", json!("New York")),
                    ParamSpec::optional("unit", json!("imperial")),
                ],
                suggested_trigger: None,
            },
            // === Notion ===
            CapabilitySpec {
                key: "notion.create_task".into(),
                description: "Create a task or page in Notion.".into(),
                kind: CapabilityKind::Action,
                group: "productivity".into(),
                params: vec![
                    ParamSpec::required_with_default("title", json!("New Task")),
                    ParamSpec::required_with_default("content", json!("Task description")),
                ],
                suggested_trigger: None,
            },
            CapabilitySpec {
                key: "notion.create_page".into(),
                description: "Create a flexible page in Notion under a database or page.".into(),
                kind: CapabilityKind::Action,
                group: "productivity".into(),
                params: vec![ParamSpec::required("parent_id")],
                suggested_trigger: None,
            },
            CapabilitySpec {
                key: "notion.append_block".into(),
                description: "Append content to an existing Notion page.".into(),
                kind: CapabilityKind::Action,
                group: "productivity".into(),
                params: vec![
                    ParamSpec::required_with_default("page_id", json!("[MISSING_PAGE_ID]")),
                    ParamSpec::required_with_default("text", json!("Additional content")),
                ],
                suggested_trigger: None,
            },
            // === GitHub ===
            CapabilitySpec {
                key: "github.create_issue".into(),
                description: "Create a new issue in a GitHub repository.".into(),
                kind: CapabilityKind::Action,
                group: "devtools".into(),
                params: vec![
                    ParamSpec::required_with_default("repo", json!("my-org/my-repo")),
                    ParamSpec::required_with_default("title", json!("Bug report")),
                    ParamSpec::optional("body", json!("")),
                    ParamSpec::optional("labels", json!([])),
                    ParamSpec::optional("assignees", json!([])),
                ],
                suggested_trigger: Some("github.issue_created".into()),
            },
            CapabilitySpec {
                key: "github.comment_issue".into(),
                description: "Add a comment to a GitHub issue.".into(),
                kind: CapabilityKind::Action,
                group: "devtools".into(),
                params: vec![
                    ParamSpec::required_with_default("repo", json!("my-org/my-repo")),
                    ParamSpec::required("issue_number"),
                    ParamSpec::required("comment"),
                ],
                suggested_trigger: Some("github.issue_created".into()),
            },
            CapabilitySpec {
                key: "github.comment_pr".into(),
                description: "Add a comment to a GitHub pull request.".into(),
                kind: CapabilityKind::Action,
                group: "devtools".into(),
                params: vec![
                    ParamSpec::required_with_default("repo", json!("my-org/my-repo")),
                    ParamSpec::required_with_default("pr_number", json!(1)),
                    ParamSpec::required_with_default(
                        "message",
                        json!("Thanks for your contribution!"),
                    ),
                ],
                suggested_trigger: Some("github.issue_created".into()),
            },
            CapabilitySpec {
                key: "github.label_check".into(),
                description: "Check if a PR has a specific label.".into(),
                kind: CapabilityKind::Action,
                group: "devtools".into(),
                params: vec![
                    ParamSpec::required_with_default("repo", json!("my-org/my-repo")),
                    ParamSpec::required_with_default("pr_number", json!(1)),
                    ParamSpec::required_with_default("label", json!("ready-for-review")),
                ],
                suggested_trigger: Some("github.issue_created".into()),
            },
            CapabilitySpec {
                key: "github.add_label".into(),
                description: "Add labels to a GitHub issue.".into(),
                kind: CapabilityKind::Action,
                group: "devtools".into(),
                params: vec![
                    ParamSpec::required_with_default("repo", json!("my-org/my-repo")),
                    ParamSpec::required("issue_number"),
                    ParamSpec::required("labels"),
                ],
                suggested_trigger: Some("github.issue_created".into()),
            },
            CapabilitySpec {
                key: "github.close_issue".into(),
                description: "Close a GitHub issue.".into(),
                kind: CapabilityKind::Action,
                group: "devtools".into(),
                params: vec![
                    ParamSpec::required_with_default("repo", json!("my-org/my-repo")),
                    ParamSpec::required("issue_number"),
                ],
                suggested_trigger: Some("github.issue_created".into()),
            },
            CapabilitySpec {
                key: "github.create_repo".into(),
                description: "Create a new GitHub repository.".into(),
                kind: CapabilityKind::Action,
                group: "devtools".into(),
                params: vec![
                    ParamSpec::required("name"),
                    ParamSpec::optional("private", json!(true)),
                    ParamSpec::optional("description", json!("")),
                ],
                suggested_trigger: None,
            },
            CapabilitySpec {
                key: "github.query_issues".into(),
                description: "List open issues in a GitHub repository.".into(),
                kind: CapabilityKind::Action,
                group: "devtools".into(),
                params: vec![
                    ParamSpec::required_with_default("repo", json!("my-org/my-repo")),
                    ParamSpec::optional("state", json!("open")),
                    ParamSpec::optional("per_page", json!(5)),
                ],
                suggested_trigger: Some("github.issue_created".into()),
            },
            // === Docs / output ===
            CapabilitySpec {
                key: "doc.generate_summary".into(),
                description: "Generate a report from content (markdown or HTML).".into(),
                kind: CapabilityKind::Action,
                group: "docs".into(),
                params: vec![
                    ParamSpec::required_with_default(
                        "text",
                        json!("Here's what happened today..."),
                    ),
                    ParamSpec::optional("format", json!("markdown")),
                ],
                suggested_trigger: None,
            },
            CapabilitySpec {
                key: "doc.save_to_file".into(),
                description: "Save given content to a local file.".into(),
                kind: CapabilityKind::Action,
                group: "docs".into(),
                params: vec![
                    ParamSpec::required_with_default("filename", json!("output.md")),
                    ParamSpec::required_with_default("content", json!("# Report\n\nNo content.")),
                ],
                suggested_trigger: None,
            },
        ];

        Self::from_specs(specs).expect("built-in catalog has unique keys")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let registry = CapabilityRegistry::builtin();
        let spec = registry.lookup("github.create_issue").unwrap();
        assert_eq!(spec.kind, CapabilityKind::Action);
        assert_eq!(
            spec.suggested_trigger.as_deref(),
            Some("github.issue_created")
        );
        assert!(registry.lookup("nope.nothing").is_none());
    }

    #[test]
    fn test_is_trigger() {
        let registry = CapabilityRegistry::builtin();
        assert!(registry.is_trigger("scheduler.cron"));
        assert!(registry.is_trigger("github.issue_created"));
        assert!(!registry.is_trigger("github.create_issue"));
        assert!(!registry.is_trigger("unknown.key"));
    }

    #[test]
    fn test_required_params() {
        let registry = CapabilityRegistry::builtin();
        let mut required = registry.required_params("email.send");
        required.sort_unstable();
        assert_eq!(required, vec!["body", "subject", "to"]);
        assert!(registry.required_params("webhook.receive").is_empty());
    }

    #[test]
    fn test_trigger_keys_sorted() {
        let registry = CapabilityRegistry::builtin();
        assert_eq!(
            registry.trigger_keys(),
            vec!["github.issue_created", "scheduler.cron", "webhook.receive"]
        );
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let spec = CapabilitySpec {
            key: "a.b".into(),
            description: String::new(),
            kind: CapabilityKind::Action,
            group: "utility".into(),
            params: vec![],
            suggested_trigger: None,
        };
        let err = CapabilityRegistry::from_specs(vec![spec.clone(), spec]).unwrap_err();
        assert!(matches!(err, RegistryError::DuplicateKey(key) if key == "a.b"));
    }

    #[test]
    fn test_from_json_catalog() {
        let registry = CapabilityRegistry::from_json(serde_json::json!([
            {
                "key": "custom.echo",
                "description": "Echo the input.",
                "kind": "action",
                "group": "utility",
                "params": [{ "name": "text", "required": true }]
            }
        ]))
        .unwrap();
        assert!(registry.contains("custom.echo"));
        assert_eq!(registry.required_params("custom.echo"), vec!["text"]);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        let err = CapabilityRegistry::from_json(serde_json::json!({"not": "an array"}));
        assert!(matches!(err, Err(RegistryError::InvalidCatalog(_))));
    }
}
