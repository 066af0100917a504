//! Capability catalog model.
//!
//! A capability is a named unit of work (a trigger kind or an action kind)
//! with a fixed parameter contract. The catalog is data, not code: it can be
//! deserialized from JSON configuration or built from the built-in table in
//! `stepflow-core`. Step dispatch validates `(type, params)` pairs against
//! this catalog at runtime instead of synthesizing per-capability types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Whether a capability starts workflows or performs work inside them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    Trigger,
    Action,
}

/// Contract for one parameter of a capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamSpec {
    /// Parameter name as it appears in `params`.
    pub name: String,
    /// Required parameters must be present and resolved before execution.
    #[serde(default)]
    pub required: bool,
    /// Default value, when the catalog declares one. Defaults on required
    /// parameters are real configuration (e.g. a standard cron expression);
    /// sample-looking defaults are scrubbed by the sanitizer's denylist.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ParamSpec {
    /// A required parameter without a default.
    pub fn required(name: &str) -> Self {
        Self {
            name: name.to_string(),
            required: true,
            default: None,
        }
    }

    /// A required parameter with a catalog default.
    pub fn required_with_default(name: &str, default: Value) -> Self {
        Self {
            name: name.to_string(),
            required: true,
            default: Some(default),
        }
    }

    /// An optional parameter with a catalog default.
    pub fn optional(name: &str, default: Value) -> Self {
        Self {
            name: name.to_string(),
            required: false,
            default: Some(default),
        }
    }
}

/// Catalog entry describing one capability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilitySpec {
    /// Globally unique key, e.g. "github.create_issue" or "scheduler.cron".
    pub key: String,
    /// One-line description shown in the `capabilities` listing.
    pub description: String,
    /// Trigger or action.
    pub kind: CapabilityKind,
    /// Listing group (utility, communication, api, productivity, devtools,
    /// docs).
    pub group: String,
    /// Parameter contracts.
    #[serde(default)]
    pub params: Vec<ParamSpec>,
    /// Trigger key to adopt when a workflow using this action arrives with
    /// no trigger at all.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_trigger: Option<String>,
}

impl CapabilitySpec {
    /// Names of all required parameters.
    pub fn required_params(&self) -> impl Iterator<Item = &str> {
        self.params
            .iter()
            .filter(|p| p.required)
            .map(|p| p.name.as_str())
    }

    /// Look up one parameter contract by name.
    pub fn param(&self, name: &str) -> Option<&ParamSpec> {
        self.params.iter().find(|p| p.name == name)
    }

    /// The capability family prefix (the part before the first dot).
    pub fn family(&self) -> &str {
        self.key
            .split_once('.')
            .map(|(family, _)| family)
            .unwrap_or(&self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec() -> CapabilitySpec {
        CapabilitySpec {
            key: "github.create_issue".to_string(),
            description: "Create a new issue in a GitHub repository.".to_string(),
            kind: CapabilityKind::Action,
            group: "devtools".to_string(),
            params: vec![
                ParamSpec::required_with_default("repo", json!("my-org/my-repo")),
                ParamSpec::required_with_default("title", json!("Bug report")),
                ParamSpec::optional("labels", json!([])),
            ],
            suggested_trigger: Some("github.issue_created".to_string()),
        }
    }

    #[test]
    fn test_required_params() {
        let spec = spec();
        let required: Vec<&str> = spec.required_params().collect();
        assert_eq!(required, vec!["repo", "title"]);
    }

    #[test]
    fn test_param_lookup() {
        let spec = spec();
        assert!(spec.param("labels").is_some());
        assert!(!spec.param("labels").unwrap().required);
        assert!(spec.param("nope").is_none());
    }

    #[test]
    fn test_family() {
        assert_eq!(spec().family(), "github");
    }

    #[test]
    fn test_spec_json_roundtrip() {
        let original = spec();
        let text = serde_json::to_string(&original).unwrap();
        assert!(text.contains("\"kind\":\"action\""));
        let parsed: CapabilitySpec = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn test_spec_from_config_json() {
        // The catalog is configuration: entries deserialize from plain JSON.
        let parsed: CapabilitySpec = serde_json::from_value(json!({
            "key": "scheduler.cron",
            "description": "Run the workflow on a recurring cron schedule.",
            "kind": "trigger",
            "group": "trigger",
            "params": [
                { "name": "expression", "required": true, "default": "0 9 * * *" }
            ]
        }))
        .unwrap();
        assert_eq!(parsed.kind, CapabilityKind::Trigger);
        assert_eq!(
            parsed.param("expression").unwrap().default,
            Some(json!("0 9 * * *"))
        );
    }
}
