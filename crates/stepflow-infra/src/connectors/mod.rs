//! Built-in connector implementations.
//!
//! One connector per capability (or per capability family, for GitHub and
//! Notion, which funnel several keys through a single implementation that
//! switches on the `_step_type` discriminator). All HTTP goes through one
//! shared `reqwest::Client` constructed by the host and injected here; API
//! tokens come from an injected `SecretStore`.

pub mod ai;
pub mod api;
pub mod discord;
pub mod doc;
pub mod email;
pub mod github;
pub mod notion;
pub mod slack;
pub mod weather;

use std::sync::Arc;

use serde_json::{Map, Value};

use stepflow_core::connector::{ConnectorError, ConnectorRegistry};
use stepflow_core::secret::SecretStore;

/// Wire the full connector table for the built-in capability catalog.
pub fn builtin_connectors(
    client: reqwest::Client,
    secrets: Arc<dyn SecretStore>,
) -> ConnectorRegistry {
    let mut registry = ConnectorRegistry::new();

    registry.register(
        "ai.summarize",
        Arc::new(ai::AiConnector::new(client.clone(), secrets.clone())),
    );
    registry.register("email.send", Arc::new(email::EmailConnector));
    registry.register(
        "api.http_get",
        Arc::new(api::HttpGetConnector::new(client.clone())),
    );
    registry.register(
        "api.fetch_hacker_news",
        Arc::new(api::HackerNewsConnector::new(client.clone())),
    );
    registry.register(
        "weather.fetch_forecast",
        Arc::new(weather::WeatherConnector::new(client.clone(), secrets.clone())),
    );
    registry.register(
        "slack.send_message",
        Arc::new(slack::SlackConnector::new(client.clone(), secrets.clone())),
    );
    registry.register(
        "discord.send_message",
        Arc::new(discord::DiscordConnector::new(client.clone())),
    );
    registry.register("doc.generate_summary", Arc::new(doc::GenerateSummaryConnector));
    registry.register("doc.save_to_file", Arc::new(doc::SaveToFileConnector));

    registry.register_family(
        "github",
        Arc::new(github::GitHubConnector::new(client.clone(), secrets.clone())),
    );
    registry.register_family(
        "notion",
        Arc::new(notion::NotionConnector::new(client, secrets)),
    );

    registry
}

// ---------------------------------------------------------------------------
// Shared parameter helpers
// ---------------------------------------------------------------------------

/// A required string parameter.
pub(crate) fn require_str<'p>(
    params: &'p Map<String, Value>,
    key: &str,
) -> Result<&'p str, ConnectorError> {
    params
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| ConnectorError::MissingParam(key.to_string()))
}

/// An optional string parameter with a fallback.
pub(crate) fn optional_str<'p>(
    params: &'p Map<String, Value>,
    key: &str,
    fallback: &'p str,
) -> &'p str {
    params.get(key).and_then(Value::as_str).unwrap_or(fallback)
}

/// A required integer parameter; numeric strings are accepted since
/// template substitution stringifies values.
pub(crate) fn require_u64(params: &Map<String, Value>, key: &str) -> Result<u64, ConnectorError> {
    match params.get(key) {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .ok_or_else(|| ConnectorError::MissingParam(key.to_string()))
}

/// An optional integer parameter with a fallback (same coercion rules).
pub(crate) fn optional_u64(params: &Map<String, Value>, key: &str, fallback: u64) -> u64 {
    match params.get(key) {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    }
    .unwrap_or(fallback)
}

/// Fetch a secret the connector cannot work without.
pub(crate) async fn require_secret(
    secrets: &dyn SecretStore,
    key: &str,
) -> Result<String, ConnectorError> {
    secrets
        .get(key)
        .await
        .map_err(|e| ConnectorError::Http(e.to_string()))?
        .ok_or_else(|| ConnectorError::MissingSecret(key.to_string()))
}

/// Map a failed HTTP response into `ConnectorError::Api` with a truncated
/// body excerpt.
pub(crate) async fn api_error(response: reqwest::Response) -> ConnectorError {
    let status = response.status().as_u16();
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "<unreadable body>".to_string())
        .chars()
        .take(300)
        .collect();
    ConnectorError::Api { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    use crate::secret::file::JsonFileSecretStore;
    use stepflow_core::registry::CapabilityRegistry;
    use stepflow_types::capability::CapabilityKind;

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_require_str() {
        let p = params(json!({ "repo": "acme/widgets", "count": 3 }));
        assert_eq!(require_str(&p, "repo").unwrap(), "acme/widgets");
        assert!(matches!(
            require_str(&p, "count"),
            Err(ConnectorError::MissingParam(key)) if key == "count"
        ));
        assert!(require_str(&p, "absent").is_err());
    }

    #[test]
    fn test_u64_coercion() {
        let p = params(json!({ "n": 7, "s": "42", "bad": "seven" }));
        assert_eq!(require_u64(&p, "n").unwrap(), 7);
        assert_eq!(require_u64(&p, "s").unwrap(), 42);
        assert!(require_u64(&p, "bad").is_err());
        assert_eq!(optional_u64(&p, "absent", 3), 3);
    }

    #[tokio::test]
    async fn test_require_secret() {
        let secrets = JsonFileSecretStore::from_values(HashMap::from([(
            "GITHUB_TOKEN".to_string(),
            "ghp_test".to_string(),
        )]));
        assert_eq!(
            require_secret(&secrets, "GITHUB_TOKEN").await.unwrap(),
            "ghp_test"
        );
        assert!(matches!(
            require_secret(&secrets, "ABSENT").await,
            Err(ConnectorError::MissingSecret(key)) if key == "ABSENT"
        ));
    }

    #[test]
    fn test_every_builtin_action_is_routable() {
        // The pre-flight route check in the runner relies on this wiring
        // covering the whole catalog.
        let secrets: Arc<dyn stepflow_core::secret::SecretStore> =
            Arc::new(JsonFileSecretStore::from_values(HashMap::new()));
        let connectors = builtin_connectors(reqwest::Client::new(), secrets);

        let registry = CapabilityRegistry::builtin();
        for spec in registry.iter().filter(|s| s.kind == CapabilityKind::Action) {
            assert!(
                connectors.can_route(&spec.key),
                "no connector route for '{}'",
                spec.key
            );
        }
    }
}
