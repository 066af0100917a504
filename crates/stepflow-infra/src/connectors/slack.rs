//! Slack connector posting through the Web API (`chat.postMessage`).

use std::sync::Arc;

use futures_util::future::BoxFuture;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value, json};

use stepflow_core::connector::{Connector, ConnectorError};
use stepflow_core::context::ExecutionContext;
use stepflow_core::secret::SecretStore;

use super::{api_error, require_secret, require_str};

const API_URL: &str = "https://slack.com/api/chat.postMessage";

/// Connector for `slack.send_message`.
pub struct SlackConnector {
    client: reqwest::Client,
    secrets: Arc<dyn SecretStore>,
    api_url: String,
}

impl SlackConnector {
    pub fn new(client: reqwest::Client, secrets: Arc<dyn SecretStore>) -> Self {
        Self {
            client,
            secrets,
            api_url: API_URL.to_string(),
        }
    }

    /// Override the API URL (useful for testing).
    #[allow(dead_code)]
    pub fn with_api_url(mut self, api_url: String) -> Self {
        self.api_url = api_url;
        self
    }
}

impl Connector for SlackConnector {
    fn name(&self) -> &str {
        "slack"
    }

    fn run<'a>(
        &'a self,
        params: &'a Map<String, Value>,
        _ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<Value, ConnectorError>> {
        Box::pin(async move {
            let channel = require_str(params, "channel")?;
            let message = require_str(params, "message")?;
            let token =
                SecretString::from(require_secret(&*self.secrets, "SLACK_BOT_TOKEN").await?);

            let response = self
                .client
                .post(&self.api_url)
                .bearer_auth(token.expose_secret())
                .json(&json!({ "channel": channel, "text": message }))
                .send()
                .await
                .map_err(|e| ConnectorError::Http(e.to_string()))?;
            if !response.status().is_success() {
                return Err(api_error(response).await);
            }

            // Slack answers 200 even for failures; the body carries the verdict.
            let body: Value = response
                .json()
                .await
                .map_err(|e| ConnectorError::Http(e.to_string()))?;
            if !body["ok"].as_bool().unwrap_or(false) {
                let reason = body["error"].as_str().unwrap_or("unknown").to_string();
                return Err(ConnectorError::Api {
                    status: 200,
                    message: reason,
                });
            }

            tracing::info!(channel, "Slack message posted");
            Ok(json!(format!("Message sent to Slack channel: {channel}")))
        })
    }
}
