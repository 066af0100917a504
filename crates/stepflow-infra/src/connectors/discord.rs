//! Discord connector posting through an incoming webhook.

use futures_util::future::BoxFuture;
use serde_json::{Map, Value, json};

use stepflow_core::connector::{Connector, ConnectorError};
use stepflow_core::context::ExecutionContext;

use super::{api_error, require_str};

/// Connector for `discord.send_message`. The webhook URL is a step
/// parameter, not a secret: each workflow targets its own channel webhook.
pub struct DiscordConnector {
    client: reqwest::Client,
}

impl DiscordConnector {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Connector for DiscordConnector {
    fn name(&self) -> &str {
        "discord"
    }

    fn run<'a>(
        &'a self,
        params: &'a Map<String, Value>,
        _ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<Value, ConnectorError>> {
        Box::pin(async move {
            let webhook_url = require_str(params, "webhook_url")?;
            let content = require_str(params, "content")?;

            if !webhook_url.starts_with("https://") {
                return Err(ConnectorError::MissingParam("webhook_url".to_string()));
            }

            let response = self
                .client
                .post(webhook_url)
                .json(&json!({ "content": content }))
                .send()
                .await
                .map_err(|e| ConnectorError::Http(e.to_string()))?;
            if !response.status().is_success() {
                return Err(api_error(response).await);
            }

            tracing::info!("Discord message posted");
            Ok(json!("Message sent to Discord webhook"))
        })
    }
}
