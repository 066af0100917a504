//! AI summarization connector.
//!
//! Sends the text to an OpenAI-compatible chat-completions endpoint
//! (`/v1/chat/completions`) and returns the model's reply. The API key is
//! wrapped in [`secrecy::SecretString`] and never appears in Debug output
//! or logs.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value, json};

use stepflow_core::connector::{Connector, ConnectorError};
use stepflow_core::context::ExecutionContext;
use stepflow_core::secret::SecretStore;

use super::{api_error, optional_str, require_secret, require_str};

const API_BASE: &str = "https://api.openai.com";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Connector for `ai.summarize`.
pub struct AiConnector {
    client: reqwest::Client,
    secrets: Arc<dyn SecretStore>,
    base_url: String,
}

impl AiConnector {
    pub fn new(client: reqwest::Client, secrets: Arc<dyn SecretStore>) -> Self {
        Self {
            client,
            secrets,
            base_url: API_BASE.to_string(),
        }
    }

    /// Override the base URL (useful for testing or proxies).
    #[allow(dead_code)]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }
}

/// Request body for the chat-completions call.
fn summarize_request(model: &str, text: &str) -> Value {
    json!({
        "model": model,
        "messages": [
            { "role": "user", "content": format!("Summarize this:\n\n{text}") }
        ],
        "temperature": 0.2,
    })
}

impl Connector for AiConnector {
    fn name(&self) -> &str {
        "ai"
    }

    fn run<'a>(
        &'a self,
        params: &'a Map<String, Value>,
        _ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<Value, ConnectorError>> {
        Box::pin(async move {
            let text = require_str(params, "text")?;
            let model = optional_str(params, "model", DEFAULT_MODEL);
            let api_key =
                SecretString::from(require_secret(&*self.secrets, "OPENAI_API_KEY").await?);

            tracing::debug!(model, chars = text.len(), "requesting summary");

            let response = self
                .client
                .post(format!("{}/v1/chat/completions", self.base_url))
                .bearer_auth(api_key.expose_secret())
                .json(&summarize_request(model, text))
                .send()
                .await
                .map_err(|e| ConnectorError::Http(e.to_string()))?;
            if !response.status().is_success() {
                return Err(api_error(response).await);
            }

            let body: Value = response
                .json()
                .await
                .map_err(|e| ConnectorError::Http(e.to_string()))?;
            let content = body["choices"][0]["message"]["content"]
                .as_str()
                .ok_or_else(|| ConnectorError::Http("malformed completion response".to_string()))?;

            Ok(Value::String(content.to_string()))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::secret::file::JsonFileSecretStore;

    #[test]
    fn test_request_body_shape() {
        let body = summarize_request("gpt-4o-mini", "Long article text");
        assert_eq!(body["model"], json!("gpt-4o-mini"));
        assert_eq!(body["temperature"], json!(0.2));
        let content = body["messages"][0]["content"].as_str().unwrap();
        assert!(content.starts_with("Summarize this:\n\n"));
        assert!(content.ends_with("Long article text"));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let secrets: Arc<dyn SecretStore> =
            Arc::new(JsonFileSecretStore::from_values(HashMap::new()));
        let connector = AiConnector::new(reqwest::Client::new(), secrets);
        let params = json!({ "text": "hello" }).as_object().unwrap().clone();
        let ctx = ExecutionContext::new(Map::new());

        let err = connector.run(&params, &ctx).await.unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::MissingSecret(key) if key == "OPENAI_API_KEY"
        ));
    }

    #[tokio::test]
    async fn test_missing_text_param() {
        let secrets: Arc<dyn SecretStore> = Arc::new(JsonFileSecretStore::from_values(
            HashMap::from([("OPENAI_API_KEY".to_string(), "sk-test".to_string())]),
        ));
        let connector = AiConnector::new(reqwest::Client::new(), secrets);
        let ctx = ExecutionContext::new(Map::new());

        let err = connector.run(&Map::new(), &ctx).await.unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::MissingParam(key) if key == "text"
        ));
    }
}
