//! Notion family connector.
//!
//! Serves `notion.*` actions through one implementation switching on the
//! `_step_type` discriminator. Talks to the Notion REST API with a
//! `NOTION_TOKEN` bearer token.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value, json};

use stepflow_core::connector::{Connector, ConnectorError};
use stepflow_core::context::ExecutionContext;
use stepflow_core::secret::SecretStore;

use super::{api_error, optional_str, require_secret, require_str};

const API_BASE: &str = "https://api.notion.com";
const NOTION_VERSION: &str = "2022-06-28";

/// Family connector for `notion.*` capabilities.
pub struct NotionConnector {
    client: reqwest::Client,
    secrets: Arc<dyn SecretStore>,
    base_url: String,
}

impl NotionConnector {
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

    fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        token: &SecretString,
    ) -> reqwest::RequestBuilder {
        self.client
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(token.expose_secret())
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn create_page(
        &self,
        params: &Map<String, Value>,
        token: &SecretString,
    ) -> Result<Value, ConnectorError> {
        let body = build_page_body(params)?;

        let response = self
            .request(reqwest::Method::POST, "/v1/pages", token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ConnectorError::Http(e.to_string()))?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let page: Value = response
            .json()
            .await
            .map_err(|e| ConnectorError::Http(e.to_string()))?;
        tracing::info!("Notion page created");
        Ok(page.get("url").cloned().unwrap_or(Value::Null))
    }

    /// A task is a page with a title property and the content as a first
    /// paragraph, created under the configured default database.
    async fn create_task(
        &self,
        params: &Map<String, Value>,
        token: &SecretString,
    ) -> Result<Value, ConnectorError> {
        let title = require_str(params, "title")?;
        let content = require_str(params, "content")?;
        let database_id = match params.get("database_id").and_then(Value::as_str) {
            Some(id) => id.to_string(),
            None => require_secret(&*self.secrets, "NOTION_DATABASE_ID").await?,
        };

        let body = json!({
            "parent": { "database_id": database_id },
            "properties": {
                "Name": { "title": [{ "text": { "content": title } }] }
            },
            "children": [paragraph_block(content)],
        });

        let response = self
            .request(reqwest::Method::POST, "/v1/pages", token)
            .json(&body)
            .send()
            .await
            .map_err(|e| ConnectorError::Http(e.to_string()))?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let page: Value = response
            .json()
            .await
            .map_err(|e| ConnectorError::Http(e.to_string()))?;
        tracing::info!(title, "Notion task created");
        Ok(page.get("url").cloned().unwrap_or(Value::Null))
    }

    async fn append_block(
        &self,
        params: &Map<String, Value>,
        token: &SecretString,
    ) -> Result<Value, ConnectorError> {
        let page_id = require_str(params, "page_id")?;
        let text = require_str(params, "text")?;

        let response = self
            .request(
                reqwest::Method::PATCH,
                &format!("/v1/blocks/{page_id}/children"),
                token,
            )
            .json(&json!({ "children": [paragraph_block(text)] }))
            .send()
            .await
            .map_err(|e| ConnectorError::Http(e.to_string()))?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        tracing::info!(page_id, "block appended");
        Ok(json!(format!("Appended content to page {page_id}")))
    }
}

/// Request body for `notion.create_page`. The `parent_type` resolved by the
/// parameter hook selects between database and page parents.
fn build_page_body(params: &Map<String, Value>) -> Result<Value, ConnectorError> {
    let parent_id = require_str(params, "parent_id")?;
    let parent = match optional_str(params, "parent_type", "database") {
        "page" => json!({ "page_id": parent_id }),
        _ => json!({ "database_id": parent_id }),
    };

    let title = optional_str(params, "title", "Untitled Page");
    let properties = params
        .get("properties")
        .filter(|p| p.is_object() && !p.as_object().unwrap().is_empty())
        .cloned()
        .unwrap_or_else(|| {
            json!({
                "Name": { "title": [{ "text": { "content": title } }] }
            })
        });
    let children = params.get("children").cloned().unwrap_or(json!([]));

    Ok(json!({
        "parent": parent,
        "properties": properties,
        "children": children,
    }))
}

fn paragraph_block(text: &str) -> Value {
    json!({
        "object": "block",
        "type": "paragraph",
        "paragraph": {
            "rich_text": [{ "type": "text", "text": { "content": text } }]
        }
    })
}

impl Connector for NotionConnector {
    fn name(&self) -> &str {
        "notion"
    }

    fn run<'a>(
        &'a self,
        params: &'a Map<String, Value>,
        _ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<Value, ConnectorError>> {
        Box::pin(async move {
            let token = SecretString::from(require_secret(&*self.secrets, "NOTION_TOKEN").await?);
            let operation = require_str(params, stepflow_types::workflow::STEP_TYPE_KEY)?;

            match operation {
                "notion.create_page" => self.create_page(params, &token).await,
                "notion.create_task" => self.create_task(params, &token).await,
                "notion.append_block" => self.append_block(params, &token).await,
                other => Err(ConnectorError::Unsupported(other.to_string())),
            }
        })
    }
}
