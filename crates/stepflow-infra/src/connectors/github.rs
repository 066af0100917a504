//! GitHub family connector.
//!
//! Serves every `github.*` action through one implementation that switches
//! on the `_step_type` discriminator injected during sanitization. Talks to
//! the GitHub REST API with a `GITHUB_TOKEN` bearer token.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value, json};

use stepflow_core::connector::{Connector, ConnectorError};
use stepflow_core::context::ExecutionContext;
use stepflow_core::secret::SecretStore;

use super::{api_error, optional_str, optional_u64, require_secret, require_str, require_u64};

const API_BASE: &str = "https://api.github.com";
const ACCEPT: &str = "application/vnd.github+json";

/// Family connector for `github.*` capabilities.
pub struct GitHubConnector {
    client: reqwest::Client,
    secrets: Arc<dyn SecretStore>,
    base_url: String,
}

impl GitHubConnector {
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
            .header("accept", ACCEPT)
    }

    async fn create_issue(
        &self,
        params: &Map<String, Value>,
        token: &SecretString,
    ) -> Result<Value, ConnectorError> {
        let repo = require_str(params, "repo")?;
        let payload = json!({
            "title": require_str(params, "title")?,
            "body": optional_str(params, "body", ""),
            "labels": params.get("labels").cloned().unwrap_or(json!([])),
            "assignees": params.get("assignees").cloned().unwrap_or(json!([])),
        });

        let response = self
            .request(reqwest::Method::POST, &format!("/repos/{repo}/issues"), token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ConnectorError::Http(e.to_string()))?;
        if response.status().as_u16() != 201 {
            return Err(api_error(response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ConnectorError::Http(e.to_string()))?;
        tracing::info!(repo, "GitHub issue created");
        Ok(body.get("html_url").cloned().unwrap_or(Value::Null))
    }

    /// Issue and PR comments share the issues comments endpoint.
    async fn comment(
        &self,
        repo: &str,
        number: u64,
        text: &str,
        token: &SecretString,
    ) -> Result<Value, ConnectorError> {
        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/repos/{repo}/issues/{number}/comments"),
                token,
            )
            .json(&json!({ "body": text }))
            .send()
            .await
            .map_err(|e| ConnectorError::Http(e.to_string()))?;
        if response.status().as_u16() != 201 {
            return Err(api_error(response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ConnectorError::Http(e.to_string()))?;
        tracing::info!(repo, number, "comment added");
        Ok(body.get("html_url").cloned().unwrap_or(Value::Null))
    }

    async fn add_label(
        &self,
        params: &Map<String, Value>,
        token: &SecretString,
    ) -> Result<Value, ConnectorError> {
        let repo = require_str(params, "repo")?;
        let number = require_u64(params, "issue_number")?;
        let labels = params
            .get("labels")
            .cloned()
            .ok_or_else(|| ConnectorError::MissingParam("labels".to_string()))?;

        let response = self
            .request(
                reqwest::Method::POST,
                &format!("/repos/{repo}/issues/{number}/labels"),
                token,
            )
            .json(&json!({ "labels": labels }))
            .send()
            .await
            .map_err(|e| ConnectorError::Http(e.to_string()))?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        tracing::info!(repo, number, "labels added");
        Ok(labels)
    }

    async fn label_check(
        &self,
        params: &Map<String, Value>,
        token: &SecretString,
    ) -> Result<Value, ConnectorError> {
        let repo = require_str(params, "repo")?;
        let number = require_u64(params, "pr_number")?;
        let wanted = require_str(params, "label")?;

        let response = self
            .request(
                reqwest::Method::GET,
                &format!("/repos/{repo}/issues/{number}/labels"),
                token,
            )
            .send()
            .await
            .map_err(|e| ConnectorError::Http(e.to_string()))?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let labels: Value = response
            .json()
            .await
            .map_err(|e| ConnectorError::Http(e.to_string()))?;
        let present = labels
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|l| l.get("name").and_then(Value::as_str))
                    .any(|name| name == wanted)
            })
            .unwrap_or(false);
        Ok(json!({ "label": wanted, "present": present }))
    }

    async fn close_issue(
        &self,
        params: &Map<String, Value>,
        token: &SecretString,
    ) -> Result<Value, ConnectorError> {
        let repo = require_str(params, "repo")?;
        let number = require_u64(params, "issue_number")?;

        let response = self
            .request(
                reqwest::Method::PATCH,
                &format!("/repos/{repo}/issues/{number}"),
                token,
            )
            .json(&json!({ "state": "closed" }))
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
        tracing::info!(repo, number, "issue closed");
        Ok(body.get("html_url").cloned().unwrap_or(Value::Null))
    }

    async fn create_repo(
        &self,
        params: &Map<String, Value>,
        token: &SecretString,
    ) -> Result<Value, ConnectorError> {
        let payload = json!({
            "name": require_str(params, "name")?,
            "private": params.get("private").and_then(Value::as_bool).unwrap_or(true),
            "description": optional_str(params, "description", ""),
        });

        let response = self
            .request(reqwest::Method::POST, "/user/repos", token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ConnectorError::Http(e.to_string()))?;
        if response.status().as_u16() != 201 {
            return Err(api_error(response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ConnectorError::Http(e.to_string()))?;
        tracing::info!("repository created");
        Ok(body.get("html_url").cloned().unwrap_or(Value::Null))
    }

    async fn query_issues(
        &self,
        params: &Map<String, Value>,
        token: &SecretString,
    ) -> Result<Value, ConnectorError> {
        let repo = require_str(params, "repo")?;
        let state = optional_str(params, "state", "open");
        let per_page = optional_u64(params, "per_page", 5);

        let response = self
            .request(reqwest::Method::GET, &format!("/repos/{repo}/issues"), token)
            .query(&[("state", state), ("per_page", &per_page.to_string())])
            .send()
            .await
            .map_err(|e| ConnectorError::Http(e.to_string()))?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let issues: Value = response
            .json()
            .await
            .map_err(|e| ConnectorError::Http(e.to_string()))?;
        Ok(json!(summarize_issues(&issues)))
    }
}

/// One line per issue; pull requests come back from the same endpoint and
/// are filtered out.
fn summarize_issues(issues: &Value) -> String {
    let lines: Vec<String> = issues
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter(|issue| issue.get("pull_request").is_none())
                .filter_map(|issue| {
                    let number = issue.get("number")?.as_u64()?;
                    let title = issue.get("title")?.as_str()?;
                    Some(format!("- #{number}: {title}"))
                })
                .collect()
        })
        .unwrap_or_default();

    if lines.is_empty() {
        "No issues found.".to_string()
    } else {
        lines.join("\n")
    }
}

impl Connector for GitHubConnector {
    fn name(&self) -> &str {
        "github"
    }

    fn run<'a>(
        &'a self,
        params: &'a Map<String, Value>,
        _ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<Value, ConnectorError>> {
        Box::pin(async move {
            let token = SecretString::from(require_secret(&*self.secrets, "GITHUB_TOKEN").await?);
            let operation = require_str(params, stepflow_types::workflow::STEP_TYPE_KEY)?;

            match operation {
                "github.create_issue" => self.create_issue(params, &token).await,
                "github.comment_issue" => {
                    let repo = require_str(params, "repo")?;
                    let number = require_u64(params, "issue_number")?;
                    let text = require_str(params, "comment")?;
                    self.comment(repo, number, text, &token).await
                }
                "github.comment_pr" => {
                    let repo = require_str(params, "repo")?;
                    let number = require_u64(params, "pr_number")?;
                    let text = require_str(params, "message")?;
                    self.comment(repo, number, text, &token).await
                }
                "github.add_label" => self.add_label(params, &token).await,
                "github.label_check" => self.label_check(params, &token).await,
                "github.close_issue" => self.close_issue(params, &token).await,
                "github.create_repo" => self.create_repo(params, &token).await,
                "github.query_issues" => self.query_issues(params, &token).await,
                other => Err(ConnectorError::Unsupported(other.to_string())),
            }
        })
    }
}
