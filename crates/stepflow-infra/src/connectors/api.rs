//! Generic API connectors: plain HTTP GET and the Hacker News top stories
//! feed.

use futures_util::future::BoxFuture;
use serde_json::{Map, Value, json};

use stepflow_core::connector::{Connector, ConnectorError};
use stepflow_core::context::ExecutionContext;

use super::{api_error, optional_u64, require_str};

const HN_API_BASE: &str = "https://hacker-news.firebaseio.com/v0";

/// Connector for `api.http_get`.
pub struct HttpGetConnector {
    client: reqwest::Client,
}

impl HttpGetConnector {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Connector for HttpGetConnector {
    fn name(&self) -> &str {
        "http"
    }

    fn run<'a>(
        &'a self,
        params: &'a Map<String, Value>,
        _ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<Value, ConnectorError>> {
        Box::pin(async move {
            let url = require_str(params, "url")?;

            let mut request = self.client.get(url);
            if let Some(headers) = params.get("headers").and_then(Value::as_object) {
                for (key, value) in headers {
                    if let Some(value) = value.as_str() {
                        request = request.header(key.as_str(), value);
                    }
                }
            }

            let response = request
                .send()
                .await
                .map_err(|e| ConnectorError::Http(format!("GET {url} failed: {e}")))?;
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .map_err(|e| ConnectorError::Http(e.to_string()))?;

            tracing::info!(url, status, body_len = body.len(), "HTTP GET completed");
            Ok(json!({ "status": status, "body": body }))
        })
    }
}

/// Connector for `api.fetch_hacker_news`.
pub struct HackerNewsConnector {
    client: reqwest::Client,
    base_url: String,
}

impl HackerNewsConnector {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: HN_API_BASE.to_string(),
        }
    }

    /// Override the API base (useful for testing).
    #[allow(dead_code)]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    async fn fetch_json(&self, path: &str) -> Result<Value, ConnectorError> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .map_err(|e| ConnectorError::Http(e.to_string()))?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        response
            .json()
            .await
            .map_err(|e| ConnectorError::Http(e.to_string()))
    }
}

/// Numbered story list, one line per title.
fn format_stories(titles: &[String]) -> String {
    titles
        .iter()
        .enumerate()
        .map(|(i, title)| format!("{}. {title}", i + 1))
        .collect::<Vec<_>>()
        .join("\n")
}

impl Connector for HackerNewsConnector {
    fn name(&self) -> &str {
        "hacker-news"
    }

    fn run<'a>(
        &'a self,
        params: &'a Map<String, Value>,
        _ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<Value, ConnectorError>> {
        Box::pin(async move {
            let limit = optional_u64(params, "limit", 3) as usize;

            let ids = self.fetch_json("/topstories.json").await?;
            let ids: Vec<u64> = ids
                .as_array()
                .map(|items| items.iter().filter_map(Value::as_u64).collect())
                .unwrap_or_default();

            let mut titles = Vec::with_capacity(limit);
            for id in ids.into_iter().take(limit) {
                let item = self.fetch_json(&format!("/item/{id}.json")).await?;
                if let Some(title) = item.get("title").and_then(Value::as_str) {
                    titles.push(title.to_string());
                }
            }

            tracing::info!(count = titles.len(), "fetched Hacker News top stories");
            Ok(Value::String(format_stories(&titles)))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_stories() {
        let titles = vec![
            "Story A".to_string(),
            "Story B".to_string(),
            "Story C".to_string(),
        ];
        assert_eq!(format_stories(&titles), "1. Story A\n2. Story B\n3. Story C");
    }

    #[test]
    fn test_format_stories_empty() {
        assert_eq!(format_stories(&[]), "");
    }

    #[tokio::test]
    async fn test_http_get_requires_url() {
        let connector = HttpGetConnector::new(reqwest::Client::new());
        let ctx = ExecutionContext::new(Map::new());
        let err = connector.run(&Map::new(), &ctx).await.unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::MissingParam(key) if key == "url"
        ));
    }
}
