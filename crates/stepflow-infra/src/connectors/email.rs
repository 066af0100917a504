//! Email connector.
//!
//! Logs the message and returns a mock confirmation. A real SMTP transport
//! is a deployment concern; workflows exercising the email step during
//! development should not send live mail.

use futures_util::future::BoxFuture;
use serde_json::{Map, Value};

use stepflow_core::connector::{Connector, ConnectorError};
use stepflow_core::context::ExecutionContext;

use super::require_str;

/// Connector for `email.send`.
pub struct EmailConnector;

impl Connector for EmailConnector {
    fn name(&self) -> &str {
        "email"
    }

    fn run<'a>(
        &'a self,
        params: &'a Map<String, Value>,
        _ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<Value, ConnectorError>> {
        Box::pin(async move {
            let to = require_str(params, "to")?;
            let subject = require_str(params, "subject")?;
            let body = require_str(params, "body")?;

            tracing::info!(to, subject, body_len = body.len(), "sending email (mocked)");
            Ok(Value::String(format!("Email sent to {to} (mocked)")))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_mock_send() {
        let params = json!({
            "to": "team@acme.dev",
            "subject": "Weekly digest",
            "body": "All green."
        })
        .as_object()
        .unwrap()
        .clone();
        let ctx = ExecutionContext::new(Map::new());

        let out = EmailConnector.run(&params, &ctx).await.unwrap();
        assert_eq!(out, json!("Email sent to team@acme.dev (mocked)"));
    }

    #[tokio::test]
    async fn test_missing_subject() {
        let params = json!({ "to": "x@y.z", "body": "hi" })
            .as_object()
            .unwrap()
            .clone();
        let ctx = ExecutionContext::new(Map::new());

        let err = EmailConnector.run(&params, &ctx).await.unwrap_err();
        assert!(matches!(
            err,
            ConnectorError::MissingParam(key) if key == "subject"
        ));
    }
}
