//! Connector boundary: the contract every capability implementation
//! satisfies, and the two-tier dispatch table the runner routes through.
//!
//! Connectors receive resolved params and a read-only view of the execution
//! context; the dispatcher owns all context mutation. Routing is two-tier:
//! an exact capability-key match wins, otherwise the key's family prefix is
//! looked up among family connectors, which switch internally on the
//! `_step_type` discriminator the sanitizer injected.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::context::ExecutionContext;

/// Errors a capability implementation may raise.
///
/// Non-fatal at the dispatcher level by default: the failing step records an
/// error output and the run continues.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// A parameter the connector needs is absent or has the wrong shape.
    #[error("missing or invalid parameter '{0}'")]
    MissingParam(String),

    /// A secret the connector needs is not available.
    #[error("missing secret '{0}'")]
    MissingSecret(String),

    /// Transport-level HTTP failure.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// The remote API answered with a failure status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Local I/O failure (e.g. writing a report file).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The family connector received a discriminator it does not handle.
    #[error("unsupported operation '{0}'")]
    Unsupported(String),
}

/// Contract for one capability implementation (or one capability family).
///
/// Object-safe: `run` returns a boxed future so implementations can live in
/// dyn dispatch tables. Implementations may perform network I/O and must not
/// mutate the context.
pub trait Connector: Send + Sync {
    /// Implementation name used in logs (e.g. "github", "weather").
    fn name(&self) -> &str;

    fn run<'a>(
        &'a self,
        params: &'a Map<String, Value>,
        ctx: &'a ExecutionContext,
    ) -> BoxFuture<'a, Result<Value, ConnectorError>>;
}

/// Two-tier dispatch table: exact capability keys first, connector families
/// second.
#[derive(Default, Clone)]
pub struct ConnectorRegistry {
    exact: HashMap<String, Arc<dyn Connector>>,
    families: HashMap<String, Arc<dyn Connector>>,
}

impl ConnectorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connector for one exact capability key.
    pub fn register(&mut self, key: impl Into<String>, connector: Arc<dyn Connector>) {
        self.exact.insert(key.into(), connector);
    }

    /// Register a connector handling a whole capability family (all keys
    /// sharing the prefix before the first dot).
    pub fn register_family(&mut self, family: impl Into<String>, connector: Arc<dyn Connector>) {
        self.families.insert(family.into(), connector);
    }

    /// Route a capability key to its implementation: exact match first, then
    /// family dispatch.
    pub fn route(&self, step_type: &str) -> Option<&Arc<dyn Connector>> {
        if let Some(connector) = self.exact.get(step_type) {
            return Some(connector);
        }
        let family = step_type
            .split_once('.')
            .map(|(family, _)| family)
            .unwrap_or(step_type);
        self.families.get(family)
    }

    /// Whether any implementation can serve this key.
    pub fn can_route(&self, step_type: &str) -> bool {
        self.route(step_type).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Probe(&'static str);

    impl Connector for Probe {
        fn name(&self) -> &str {
            self.0
        }

        fn run<'a>(
            &'a self,
            _params: &'a Map<String, Value>,
            _ctx: &'a ExecutionContext,
        ) -> BoxFuture<'a, Result<Value, ConnectorError>> {
            Box::pin(async move { Ok(json!(self.0)) })
        }
    }

    #[test]
    fn test_exact_match_wins_over_family() {
        let mut registry = ConnectorRegistry::new();
        registry.register("github.create_issue", Arc::new(Probe("exact")));
        registry.register_family("github", Arc::new(Probe("family")));

        assert_eq!(registry.route("github.create_issue").unwrap().name(), "exact");
        assert_eq!(registry.route("github.close_issue").unwrap().name(), "family");
    }

    #[test]
    fn test_unroutable_key() {
        let registry = ConnectorRegistry::new();
        assert!(registry.route("nope.nothing").is_none());
        assert!(!registry.can_route("nope.nothing"));
    }

    #[tokio::test]
    async fn test_connector_invocation() {
        let connector = Probe("probe");
        let ctx = ExecutionContext::new(Map::new());
        let out = connector.run(&Map::new(), &ctx).await.unwrap();
        assert_eq!(out, json!("probe"));
    }
}
