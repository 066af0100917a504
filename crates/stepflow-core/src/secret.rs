//! Secret store boundary.
//!
//! Connectors read API tokens through this trait; implementations (env vars,
//! JSON file, chains) live in `stepflow-infra`. Read-only by design: managing
//! secret storage is a host concern, not an engine concern.

use futures_util::future::BoxFuture;
use thiserror::Error;

/// Errors raised by secret store implementations.
#[derive(Debug, Error)]
pub enum SecretError {
    #[error("secret store unavailable: {0}")]
    Unavailable(String),
}

/// Read-only keyed secret lookup.
///
/// Object-safe (boxed futures) so stores can be chained and shared as
/// `Arc<dyn SecretStore>`.
pub trait SecretStore: Send + Sync {
    /// Look up a secret by key. `Ok(None)` means the store has no entry.
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, SecretError>>;
}
