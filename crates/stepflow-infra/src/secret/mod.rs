//! Secret store implementations.
//!
//! - `env`: environment variable store (read-only, highest priority)
//! - `file`: JSON file store (`.secrets.json` or the user config dir)
//! - `SecretChain`: resolution chain wiring stores together, first hit wins

pub mod env;
pub mod file;

use std::sync::Arc;

use futures_util::future::BoxFuture;
use stepflow_core::secret::{SecretError, SecretStore};

use self::env::EnvSecretStore;
use self::file::JsonFileSecretStore;

/// Ordered chain of secret stores; the first store with a value wins.
///
/// A store that errors is skipped with a warning so a broken secrets file
/// cannot mask values available elsewhere in the chain.
pub struct SecretChain {
    stores: Vec<Arc<dyn SecretStore>>,
}

impl SecretChain {
    pub fn new(stores: Vec<Arc<dyn SecretStore>>) -> Self {
        Self { stores }
    }

    /// The default chain: environment variables first, then the discovered
    /// secrets file.
    pub fn default_chain() -> Self {
        Self::new(vec![
            Arc::new(EnvSecretStore::new()),
            Arc::new(JsonFileSecretStore::discover()),
        ])
    }
}

impl SecretStore for SecretChain {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, SecretError>> {
        Box::pin(async move {
            for store in &self.stores {
                match store.get(key).await {
                    Ok(Some(value)) => return Ok(Some(value)),
                    Ok(None) => continue,
                    Err(e) => {
                        tracing::warn!(key, error = %e, "secret store failed, trying next");
                        continue;
                    }
                }
            }
            Ok(None)
        })
    }
}
