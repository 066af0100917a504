//! Environment variable secret store.
//!
//! Read-only store checking process environment variables. Highest priority
//! in the default chain: env vars override the secrets file.

use futures_util::future::BoxFuture;
use stepflow_core::secret::{SecretError, SecretStore};

/// Environment variable secret store.
pub struct EnvSecretStore;

impl EnvSecretStore {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EnvSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for EnvSecretStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, SecretError>> {
        Box::pin(async move {
            match std::env::var(key) {
                Ok(value) => Ok(Some(value)),
                Err(std::env::VarError::NotPresent) => Ok(None),
                Err(std::env::VarError::NotUnicode(_)) => {
                    // Env var exists but has invalid Unicode -- treat as not
                    // found, since secrets must be valid strings.
                    Ok(None)
                }
            }
        })
    }
}
