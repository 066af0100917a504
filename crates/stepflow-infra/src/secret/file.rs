//! JSON file secret store.
//!
//! Loads a flat `{ "KEY": "value" }` object once at construction. The
//! default discovery order is `.secrets.json` in the working directory,
//! then `secrets.json` under the user config dir (`~/.config/stepflow/`).
//! Intended for local development; production hosts should prefer
//! environment variables.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use stepflow_core::secret::{SecretError, SecretStore};

/// Secret store backed by a JSON file loaded at startup.
pub struct JsonFileSecretStore {
    values: HashMap<String, String>,
}

impl JsonFileSecretStore {
    /// Load secrets from a specific file.
    pub fn load(path: &Path) -> Result<Self, SecretError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SecretError::Unavailable(format!("{}: {e}", path.display())))?;
        let values: HashMap<String, String> = serde_json::from_str(&content)
            .map_err(|e| SecretError::Unavailable(format!("{}: {e}", path.display())))?;
        Ok(Self { values })
    }

    /// Build a store from in-memory values (tests, embedding hosts).
    pub fn from_values(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// Load the first secrets file found in the discovery order, or an empty
    /// store when none exists.
    pub fn discover() -> Self {
        for path in Self::candidate_paths() {
            if path.exists() {
                match Self::load(&path) {
                    Ok(store) => {
                        tracing::debug!(path = %path.display(), "loaded secrets file");
                        return store;
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "skipping unreadable secrets file");
                    }
                }
            }
        }
        Self {
            values: HashMap::new(),
        }
    }

    fn candidate_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from(".secrets.json")];
        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("stepflow").join("secrets.json"));
        }
        paths
    }
}

impl SecretStore for JsonFileSecretStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, SecretError>> {
        Box::pin(async move { Ok(self.values.get(key).cloned()) })
    }
}
