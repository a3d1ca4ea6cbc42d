//! Access-key to secret-key lookup.
//!
//! The filter only reads credentials. A reload builds a fresh store and installs it
//! together with the rest of the admission policy.

use std::collections::HashMap;

use crate::config::CredentialConfig;

/// Resolves the secret key for an access key.
pub trait CredentialStore: Send + Sync {
    /// `None` when the access key is unknown.
    fn resolve_secret(&self, access_key: &str) -> Option<String>;
}

/// In-memory credential map built from configuration.
#[derive(Debug, Default)]
pub struct StaticCredentialStore {
    keys: HashMap<String, String>,
}

impl StaticCredentialStore {
    pub fn new(keys: HashMap<String, String>) -> Self {
        Self { keys }
    }

    pub fn from_config(credentials: &[CredentialConfig]) -> Self {
        Self::new(
            credentials
                .iter()
                .map(|c| (c.access_key.clone(), c.secret_key.clone()))
                .collect(),
        )
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialStore for StaticCredentialStore {
    fn resolve_secret(&self, access_key: &str) -> Option<String> {
        self.keys.get(access_key).cloned()
    }
}
