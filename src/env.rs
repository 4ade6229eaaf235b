//! Process environment snapshot.
//!
//! API keys and safety switches are read once at startup and passed by reference to every
//! consumer; nothing below this module touches `std::env` for keys.

use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;

use crate::types::ProviderKind;

/// Disables the reasoning-effort and web-search capability allow-lists.
pub const OVERRIDE_SAFETY_CHECKS: &str = "OVERRIDE_SAFETY_CHECKS";

const TRACKED_VARS: &[&str] = &[
    OVERRIDE_SAFETY_CHECKS,
    "GOOGLE_CLOUD_PROJECT",
    "GCLOUD_PROJECT",
    "GOOGLE_CLOUD_LOCATION",
    "GOOGLE_APPLICATION_CREDENTIALS",
    "GOOGLE_OAUTH_ACCESS_TOKEN",
];

/// Immutable view of the environment variables the tool consumes.
#[derive(Clone, Default)]
pub struct EnvSnapshot {
    keys: HashMap<ProviderKind, SecretString>,
    vars: HashMap<String, String>,
}

impl std::fmt::Debug for EnvSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut providers: Vec<&str> = self.keys.keys().map(|k| k.as_str()).collect();
        providers.sort_unstable();
        f.debug_struct("EnvSnapshot")
            .field("keys", &providers)
            .field("vars", &self.vars)
            .finish()
    }
}

impl EnvSnapshot {
    /// Capture the current process environment
    pub fn from_process() -> Self {
        Self::from_pairs(std::env::vars())
    }

    /// Build a snapshot from explicit `(name, value)` pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut snapshot = Self::default();
        for (name, value) in pairs {
            let (name, value) = (name.into(), value.into());
            if value.trim().is_empty() {
                continue;
            }
            if let Some(kind) = ProviderKind::ALL.into_iter().find(|k| k.env_key() == name) {
                snapshot.keys.insert(kind, SecretString::from(value));
            } else if TRACKED_VARS.contains(&name.as_str()) {
                snapshot.vars.insert(name, value);
            }
        }
        snapshot
    }

    /// Override or add an API key (used for config-file `apiKey` entries)
    pub fn with_api_key(mut self, kind: ProviderKind, key: impl Into<String>) -> Self {
        self.keys.insert(kind, SecretString::from(key.into()));
        self
    }

    pub fn api_key(&self, kind: ProviderKind) -> Option<&SecretString> {
        self.keys.get(&kind)
    }

    pub fn has_api_key(&self, kind: ProviderKind) -> bool {
        self.keys
            .get(&kind)
            .is_some_and(|k| !k.expose_secret().trim().is_empty())
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Whether capability gating should be skipped
    pub fn override_safety_checks(&self) -> bool {
        self.var(OVERRIDE_SAFETY_CHECKS)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
            .unwrap_or(false)
    }
}
