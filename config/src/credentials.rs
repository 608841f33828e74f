//! Credential lookup.
//!
//! The push provider is initialized with an application id and a client key
//! resolved by name from whatever string store the host exposes.

use std::collections::HashMap;
use std::fmt;

use crate::ConfigError;

/// Resource key holding the application id.
pub const APP_ID_KEY: &str = "parse_app_id";
/// Resource key holding the client key.
pub const CLIENT_KEY_KEY: &str = "parse_client_key";

/// Resolves named string resources.
pub trait ConfigLookup: Send + Sync {
    /// Resolve `key`. Absent or blank values are `ConfigError::Missing`.
    fn lookup(&self, key: &str) -> Result<String, ConfigError>;
}

impl ConfigLookup for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Result<String, ConfigError> {
        non_blank(key, self.get(key).cloned())
    }
}

pub(crate) fn non_blank(key: &str, value: Option<String>) -> Result<String, ConfigError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ConfigError::Missing {
            key: key.to_string(),
        }),
    }
}

/// Application id and client key for the push provider.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    app_id: String,
    client_key: String,
}

impl Credentials {
    #[must_use]
    pub fn new(app_id: impl Into<String>, client_key: impl Into<String>) -> Self {
        Self {
            app_id: app_id.into(),
            client_key: client_key.into(),
        }
    }

    /// Resolve both credentials. The app id is looked up first, so a config
    /// missing both keys reports the app id.
    pub fn from_lookup(lookup: &dyn ConfigLookup) -> Result<Self, ConfigError> {
        let app_id = lookup.lookup(APP_ID_KEY)?;
        let client_key = lookup.lookup(CLIENT_KEY_KEY)?;
        Ok(Self { app_id, client_key })
    }

    #[must_use]
    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    #[must_use]
    pub fn client_key(&self) -> &str {
        &self.client_key
    }
}

// Manual Debug impl to prevent leaking the client key in logs.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("app_id", &self.app_id)
            .field("client_key", &"[REDACTED]")
            .finish()
    }
}
