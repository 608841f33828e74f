//! Configuration for the Beacon bridge.
//!
//! ```toml
//! [strings]
//! parse_app_id = "${PARSE_APP_ID}"
//! parse_client_key = "${PARSE_CLIENT_KEY}"
//!
//! [bridge]
//! strict_subscriptions = true
//! ```
//!
//! The `[strings]` table plays the part of the host's string resources and is
//! read through [`ConfigLookup`]. Values may reference environment variables
//! with `${NAME}`; unset variables expand to the empty string.

mod credentials;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::{env, fs};

use serde::Deserialize;
use thiserror::Error;

pub use credentials::{APP_ID_KEY, CLIENT_KEY_KEY, ConfigLookup, Credentials};

/// Overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "BEACON_CONFIG";

// Default value function for serde (bool::default() is false, so only true needs a fn)
const fn default_true() -> bool {
    true
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing configuration value '{key}'")]
    Missing { key: String },
    #[error("failed to read config at {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config at {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BeaconConfig {
    /// Named string resources (credentials live here).
    #[serde(default)]
    strings: HashMap<String, String>,
    #[serde(default)]
    bridge: BridgeOptions,
}

/// Behavioural switches for the dispatcher.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub struct BridgeOptions {
    /// Report remote subscribe/unsubscribe failures to the caller.
    ///
    /// When false, those calls always report success, which is what older
    /// hosts expect. Failed writes still leave the record untouched.
    #[serde(default = "default_true")]
    pub strict_subscriptions: bool,
}

impl Default for BridgeOptions {
    fn default() -> Self {
        Self {
            strict_subscriptions: true,
        }
    }
}

impl BeaconConfig {
    /// Load the config file, if one exists.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let path = match config_path() {
            Some(path) => path,
            None => return Ok(None),
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    #[must_use]
    pub fn bridge(&self) -> BridgeOptions {
        self.bridge
    }
}

impl ConfigLookup for BeaconConfig {
    fn lookup(&self, key: &str) -> Result<String, ConfigError> {
        let value = self.strings.get(key).map(|raw| expand_env_vars(raw));
        credentials::non_blank(key, value)
    }
}

/// Replace `${NAME}` with the value of environment variable `NAME`.
///
/// Unset variables become empty; an unclosed `${` is kept literally.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let var = &after[..end];
                if !var.is_empty() {
                    out.push_str(&env::var(var).unwrap_or_default());
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }

    out.push_str(rest);
    out
}

/// `$BEACON_CONFIG`, else `~/.beacon/config.toml`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(".beacon").join("config.toml"))
}
