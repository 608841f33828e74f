use beacon_config::ConfigError;
use beacon_types::{DecodeError, RemoteError};

/// Why `initialize` failed.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0}")]
    Provider(RemoteError),
    #[error("{0}")]
    Save(RemoteError),
}

/// The failure delivered to a completion callback.
///
/// `Display` is the caller-visible message. Remote messages are not wrapped.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Init(#[from] InitError),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("no installation available: {0}")]
    NoInstallation(RemoteError),
    #[error("task ended without producing a result")]
    Abandoned,
}

impl BridgeError {
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }
}
