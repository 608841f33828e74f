//! Core domain types for Beacon.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything here can be used from any layer of the bridge.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod action;
mod ids;
mod installation;

pub use action::{Action, ActionName, DecodeError};
pub use ids::{InstallationId, ObjectId};
pub use installation::{ChannelSet, InstallationRecord};

use thiserror::Error;

// ============================================================================
// Remote failures
// ============================================================================

/// A failure reported by the remote push service.
///
/// The message is the provider's own text and is passed through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RemoteError {
    message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

// ============================================================================
// Success payloads
// ============================================================================

/// The value carried by a successful completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Success with nothing to report (subscribe/unsubscribe).
    Empty,
    /// A string value (ids, rendered channel list).
    Text(String),
    /// A value that does not exist yet, e.g. an object id before the first save.
    Absent,
}

impl Payload {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            Self::Empty | Self::Absent => None,
        }
    }

    /// JSON form used on the wire. `Empty` and `Absent` both map to `null`.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::Empty | Self::Absent => serde_json::Value::Null,
        }
    }
}

impl From<Option<String>> for Payload {
    fn from(value: Option<String>) -> Self {
        value.map_or(Self::Absent, Self::Text)
    }
}
