//! Bridge actions and argument decoding.
//!
//! Callers name an action with a string and pass a JSON argument array. This
//! module turns that pair into a typed [`Action`] or rejects it before any
//! work is scheduled.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Argument decoding failure. Reported synchronously, never scheduled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("{action} expects exactly {expected} argument(s), got {got}")]
    Arity {
        action: ActionName,
        expected: usize,
        got: usize,
    },
    #[error("{action} argument {index} must be a string, got {found}")]
    NotAString {
        action: ActionName,
        index: usize,
        found: &'static str,
    },
}

/// The fixed set of action names this bridge answers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionName {
    Initialize,
    GetInstallationId,
    GetInstallationObjectId,
    GetSubscriptions,
    Subscribe,
    Unsubscribe,
}

impl ActionName {
    pub const ALL: [ActionName; 6] = [
        Self::Initialize,
        Self::GetInstallationId,
        Self::GetInstallationObjectId,
        Self::GetSubscriptions,
        Self::Subscribe,
        Self::Unsubscribe,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::GetInstallationId => "getInstallationId",
            Self::GetInstallationObjectId => "getInstallationObjectId",
            Self::GetSubscriptions => "getSubscriptions",
            Self::Subscribe => "subscribe",
            Self::Unsubscribe => "unsubscribe",
        }
    }

    /// Look up a wire name. `None` means this bridge does not handle it.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == name)
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A decoded request, ready to be scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Initialize,
    GetInstallationId,
    GetInstallationObjectId,
    GetSubscriptions,
    Subscribe { channel: String },
    Unsubscribe { channel: String },
}

impl Action {
    /// Decode a wire request.
    ///
    /// Returns `Ok(None)` for names this bridge does not know; the caller
    /// should offer the request to another handler. Argument-less actions
    /// ignore whatever arguments are supplied.
    pub fn decode(name: &str, args: &[Value]) -> Result<Option<Self>, DecodeError> {
        let Some(action) = ActionName::parse(name) else {
            return Ok(None);
        };
        let decoded = match action {
            ActionName::Initialize => Self::Initialize,
            ActionName::GetInstallationId => Self::GetInstallationId,
            ActionName::GetInstallationObjectId => Self::GetInstallationObjectId,
            ActionName::GetSubscriptions => Self::GetSubscriptions,
            ActionName::Subscribe => Self::Subscribe {
                channel: single_string(action, args)?,
            },
            ActionName::Unsubscribe => Self::Unsubscribe {
                channel: single_string(action, args)?,
            },
        };
        Ok(Some(decoded))
    }

    #[must_use]
    pub fn name(&self) -> ActionName {
        match self {
            Self::Initialize => ActionName::Initialize,
            Self::GetInstallationId => ActionName::GetInstallationId,
            Self::GetInstallationObjectId => ActionName::GetInstallationObjectId,
            Self::GetSubscriptions => ActionName::GetSubscriptions,
            Self::Subscribe { .. } => ActionName::Subscribe,
            Self::Unsubscribe { .. } => ActionName::Unsubscribe,
        }
    }
}

fn single_string(action: ActionName, args: &[Value]) -> Result<String, DecodeError> {
    match args {
        [Value::String(s)] => Ok(s.clone()),
        [other] => Err(DecodeError::NotAString {
            action,
            index: 0,
            found: json_kind(other),
        }),
        _ => Err(DecodeError::Arity {
            action,
            expected: 1,
            got: args.len(),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
