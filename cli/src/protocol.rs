//! JSON-lines wire format.
//!
//! Request:  `{"id": 7, "action": "subscribe", "args": ["news"]}`
//! Response: `{"status": "ok", "id": 7, "payload": null}`
//!           `{"status": "error", "id": 7, "message": "..."}`
//!           `{"status": "not_handled", "id": 7}`
//!
//! `id` is echoed back untouched and may be any JSON value.

use beacon_bridge::Reply;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Value,
    pub action: String,
    #[serde(default)]
    pub args: Vec<Value>,
}

impl Request {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(line)
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Response {
    Ok { id: Value, payload: Value },
    Error { id: Value, message: String },
    NotHandled { id: Value },
}

impl Response {
    pub fn from_reply(id: Value, reply: Reply) -> Self {
        match reply {
            Ok(payload) => Self::Ok {
                id,
                payload: payload.to_json(),
            },
            Err(e) => Self::Error {
                id,
                message: e.message(),
            },
        }
    }

    /// Reply for a line that is not a valid request.
    pub fn malformed(err: &serde_json::Error) -> Self {
        Self::Error {
            id: Value::Null,
            message: format!("malformed request: {err}"),
        }
    }

    pub fn to_line(&self) -> String {
        let mut line = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"status":"error","id":null,"message":"unencodable response: {e}"}}"#)
        });
        line.push('\n');
        line
    }
}
